use std::path::PathBuf;

use clap::Parser;

use crate::config::{AppConfig, LogTarget};

/// Follow one processing batch live and control it from the terminal.
#[derive(Debug, Parser)]
#[command(name = "batch-tracker", version)]
pub struct Cli {
    /// Batch to open.
    pub batch_id: String,

    /// RON config file; flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Server root, e.g. http://localhost:8000.
    #[arg(long)]
    pub server: Option<String>,

    /// Bearer token for the API and the event stream.
    #[arg(long)]
    pub token: Option<String>,

    #[arg(long)]
    pub keepalive_secs: Option<u64>,

    #[arg(long)]
    pub reconnect_delay_secs: Option<u64>,

    #[arg(long)]
    pub max_reconnect_attempts: Option<u32>,

    #[arg(long)]
    pub status_debounce_ms: Option<u64>,

    /// Only follow the batch channel, not the global feed.
    #[arg(long)]
    pub no_global: bool,

    /// Job to follow on its own channel; may be repeated.
    #[arg(long = "watch", value_name = "JOB_ID")]
    pub watch: Vec<String>,

    #[arg(long, value_enum)]
    pub log_target: Option<LogTargetArg>,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// off, error, warn, info, debug or trace.
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogTargetArg {
    File,
    Terminal,
    Both,
}

impl From<LogTargetArg> for LogTarget {
    fn from(arg: LogTargetArg) -> Self {
        match arg {
            LogTargetArg::File => LogTarget::File,
            LogTargetArg::Terminal => LogTarget::Terminal,
            LogTargetArg::Both => LogTarget::Both,
        }
    }
}

impl Cli {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(secs) = self.keepalive_secs {
            config.keepalive_secs = secs;
        }
        if let Some(secs) = self.reconnect_delay_secs {
            config.reconnect_delay_secs = secs;
        }
        if let Some(attempts) = self.max_reconnect_attempts {
            config.max_reconnect_attempts = attempts;
        }
        if let Some(ms) = self.status_debounce_ms {
            config.status_debounce_ms = ms;
        }
        if self.no_global {
            config.subscribe_global = false;
        }
        if let Some(target) = self.log_target {
            config.log_target = target.into();
        }
        if let Some(path) = &self.log_file {
            config.log_file = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}
