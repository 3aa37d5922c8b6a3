use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use tracker_engine::{ApiSettings, ConnectionSettings, MonitorSettings};
use tracker_logging::{tracker_info, LogDestination, DEFAULT_LOG_FILE};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("invalid server url {url}: {message}")]
    InvalidServerUrl { url: String, message: String },
    #[error("unknown log level {0}")]
    InvalidLogLevel(String),
}

/// Where log records go. The terminal is shared with the live view, so the
/// file is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    File,
    Terminal,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP root of the orchestration service; the stream endpoint is derived.
    pub server_url: String,
    pub token: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub keepalive_secs: u64,
    pub reconnect_delay_secs: u64,
    pub max_reconnect_attempts: u32,
    pub status_debounce_ms: u64,
    pub subscribe_global: bool,
    pub log_target: LogTarget,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let connection = ConnectionSettings::default();
        let api = ApiSettings::default();
        let monitor = MonitorSettings::default();
        Self {
            server_url: api.base_url,
            token: None,
            connect_timeout_secs: api.connect_timeout.as_secs(),
            request_timeout_secs: api.request_timeout.as_secs(),
            keepalive_secs: connection.keepalive_interval.as_secs(),
            reconnect_delay_secs: connection.reconnect_delay.as_secs(),
            max_reconnect_attempts: connection.max_reconnect_attempts,
            status_debounce_ms: millis(monitor.status_debounce),
            subscribe_global: monitor.subscribe_global,
            log_target: LogTarget::File,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads a RON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracker_info!("loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log_target {
            LogTarget::File => LogDestination::File(self.log_file.clone()),
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both(self.log_file.clone()),
        }
    }

    /// `http://host:port` becomes `ws://host:port/api/ws`, `https` becomes `wss`.
    pub fn stream_endpoint(&self) -> Result<String, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidServerUrl {
            url: self.server_url.clone(),
            message,
        };
        let mut url = Url::parse(&self.server_url).map_err(|err| invalid(err.to_string()))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(invalid(format!("unsupported scheme {other}"))),
        };
        url.set_scheme(scheme)
            .map_err(|()| invalid(format!("cannot switch to {scheme}")))?;
        let path = format!("{}/api/ws", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        Ok(url.to_string())
    }

    pub fn monitor_settings(&self) -> Result<MonitorSettings, ConfigError> {
        let endpoint = self.stream_endpoint()?;
        let base_url = self.server_url.trim_end_matches('/').to_string();
        let connect_timeout = Duration::from_secs(self.connect_timeout_secs);

        Ok(MonitorSettings {
            connection: ConnectionSettings {
                endpoint,
                bearer_token: self.token.clone(),
                connect_timeout,
                keepalive_interval: Duration::from_secs(self.keepalive_secs.max(1)),
                reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
                max_reconnect_attempts: self.max_reconnect_attempts,
            },
            api: ApiSettings {
                base_url,
                bearer_token: self.token.clone(),
                connect_timeout,
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
            status_debounce: Duration::from_millis(self.status_debounce_ms),
            subscribe_global: self.subscribe_global,
        })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
