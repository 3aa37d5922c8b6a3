//! `batch-tracker` CLI building blocks: config, command line, input parsing
//! and text rendering of the monitor view.
mod cli;
mod config;
mod input;
mod render;

pub use cli::{Cli, LogTargetArg};
pub use config::{AppConfig, ConfigError, LogTarget};
pub use input::{parse_command, Command, InputError, HELP};
pub use render::render;
