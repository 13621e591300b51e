mod config;
mod error;
mod format;
mod init;
mod level;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;
pub use init::logger_init;
pub use level::LoggerLevel;

/// Target under which container stdout lines are logged.
pub const CONTAINER_TARGET: &str = "murphy.container";
