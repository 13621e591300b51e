use thiserror::Error;
use tracing_subscriber::util::TryInitError;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, expected text, json or journald")]
    UnknownFormat(String),
    #[error("journald output needs linux and the `journald` feature")]
    JournaldUnavailable,
    #[error("cannot connect to journald: {0}")]
    Journald(#[source] std::io::Error),
    #[error("invalid log directive {0:?}")]
    InvalidDirective(String),
    #[error("global subscriber is already installed: {0}")]
    Install(#[from] TryInitError),
}
