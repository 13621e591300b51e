use std::io::IsTerminal;

use serde::Deserialize;

use crate::logger::{format::LoggerFormat, level::LoggerLevel};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    pub with_targets: bool,
    pub use_color: bool,
    /// Show container stdout regardless of `level`.
    pub container_output: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: std::io::stdout().is_terminal(),
            container_output: false,
        }
    }
}
