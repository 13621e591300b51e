use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid resource: {0}")]
    InvalidResource(String),
    #[error("launch command is empty")]
    EmptyCommand,
}
