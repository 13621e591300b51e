use thiserror::Error;

use murphy_core::ClientError;
use murphy_model::ModelError;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("invalid local cluster config: {0}")]
    InvalidConfig(String),
    #[error("missing program")]
    MissingProgram,
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("client not started")]
    NotStarted,
    #[error("already registered")]
    AlreadyRegistered,
    #[error("not registered")]
    NotRegistered,
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

impl From<ModelError> for ExecError {
    fn from(e: ModelError) -> Self {
        ExecError::InvalidConfig(e.to_string())
    }
}

impl From<ExecError> for ClientError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::NotStarted | ExecError::InvalidConfig(_) => {
                ClientError::Start(e.to_string())
            }
            ExecError::AlreadyRegistered => ClientError::Registration(e.to_string()),
            ExecError::NotRegistered => ClientError::Unregistration(e.to_string()),
            ExecError::MissingProgram | ExecError::Spawn(_) => ClientError::Rejected(e.to_string()),
            ExecError::Io(_) => ClientError::Transport(e.to_string()),
        }
    }
}
