use thiserror::Error;

use murphy_model::{ModelError, Resource};

use crate::{orchestrator::Phase, queue::QueueError};

/// Failures reported by the external cluster clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client failed to start: {0}")]
    Start(String),
    #[error("registration failed: {0}")]
    Registration(String),
    #[error("unregistration failed: {0}")]
    Unregistration(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid phase transition: {from:?} -> {to:?}")]
    InvalidPhase { from: Phase, to: Phase },

    #[error("requested {requested} exceeds maximum capability {max}")]
    CapabilityExceeded { requested: Resource, max: Resource },

    #[error("status endpoint error: {0}")]
    Status(String),

    #[error("event channel closed")]
    ChannelClosed,

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}
