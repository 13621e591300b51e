use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use tokio_util::sync::CancellationToken;

/// Why the run was cut short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The resource manager client reported an error.
    ManagerError(String),
    /// The resource manager asked the process to stop.
    ShutdownRequested,
    /// The local process was interrupted.
    Interrupted,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::ManagerError(cause) => write!(f, "resource manager error: {cause}"),
            AbortReason::ShutdownRequested => f.write_str("shutdown requested by resource manager"),
            AbortReason::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// One-shot, process-wide abort flag carrying the first reason it was triggered with.
#[derive(Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<AbortReason>>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the abort. Returns `false` if it had already been triggered.
    pub fn trigger(&self, reason: AbortReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.reason.get().cloned()
    }

    /// Resolves once the abort was triggered.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }
}
