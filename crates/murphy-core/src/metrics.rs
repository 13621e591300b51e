/// Outcome label of a completed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed,
}

impl TaskOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Succeeded => "succeeded",
            TaskOutcome::Failed => "failed",
        }
    }
}

/// Bookkeeping mismatches between the orchestrator and the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    /// More grants than outstanding requests.
    SurplusGrant,
    /// A grant reused a container id.
    DuplicateGrant,
    /// Completion for a container that was never granted.
    UnknownCompletion,
    /// Second completion for the same container.
    DuplicateCompletion,
}

impl ProtocolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolErrorKind::SurplusGrant => "surplus_grant",
            ProtocolErrorKind::DuplicateGrant => "duplicate_grant",
            ProtocolErrorKind::UnknownCompletion => "unknown_completion",
            ProtocolErrorKind::DuplicateCompletion => "duplicate_completion",
        }
    }
}

/// Sink for orchestrator metrics. All methods default to no-ops.
pub trait MetricsBackend: Send + Sync + 'static {
    fn record_requested(&self, _count: u32) {}
    fn record_granted(&self) {}
    fn record_completed(&self, _outcome: TaskOutcome) {}
    fn record_protocol_error(&self, _kind: ProtocolErrorKind) {}
    fn record_launch_error(&self, _kind: &'static str) {}
    fn record_manager_error(&self) {}
}

/// Metrics backend that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {}
