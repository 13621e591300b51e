pub mod error;
pub use error::{ClientError, CoreError};

mod config;
pub use config::OrchestratorConfig;

pub mod queue;
pub use queue::{ClaimError, QueueError, RequestQueue};

pub mod state;
pub use state::{Completion, RunState, StateError};

pub mod event;
pub use event::{AllocationEvent, AllocationSink, EventSink, LaunchEvent, LaunchSink};

pub mod client;
pub use client::{
    ContainerAsk, LaunchSpec, NodeAgentClient, ProgressProbe, Registration,
    ResourceManagerClient, StatusServer, TrackingEndpoint,
};

pub mod handler;
pub use handler::{
    AllocationHandler, ENV_CONTAINER_ID, ENV_MEMORY_MB, EventHandler, LaunchHandler,
    spawn_event_loop,
};

mod metrics;
pub use metrics::{MetricsBackend, NoopMetrics, ProtocolErrorKind, TaskOutcome};

mod abort;
pub use abort::{AbortReason, AbortSignal};

pub mod orchestrator;
pub use orchestrator::{Orchestrator, Phase, RunOutcome, WaitResult};

mod system;
pub use system::local_hostname;
