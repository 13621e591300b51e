mod container_id;
pub use container_id::ContainerId;

mod resource;
pub use resource::Resource;

mod task;
pub use task::TaskDescriptor;

mod grant;
pub use grant::ContainerGrant;

mod completion;
pub use completion::{CompletionRecord, ContainerState};

mod node;
pub use node::{NodeReport, NodeState};

mod final_status;
pub use final_status::FinalStatus;

mod snapshot;
pub use snapshot::{RunCounters, RunSnapshot};

/// Scheduling priority of a container request.
///
/// Lower values are served first by the resource manager; the orchestrator only forwards it.
pub type Priority = i32;

/// Process exit indicator reported for a finished container.
pub type ExitStatus = i32;
