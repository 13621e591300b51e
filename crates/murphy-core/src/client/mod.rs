//! Contracts of the external collaborators.
//!
//! The orchestrator never talks to the cluster directly: a resource manager client grants
//! containers, a node agent client launches commands in them, and a status server exposes
//! the run state. All three are injected as trait objects.

use async_trait::async_trait;

use murphy_model::{ContainerGrant, ContainerId, FinalStatus, Priority, Resource};

use crate::{
    error::{ClientError, CoreError},
    event::{AllocationSink, LaunchSink},
    state::RunState,
};

/// Allocation ask sent to the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerAsk {
    pub capability: Resource,
    pub priority: Priority,
}

/// Answer to a successful registration.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    /// Largest container the manager is willing to grant, if it says.
    pub max_capability: Option<Resource>,
    pub queue: Option<String>,
    /// Containers still alive from an earlier attempt of this application.
    pub containers_from_previous_attempts: Vec<ContainerId>,
}

/// Everything a node agent needs to start a task in a granted container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub command: Vec<String>,
    pub resource: Resource,
    pub env: Vec<(String, String)>,
}

/// Where the status endpoint is reachable; sent to the manager at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingEndpoint {
    pub host: String,
    pub port: u16,
    pub tracking_url: String,
}

/// Read access the resource manager client uses for heartbeat progress.
#[derive(Clone)]
pub struct ProgressProbe {
    state: RunState,
}

impl ProgressProbe {
    pub fn new(state: RunState) -> Self {
        Self { state }
    }

    /// Completed fraction in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.state.progress()
    }
}

/// Client of the cluster resource manager.
#[async_trait]
pub trait ResourceManagerClient: Send + Sync + 'static {
    /// Start the client; events are delivered to `events` from now on.
    async fn start(&self, events: AllocationSink, progress: ProgressProbe)
    -> Result<(), ClientError>;

    async fn register(
        &self,
        host: &str,
        port: u16,
        tracking_url: &str,
    ) -> Result<Registration, ClientError>;

    /// Fire-and-forget allocation ask; the answer arrives as an allocation event.
    fn request_container(&self, ask: ContainerAsk);

    async fn unregister(&self, status: FinalStatus, message: &str) -> Result<(), ClientError>;

    async fn stop(&self);
}

/// Client of the per-node launch agents.
#[async_trait]
pub trait NodeAgentClient: Send + Sync + 'static {
    async fn start(&self, events: LaunchSink) -> Result<(), ClientError>;

    /// Fire-and-forget launch; confirmations arrive as launch events.
    fn start_container(&self, grant: &ContainerGrant, spec: LaunchSpec);

    async fn stop(&self);
}

/// Transport serving the read-only status view.
#[async_trait]
pub trait StatusServer: Send + Sync + 'static {
    /// Start serving `state` and report where it is reachable.
    async fn start(&self, state: RunState) -> Result<TrackingEndpoint, CoreError>;

    /// Stop serving. Default: nothing to release.
    async fn stop(&self) {}
}
