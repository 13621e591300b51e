use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    event::LaunchEvent,
    handler::EventHandler,
    metrics::{MetricsBackend, NoopMetrics},
};

/// Processes node agent confirmations.
///
/// Purely observational: completion truth comes from the resource manager's completion
/// events, since a container can start fine and its task still fail later.
pub struct LaunchHandler {
    metrics: Arc<dyn MetricsBackend>,
}

impl LaunchHandler {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(NoopMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for LaunchHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler<LaunchEvent> for LaunchHandler {
    fn handle(&self, event: LaunchEvent) {
        match event {
            LaunchEvent::ContainerStarted {
                container_id,
                service_data,
            } => {
                info!(container = %container_id, "succeeded to start container");
                if !service_data.is_empty() {
                    let services: Vec<&str> = service_data.keys().map(String::as_str).collect();
                    debug!(container = %container_id, ?services, "service data received");
                }
            }
            LaunchEvent::ContainerStopped { container_id } => {
                debug!(container = %container_id, "succeeded to stop container");
            }
            LaunchEvent::ContainerStatus {
                container_id,
                state,
                exit_status,
                diagnostics,
            } => {
                info!(
                    container = %container_id,
                    ?state,
                    exit_status,
                    diagnostics = %diagnostics,
                    "container status received"
                );
            }
            LaunchEvent::StartContainerError {
                container_id,
                cause,
            } => {
                error!(container = %container_id, %cause, "failed to start container");
                self.metrics.record_launch_error("start");
            }
            LaunchEvent::StopContainerError {
                container_id,
                cause,
            } => {
                error!(container = %container_id, %cause, "failed to stop container");
                self.metrics.record_launch_error("stop");
            }
            LaunchEvent::GetContainerStatusError {
                container_id,
                cause,
            } => {
                error!(container = %container_id, %cause, "failed to query container status");
                self.metrics.record_launch_error("status");
            }
        }
    }

    fn name(&self) -> &'static str {
        "launch"
    }
}
