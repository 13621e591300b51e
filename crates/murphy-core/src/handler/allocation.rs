use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use murphy_model::{CompletionRecord, ContainerGrant, NodeReport, TaskDescriptor};

use crate::{
    abort::{AbortReason, AbortSignal},
    client::{LaunchSpec, NodeAgentClient},
    event::AllocationEvent,
    handler::EventHandler,
    metrics::{MetricsBackend, NoopMetrics, ProtocolErrorKind, TaskOutcome},
    queue::{ClaimError, RequestQueue},
    state::{RunState, StateError},
};

/// Environment variable carrying the container id into the task.
pub const ENV_CONTAINER_ID: &str = "MURPHY_CONTAINER_ID";
/// Environment variable carrying the granted memory into the task.
pub const ENV_MEMORY_MB: &str = "MURPHY_MEMORY_MB";

/// Processes resource manager events: matches grants to queued requests, launches the
/// matched tasks and folds completions into the run state.
pub struct AllocationHandler {
    queue: RequestQueue,
    state: RunState,
    launcher: Arc<dyn NodeAgentClient>,
    metrics: Arc<dyn MetricsBackend>,
    abort: AbortSignal,
    abort_on_error: bool,
    /// Serializes grant matching and completion accounting across callers.
    serial: Mutex<()>,
}

impl AllocationHandler {
    pub fn new(
        queue: RequestQueue,
        state: RunState,
        launcher: Arc<dyn NodeAgentClient>,
        abort: AbortSignal,
    ) -> Self {
        Self {
            queue,
            state,
            launcher,
            metrics: Arc::new(NoopMetrics),
            abort,
            abort_on_error: true,
            serial: Mutex::new(()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_abort_on_error(mut self, abort_on_error: bool) -> Self {
        self.abort_on_error = abort_on_error;
        self
    }

    fn serialize(&self) -> MutexGuard<'_, ()> {
        self.serial.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Completed fraction, used as heartbeat payload only.
    pub fn progress(&self) -> f32 {
        self.state.progress()
    }

    fn on_containers_allocated(&self, grants: Vec<ContainerGrant>) {
        info!(
            allocated = grants.len(),
            "got response from resource manager for container ask"
        );

        let mut launches = Vec::with_capacity(grants.len());
        {
            let _serial = self.serialize();
            for grant in grants {
                let claimed = self
                    .queue
                    .claim_oldest(|task| self.state.assign(grant.id, task.clone()));

                match claimed {
                    Ok(task) => {
                        self.metrics.record_granted();
                        launches.push((grant, task));
                    }
                    Err(
                        ClaimError::Empty
                        | ClaimError::Rejected(StateError::RequestedExceeded { .. }),
                    ) => {
                        warn!(
                            container = %grant.id,
                            node = %grant.node_address,
                            "more grants than outstanding requests; dropping grant"
                        );
                        self.metrics
                            .record_protocol_error(ProtocolErrorKind::SurplusGrant);
                    }
                    Err(ClaimError::Rejected(err)) => {
                        warn!(container = %grant.id, error = %err, "ignoring grant");
                        self.metrics
                            .record_protocol_error(ProtocolErrorKind::DuplicateGrant);
                    }
                }
            }
        }

        // locks are released; launches are fire-and-forget
        for (grant, task) in launches {
            self.launch(&grant, &task);
        }
    }

    fn launch(&self, grant: &ContainerGrant, task: &TaskDescriptor) {
        info!(
            container = %grant.id,
            node = %grant.node_host(),
            http = grant.node_http_address.as_deref().unwrap_or("-"),
            "container allocated for task"
        );
        if !task.resource().fits_in(&grant.resource) {
            warn!(
                container = %grant.id,
                required = %task.resource(),
                granted = %grant.resource,
                "granted capability is smaller than the matched request"
            );
        }

        let spec = LaunchSpec {
            command: task.command().to_vec(),
            resource: *task.resource(),
            env: vec![
                (ENV_CONTAINER_ID.to_string(), grant.id.to_string()),
                (
                    ENV_MEMORY_MB.to_string(),
                    task.required_memory_mb().to_string(),
                ),
            ],
        };
        debug!(container = %grant.id, command = ?spec.command, "launching command");
        self.launcher.start_container(grant, spec);
    }

    fn on_containers_completed(&self, records: Vec<CompletionRecord>) {
        let _serial = self.serialize();
        for record in records {
            let id = record.container_id;
            match self.state.complete(&record) {
                Ok(done) if done.failed => {
                    error!(
                        container = %id,
                        exit_status = record.exit_status,
                        state = ?record.state,
                        diagnostics = %record.diagnostics,
                        completed = done.counters.completed,
                        requested = done.counters.requested,
                        "container failed"
                    );
                    self.metrics.record_completed(TaskOutcome::Failed);
                }
                Ok(done) => {
                    info!(
                        container = %id,
                        completed = done.counters.completed,
                        requested = done.counters.requested,
                        "container completed"
                    );
                    self.metrics.record_completed(TaskOutcome::Succeeded);
                }
                Err(StateError::AlreadyCompleted(_)) => {
                    warn!(container = %id, "duplicate completion ignored");
                    self.metrics
                        .record_protocol_error(ProtocolErrorKind::DuplicateCompletion);
                }
                Err(err) => {
                    warn!(container = %id, error = %err, "completion for unknown container ignored");
                    self.metrics
                        .record_protocol_error(ProtocolErrorKind::UnknownCompletion);
                }
            }
        }
    }

    fn on_error(&self, cause: String) {
        error!(%cause, "error reported by resource manager client");
        self.metrics.record_manager_error();
        if self.abort_on_error && self.abort.trigger(AbortReason::ManagerError(cause)) {
            warn!("aborting run after resource manager error");
        }
    }

    fn on_shutdown_request(&self) {
        warn!("shutdown was requested by resource manager");
        self.abort.trigger(AbortReason::ShutdownRequested);
    }

    fn on_nodes_updated(&self, nodes: Vec<NodeReport>) {
        for node in nodes {
            if node.state.is_unusable() {
                warn!(
                    node = %node.node_id,
                    state = ?node.state,
                    health = %node.health_report,
                    containers = node.num_containers,
                    "node became unusable"
                );
            } else {
                info!(
                    node = %node.node_id,
                    state = ?node.state,
                    capability = %node.capability,
                    containers = node.num_containers,
                    "node updated"
                );
            }
        }
    }
}

impl EventHandler<AllocationEvent> for AllocationHandler {
    fn handle(&self, event: AllocationEvent) {
        match event {
            AllocationEvent::ContainersAllocated(grants) => self.on_containers_allocated(grants),
            AllocationEvent::ContainersCompleted(records) => {
                self.on_containers_completed(records)
            }
            AllocationEvent::Error(cause) => self.on_error(cause),
            AllocationEvent::ShutdownRequested => self.on_shutdown_request(),
            AllocationEvent::NodesUpdated(nodes) => self.on_nodes_updated(nodes),
        }
    }

    fn name(&self) -> &'static str {
        "allocation"
    }
}
