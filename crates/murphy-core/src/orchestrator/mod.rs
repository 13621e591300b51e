//! Orchestrator lifecycle.
//!
//! Runs on a single flow of control; all concurrency lives in the two event loops started
//! by [`Orchestrator::start_clients`].

mod outcome;
pub use outcome::{EXIT_ABORTED, EXIT_FATAL, EXIT_OK, EXIT_TASK_FAILURES, RunOutcome, WaitResult};

mod phase;
pub use phase::Phase;

use std::sync::Arc;

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use murphy_model::{FinalStatus, Resource, RunCounters, TaskDescriptor};

use crate::{
    abort::{AbortReason, AbortSignal},
    client::{
        ContainerAsk, NodeAgentClient, ProgressProbe, Registration, ResourceManagerClient,
        StatusServer,
    },
    config::OrchestratorConfig,
    error::CoreError,
    event::{AllocationSink, LaunchSink},
    handler::{AllocationHandler, LaunchHandler, spawn_event_loop},
    metrics::{MetricsBackend, NoopMetrics},
    queue::RequestQueue,
    state::RunState,
};

pub struct Orchestrator {
    cfg: OrchestratorConfig,
    phase: Phase,
    queue: RequestQueue,
    state: RunState,
    manager: Arc<dyn ResourceManagerClient>,
    agent: Arc<dyn NodeAgentClient>,
    status: Arc<dyn StatusServer>,
    metrics: Arc<dyn MetricsBackend>,
    abort: AbortSignal,
    loops_shutdown: CancellationToken,
    loops: Vec<JoinHandle<()>>,
    registration: Option<Registration>,
}

impl Orchestrator {
    pub fn new(
        cfg: OrchestratorConfig,
        manager: Arc<dyn ResourceManagerClient>,
        agent: Arc<dyn NodeAgentClient>,
        status: Arc<dyn StatusServer>,
    ) -> Result<Self, CoreError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            phase: Phase::Created,
            queue: RequestQueue::new(),
            state: RunState::new(),
            manager,
            agent,
            status,
            metrics: Arc::new(NoopMetrics),
            abort: AbortSignal::new(),
            loops_shutdown: CancellationToken::new(),
            loops: Vec::new(),
            registration: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsBackend>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Handle to the shared run state (read side for status views).
    pub fn state(&self) -> RunState {
        self.state.clone()
    }

    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    /// Signal that cuts the wait short; triggered by the allocation handler or externally.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    fn check(&self, to: Phase) -> Result<(), CoreError> {
        if self.phase.can_transition(to) {
            Ok(())
        } else {
            Err(CoreError::InvalidPhase {
                from: self.phase,
                to,
            })
        }
    }

    fn advance(&mut self, to: Phase) -> Result<(), CoreError> {
        self.check(to)?;
        debug!(from = %self.phase, to = %to, "orchestrator phase transition");
        self.phase = to;
        Ok(())
    }

    /// Spawn both event loops and start the external clients.
    pub async fn start_clients(&mut self) -> Result<(), CoreError> {
        self.check(Phase::ClientsStarted)?;

        let capacity = self.cfg.event_queue_capacity;
        let (allocation_tx, allocation_rx) = AllocationSink::channel(capacity);
        let (launch_tx, launch_rx) = LaunchSink::channel(capacity);

        let allocation = AllocationHandler::new(
            self.queue.clone(),
            self.state.clone(),
            Arc::clone(&self.agent),
            self.abort.clone(),
        )
        .with_metrics(Arc::clone(&self.metrics))
        .with_abort_on_error(self.cfg.abort_on_manager_error);
        let launch = LaunchHandler::new().with_metrics(Arc::clone(&self.metrics));

        self.loops.push(spawn_event_loop(
            Arc::new(allocation),
            allocation_rx,
            self.loops_shutdown.clone(),
        ));
        self.loops.push(spawn_event_loop(
            Arc::new(launch),
            launch_rx,
            self.loops_shutdown.clone(),
        ));

        self.manager
            .start(allocation_tx, ProgressProbe::new(self.state.clone()))
            .await?;
        self.agent.start(launch_tx).await?;

        info!("cluster clients started");
        self.advance(Phase::ClientsStarted)
    }

    /// Start the status endpoint and register with the resource manager, advertising the
    /// endpoint as tracking location.
    pub async fn register_with_manager(&mut self) -> Result<(), CoreError> {
        self.check(Phase::Registered)?;

        let endpoint = self.status.start(self.state.clone()).await?;
        let registration = self
            .manager
            .register(&endpoint.host, endpoint.port, &endpoint.tracking_url)
            .await?;

        info!(
            host = %endpoint.host,
            port = endpoint.port,
            tracking_url = %endpoint.tracking_url,
            "registered with resource manager"
        );
        info!(
            previous_attempts = ?registration.containers_from_previous_attempts,
            max_capability = ?registration.max_capability,
            queue = registration.queue.as_deref().unwrap_or("-"),
            "registration details"
        );

        self.registration = Some(registration);
        self.advance(Phase::Registered)
    }

    pub fn registration(&self) -> Option<&Registration> {
        self.registration.as_ref()
    }

    /// Build `count` descriptors and ask for one container each.
    ///
    /// Every descriptor is queued before its ask is sent, so a grant can never overtake the
    /// request it answers.
    #[instrument(level = "debug", skip(self))]
    pub fn submit_requests(&mut self, count: u32, memory_mb: u32) -> Result<(), CoreError> {
        self.check(Phase::RequestsSubmitted)?;
        if count == 0 {
            return Err(CoreError::InvalidConfig(
                "container count must be positive".into(),
            ));
        }

        let resource = Resource::new(memory_mb, self.cfg.container_vcores)?;
        if let Some(max) = self.registration.as_ref().and_then(|r| r.max_capability)
            && !resource.fits_in(&max)
        {
            return Err(CoreError::CapabilityExceeded {
                requested: resource,
                max,
            });
        }

        let command = self.cfg.render_command(memory_mb);
        self.state.set_requested(count);
        self.metrics.record_requested(count);
        info!(count, %resource, "requesting containers");

        for _ in 0..count {
            let task = TaskDescriptor::new(resource, self.cfg.priority, command.clone())?;
            let ask = ContainerAsk {
                capability: *task.resource(),
                priority: task.priority(),
            };
            self.queue.enqueue(task)?;
            self.manager.request_container(ask);
        }
        self.queue.seal();
        debug!(pending = self.queue.len(), "all container asks sent");

        self.advance(Phase::RequestsSubmitted)
    }

    /// Wait until every requested container completed or the run is aborted.
    ///
    /// Wakes on counter changes; progress is logged every completion check interval.
    pub async fn await_completion(&mut self) -> Result<WaitResult, CoreError> {
        self.advance(Phase::AwaitingCompletion)?;
        info!("waiting for containers completion");

        let mut counters_rx = self.state.subscribe();
        let done = counters_rx.wait_for(RunCounters::is_done);
        tokio::pin!(done);

        let mut ticker = tokio::time::interval(self.cfg.completion_check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                res = &mut done => {
                    let counters = *res.map_err(|_| CoreError::ChannelClosed)?;
                    info!(
                        completed = counters.completed,
                        failed = counters.failed,
                        "all containers completed"
                    );
                    return Ok(WaitResult::Completed(counters));
                }
                _ = self.abort.triggered() => {
                    let reason = self.abort.reason().unwrap_or(AbortReason::Interrupted);
                    warn!(%reason, "wait for completion aborted");
                    return Ok(WaitResult::Aborted(reason));
                }
                _ = ticker.tick() => {
                    let counters = self.state.counters();
                    info!(
                        completed = counters.completed,
                        requested = counters.requested,
                        failed = counters.failed,
                        "containers completed so far"
                    );
                }
            }
        }
    }

    /// Report the final status, then stop both clients.
    pub async fn unregister(
        &mut self,
        status: FinalStatus,
        message: &str,
    ) -> Result<(), CoreError> {
        self.advance(Phase::Unregistering)?;
        info!(%status, message, "unregistering from resource manager");

        let result = self
            .manager
            .unregister(status, message)
            .await
            .map_err(CoreError::from);
        self.shutdown().await;
        result
    }

    async fn shutdown(&mut self) {
        self.manager.stop().await;
        info!("resource manager client stopped");
        self.agent.stop().await;
        info!("node agent client stopped");
        self.status.stop().await;

        self.loops_shutdown.cancel();
        for handle in self.loops.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "event loop ended abnormally");
            }
        }

        if self.phase != Phase::Terminated {
            self.phase = Phase::Terminated;
        }
    }

    /// Drive the whole lifecycle and return the outcome; never panics on cluster errors.
    pub async fn run(mut self) -> RunOutcome {
        if let Err(err) = self.start_clients().await {
            error!(error = %err, "failed to start cluster clients");
            self.shutdown().await;
            return RunOutcome::fatal(&err, self.state.counters());
        }
        if let Err(err) = self.register_with_manager().await {
            error!(error = %err, "failed to register with resource manager");
            self.shutdown().await;
            return RunOutcome::fatal(&err, self.state.counters());
        }

        let count = self.cfg.container_count;
        let memory_mb = self.cfg.container_memory_mb;
        let wait = match self.submit_requests(count, memory_mb) {
            Ok(()) => self.await_completion().await,
            Err(err) => Err(err),
        };
        let outcome = match wait {
            Ok(wait) => RunOutcome::from_wait(&wait, self.state.counters()),
            Err(err) => {
                error!(error = %err, "run failed");
                RunOutcome::fatal(&err, self.state.counters())
            }
        };

        if let Err(err) = self.unregister(outcome.status, &outcome.message).await {
            error!(error = %err, "failed to unregister from resource manager");
        }
        info!(
            status = %outcome.status,
            exit_code = outcome.exit_code,
            "orchestrator stopped"
        );
        outcome
    }
}
