use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use murphy_core::{
    AllocationEvent, AllocationSink, ClientError, ContainerAsk, CoreError, ProgressProbe,
    Registration, ResourceManagerClient,
};
use murphy_model::{FinalStatus, Resource};

use crate::{error::ExecError, node::Node};

#[derive(Default)]
struct ManagerState {
    events: Option<AllocationSink>,
    heartbeat: Option<JoinHandle<()>>,
    tracking_url: Option<String>,
    final_status: Option<FinalStatus>,
}

/// Resource manager of the local cluster.
///
/// Asks are queued on the node and answered from a heartbeat loop, so grants always arrive
/// asynchronously, as they would from a remote manager.
pub struct LocalResourceManager {
    node: Arc<Node>,
    max_allocation: Resource,
    heartbeat_interval: Duration,
    shutdown: CancellationToken,
    state: Mutex<ManagerState>,
}

impl LocalResourceManager {
    pub(crate) fn new(
        node: Arc<Node>,
        max_allocation: Resource,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            node,
            max_allocation,
            heartbeat_interval,
            shutdown: CancellationToken::new(),
            state: Mutex::new(ManagerState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Final status reported at unregistration, if any.
    pub fn final_status(&self) -> Option<FinalStatus> {
        self.lock().final_status
    }

    pub fn tracking_url(&self) -> Option<String> {
        self.lock().tracking_url.clone()
    }
}

#[async_trait]
impl ResourceManagerClient for LocalResourceManager {
    async fn start(
        &self,
        events: AllocationSink,
        progress: ProgressProbe,
    ) -> Result<(), ClientError> {
        let mut state = self.lock();
        if state.events.is_some() {
            return Err(ClientError::Start("resource manager already started".into()));
        }
        state.events = Some(events.clone());

        let heartbeat = Heartbeat {
            node: Arc::clone(&self.node),
            events,
            progress,
            node_reported: false,
        };
        let interval = self.heartbeat_interval;
        let shutdown = self.shutdown.clone();
        state.heartbeat = Some(tokio::spawn(heartbeat.run(interval, shutdown)));
        debug!(interval_ms = interval.as_millis() as u64, "local resource manager started");
        Ok(())
    }

    async fn register(
        &self,
        host: &str,
        port: u16,
        tracking_url: &str,
    ) -> Result<Registration, ClientError> {
        let mut state = self.lock();
        if state.events.is_none() {
            return Err(ExecError::NotStarted.into());
        }
        if state.tracking_url.is_some() {
            return Err(ExecError::AlreadyRegistered.into());
        }
        state.tracking_url = Some(tracking_url.to_string());
        info!(host, port, tracking_url, "application master registered");

        Ok(Registration {
            max_capability: Some(self.max_allocation),
            queue: Some("default".to_string()),
            containers_from_previous_attempts: Vec::new(),
        })
    }

    fn request_container(&self, ask: ContainerAsk) {
        if !ask.capability.fits_in(&self.max_allocation) {
            warn!(
                requested = %ask.capability,
                max = %self.max_allocation,
                "container ask exceeds max allocation"
            );
            self.node.refuse(format!(
                "invalid resource request: {} exceeds max allocation {}",
                ask.capability, self.max_allocation
            ));
            return;
        }
        self.node.push_ask(ask);
        trace!(
            capability = %ask.capability,
            priority = ask.priority,
            pending = self.node.pending_asks(),
            "container ask queued"
        );
    }

    async fn unregister(&self, status: FinalStatus, message: &str) -> Result<(), ClientError> {
        let mut state = self.lock();
        if state.tracking_url.is_none() {
            return Err(ExecError::NotRegistered.into());
        }
        state.final_status = Some(status);
        info!(%status, message, "application master unregistered");
        Ok(())
    }

    async fn stop(&self) {
        self.shutdown.cancel();
        let heartbeat = self.lock().heartbeat.take();
        if let Some(handle) = heartbeat
            && let Err(err) = handle.await
        {
            warn!(error = %err, "heartbeat loop ended abnormally");
        }
        debug!("local resource manager stopped");
    }
}

struct Heartbeat {
    node: Arc<Node>,
    events: AllocationSink,
    progress: ProgressProbe,
    node_reported: bool,
}

impl Heartbeat {
    async fn run(mut self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.beat().await {
                        debug!(error = %err, "allocation events dropped; heartbeat stopped");
                        break;
                    }
                }
            }
        }
    }

    /// One allocate round trip: completions first so their capacity is reusable at once.
    async fn beat(&mut self) -> Result<(), CoreError> {
        trace!(progress = self.progress.progress(), "heartbeat");

        if !self.node_reported {
            self.events
                .send(AllocationEvent::NodesUpdated(vec![self.node.report()]))
                .await?;
            self.node_reported = true;
        }
        for cause in self.node.drain_refused() {
            self.events.send(AllocationEvent::Error(cause)).await?;
        }

        let completed = self.node.drain_completions();
        if !completed.is_empty() {
            self.events
                .send(AllocationEvent::ContainersCompleted(completed))
                .await?;
        }
        let granted = self.node.allocate();
        if !granted.is_empty() {
            self.events
                .send(AllocationEvent::ContainersAllocated(granted))
                .await?;
        }
        Ok(())
    }
}
