use std::{
    collections::HashMap,
    path::PathBuf,
    process::Stdio,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::ChildStdout,
    runtime::Handle,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use murphy_core::{ClientError, LaunchEvent, LaunchSink, LaunchSpec, NodeAgentClient};
use murphy_model::{CompletionRecord, ContainerGrant, ContainerId, ContainerState};
use murphy_observe::CONTAINER_TARGET;

use crate::{
    error::ExecError,
    limits::{RlimitConfig, attach_rlimits},
    node::Node,
    util::{SPAWN_FAILURE_EXIT, cmd_program, exit_code, kill_graceful},
};

#[derive(Default)]
struct AgentState {
    events: Option<LaunchSink>,
    runtime: Option<Handle>,
    containers: HashMap<ContainerId, JoinHandle<()>>,
}

/// Node agent of the local cluster: runs each container's command as a child process.
pub struct LocalNodeAgent {
    node: Arc<Node>,
    kill_grace: Duration,
    limit_address_space: bool,
    work_dir: Option<PathBuf>,
    shutdown: CancellationToken,
    state: Mutex<AgentState>,
}

impl LocalNodeAgent {
    pub(crate) fn new(
        node: Arc<Node>,
        kill_grace: Duration,
        limit_address_space: bool,
        work_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            node,
            kill_grace,
            limit_address_space,
            work_dir,
            shutdown: CancellationToken::new(),
            state: Mutex::new(AgentState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Containers whose process has not been reaped yet.
    pub fn running(&self) -> usize {
        self.lock()
            .containers
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}

#[async_trait]
impl NodeAgentClient for LocalNodeAgent {
    async fn start(&self, events: LaunchSink) -> Result<(), ClientError> {
        let mut state = self.lock();
        if state.events.is_some() {
            return Err(ClientError::Start("node agent already started".into()));
        }
        state.events = Some(events);
        state.runtime = Some(Handle::current());
        debug!("local node agent started");
        Ok(())
    }

    fn start_container(&self, grant: &ContainerGrant, spec: LaunchSpec) {
        let mut state = self.lock();
        let (Some(events), Some(runtime)) = (state.events.clone(), state.runtime.clone()) else {
            warn!(container = %grant.id, "launch requested before node agent start");
            self.node.release(
                CompletionRecord::new(grant.id, SPAWN_FAILURE_EXIT)
                    .with_diagnostics(ExecError::NotStarted.to_string()),
            );
            return;
        };

        let run = ContainerRun {
            id: grant.id,
            limits: RlimitConfig::for_container(&spec.resource, self.limit_address_space),
            spec,
            work_dir: self.work_dir.clone(),
            events,
            node: Arc::clone(&self.node),
            grace: self.kill_grace,
            cancel: self.shutdown.child_token(),
        };
        state.containers.retain(|_, h| !h.is_finished());
        state.containers.insert(grant.id, runtime.spawn(run.run()));
    }

    async fn stop(&self) {
        self.shutdown.cancel();
        let handles: Vec<_> = self.lock().containers.drain().collect();
        if !handles.is_empty() {
            info!(containers = handles.len(), "stopping containers");
        }
        for (id, handle) in handles {
            if let Err(err) = handle.await {
                warn!(container = %id, error = %err, "container task ended abnormally");
            }
        }
        debug!("local node agent stopped");
    }
}

/// One container process from spawn to reap.
struct ContainerRun {
    id: ContainerId,
    spec: LaunchSpec,
    limits: RlimitConfig,
    work_dir: Option<PathBuf>,
    events: LaunchSink,
    node: Arc<Node>,
    grace: Duration,
    cancel: CancellationToken,
}

impl ContainerRun {
    async fn run(self) {
        let record = match self.execute().await {
            Ok(record) => record,
            Err(err) => {
                warn!(container = %self.id, error = %err, "container could not be run");
                let _ = self
                    .events
                    .send(LaunchEvent::StartContainerError {
                        container_id: self.id,
                        cause: err.to_string(),
                    })
                    .await;
                CompletionRecord::new(self.id, SPAWN_FAILURE_EXIT).with_diagnostics(err.to_string())
            }
        };
        self.node.release(record);
    }

    async fn execute(&self) -> Result<CompletionRecord, ExecError> {
        let id = self.id;
        let mut cmd = cmd_program(&self.spec.command)?;
        cmd.envs(self.spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());
        cmd.kill_on_drop(true);
        attach_rlimits(&mut cmd, &self.limits);

        trace!(container = %id, command = ?self.spec.command, "spawn");
        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;
        info!(container = %id, pid = ?child.id(), "container process started");
        let _ = self
            .events
            .send(LaunchEvent::ContainerStarted {
                container_id: id,
                service_data: HashMap::new(),
            })
            .await;

        let output = child.stdout.take().map(|out| tokio::spawn(forward_output(id, out)));

        let (status, diagnostics) = tokio::select! {
            status = child.wait() => (status?, String::new()),
            _ = self.cancel.cancelled() => {
                debug!(container = %id, "node agent stopping; terminating container");
                let status = kill_graceful(&mut child, self.grace).await?;
                (status, "container killed by node agent stop".to_string())
            }
        };
        if let Some(output) = output {
            let _ = output.await;
        }

        let exit = exit_code(status);
        debug!(container = %id, exit, "container process exited");
        let _ = self
            .events
            .send(LaunchEvent::ContainerStatus {
                container_id: id,
                state: ContainerState::Complete,
                exit_status: exit,
                diagnostics: diagnostics.clone(),
            })
            .await;

        Ok(CompletionRecord::new(id, exit).with_diagnostics(diagnostics))
    }
}

async fn forward_output(id: ContainerId, stdout: ChildStdout) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: CONTAINER_TARGET, container = %id, %line);
    }
}
