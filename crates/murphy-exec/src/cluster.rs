use std::sync::Arc;

use tracing::info;

use murphy_core::{NodeAgentClient, ResourceManagerClient};

use crate::{
    agent::LocalNodeAgent, config::LocalClusterConfig, error::ExecError,
    manager::LocalResourceManager, node::Node,
};

/// A one-node cluster: a resource manager and a node agent sharing the node's bookkeeping.
pub struct LocalCluster {
    manager: Arc<LocalResourceManager>,
    agent: Arc<LocalNodeAgent>,
}

impl LocalCluster {
    pub fn new(cfg: LocalClusterConfig) -> Result<Self, ExecError> {
        cfg.validate()?;
        let capacity = cfg.capacity()?;
        let max_allocation = cfg.max_allocation()?;
        let node = Arc::new(Node::new(&cfg, capacity));

        info!(
            node = %cfg.node_id,
            %capacity,
            %max_allocation,
            "local cluster created"
        );
        Ok(Self {
            manager: Arc::new(LocalResourceManager::new(
                Arc::clone(&node),
                max_allocation,
                cfg.heartbeat_interval,
            )),
            agent: Arc::new(LocalNodeAgent::new(
                node,
                cfg.kill_grace,
                cfg.limit_address_space,
                cfg.work_dir,
            )),
        })
    }

    pub fn resource_manager(&self) -> Arc<LocalResourceManager> {
        Arc::clone(&self.manager)
    }

    pub fn node_agent(&self) -> Arc<LocalNodeAgent> {
        Arc::clone(&self.agent)
    }

    /// Both clients as the trait objects the orchestrator takes.
    pub fn clients(&self) -> (Arc<dyn ResourceManagerClient>, Arc<dyn NodeAgentClient>) {
        (self.resource_manager(), self.node_agent())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use murphy_core::{
        AllocationEvent, AllocationSink, ContainerAsk, CoreError, LaunchEvent, LaunchSink,
        LaunchSpec, Orchestrator, OrchestratorConfig, ProgressProbe, RunState, StatusServer,
        TrackingEndpoint,
    };
    use murphy_model::{ContainerGrant, ContainerId, FinalStatus, Resource};

    use super::*;

    struct NoStatus;

    #[async_trait]
    impl StatusServer for NoStatus {
        async fn start(&self, _: RunState) -> Result<TrackingEndpoint, CoreError> {
            Ok(TrackingEndpoint {
                host: "localhost".into(),
                port: 0,
                tracking_url: "http://localhost:0/murphy/index".into(),
            })
        }
    }

    fn cluster_config() -> LocalClusterConfig {
        LocalClusterConfig {
            capacity_memory_mb: 1024,
            max_allocation_memory_mb: 512,
            heartbeat_interval: Duration::from_millis(20),
            kill_grace: Duration::from_secs(2),
            limit_address_space: false,
            ..LocalClusterConfig::default()
        }
    }

    fn shell(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    async fn run_with(cluster: &LocalCluster, cfg: OrchestratorConfig) -> murphy_core::RunOutcome {
        let (manager, agent) = cluster.clients();
        let orchestrator = Orchestrator::new(cfg, manager, agent, Arc::new(NoStatus)).unwrap();
        tokio::time::timeout(Duration::from_secs(20), orchestrator.run())
            .await
            .expect("run did not finish")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_real_processes_to_success() {
        let cluster = LocalCluster::new(cluster_config()).unwrap();
        let cfg = OrchestratorConfig {
            container_count: 3,
            container_memory_mb: 256,
            task_command: shell(
                r#"test "$MURPHY_MEMORY_MB" = "{memory_mb}" && test -n "$MURPHY_CONTAINER_ID""#,
            ),
            completion_check_interval: Duration::from_millis(50),
            ..OrchestratorConfig::default()
        };

        let outcome = run_with(&cluster, cfg).await;
        assert_eq!(outcome.status, FinalStatus::Succeeded);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.counters.completed, 3);
        assert_eq!(
            cluster.resource_manager().final_status(),
            Some(FinalStatus::Succeeded)
        );
        assert_eq!(
            cluster.resource_manager().tracking_url().as_deref(),
            Some("http://localhost:0/murphy/index")
        );
        assert_eq!(cluster.node_agent().running(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn request_above_max_allocation_is_never_sent() {
        let cluster = LocalCluster::new(cluster_config()).unwrap();
        let cfg = OrchestratorConfig {
            container_count: 2,
            container_memory_mb: 1024,
            task_command: shell("true"),
            completion_check_interval: Duration::from_millis(50),
            ..OrchestratorConfig::default()
        };

        let outcome = run_with(&cluster, cfg).await;
        assert_eq!(outcome.status, FinalStatus::Failed);
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(outcome.counters.requested, 0);
        assert_eq!(
            cluster.resource_manager().final_status(),
            Some(FinalStatus::Failed)
        );
        assert_eq!(cluster.node_agent().running(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_zero_exits_fail_the_run() {
        let cluster = LocalCluster::new(cluster_config()).unwrap();
        let cfg = OrchestratorConfig {
            container_count: 2,
            container_memory_mb: 128,
            task_command: shell("exit 3"),
            completion_check_interval: Duration::from_millis(50),
            ..OrchestratorConfig::default()
        };

        let outcome = run_with(&cluster, cfg).await;
        assert_eq!(outcome.status, FinalStatus::Failed);
        assert_eq!(outcome.message, "Task failures: 2.");
        assert_eq!(outcome.counters.failed, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn missing_program_counts_as_failure() {
        let cluster = LocalCluster::new(cluster_config()).unwrap();
        let cfg = OrchestratorConfig {
            container_count: 1,
            container_memory_mb: 128,
            task_command: vec!["/nonexistent/murphy-task".into()],
            completion_check_interval: Duration::from_millis(50),
            ..OrchestratorConfig::default()
        };

        let outcome = run_with(&cluster, cfg).await;
        assert_eq!(outcome.counters.completed, 1);
        assert_eq!(outcome.counters.failed, 1);
        assert_eq!(outcome.exit_code, 2);
    }

    #[tokio::test]
    async fn oversized_ask_is_reported_as_error() {
        let cluster = LocalCluster::new(cluster_config()).unwrap();
        let manager = cluster.resource_manager();
        let (sink, mut rx) = AllocationSink::channel(16);
        manager
            .start(sink, ProgressProbe::new(RunState::new()))
            .await
            .unwrap();

        manager.request_container(ContainerAsk {
            capability: Resource::new(4096, 1).unwrap(),
            priority: 0,
        });

        let error = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Some(AllocationEvent::Error(cause)) => return cause,
                    Some(_) => continue,
                    None => panic!("channel closed"),
                }
            }
        })
        .await
        .unwrap();
        assert!(error.contains("exceeds max allocation"));
        manager.stop().await;
    }

    #[tokio::test]
    async fn stop_terminates_running_containers() {
        let cluster = LocalCluster::new(cluster_config()).unwrap();
        let agent = cluster.node_agent();
        let (sink, mut rx) = LaunchSink::channel(16);
        agent.start(sink).await.unwrap();

        let resource = Resource::new(128, 1).unwrap();
        let grant = ContainerGrant {
            id: ContainerId::new(1),
            node_address: "localhost:45454".into(),
            node_http_address: None,
            resource,
        };
        agent.start_container(
            &grant,
            LaunchSpec {
                command: vec!["sleep".into(), "30".into()],
                resource,
                env: Vec::new(),
            },
        );

        let started = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(matches!(started, Some(LaunchEvent::ContainerStarted { .. })));

        tokio::time::timeout(Duration::from_secs(5), agent.stop())
            .await
            .expect("stop hung");
        assert_eq!(agent.running(), 0);

        match rx.recv().await {
            Some(LaunchEvent::ContainerStatus { exit_status, .. }) => {
                assert_eq!(exit_status, 128 + libc::SIGTERM)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
