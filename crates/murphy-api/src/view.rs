use serde::{Deserialize, Serialize};

use murphy_model::{ContainerId, RunSnapshot, TaskDescriptor};

/// One running container as shown by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerView {
    pub container_id: String,
    pub memory_mb: u32,
    pub vcores: u32,
    pub priority: i32,
    pub command: Vec<String>,
}

impl ContainerView {
    pub fn new(id: &ContainerId, task: &TaskDescriptor) -> Self {
        Self {
            container_id: id.to_string(),
            memory_mb: task.required_memory_mb(),
            vcores: task.required_vcores(),
            priority: task.priority(),
            command: task.command().to_vec(),
        }
    }
}

/// Counters plus running containers, ordered by container id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub requested: u32,
    pub completed: u32,
    pub failed: u32,
    pub progress: f32,
    pub containers: Vec<ContainerView>,
}

impl From<&RunSnapshot> for StatusView {
    fn from(snapshot: &RunSnapshot) -> Self {
        let counters = snapshot.counters;
        Self {
            requested: counters.requested,
            completed: counters.completed,
            failed: counters.failed,
            progress: counters.progress(),
            containers: snapshot
                .running
                .iter()
                .map(|(id, task)| ContainerView::new(id, task))
                .collect(),
        }
    }
}
