use serde::{Deserialize, Serialize};

use crate::Resource;

/// Health of a cluster node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeState {
    New,
    Running,
    Unhealthy,
    Decommissioned,
    Lost,
    Rebooted,
    Shutdown,
}

impl NodeState {
    /// Returns `true` if containers on this node can no longer be trusted to finish.
    pub fn is_unusable(&self) -> bool {
        matches!(
            self,
            NodeState::Unhealthy
                | NodeState::Decommissioned
                | NodeState::Lost
                | NodeState::Shutdown
        )
    }
}

/// Node description carried by topology-changed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReport {
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_address: Option<String>,
    pub state: NodeState,
    pub capability: Resource,
    pub num_containers: u32,
    #[serde(default)]
    pub health_report: String,
}
