use serde::{Deserialize, Serialize};

use crate::{ContainerId, Resource};

/// A container handed out by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGrant {
    pub id: ContainerId,
    /// Node agent address, `host:port`.
    pub node_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_http_address: Option<String>,
    /// Capability actually granted.
    pub resource: Resource,
}

impl ContainerGrant {
    /// Host part of [`ContainerGrant::node_address`].
    pub fn node_host(&self) -> &str {
        self.node_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&self.node_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_host_strips_port() {
        let grant = ContainerGrant {
            id: ContainerId::new(1),
            node_address: "worker-3:45454".into(),
            node_http_address: None,
            resource: Resource::new(512, 1).unwrap(),
        };
        assert_eq!(grant.node_host(), "worker-3");
    }
}
