use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use murphy_core::ContainerAsk;
use murphy_model::{
    CompletionRecord, ContainerGrant, ContainerId, NodeReport, NodeState, Resource,
};

use crate::config::LocalClusterConfig;

/// Bookkeeping of the single local node, shared by the manager and the agent.
pub(crate) struct Node {
    address: String,
    http_address: Option<String>,
    capacity: Resource,
    inner: Mutex<NodeInner>,
}

struct NodeInner {
    free: Resource,
    pending: VecDeque<ContainerAsk>,
    live: HashMap<ContainerId, Resource>,
    finished: Vec<CompletionRecord>,
    refused: Vec<String>,
    next_id: u64,
}

impl Node {
    pub(crate) fn new(cfg: &LocalClusterConfig, capacity: Resource) -> Self {
        Self {
            address: cfg.node_id.clone(),
            http_address: cfg.node_http_address.clone(),
            capacity,
            inner: Mutex::new(NodeInner {
                free: capacity,
                pending: VecDeque::new(),
                live: HashMap::new(),
                finished: Vec::new(),
                refused: Vec::new(),
                next_id: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NodeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push_ask(&self, ask: ContainerAsk) {
        self.lock().pending.push_back(ask);
    }

    /// Grant pending asks in arrival order while the head fits in the free capacity.
    pub(crate) fn allocate(&self) -> Vec<ContainerGrant> {
        let mut inner = self.lock();
        let mut grants = Vec::new();
        while let Some(ask) = inner.pending.front() {
            let capability = ask.capability;
            let Some(free) = inner.free.checked_sub(&capability) else {
                break;
            };
            inner.pending.pop_front();
            inner.free = free;
            inner.next_id += 1;
            let id = ContainerId::new(inner.next_id);
            inner.live.insert(id, capability);
            grants.push(ContainerGrant {
                id,
                node_address: self.address.clone(),
                node_http_address: self.http_address.clone(),
                resource: capability,
            });
        }
        grants
    }

    /// Free the container's capacity and queue its completion for the next heartbeat.
    pub(crate) fn release(&self, record: CompletionRecord) {
        let mut inner = self.lock();
        if let Some(resource) = inner.live.remove(&record.container_id) {
            inner.free = inner.free.saturating_add(&resource);
        }
        inner.finished.push(record);
    }

    pub(crate) fn drain_completions(&self) -> Vec<CompletionRecord> {
        std::mem::take(&mut self.lock().finished)
    }

    /// Record an ask that can never be granted; reported as an error on the next heartbeat.
    pub(crate) fn refuse(&self, cause: String) {
        self.lock().refused.push(cause);
    }

    pub(crate) fn drain_refused(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().refused)
    }

    pub(crate) fn pending_asks(&self) -> usize {
        self.lock().pending.len()
    }

    pub(crate) fn report(&self) -> NodeReport {
        let inner = self.lock();
        NodeReport {
            node_id: self.address.clone(),
            http_address: self.http_address.clone(),
            state: NodeState::Running,
            capability: self.capacity,
            num_containers: inner.live.len() as u32,
            health_report: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(memory_mb: u32) -> Node {
        let cfg = LocalClusterConfig::default();
        Node::new(&cfg, Resource::new(memory_mb, 4).unwrap())
    }

    fn ask(memory_mb: u32) -> ContainerAsk {
        ContainerAsk {
            capability: Resource::new(memory_mb, 1).unwrap(),
            priority: 0,
        }
    }

    #[test]
    fn grants_while_capacity_allows() {
        let node = node(2048);
        for _ in 0..3 {
            node.push_ask(ask(1024));
        }

        let grants = node.allocate();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].id, ContainerId::new(1));
        assert_eq!(grants[1].id, ContainerId::new(2));
        assert_eq!(node.pending_asks(), 1);
        assert!(node.allocate().is_empty());

        node.release(CompletionRecord::new(grants[0].id, 0));
        let next = node.allocate();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, ContainerId::new(3));
        assert_eq!(node.drain_completions().len(), 1);
        assert!(node.drain_completions().is_empty());
    }

    #[test]
    fn report_counts_live_containers() {
        let node = node(4096);
        node.push_ask(ask(512));
        node.allocate();
        let report = node.report();
        assert_eq!(report.num_containers, 1);
        assert_eq!(report.state, NodeState::Running);
    }
}
