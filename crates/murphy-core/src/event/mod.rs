//! Inbound messages from the external clients.
//!
//! Each collaborator gets a bounded channel; its events are consumed by a single event loop
//! (see [`crate::handler::spawn_event_loop`]).

use std::collections::HashMap;

use tokio::sync::mpsc;

use murphy_model::{
    CompletionRecord, ContainerGrant, ContainerId, ContainerState, ExitStatus, NodeReport,
};

use crate::error::CoreError;

/// Events delivered by the resource manager client.
#[derive(Debug, Clone)]
pub enum AllocationEvent {
    /// Containers were granted against outstanding requests.
    ContainersAllocated(Vec<ContainerGrant>),
    /// Containers finished.
    ContainersCompleted(Vec<CompletionRecord>),
    /// Communication with the resource manager failed.
    Error(String),
    /// The resource manager asked this process to stop.
    ShutdownRequested,
    /// Health or availability of cluster nodes changed.
    NodesUpdated(Vec<NodeReport>),
}

/// Events delivered by the node agent client after a launch was requested.
#[derive(Debug, Clone)]
pub enum LaunchEvent {
    ContainerStarted {
        container_id: ContainerId,
        /// Auxiliary data returned by node-side services, keyed by service name.
        service_data: HashMap<String, Vec<u8>>,
    },
    ContainerStopped {
        container_id: ContainerId,
    },
    ContainerStatus {
        container_id: ContainerId,
        state: ContainerState,
        exit_status: ExitStatus,
        diagnostics: String,
    },
    StartContainerError {
        container_id: ContainerId,
        cause: String,
    },
    StopContainerError {
        container_id: ContainerId,
        cause: String,
    },
    GetContainerStatusError {
        container_id: ContainerId,
        cause: String,
    },
}

/// Sending half handed to an external client.
pub struct EventSink<E> {
    tx: mpsc::Sender<E>,
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

pub type AllocationSink = EventSink<AllocationEvent>;
pub type LaunchSink = EventSink<LaunchEvent>;

impl<E> EventSink<E> {
    /// Bounded channel; the receiver belongs to the event loop.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<E>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Deliver an event, waiting for queue space.
    pub async fn send(&self, event: E) -> Result<(), CoreError> {
        self.tx.send(event).await.map_err(|_| CoreError::ChannelClosed)
    }
}
