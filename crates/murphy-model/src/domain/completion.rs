use serde::{Deserialize, Serialize};

use crate::{ContainerId, ExitStatus};

/// Lifecycle state of a container as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerState {
    New,
    Running,
    Complete,
}

/// Final report for a container, delivered with the completions-received event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub container_id: ContainerId,
    pub state: ContainerState,
    pub exit_status: ExitStatus,
    #[serde(default)]
    pub diagnostics: String,
}

impl CompletionRecord {
    pub fn new(container_id: ContainerId, exit_status: ExitStatus) -> Self {
        Self {
            container_id,
            state: ContainerState::Complete,
            exit_status,
            diagnostics: String::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = diagnostics.into();
        self
    }

    /// A non-zero exit indicator counts as a task failure.
    pub fn is_failure(&self) -> bool {
        self.exit_status != 0
    }
}
