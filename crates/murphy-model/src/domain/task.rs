use serde::{Deserialize, Serialize};

use crate::{ModelError, Priority, Resource};

/// What to run inside a container and how much it needs.
///
/// Immutable once built. The orchestrator creates one per requested container and the
/// allocation handler pairs it with a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    resource: Resource,
    priority: Priority,
    command: Vec<String>,
}

impl TaskDescriptor {
    pub fn new(
        resource: Resource,
        priority: Priority,
        command: Vec<String>,
    ) -> Result<Self, ModelError> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(ModelError::EmptyCommand);
        }
        Ok(Self {
            resource,
            priority,
            command,
        })
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn required_memory_mb(&self) -> u32 {
        self.resource.memory_mb()
    }

    pub fn required_vcores(&self) -> u32 {
        self.resource.vcores()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Program followed by its arguments.
    pub fn command(&self) -> &[String] {
        &self.command
    }
}
