use std::time::Duration;

use murphy_model::{Priority, Resource};

use crate::error::CoreError;

/// Placeholder in [`OrchestratorConfig::task_command`] replaced by the per-task memory.
pub const MEMORY_PLACEHOLDER: &str = "{memory_mb}";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of containers (tasks) to run.
    pub container_count: u32,
    /// Memory requested for every container.
    pub container_memory_mb: u32,
    /// Cores requested for every container.
    pub container_vcores: u32,
    pub priority: Priority,
    /// Launch command template; `{memory_mb}` is substituted per task.
    pub task_command: Vec<String>,
    /// How often the wait loop reports progress.
    pub completion_check_interval: Duration,
    /// Capacity of each inbound event channel.
    pub event_queue_capacity: usize,
    /// Abort and unregister when the resource manager reports an error.
    pub abort_on_manager_error: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            container_count: 1,
            container_memory_mb: 512,
            container_vcores: 1,
            priority: 0,
            task_command: vec!["sleep".to_string(), "5".to_string()],
            completion_check_interval: Duration::from_millis(5_000),
            event_queue_capacity: 2048,
            abort_on_manager_error: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.container_count == 0 {
            return Err(CoreError::InvalidConfig(
                "container count must be positive".into(),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "event queue capacity must be positive".into(),
            ));
        }
        if self.completion_check_interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "completion check interval must be positive".into(),
            ));
        }
        self.container_resource()?;
        if self.task_command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(CoreError::InvalidConfig("task command is empty".into()));
        }
        Ok(())
    }

    /// Capability requested for every container.
    pub fn container_resource(&self) -> Result<Resource, CoreError> {
        Resource::new(self.container_memory_mb, self.container_vcores)
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))
    }

    /// Expand the command template for a task of `memory_mb`.
    pub fn render_command(&self, memory_mb: u32) -> Vec<String> {
        let memory = memory_mb.to_string();
        self.task_command
            .iter()
            .map(|arg| arg.replace(MEMORY_PLACEHOLDER, &memory))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(OrchestratorConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_count_and_memory() {
        let cfg = OrchestratorConfig {
            container_count: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(CoreError::InvalidConfig(_))));

        let cfg = OrchestratorConfig {
            container_memory_mb: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_command() {
        let cfg = OrchestratorConfig {
            task_command: vec![],
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn render_substitutes_memory() {
        let cfg = OrchestratorConfig {
            task_command: vec!["eat".into(), "--mb={memory_mb}".into()],
            ..Default::default()
        };
        assert_eq!(cfg.render_command(1024), vec!["eat", "--mb=1024"]);
    }
}
