use std::{path::PathBuf, time::Duration};

use murphy_model::Resource;

use crate::error::ExecError;

/// Shape of the single local node.
#[derive(Debug, Clone)]
pub struct LocalClusterConfig {
    /// Node address reported in grants (`host:port`).
    pub node_id: String,
    pub node_http_address: Option<String>,
    pub capacity_memory_mb: u32,
    pub capacity_vcores: u32,
    /// Largest single container the manager grants.
    pub max_allocation_memory_mb: u32,
    pub max_allocation_vcores: u32,
    pub heartbeat_interval: Duration,
    /// Time between SIGTERM and SIGKILL when stopping containers.
    pub kill_grace: Duration,
    /// Cap the address space of each container at its granted memory.
    pub limit_address_space: bool,
    pub work_dir: Option<PathBuf>,
}

impl Default for LocalClusterConfig {
    fn default() -> Self {
        Self {
            node_id: "localhost:45454".to_string(),
            node_http_address: None,
            capacity_memory_mb: 8192,
            capacity_vcores: 8,
            max_allocation_memory_mb: 8192,
            max_allocation_vcores: 8,
            heartbeat_interval: Duration::from_secs(1),
            kill_grace: Duration::from_secs(5),
            limit_address_space: true,
            work_dir: None,
        }
    }
}

impl LocalClusterConfig {
    pub fn capacity(&self) -> Result<Resource, ExecError> {
        Ok(Resource::new(self.capacity_memory_mb, self.capacity_vcores)?)
    }

    pub fn max_allocation(&self) -> Result<Resource, ExecError> {
        Ok(Resource::new(
            self.max_allocation_memory_mb,
            self.max_allocation_vcores,
        )?)
    }

    pub fn validate(&self) -> Result<(), ExecError> {
        if self.node_id.trim().is_empty() {
            return Err(ExecError::InvalidConfig("node id is empty".into()));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ExecError::InvalidConfig(
                "heartbeat interval must be positive".into(),
            ));
        }
        let capacity = self.capacity()?;
        if !self.max_allocation()?.fits_in(&capacity) {
            return Err(ExecError::InvalidConfig(
                "max allocation exceeds node capacity".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(LocalClusterConfig::default().validate().is_ok());
    }

    #[test]
    fn max_allocation_must_fit_capacity() {
        let cfg = LocalClusterConfig {
            capacity_memory_mb: 1024,
            max_allocation_memory_mb: 2048,
            ..LocalClusterConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ExecError::InvalidConfig(_))));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let cfg = LocalClusterConfig {
            capacity_vcores: 0,
            ..LocalClusterConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
