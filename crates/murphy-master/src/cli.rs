use std::time::Duration;

use clap::Parser;

use murphy_api::HttpStatusConfig;
use murphy_core::OrchestratorConfig;
use murphy_exec::LocalClusterConfig;
use murphy_observe::{LoggerConfig, LoggerFormat, LoggerLevel};

#[derive(Parser, Debug)]
#[command(name = "murphy-master")]
#[command(about = "Runs N containers of a command on a cluster and reports how they finished")]
#[command(version)]
pub struct Cli {
    /// Number of containers to run
    #[arg(long, env = "MURPHY_CONTAINERS", default_value_t = 1)]
    pub containers: u32,

    /// Memory per container, in MB
    #[arg(long, env = "MURPHY_CONTAINER_MEMORY_MB", default_value_t = 512)]
    pub memory_mb: u32,

    /// Cores per container
    #[arg(long, env = "MURPHY_CONTAINER_VCORES", default_value_t = 1)]
    pub vcores: u32,

    #[arg(long, env = "MURPHY_PRIORITY", default_value_t = 0, allow_negative_numbers = true)]
    pub priority: i32,

    /// Interval of the progress report while waiting, in milliseconds
    #[arg(long, env = "MURPHY_CHECK_INTERVAL_MS", default_value_t = 5_000)]
    pub check_interval_ms: u64,

    /// Keep waiting when the resource manager reports an error
    #[arg(long, env = "MURPHY_IGNORE_MANAGER_ERRORS")]
    pub ignore_manager_errors: bool,

    #[arg(long, env = "MURPHY_STATUS_HOST", default_value = "0.0.0.0")]
    pub status_host: String,

    /// Status endpoint port (0 picks a free one)
    #[arg(long, env = "MURPHY_STATUS_PORT", default_value_t = 4444)]
    pub status_port: u16,

    #[arg(long, env = "MURPHY_STATUS_PREFIX", default_value = "/murphy")]
    pub status_prefix: String,

    /// Node address of the local cluster
    #[arg(long, env = "MURPHY_NODE_ID", default_value = "localhost:45454")]
    pub node_id: String,

    #[arg(long, env = "MURPHY_NODE_MEMORY_MB", default_value_t = 8192)]
    pub node_memory_mb: u32,

    #[arg(long, env = "MURPHY_NODE_VCORES", default_value_t = 8)]
    pub node_vcores: u32,

    #[arg(long, env = "MURPHY_HEARTBEAT_MS", default_value_t = 1_000)]
    pub heartbeat_ms: u64,

    /// Grace period between SIGTERM and SIGKILL when stopping containers, in milliseconds
    #[arg(long, env = "MURPHY_KILL_GRACE_MS", default_value_t = 5_000)]
    pub kill_grace_ms: u64,

    /// Do not cap container address space at the requested memory
    #[arg(long, env = "MURPHY_NO_MEMORY_LIMIT")]
    pub no_memory_limit: bool,

    #[arg(long, env = "MURPHY_LOG_LEVEL", default_value = "info")]
    pub log_level: LoggerLevel,

    /// text, json or journald
    #[arg(long, env = "MURPHY_LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// Log container stdout even when the log level is above debug
    #[arg(long, env = "MURPHY_CONTAINER_OUTPUT")]
    pub container_output: bool,

    /// Command run in every container; `{memory_mb}` is replaced by the container memory
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl Cli {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            container_output: self.container_output,
            ..LoggerConfig::default()
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let defaults = OrchestratorConfig::default();
        OrchestratorConfig {
            container_count: self.containers,
            container_memory_mb: self.memory_mb,
            container_vcores: self.vcores,
            priority: self.priority,
            task_command: if self.command.is_empty() {
                defaults.task_command
            } else {
                self.command.clone()
            },
            completion_check_interval: Duration::from_millis(self.check_interval_ms),
            abort_on_manager_error: !self.ignore_manager_errors,
            ..defaults
        }
    }

    pub fn status_config(&self) -> HttpStatusConfig {
        HttpStatusConfig {
            bind_host: self.status_host.clone(),
            port: self.status_port,
            prefix: self.status_prefix.clone(),
            ..HttpStatusConfig::default()
        }
    }

    pub fn cluster_config(&self) -> LocalClusterConfig {
        LocalClusterConfig {
            node_id: self.node_id.clone(),
            capacity_memory_mb: self.node_memory_mb,
            capacity_vcores: self.node_vcores,
            max_allocation_memory_mb: self.node_memory_mb,
            max_allocation_vcores: self.node_vcores,
            heartbeat_interval: Duration::from_millis(self.heartbeat_ms),
            kill_grace: Duration::from_millis(self.kill_grace_ms),
            limit_address_space: !self.no_memory_limit,
            ..LocalClusterConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["murphy-master"]).unwrap();
        let cfg = cli.orchestrator_config();
        assert_eq!(cfg.container_count, 1);
        assert_eq!(cfg.task_command, OrchestratorConfig::default().task_command);
        assert!(cfg.abort_on_manager_error);
        assert_eq!(cli.status_config().port, 4444);
        assert!(cli.cluster_config().validate().is_ok());
    }

    #[test]
    fn trailing_command_is_taken_verbatim() {
        let cli = Cli::try_parse_from([
            "murphy-master",
            "--containers",
            "3",
            "--memory-mb",
            "1024",
            "--",
            "stress",
            "--vm-bytes",
            "{memory_mb}M",
        ])
        .unwrap();
        let cfg = cli.orchestrator_config();
        assert_eq!(cfg.container_count, 3);
        assert_eq!(cfg.container_memory_mb, 1024);
        assert_eq!(
            cfg.render_command(1024),
            vec!["stress", "--vm-bytes", "1024M"]
        );
    }

    #[test]
    fn container_output_flag_reaches_logger() {
        let cli = Cli::try_parse_from(["murphy-master", "--container-output"]).unwrap();
        assert!(cli.logger_config().container_output);
        assert!(!Cli::try_parse_from(["murphy-master"])
            .unwrap()
            .logger_config()
            .container_output);
    }

    #[test]
    fn rejects_bad_log_level() {
        assert!(Cli::try_parse_from(["murphy-master", "--log-level", "x=loud"]).is_err());
    }
}
