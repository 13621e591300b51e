//! Single-machine cluster backend: a resource manager and a node agent that run container
//! commands as local subprocesses.

mod error;
pub use error::ExecError;

mod config;
pub use config::LocalClusterConfig;

mod limits;
pub use limits::{RlimitConfig, attach_rlimits};

mod util;

mod node;

mod manager;
pub use manager::LocalResourceManager;

mod agent;
pub use agent::LocalNodeAgent;

mod cluster;
pub use cluster::LocalCluster;
