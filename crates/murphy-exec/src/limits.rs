//! POSIX rlimits for container subprocesses.
//!
//! On Unix the limits are applied in a `pre_exec` hook, inside the child after `fork()` and
//! before `execve()`, so the task never runs unrestricted. Elsewhere they are ignored with a
//! warning.
use tokio::process::Command;
#[cfg(not(unix))]
use tracing::warn;

use murphy_model::Resource;

/// Limits for one container process. `None` keeps the inherited limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RlimitConfig {
    /// `RLIMIT_AS`, in bytes.
    pub max_address_space_bytes: Option<u64>,
    /// `RLIMIT_NOFILE`.
    pub max_open_files: Option<u64>,
    /// `RLIMIT_CORE = 0`.
    pub disable_core_dumps: bool,
}

impl RlimitConfig {
    /// Limits for a container granted `resource`.
    pub fn for_container(resource: &Resource, limit_address_space: bool) -> Self {
        Self {
            max_address_space_bytes: limit_address_space
                .then(|| u64::from(resource.memory_mb()) * 1024 * 1024),
            max_open_files: None,
            disable_core_dumps: true,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_address_space_bytes.is_none()
            && self.max_open_files.is_none()
            && !self.disable_core_dumps
    }
}

pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
    if config.is_empty() {
        return;
    }

    #[cfg(unix)]
    {
        unix_impl::attach_rlimits(cmd, config);
    }

    #[cfg(not(unix))]
    {
        let _ = cmd;
        warn!(
            target: "murphy_exec::limits",
            ?config,
            "rlimits are not supported on this platform; ignoring"
        );
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use tokio::process::Command;

    use super::RlimitConfig;

    pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
        let address_space = config.max_address_space_bytes;
        let open_files = config.max_open_files;
        let no_core = config.disable_core_dumps;

        // SAFETY: the hook only calls async-signal-safe setrlimit.
        unsafe {
            cmd.pre_exec(move || {
                if let Some(bytes) = address_space {
                    check(libc::setrlimit(libc::RLIMIT_AS, &rlimit(bytes)))?;
                }
                if let Some(nofile) = open_files {
                    check(libc::setrlimit(libc::RLIMIT_NOFILE, &rlimit(nofile)))?;
                }
                if no_core {
                    check(libc::setrlimit(libc::RLIMIT_CORE, &rlimit(0)))?;
                }
                Ok(())
            });
        }
    }

    fn rlimit(value: u64) -> libc::rlimit {
        libc::rlimit {
            rlim_cur: value as libc::rlim_t,
            rlim_max: value as libc::rlim_t,
        }
    }

    fn check(rc: libc::c_int) -> io::Result<()> {
        if rc != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_limits_follow_granted_memory() {
        let resource = Resource::new(256, 1).unwrap();
        let limits = RlimitConfig::for_container(&resource, true);
        assert_eq!(limits.max_address_space_bytes, Some(256 * 1024 * 1024));
        assert!(limits.disable_core_dumps);

        let unlimited = RlimitConfig::for_container(&resource, false);
        assert_eq!(unlimited.max_address_space_bytes, None);
        assert!(!unlimited.is_empty());
    }

    #[test]
    fn empty_config_is_noop() {
        let config = RlimitConfig::default();
        assert!(config.is_empty());
        let mut cmd = Command::new("sh");
        attach_rlimits(&mut cmd, &config);
    }
}
