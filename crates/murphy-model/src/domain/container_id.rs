use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a granted container.
///
/// Assigned by the resource manager, monotonic across the lifetime of the process and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(u64);

impl ContainerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ContainerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container_{:06}", self.0)
    }
}

impl std::str::FromStr for ContainerId {
    type Err = std::num::ParseIntError;

    /// Accepts both the display form (`container_000042`) and a bare number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let raw = raw.strip_prefix("container_").unwrap_or(raw);
        raw.parse::<u64>().map(Self)
    }
}
