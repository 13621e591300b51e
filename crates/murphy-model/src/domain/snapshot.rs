use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ContainerId, TaskDescriptor};

/// Aggregate progress counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCounters {
    pub requested: u32,
    pub completed: u32,
    pub failed: u32,
}

impl RunCounters {
    /// Every requested container has reported completion.
    pub fn is_done(&self) -> bool {
        self.completed == self.requested
    }

    /// Completed fraction in `[0, 1]`; zero when nothing was requested.
    pub fn progress(&self) -> f32 {
        if self.requested == 0 {
            return 0.0;
        }
        (self.completed as f32 / self.requested as f32).clamp(0.0, 1.0)
    }
}

/// Consistent read-only view of the run state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub counters: RunCounters,
    /// Containers granted and launched but not yet completed.
    pub running: BTreeMap<ContainerId, TaskDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_bounded() {
        let idle = RunCounters::default();
        assert_eq!(idle.progress(), 0.0);

        let half = RunCounters {
            requested: 4,
            completed: 2,
            failed: 1,
        };
        assert_eq!(half.progress(), 0.5);
        assert!(!half.is_done());

        let done = RunCounters {
            requested: 4,
            completed: 4,
            failed: 0,
        };
        assert!(done.is_done());
        assert_eq!(done.progress(), 1.0);
    }

    #[test]
    fn snapshot_serializes_container_keys_as_strings() {
        let snap = RunSnapshot::default();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"running\":{}"));
        assert!(json.contains("\"requested\":0"));
    }
}
