use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;
use tokio::sync::watch;

use murphy_model::{CompletionRecord, ContainerId, RunCounters, RunSnapshot, TaskDescriptor};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("container {0} is already assigned")]
    DuplicateContainer(ContainerId),
    #[error("container {0} was never granted")]
    UnknownContainer(ContainerId),
    #[error("container {0} already completed")]
    AlreadyCompleted(ContainerId),
    #[error("container {id} exceeds the {requested} requested tasks")]
    RequestedExceeded { id: ContainerId, requested: u32 },
}

/// Effect of an accepted completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub task: TaskDescriptor,
    pub failed: bool,
    pub counters: RunCounters,
}

/// Shared run state: counters plus the container -> task mapping.
///
/// Every mutation goes through one lock and publishes the new counters on a watch channel,
/// so waiters observe changes without polling.
#[derive(Clone)]
pub struct RunState {
    inner: Arc<Mutex<RunStateInner>>,
    counters_tx: Arc<watch::Sender<RunCounters>>,
}

#[derive(Default)]
struct RunStateInner {
    counters: RunCounters,
    /// Granted and not yet completed.
    running: HashMap<ContainerId, TaskDescriptor>,
    /// Every id ever assigned; ids are never reused.
    assigned: HashSet<ContainerId>,
}

impl RunState {
    /// Create empty run state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunCounters::default());
        Self {
            inner: Arc::new(Mutex::new(RunStateInner::default())),
            counters_tx: Arc::new(tx),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunStateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, counters: RunCounters) {
        self.counters_tx.send_replace(counters);
    }

    /// Set the number of tasks the run expects.
    pub fn set_requested(&self, requested: u32) {
        let mut inner = self.lock();
        inner.counters.requested = requested;
        self.publish(inner.counters);
    }

    /// Record that `id` now runs `task` (called when a grant is matched).
    ///
    /// Running plus completed containers never exceed `requested`, so `completed` cannot
    /// overshoot it either.
    pub fn assign(&self, id: ContainerId, task: TaskDescriptor) -> Result<(), StateError> {
        let mut inner = self.lock();
        if inner.assigned.contains(&id) {
            return Err(StateError::DuplicateContainer(id));
        }
        let requested = inner.counters.requested;
        let in_flight = inner.running.len() as u64 + u64::from(inner.counters.completed);
        if in_flight >= u64::from(requested) {
            return Err(StateError::RequestedExceeded { id, requested });
        }
        inner.assigned.insert(id);
        inner.running.insert(id, task);
        Ok(())
    }

    /// Returns `true` if `id` was ever assigned.
    pub fn is_assigned(&self, id: &ContainerId) -> bool {
        self.lock().assigned.contains(id)
    }

    /// Apply a completion record.
    ///
    /// Counts at most once per container: unknown and repeated ids are rejected and leave the
    /// counters untouched.
    pub fn complete(&self, record: &CompletionRecord) -> Result<Completion, StateError> {
        let id = record.container_id;
        let mut inner = self.lock();

        let Some(task) = inner.running.remove(&id) else {
            return Err(if inner.assigned.contains(&id) {
                StateError::AlreadyCompleted(id)
            } else {
                StateError::UnknownContainer(id)
            });
        };

        let failed = record.is_failure();
        inner.counters.completed += 1;
        if failed {
            inner.counters.failed += 1;
        }
        let counters = inner.counters;
        self.publish(counters);

        Ok(Completion {
            task,
            failed,
            counters,
        })
    }

    /// Current counters.
    pub fn counters(&self) -> RunCounters {
        self.lock().counters
    }

    /// Completed fraction, reported to the resource manager on heartbeats.
    pub fn progress(&self) -> f32 {
        self.counters().progress()
    }

    /// Number of containers currently running.
    pub fn running_count(&self) -> usize {
        self.lock().running.len()
    }

    /// Task assigned to a running container.
    pub fn get(&self, id: &ContainerId) -> Option<TaskDescriptor> {
        self.lock().running.get(id).cloned()
    }

    /// Consistent copy of counters and mapping, taken under the state lock.
    pub fn snapshot(&self) -> RunSnapshot {
        let inner = self.lock();
        RunSnapshot {
            counters: inner.counters,
            running: inner
                .running
                .iter()
                .map(|(id, task)| (*id, task.clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    /// Receiver notified whenever the counters change.
    pub fn subscribe(&self) -> watch::Receiver<RunCounters> {
        self.counters_tx.subscribe()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use murphy_model::Resource;

    use super::*;

    fn task() -> TaskDescriptor {
        TaskDescriptor::new(
            Resource::new(1024, 1).unwrap(),
            0,
            vec!["true".to_string()],
        )
        .unwrap()
    }

    fn id(raw: u64) -> ContainerId {
        ContainerId::new(raw)
    }

    #[test]
    fn assign_then_complete() {
        let state = RunState::new();
        state.set_requested(2);
        state.assign(id(1), task()).unwrap();
        assert_eq!(state.running_count(), 1);
        assert!(state.get(&id(1)).is_some());

        let done = state.complete(&CompletionRecord::new(id(1), 0)).unwrap();
        assert!(!done.failed);
        assert_eq!(done.counters.completed, 1);
        assert_eq!(state.running_count(), 0);
        assert!(state.get(&id(1)).is_none());
    }

    #[test]
    fn duplicate_assignment_is_rejected() {
        let state = RunState::new();
        state.set_requested(2);
        state.assign(id(1), task()).unwrap();
        assert_eq!(
            state.assign(id(1), task()),
            Err(StateError::DuplicateContainer(id(1)))
        );

        // ids are never reused, even after completion
        state.complete(&CompletionRecord::new(id(1), 0)).unwrap();
        assert_eq!(
            state.assign(id(1), task()),
            Err(StateError::DuplicateContainer(id(1)))
        );
    }

    #[test]
    fn non_zero_exit_counts_as_failure() {
        let state = RunState::new();
        state.set_requested(1);
        state.assign(id(9), task()).unwrap();

        let done = state.complete(&CompletionRecord::new(id(9), 137)).unwrap();
        assert!(done.failed);
        assert_eq!(
            state.counters(),
            RunCounters {
                requested: 1,
                completed: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn repeated_completion_is_a_no_op() {
        let state = RunState::new();
        state.set_requested(1);
        state.assign(id(1), task()).unwrap();
        state.complete(&CompletionRecord::new(id(1), 1)).unwrap();

        let again = state.complete(&CompletionRecord::new(id(1), 1));
        assert!(matches!(again, Err(StateError::AlreadyCompleted(_))));
        assert_eq!(state.counters().completed, 1);
        assert_eq!(state.counters().failed, 1);
    }

    #[test]
    fn unknown_completion_leaves_counters() {
        let state = RunState::new();
        state.set_requested(3);

        let res = state.complete(&CompletionRecord::new(id(77), 0));
        assert_eq!(res.unwrap_err(), StateError::UnknownContainer(id(77)));
        assert_eq!(
            state.counters(),
            RunCounters {
                requested: 3,
                completed: 0,
                failed: 0
            }
        );
    }

    #[test]
    fn completed_never_exceeds_requested() {
        let state = RunState::new();
        state.set_requested(1);
        state.assign(id(1), task()).unwrap();
        assert_eq!(
            state.assign(id(2), task()),
            Err(StateError::RequestedExceeded {
                id: id(2),
                requested: 1
            })
        );
        assert!(!state.is_assigned(&id(2)));

        state.complete(&CompletionRecord::new(id(1), 0)).unwrap();
        assert!(matches!(
            state.assign(id(3), task()),
            Err(StateError::RequestedExceeded { .. })
        ));
        assert_eq!(
            state.complete(&CompletionRecord::new(id(2), 0)).unwrap_err(),
            StateError::UnknownContainer(id(2))
        );
        assert_eq!(
            state.counters(),
            RunCounters {
                requested: 1,
                completed: 1,
                failed: 0
            }
        );
        assert!(state.counters().is_done());
    }

    #[test]
    fn nothing_is_assigned_before_requests() {
        let state = RunState::new();
        assert!(matches!(
            state.assign(id(1), task()),
            Err(StateError::RequestedExceeded { requested: 0, .. })
        ));
    }

    #[test]
    fn snapshot_is_sorted_and_consistent() {
        let state = RunState::new();
        state.set_requested(3);
        for raw in [3, 1, 2] {
            state.assign(id(raw), task()).unwrap();
        }
        state.complete(&CompletionRecord::new(id(2), 0)).unwrap();

        let snap = state.snapshot();
        assert_eq!(snap.counters.completed, 1);
        let ids: Vec<_> = snap.running.keys().map(|k| k.get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn subscribers_see_counter_changes() {
        let state = RunState::new();
        let mut rx = state.subscribe();
        state.set_requested(1);
        state.assign(id(1), task()).unwrap();

        let waiter = tokio::spawn(async move {
            let counters = *rx.wait_for(RunCounters::is_done).await.unwrap();
            counters
        });

        state.complete(&CompletionRecord::new(id(1), 0)).unwrap();
        let counters = waiter.await.unwrap();
        assert_eq!(counters.completed, 1);
    }
}
