use murphy_model::{FinalStatus, RunCounters};

use crate::{abort::AbortReason, error::CoreError};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_TASK_FAILURES: i32 = 2;
pub const EXIT_ABORTED: i32 = 3;

/// How the wait for completion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitResult {
    Completed(RunCounters),
    Aborted(AbortReason),
}

/// Final result of a run: what was reported to the manager and the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: FinalStatus,
    pub message: String,
    pub counters: RunCounters,
    pub exit_code: i32,
}

impl RunOutcome {
    pub(crate) fn from_wait(wait: &WaitResult, counters: RunCounters) -> Self {
        match wait {
            WaitResult::Completed(done) if done.failed == 0 => Self {
                status: FinalStatus::Succeeded,
                message: "OK".to_string(),
                counters,
                exit_code: EXIT_OK,
            },
            WaitResult::Completed(done) => Self {
                status: FinalStatus::Failed,
                message: format!("Task failures: {}.", done.failed),
                counters,
                exit_code: EXIT_TASK_FAILURES,
            },
            WaitResult::Aborted(reason) => Self {
                status: match reason {
                    AbortReason::ManagerError(_) => FinalStatus::Failed,
                    AbortReason::ShutdownRequested | AbortReason::Interrupted => {
                        FinalStatus::Killed
                    }
                },
                message: format!(
                    "Aborted ({reason}) after {} of {} containers, {} failed.",
                    counters.completed, counters.requested, counters.failed
                ),
                counters,
                exit_code: EXIT_ABORTED,
            },
        }
    }

    pub(crate) fn fatal(err: &CoreError, counters: RunCounters) -> Self {
        Self {
            status: FinalStatus::Failed,
            message: err.to_string(),
            counters,
            exit_code: EXIT_FATAL,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(requested: u32, completed: u32, failed: u32) -> RunCounters {
        RunCounters {
            requested,
            completed,
            failed,
        }
    }

    #[test]
    fn clean_completion_succeeds() {
        let c = counters(3, 3, 0);
        let outcome = RunOutcome::from_wait(&WaitResult::Completed(c), c);
        assert_eq!(outcome.status, FinalStatus::Succeeded);
        assert_eq!(outcome.message, "OK");
        assert!(outcome.is_success());
    }

    #[test]
    fn task_failures_degrade_status() {
        let c = counters(3, 3, 2);
        let outcome = RunOutcome::from_wait(&WaitResult::Completed(c), c);
        assert_eq!(outcome.status, FinalStatus::Failed);
        assert_eq!(outcome.message, "Task failures: 2.");
        assert_eq!(outcome.exit_code, EXIT_TASK_FAILURES);
    }

    #[test]
    fn shutdown_is_reported_as_killed() {
        let c = counters(3, 1, 0);
        let outcome =
            RunOutcome::from_wait(&WaitResult::Aborted(AbortReason::ShutdownRequested), c);
        assert_eq!(outcome.status, FinalStatus::Killed);
        assert_eq!(outcome.exit_code, EXIT_ABORTED);
        assert!(outcome.message.contains("1 of 3"));
    }
}
