use std::{process::ExitStatus, time::Duration};

use tokio::process::{Child, Command};

use crate::error::ExecError;

/// Exit status reported when the command could not be started at all.
pub const SPAWN_FAILURE_EXIT: i32 = -1;

pub fn cmd_program(command: &[String]) -> Result<Command, ExecError> {
    let (program, args) = command.split_first().ok_or(ExecError::MissingProgram)?;
    if program.trim().is_empty() {
        return Err(ExecError::MissingProgram);
    }
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()));
    Ok(cmd)
}

/// Shell convention: the exit code, or 128 + signal number when killed by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    SPAWN_FAILURE_EXIT
}

/// SIGTERM, then SIGKILL if the child is still alive after `grace`.
#[cfg(unix)]
pub async fn kill_graceful(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    if let Some(pid) = child.id() {
        // SAFETY: plain syscall on a pid we own.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
            return status;
        }
    }
    child.kill().await?;
    child.wait().await
}

#[cfg(not(unix))]
pub async fn kill_graceful(child: &mut Child, _grace: Duration) -> std::io::Result<ExitStatus> {
    child.kill().await?;
    child.wait().await
}
