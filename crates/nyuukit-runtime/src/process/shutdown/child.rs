//! Graceful shutdown logic for `tokio::process::Child` with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Ask a process to terminate without waiting for it.
///
/// - Unix: sends SIGTERM. An already-exited process is not an error.
/// - Windows: no SIGTERM equivalent, the process is killed.
pub fn send_terminate(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        let Some(pid) = child.id() else {
            // Already reaped
            return Ok(());
        };
        let pid = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PID out of range"))?;
        match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    #[cfg(not(unix))]
    {
        child.start_kill()
    }
}

/// Terminate a child and reap it, escalating to SIGKILL after `grace`.
///
/// # Strategy
/// 1. Send SIGTERM and wait up to `grace` for exit
/// 2. If still running, kill
/// 3. Wait for reaping (required to avoid zombies)
pub async fn shutdown_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    send_terminate(child)?;

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    child.kill().await?;
    child.wait().await
}
