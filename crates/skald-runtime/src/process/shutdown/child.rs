//! Shutdown for `tokio::process::Child` with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
#[cfg(unix)]
use tokio::time::timeout;
use tracing::debug;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Shut down a child process, escalating to SIGKILL after `grace`.
///
/// # Strategy
/// 1. Send SIGTERM and wait up to `grace` for exit (skipped when `force`)
/// 2. If still running, send SIGKILL
/// 3. Wait for process reaping (required to avoid zombies)
///
/// # Platform behavior
/// - Unix: SIGTERM via `nix`, then SIGKILL via `Child::kill`
/// - Windows: immediately calls `Child::kill` (no graceful shutdown available)
pub async fn shutdown_child(
    child: &mut Child,
    grace: Duration,
    force: bool,
) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        if !force {
            return shutdown_unix(child, grace).await;
        }
    }
    #[cfg(not(unix))]
    let _ = (grace, force);

    child.kill().await?;
    child.wait().await
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        // Already reaped
        return child.wait().await;
    };

    // Phase 1: SIGTERM with grace period
    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        // Process may have already exited
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    // Phase 2: SIGKILL (Child::kill uses SIGKILL on Unix and reaps)
    debug!(pid = %pid, grace_secs = grace.as_secs(), "Server ignored SIGTERM, escalating to SIGKILL");
    child.kill().await?;
    child.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;
    use tokio::time::sleep;

    #[tokio::test]
    #[cfg(unix)]
    async fn shutdown_responds_to_sigterm() {
        let mut child = Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("failed to spawn sleep");

        let status = shutdown_child(&mut child, Duration::from_secs(5), false)
            .await
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn shutdown_escalates_when_sigterm_ignored() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("trap '' TERM; while true; do sleep 0.05; done")
            .spawn()
            .expect("failed to spawn sh");

        // Let the shell install its trap
        sleep(Duration::from_millis(200)).await;

        let started = std::time::Instant::now();
        let result = shutdown_child(&mut child, Duration::from_millis(300), false).await;
        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn shutdown_handles_already_exited() {
        let mut child = Command::new("echo")
            .arg("test")
            .spawn()
            .expect("failed to spawn echo");

        sleep(Duration::from_millis(100)).await;

        let result = shutdown_child(&mut child, Duration::from_secs(1), false).await;
        assert!(result.is_ok());
    }
}
