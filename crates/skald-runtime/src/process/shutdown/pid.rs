//! Kill an external server by PID without reaping (no Child handle available).

use std::io;
use std::time::Duration;

use skald_core::ProcessProbe;
use tokio::time::{Instant, sleep};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time allowed for the process to disappear after a forced kill.
const KILL_CONFIRM_TIMEOUT: Duration = Duration::from_secs(2);

/// Kill a process by PID with terminate → kill escalation.
///
/// # Strategy
/// 1. Ask the process to terminate (skipped when `force`)
/// 2. Poll for up to `grace` to verify exit
/// 3. If still alive, kill it
/// 4. Poll again for up to 2 seconds to verify exit
///
/// # Differences from `shutdown_child`
/// - No `Child` handle, so **cannot reap** the process
/// - Used for servers a previous supervisor instance left running
pub async fn kill_pid(
    probe: &dyn ProcessProbe,
    pid: u32,
    grace: Duration,
    force: bool,
) -> io::Result<()> {
    if !force {
        if !probe.kill(pid, false) && !probe.is_alive(pid) {
            // Already gone
            return Ok(());
        }
        if wait_for_exit(probe, pid, grace).await {
            return Ok(());
        }
        debug!(pid = %pid, "Server ignored terminate request, escalating to kill");
    }

    if !probe.kill(pid, true) && !probe.is_alive(pid) {
        return Ok(());
    }
    if wait_for_exit(probe, pid, KILL_CONFIRM_TIMEOUT).await {
        return Ok(());
    }

    Err(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("process {pid} did not exit after kill"),
    ))
}

async fn wait_for_exit(probe: &dyn ProcessProbe, pid: u32, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if !probe.is_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::SystemProbe;

    #[tokio::test]
    #[cfg(unix)]
    async fn kill_pid_handles_already_gone() {
        let probe = SystemProbe::default();
        let result = kill_pid(&probe, 999_999_999, Duration::from_secs(1), false).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn kill_pid_terminates_process() {
        let mut child = std::process::Command::new("sleep")
            .arg("60")
            .spawn()
            .expect("failed to spawn sleep");
        let pid = child.id();

        // Reap in the background: kill_pid cannot, and a zombie still
        // answers liveness probes.
        let reaper = std::thread::spawn(move || child.wait());

        let probe = SystemProbe::default();
        kill_pid(&probe, pid, Duration::from_secs(5), false)
            .await
            .expect("kill_pid failed");

        assert!(reaper.join().unwrap().is_ok());
        assert!(!probe.is_alive(pid));
    }
}
