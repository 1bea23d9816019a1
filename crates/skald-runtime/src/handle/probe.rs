//! OS process probe: liveness, signalling and orphan enumeration.

use std::ffi::OsStr;

use skald_core::ProcessProbe;
#[cfg(not(unix))]
use sysinfo::ProcessesToUpdate;
use sysinfo::{ProcessRefreshKind, RefreshKind, System, UpdateKind};
use tracing::debug;

/// Process name of the dedicated server binary on this platform.
#[cfg(windows)]
pub const SERVER_BINARY_NAME: &str = "valheim_server.exe";
#[cfg(not(windows))]
pub const SERVER_BINARY_NAME: &str = "valheim_server.x86_64";

/// [`ProcessProbe`] backed by the host OS.
///
/// # Platform behavior
/// - **Unix**: `kill(pid, 0)` for liveness, SIGTERM/SIGKILL for signalling
/// - **Other**: `sysinfo` for liveness and termination
/// - Enumeration uses `sysinfo` everywhere
#[derive(Debug, Clone)]
pub struct SystemProbe {
    binary_name: String,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new(SERVER_BINARY_NAME)
    }
}

impl SystemProbe {
    /// Probe matching processes named exactly `binary_name`.
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
        }
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// Exact match on process name or executable file name.
    ///
    /// Linux truncates `comm` to 15 bytes, so the executable's file name is
    /// checked as well. Both comparisons are equality, never substring.
    fn matches(&self, name: &OsStr, exe_name: Option<&OsStr>) -> bool {
        let wanted = OsStr::new(&self.binary_name);
        name == wanted || exe_name == Some(wanted)
    }
}

impl ProcessProbe for SystemProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        use nix::sys::signal;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };

        // Signal None is a special "null signal" that checks if we can signal the process
        match signal::kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            Err(nix::errno::Errno::ESRCH) => false, // No such process
            Err(_) => true,                         // Process exists but we lack permission
        }
    }

    #[cfg(not(unix))]
    fn is_alive(&self, pid: u32) -> bool {
        let mut sys = System::new();
        let pid = sysinfo::Pid::from_u32(pid);
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        sys.process(pid).is_some()
    }

    #[cfg(unix)]
    fn kill(&self, pid: u32, force: bool) -> bool {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        let sig = if force { Signal::SIGKILL } else { Signal::SIGTERM };

        match signal::kill(Pid::from_raw(raw), sig) {
            Ok(()) => true,
            Err(e) => {
                debug!(pid = %pid, signal = ?sig, error = %e, "Failed to signal process");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self, pid: u32, force: bool) -> bool {
        let mut sys = System::new();
        let spid = sysinfo::Pid::from_u32(pid);
        sys.refresh_processes(ProcessesToUpdate::Some(&[spid]), true);
        let Some(process) = sys.process(spid) else {
            return false;
        };

        if force {
            process.kill()
        } else {
            // No SIGTERM on Windows; fall back to hard kill when unsupported
            process
                .kill_with(sysinfo::Signal::Term)
                .unwrap_or_else(|| process.kill())
        }
    }

    fn scan_for_orphans(&self) -> Vec<u32> {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_processes(ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet)),
        );
        let own_pid = std::process::id();

        let mut pids: Vec<u32> = sys
            .processes()
            .iter()
            .filter(|(_, process)| {
                let exe_name = process.exe().and_then(|p| p.file_name());
                self.matches(process.name(), exe_name)
            })
            .map(|(pid, _)| pid.as_u32())
            .filter(|pid| *pid != own_pid)
            .collect();

        pids.sort_unstable();
        debug!(binary = %self.binary_name, found = pids.len(), "Scanned for orphaned servers");
        pids
    }
}
