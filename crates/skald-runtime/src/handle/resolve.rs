//! Find the game server already running on this host, if any.

use skald_core::{ProcessHandleRecord, ProcessProbe};
use tracing::{debug, info, warn};

use super::store::HandleStore;

impl HandleStore {
    /// Resolve the running server, reconciling the record with the OS.
    ///
    /// 1. A valid record whose PID is alive wins.
    /// 2. A record whose PID is dead is deleted.
    /// 3. Otherwise the first process with the server binary name is adopted:
    ///    a minimal record is synthesized and persisted so later calls
    ///    resolve from disk.
    pub fn resolve_running_server(&self, probe: &dyn ProcessProbe) -> Option<ProcessHandleRecord> {
        if let Some(record) = self.read() {
            if probe.is_alive(record.pid) {
                debug!(pid = %record.pid, "Handle record points at a live server");
                return Some(record);
            }

            info!(pid = %record.pid, "Removing stale handle record (process is dead)");
            if let Err(e) = self.delete() {
                warn!(error = %e, "Failed to remove stale handle record");
            }
        }

        let pid = probe.scan_for_orphans().into_iter().next()?;
        let record = ProcessHandleRecord::synthesized(pid);
        info!(pid = %pid, "Adopting orphaned game server found by process scan");

        if let Err(e) = self.write(&record) {
            warn!(pid = %pid, error = %e, "Failed to persist synthesized handle record");
        }
        Some(record)
    }
}
