//! Notifications and snapshots published by the game server process.

use chrono::{DateTime, Utc};
use serde::Serialize;
use skald_core::{LogEntry, ProcessHandleRecord, ProcessState, ServerEvent, StartupPhase};

/// Everything observable about a run, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    StateChanged {
        from: ProcessState,
        to: ProcessState,
    },
    /// Every parsed output line.
    Log(LogEntry),
    PlayerJoined {
        name: String,
    },
    PlayerLeft {
        name: String,
    },
    /// Domain event recognised in a line (follows the matching `Log`).
    Server(ServerEvent),
    /// A failure the operator must see: crash or spawn failure.
    Fatal {
        message: String,
    },
    /// The process is gone. `code` is `None` when killed by a signal or
    /// when the process was not our child.
    Exited {
        code: Option<i32>,
    },
}

/// Point-in-time view of the supervised server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub state: ProcessState,
    pub phase: StartupPhase,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub record: Option<ProcessHandleRecord>,
    pub players: Vec<String>,
}

impl ProcessInfo {
    /// Time since start, if a run is active.
    pub fn uptime(&self) -> Option<chrono::Duration> {
        self.started_at.map(|t| Utc::now() - t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_requires_start_time() {
        let mut info = ProcessInfo {
            state: ProcessState::Offline,
            phase: StartupPhase::Idle,
            pid: None,
            started_at: None,
            record: None,
            players: Vec::new(),
        };
        assert!(info.uptime().is_none());

        info.started_at = Some(Utc::now() - chrono::Duration::seconds(90));
        assert!(info.uptime().unwrap().num_seconds() >= 90);
    }
}
