use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::handle::HandleError;

/// Errors returned by [`GameServerProcess`](super::GameServerProcess) control calls.
///
/// Crashes are not errors: they surface as state transitions and events.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("A game server is already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("Failed to spawn {}: {source}", path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Spawned process reported no PID")]
    NoPid,

    #[error("No game server is running")]
    NotRunning,

    #[error("Only detached or attached-external servers can be detached")]
    NotDetachable,

    #[error("Process {0} is not alive")]
    NotAlive(u32),

    #[error("Cannot open server log {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Handle(#[from] HandleError),
}
