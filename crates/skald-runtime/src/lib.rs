//! OS-facing runtime for skald.
//!
//! This crate owns everything that touches processes and the filesystem:
//!
//! - [`logs`]: bounded log buffer with subscriber fan-out
//! - [`handle`]: persisted process handle record, OS probe, orphan discovery
//! - [`process`]: the game server process state machine
//! - [`watchdog`]: crash-restart policy around the process

pub mod handle;
pub mod logs;
pub mod process;
pub mod watchdog;

pub use handle::{HandleError, HandleStore, SERVER_BINARY_NAME, SystemProbe};
pub use logs::{LogBuffer, Subscription};
pub use process::{
    GameServerProcess, ProcessError, ProcessEvent, ProcessInfo, ProcessOptions, prune_log_files,
};
pub use watchdog::{RestartDecision, RestartTracker, Watchdog, WatchdogError, WatchdogEvent};
