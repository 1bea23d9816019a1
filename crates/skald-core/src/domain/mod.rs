//! Domain types shared by every skald crate.

mod event;
mod handle;
mod launch;
mod log;
mod process;
mod rcon;
mod watchdog;

pub use event::{ServerEvent, StartupPhase};
pub use handle::{HandleValidationError, ProcessHandleRecord};
pub use launch::{DEFAULT_GAME_PORT, LaunchConfig};
pub use log::{LogEntry, LogLevel};
pub use process::ProcessState;
pub use rcon::{DEFAULT_RCON_PORT, RconConnectionState, RconSettings};
pub use watchdog::WatchdogPolicy;
