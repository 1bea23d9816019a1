//! Game server process supervision.
//!
//! - `command`: launch options and argument/environment construction
//! - `server`: the lifecycle state machine around one OS process
//! - `stream`: pipe readers and detached log file tailing
//! - `logfile`: daily detached log naming and retention
//! - `shutdown`: terminate → kill escalation for owned and external PIDs

mod command;
mod error;
mod events;
mod logfile;
mod server;
mod shutdown;
mod stream;

pub use command::{ProcessOptions, STEAM_APP_ID};
pub use error::ProcessError;
pub use events::{ProcessEvent, ProcessInfo};
pub use logfile::{log_file_path, prune_log_files};
pub use server::GameServerProcess;
pub use shutdown::{kill_pid, shutdown_child};
