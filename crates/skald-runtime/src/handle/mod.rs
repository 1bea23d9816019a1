//! Process handle record management for cross-process attach/detach.
//!
//! Provides atomic record I/O, OS process probing, and resolution of "which
//! game server is already running here" across supervisor restarts.
//!
//! # Safety guarantees
//! - Atomic writes via temp file + rename (concurrent readers never see a
//!   partial record)
//! - Invalid records are deleted on read, never partially trusted
//! - Orphan enumeration matches the exact binary name only

mod probe;
mod resolve;
mod store;

pub use probe::{SERVER_BINARY_NAME, SystemProbe};
pub use store::{HandleError, HandleStore};
