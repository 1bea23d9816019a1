//! Command handlers.
//!
//! Handlers take the composed [`CliContext`](crate::bootstrap::CliContext),
//! call into the runtime and RCON crates, and format output for the
//! terminal.

pub mod attach;
pub mod logs;
pub mod paths;
pub mod rcon;
pub mod start;
pub mod status;
pub mod stop;
pub mod supervise;
