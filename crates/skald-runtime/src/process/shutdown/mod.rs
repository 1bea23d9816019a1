//! Graceful game server shutdown.
//!
//! Provides two shutdown strategies:
//! - `shutdown_child`: for a server we spawned (includes reaping)
//! - `kill_pid`: for an external server we attached to (PID-only, no reaping)
//!
//! Both send a terminate request first and wait a grace period before
//! killing: the server saves the world on a clean quit, which can take a
//! while on large worlds.

mod child;
mod pid;

pub use child::shutdown_child;
pub use pid::kill_pid;
