//! Crash-restart policy for the game server.
//!
//! `tracker` is the pure counting logic (sliding cooldown window with
//! exponential backoff); `supervisor` applies it to a live process.

mod supervisor;
mod tracker;

pub use supervisor::{Watchdog, WatchdogError, WatchdogEvent};
pub use tracker::{RestartDecision, RestartTracker};
