//! OS process probe port.
//!
//! Abstracts the per-OS-family primitives the handle store needs so that
//! "is a server already running, and which one" can be decided and tested
//! without touching real processes.

/// Liveness, signalling and enumeration of OS processes.
///
/// Implementations must be side-effect free on the target for `is_alive`
/// and must match the server binary by its exact process name in
/// `scan_for_orphans` (never a substring, which would catch unrelated
/// paths that merely contain the name).
pub trait ProcessProbe: Send + Sync {
    /// Whether a process with this PID currently exists.
    fn is_alive(&self, pid: u32) -> bool;

    /// Send terminate (`force == false`) or kill (`force == true`).
    ///
    /// Returns whether the signal was delivered, not whether the process
    /// has exited.
    fn kill(&self, pid: u32, force: bool) -> bool;

    /// PIDs of running processes whose name equals the server binary name.
    fn scan_for_orphans(&self) -> Vec<u32>;
}
