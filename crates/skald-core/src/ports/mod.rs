//! Port definitions implemented by the runtime.

mod process_probe;

pub use process_probe::ProcessProbe;
