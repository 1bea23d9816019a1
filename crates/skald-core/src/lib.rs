//! Core domain types and port definitions for skald.
//!
//! This crate has no OS or network dependencies. It defines what a game
//! server run looks like (launch configuration, lifecycle state, log entries
//! and the events derived from them), the persisted process handle record,
//! restart policy, RCON settings, and the ports the runtime implements.

pub mod domain;
pub mod parser;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    DEFAULT_GAME_PORT, DEFAULT_RCON_PORT, HandleValidationError, LaunchConfig, LogEntry, LogLevel,
    ProcessHandleRecord, ProcessState, RconConnectionState, RconSettings, ServerEvent,
    StartupPhase, WatchdogPolicy,
};
pub use parser::{parse_event, parse_line};
pub use paths::{
    PathError, data_root, ensure_directory, handle_file_path, server_logs_dir, settings_path,
};
pub use ports::ProcessProbe;
pub use settings::{Settings, SettingsError, load_settings, save_settings, validate_settings};
