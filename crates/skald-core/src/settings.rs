//! Settings domain types, validation and JSON persistence.
//!
//! Settings aggregate everything a supervisor run needs: the launch
//! configuration, restart policy, remote console settings and a few
//! runtime knobs. Missing fields fall back to defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{LaunchConfig, RconSettings, WatchdogPolicy};

/// Default number of parsed log lines kept in memory.
pub const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;

/// Default number of daily detached log files kept on disk.
pub const DEFAULT_LOG_RETENTION: usize = 7;

/// Default grace period between terminate and kill on stop.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 30;

/// Minimum password length the dedicated server accepts.
const MIN_PASSWORD_LEN: usize = 5;

/// Application settings structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Dedicated server executable. `None` means "look in the install dir".
    pub server_executable: Option<PathBuf>,
    /// Launch configuration for the game server.
    pub server: LaunchConfig,
    /// Crash-restart policy.
    pub watchdog: WatchdogPolicy,
    /// Remote console connection.
    pub rcon: RconSettings,
    /// Parsed log lines kept in memory.
    pub log_buffer_capacity: usize,
    /// Daily detached log files kept on disk.
    pub log_retention: usize,
    /// Seconds to wait after terminate before killing on stop.
    pub stop_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Settings {
    /// Create settings with sensible defaults.
    pub fn with_defaults() -> Self {
        Self {
            server_executable: None,
            server: LaunchConfig::default(),
            watchdog: WatchdogPolicy::default(),
            rcon: RconSettings::default(),
            log_buffer_capacity: DEFAULT_LOG_BUFFER_CAPACITY,
            log_retention: DEFAULT_LOG_RETENTION,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
        }
    }
}

/// Settings load/validation error.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Settings file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Server name cannot be empty")]
    EmptyServerName,

    #[error("World name cannot be empty")]
    EmptyWorldName,

    #[error("Server password must be at least 5 characters")]
    PasswordTooShort,

    #[error("Server password must not be contained in the server name")]
    PasswordInName,

    #[error("Log buffer capacity must be at least 1")]
    InvalidBufferCapacity,

    #[error("Backoff multiplier must be >= 1.0, got {0}")]
    InvalidBackoff(f64),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    let server = &settings.server;

    if server.port < 1024 {
        return Err(SettingsError::InvalidPort(server.port));
    }
    if server.name.trim().is_empty() {
        return Err(SettingsError::EmptyServerName);
    }
    if server.world.trim().is_empty() {
        return Err(SettingsError::EmptyWorldName);
    }

    // The dedicated server refuses to start with a short password or one
    // that appears in the server name; an empty password is allowed.
    if !server.password.is_empty() {
        if server.password.len() < MIN_PASSWORD_LEN {
            return Err(SettingsError::PasswordTooShort);
        }
        if server.name.contains(&server.password) {
            return Err(SettingsError::PasswordInName);
        }
    }

    if settings.rcon.enabled && settings.rcon.port < 1024 {
        return Err(SettingsError::InvalidPort(settings.rcon.port));
    }

    if settings.log_buffer_capacity == 0 {
        return Err(SettingsError::InvalidBufferCapacity);
    }

    if settings.watchdog.backoff_multiplier < 1.0 || !settings.watchdog.backoff_multiplier.is_finite() {
        return Err(SettingsError::InvalidBackoff(settings.watchdog.backoff_multiplier));
    }

    Ok(())
}

/// Load settings from a JSON file. A missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Settings::with_defaults());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Save settings atomically (temp file + rename).
pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, json).map_err(io_err)?;
    fs::rename(&temp_path, path).map_err(io_err)?;
    Ok(())
}
