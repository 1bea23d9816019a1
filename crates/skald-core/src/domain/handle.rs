//! Persisted record of "a game server is running here".
//!
//! The record lets a later supervisor instance recognise and reattach to a
//! server it did not start. It is schema-validated on every read: any shape
//! or type mismatch invalidates the whole record.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::launch::DEFAULT_GAME_PORT;

/// World name recorded for a server discovered by process enumeration.
const UNKNOWN_WORLD: &str = "unknown";

/// Why a handle record was rejected.
#[derive(Debug, Error)]
pub enum HandleValidationError {
    /// The file is not JSON of the expected shape.
    #[error("Malformed handle record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The PID is not a positive process id.
    #[error("Invalid PID {0}")]
    InvalidPid(u32),
}

/// Process handle record as stored on disk.
///
/// ```json
/// {"pid": 4242, "startedAt": "2026-01-01T12:00:00Z", "world": "Midgard",
///  "port": 2456, "logFile": "/data/logs/valheim-2026-01-01.log",
///  "detached": true, "serverName": "My Server"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessHandleRecord {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub world: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

impl ProcessHandleRecord {
    /// Record for a server this supervisor just launched.
    pub fn new(pid: u32, world: impl Into<String>, port: u16) -> Self {
        Self {
            pid,
            started_at: Utc::now(),
            world: world.into(),
            port,
            log_file: None,
            detached: None,
            server_name: None,
        }
    }

    /// Best-effort record for an orphan found by process enumeration.
    ///
    /// World and name are unknown; the port is the game default.
    pub fn synthesized(pid: u32) -> Self {
        Self::new(pid, UNKNOWN_WORLD, DEFAULT_GAME_PORT)
    }

    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_detached(mut self, detached: bool) -> Self {
        self.detached = Some(detached);
        self
    }

    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Whether the server was launched with output going to a file.
    pub fn is_detached(&self) -> bool {
        self.detached.unwrap_or(false)
    }

    /// Check invariants that the type system does not enforce.
    pub fn validate(&self) -> Result<(), HandleValidationError> {
        if self.pid == 0 {
            return Err(HandleValidationError::InvalidPid(self.pid));
        }
        Ok(())
    }

    /// Parse and validate a record. Never returns a partially trusted value.
    pub fn from_json(content: &str) -> Result<Self, HandleValidationError> {
        let record: Self = serde_json::from_str(content)?;
        record.validate()?;
        Ok(record)
    }

    /// Serialize for persistence.
    pub fn to_json(&self) -> Result<String, HandleValidationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
