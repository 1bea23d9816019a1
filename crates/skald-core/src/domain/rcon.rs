//! Remote console connection settings and state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default RCON port used by the server-side console mod.
pub const DEFAULT_RCON_PORT: u16 = 25575;

/// State of the single remote console connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RconConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last attempt failed (network error, timeout or rejected password).
    Error,
}

impl fmt::Display for RconConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        })
    }
}

/// Connection and session behaviour for the remote console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RconSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Reconnect after an unexpected disconnect while the server is online.
    pub auto_reconnect: bool,
    pub reconnect_delay_ms: u64,
    /// Player-list poll interval. Zero disables polling.
    pub poll_interval_ms: u64,
    /// Timeout applied to connect and to each command.
    pub timeout_ms: u64,
}

impl Default for RconSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_RCON_PORT,
            password: String::new(),
            auto_reconnect: true,
            reconnect_delay_ms: 5_000,
            poll_interval_ms: 10_000,
            timeout_ms: 5_000,
        }
    }
}

impl RconSettings {
    /// `host:port` for socket connection.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// `None` when polling is disabled.
    pub const fn poll_interval(&self) -> Option<Duration> {
        if self.poll_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.poll_interval_ms))
        }
    }
}
