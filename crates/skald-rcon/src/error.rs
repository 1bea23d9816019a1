use std::io;

use thiserror::Error;

use crate::codec::CodecError;

/// Errors from the remote console client and session.
///
/// `AuthFailed` is final for the configured password: it is never retried
/// automatically.
#[derive(Debug, Error)]
pub enum RconError {
    #[error("RCON I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("RCON protocol error: {0}")]
    Codec(#[from] CodecError),

    #[error("RCON operation timed out")]
    Timeout,

    #[error("RCON authentication failed (wrong password)")]
    AuthFailed,

    #[error("RCON connection closed")]
    Disconnected,

    #[error("RCON is not connected")]
    NotConnected,
}

impl RconError {
    /// Whether the failure ends the connection (and so may warrant a
    /// reconnect) rather than just one command.
    pub const fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Codec(_) | Self::Timeout | Self::Disconnected
        )
    }
}
