//! Game server lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of the supervised game server.
///
/// `Crashed` is terminal for the process wrapper. Only the restart policy
/// decides whether a new run starts from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    #[default]
    Offline,
    Starting,
    Online,
    Stopping,
    Crashed,
}

impl ProcessState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Offline | Self::Crashed, Self::Starting)
                | (Self::Starting, Self::Online | Self::Stopping | Self::Crashed)
                | (Self::Online, Self::Stopping | Self::Crashed)
                | (Self::Stopping, Self::Offline)
                // An attached external process can be found already online.
                | (Self::Offline, Self::Online)
                // Detaching drops the process without stopping it.
                | (Self::Starting | Self::Online, Self::Offline)
                // Acknowledging a crash without restarting.
                | (Self::Crashed, Self::Offline)
        )
    }

    /// A process exists (or is expected to) in this state.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Online | Self::Stopping)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Offline => "offline",
            Self::Starting => "starting",
            Self::Online => "online",
            Self::Stopping => "stopping",
            Self::Crashed => "crashed",
        };
        f.write_str(s)
    }
}
