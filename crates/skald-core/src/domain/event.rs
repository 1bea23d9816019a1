//! Typed events derived from game server output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse boot milestone inferred from specific log lines.
///
/// Variants are declared in boot order, so `Ord` follows progression.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StartupPhase {
    #[default]
    Idle,
    Initializing,
    LoadingWorld,
    GeneratingWorld,
    CreatingLocations,
    StartingServer,
    RegisteringLobby,
    Ready,
}

impl StartupPhase {
    /// Rough completion percentage for progress feedback.
    pub const fn progress(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Initializing => 10,
            Self::LoadingWorld => 25,
            Self::GeneratingWorld => 40,
            Self::CreatingLocations => 60,
            Self::StartingServer => 75,
            Self::RegisteringLobby => 90,
            Self::Ready => 100,
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Initializing => "Initializing",
            Self::LoadingWorld => "Loading world",
            Self::GeneratingWorld => "Generating world",
            Self::CreatingLocations => "Creating locations",
            Self::StartingServer => "Starting server",
            Self::RegisteringLobby => "Registering lobby",
            Self::Ready => "Ready",
        }
    }
}

impl fmt::Display for StartupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Domain event recognised in a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    PlayerJoin { name: String },
    PlayerLeave { name: String },
    WorldSaved,
    WorldGenerated,
    ServerReady,
    ServerShutdown,
    StartupPhase { phase: StartupPhase },
    Error { message: String },
}
