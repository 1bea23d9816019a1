//! Prioritised event matcher table.
//!
//! Each rule pairs substring needles with a builder. Rules are checked in
//! table order; the first rule whose needle occurs in the line decides the
//! outcome, even when its builder declines (for example a join line with no
//! resolvable name yields no event rather than falling through).

use crate::domain::{ServerEvent, StartupPhase};

type Build = fn(&str, &str) -> Option<ServerEvent>;

struct Rule {
    needles: &'static [&'static str],
    build: Build,
}

const JOIN_MARKER: &str = "Got character ZDOID from ";
const LEAVE_MARKER: &str = "Player left: ";

const RULES: &[Rule] = &[
    // Players
    Rule {
        needles: &[JOIN_MARKER],
        build: |line, needle| player_name_after(line, needle).map(|name| ServerEvent::PlayerJoin { name }),
    },
    Rule {
        needles: &[LEAVE_MARKER],
        build: |line, needle| player_name_after(line, needle).map(|name| ServerEvent::PlayerLeave { name }),
    },
    // Persistence
    Rule {
        needles: &["World saved"],
        build: |_, _| Some(ServerEvent::WorldSaved),
    },
    Rule {
        needles: &["Done generating locations"],
        build: |_, _| Some(ServerEvent::WorldGenerated),
    },
    // Readiness
    Rule {
        needles: &["Game server connected"],
        build: |_, _| Some(ServerEvent::ServerReady),
    },
    Rule {
        needles: &["OnApplicationQuit"],
        build: |_, _| Some(ServerEvent::ServerShutdown),
    },
    // Startup phases
    Rule {
        needles: &["DungeonDB Start"],
        build: |_, _| phase(StartupPhase::Initializing),
    },
    Rule {
        needles: &["Load world", "Loading world data"],
        build: |_, _| phase(StartupPhase::LoadingWorld),
    },
    Rule {
        needles: &["Generating locations, please wait"],
        build: |_, _| phase(StartupPhase::GeneratingWorld),
    },
    Rule {
        needles: &["Placing locations", "Failed to place all locations"],
        build: |_, _| phase(StartupPhase::CreatingLocations),
    },
    Rule {
        needles: &["ZDOMan initialization", "Zonesystem Start"],
        build: |_, _| phase(StartupPhase::StartingServer),
    },
    Rule {
        needles: &["Registering lobby"],
        build: |_, _| phase(StartupPhase::RegisteringLobby),
    },
    // Error markers
    Rule {
        needles: &["Error!", "FAILED", "Exception:"],
        build: |line, _| {
            Some(ServerEvent::Error {
                message: line.trim().to_string(),
            })
        },
    },
];

#[allow(clippy::unnecessary_wraps)]
const fn phase(phase: StartupPhase) -> Option<ServerEvent> {
    Some(ServerEvent::StartupPhase { phase })
}

/// Name token following `needle`, up to the ` : <zdoid>` suffix if present.
fn player_name_after(line: &str, needle: &str) -> Option<String> {
    let (_, rest) = line.split_once(needle)?;
    let name = rest.split(" :").next().unwrap_or_default().trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

pub(super) fn match_event(line: &str) -> Option<ServerEvent> {
    for rule in RULES {
        if let Some(needle) = rule.needles.iter().find(|n| line.contains(*n)) {
            return (rule.build)(line, needle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_of(line: &str) -> Option<StartupPhase> {
        match match_event(line) {
            Some(ServerEvent::StartupPhase { phase }) => Some(phase),
            _ => None,
        }
    }

    #[test]
    fn join_captures_name_before_zdoid_suffix() {
        assert_eq!(
            match_event("02/14/2026 18:10:00: Got character ZDOID from Ragnar : -2147 : 1"),
            Some(ServerEvent::PlayerJoin {
                name: "Ragnar".to_string()
            })
        );
    }

    #[test]
    fn join_without_name_yields_nothing() {
        assert_eq!(match_event("Got character ZDOID from  "), None);
    }

    #[test]
    fn leave_requires_a_name() {
        assert_eq!(
            match_event("Player left: Freya"),
            Some(ServerEvent::PlayerLeave {
                name: "Freya".to_string()
            })
        );
        assert_eq!(match_event("Player left: "), None);
    }

    #[test]
    fn every_phase_mapping() {
        let cases = [
            ("DungeonDB Start 12345", StartupPhase::Initializing),
            ("Load world: Midgard", StartupPhase::LoadingWorld),
            ("Loading world data", StartupPhase::LoadingWorld),
            ("Generating locations, please wait...", StartupPhase::GeneratingWorld),
            ("Placing locations", StartupPhase::CreatingLocations),
            ("Failed to place all locations, Mistlands", StartupPhase::CreatingLocations),
            ("ZDOMan initialization", StartupPhase::StartingServer),
            ("Zonesystem Start 4", StartupPhase::StartingServer),
            ("Registering lobby", StartupPhase::RegisteringLobby),
        ];
        for (line, expected) in cases {
            assert_eq!(phase_of(line), Some(expected), "line: {line}");
        }
    }

    #[test]
    fn persistence_and_readiness() {
        assert_eq!(match_event("World saved ( 31.2ms )"), Some(ServerEvent::WorldSaved));
        assert_eq!(match_event("Game server connected"), Some(ServerEvent::ServerReady));
        assert_eq!(match_event("OnApplicationQuit"), Some(ServerEvent::ServerShutdown));
    }

    #[test]
    fn error_markers_carry_full_message() {
        assert_eq!(
            match_event("  Steam init FAILED  "),
            Some(ServerEvent::Error {
                message: "Steam init FAILED".to_string()
            })
        );
        assert!(matches!(
            match_event("NullReferenceException: boom"),
            Some(ServerEvent::Error { .. })
        ));
        assert!(matches!(match_event("Error! disk full"), Some(ServerEvent::Error { .. })));
    }

    #[test]
    fn lowercase_failed_is_not_an_error_marker() {
        assert_eq!(match_event("connection failed, retrying"), None);
    }
}
