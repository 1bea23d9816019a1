//! Game server log parsing.
//!
//! Two pure functions turn a raw output line into typed data:
//!
//! - [`parse_line`] produces a leveled [`LogEntry`]
//! - [`parse_event`] recognises domain events through a prioritised
//!   matcher table (see `matchers.rs`); adding an event is a table entry

mod level;
mod matchers;

use chrono::Utc;

use crate::domain::{LogEntry, ServerEvent};

pub use level::infer_level;

/// Length of the server's `MM/DD/YYYY HH:MM:SS:` clock prefix.
const TIMESTAMP_PREFIX_LEN: usize = 20;

/// Parse one raw output line into a log entry.
///
/// The server's own clock prefix is stripped from `message` but kept in
/// `raw`. Blank lines are valid entries with an empty message.
pub fn parse_line(raw: &str) -> LogEntry {
    let message = strip_server_timestamp(raw).trim().to_string();
    LogEntry {
        timestamp: Utc::now(),
        level: infer_level(&message),
        message,
        raw: raw.to_string(),
    }
}

/// Recognise a domain event in a raw line. First matching rule wins.
pub fn parse_event(raw: &str) -> Option<ServerEvent> {
    matchers::match_event(raw)
}

/// Strip a leading `MM/DD/YYYY HH:MM:SS:` prefix if present.
fn strip_server_timestamp(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    if bytes.len() < TIMESTAMP_PREFIX_LEN {
        return raw;
    }

    // MM/DD/YYYY HH:MM:SS:
    // 0123456789012345678 9
    let shape_ok = bytes[..TIMESTAMP_PREFIX_LEN]
        .iter()
        .enumerate()
        .all(|(i, b)| match i {
            2 | 5 => *b == b'/',
            10 => *b == b' ',
            13 | 16 | 19 => *b == b':',
            _ => b.is_ascii_digit(),
        });

    if shape_ok {
        &raw[TIMESTAMP_PREFIX_LEN..]
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LogLevel, StartupPhase};

    #[test]
    fn strips_server_clock_prefix() {
        let raw = "02/14/2026 18:04:55: Load world: Midgard (Midgard)";
        let entry = parse_line(raw);
        assert_eq!(entry.message, "Load world: Midgard (Midgard)");
        assert_eq!(entry.raw, raw);
        assert_eq!(entry.level, LogLevel::Info);
    }

    #[test]
    fn keeps_lines_without_prefix_intact() {
        let entry = parse_line("  Game server connected  ");
        assert_eq!(entry.message, "Game server connected");
        assert_eq!(entry.raw, "  Game server connected  ");
    }

    #[test]
    fn near_miss_prefix_is_not_stripped() {
        let raw = "02-14-2026 18:04:55: something";
        assert_eq!(parse_line(raw).message, raw);
    }

    #[test]
    fn blank_line_is_a_valid_info_entry() {
        let entry = parse_line("   ");
        assert_eq!(entry.message, "");
        assert_eq!(entry.level, LogLevel::Info);

        let entry = parse_line("");
        assert_eq!(entry.message, "");
    }

    #[test]
    fn error_or_exception_always_yields_error_level() {
        for line in [
            "Error loading texture",
            "NullReferenceException: Object reference not set",
            "some ERROR happened",
            "eXcEpTiOn in thread",
            "12/31/2025 23:59:59: warn: error while saving",
        ] {
            assert_eq!(parse_line(line).level, LogLevel::Error, "line: {line}");
        }
    }

    #[test]
    fn prefix_digits_do_not_influence_level() {
        let entry = parse_line("01/01/2026 00:00:00: Debug mode enabled");
        assert_eq!(entry.level, LogLevel::Debug);
    }

    #[test]
    fn spec_example_events() {
        assert_eq!(
            parse_event("Got character ZDOID from Viking123"),
            Some(ServerEvent::PlayerJoin {
                name: "Viking123".to_string()
            })
        );
        assert_eq!(parse_event("Closing socket 192.168.1.1:52345"), None);
    }

    #[test]
    fn phases_follow_boot_order_for_a_typical_log() {
        let lines = [
            "02/14/2026 18:04:50: DungeonDB Start 1739556290",
            "02/14/2026 18:04:55: Load world: Foo (Foo)",
            "02/14/2026 18:05:00: Generating locations, please wait...",
            "02/14/2026 18:06:00: Done generating locations, duration:60000 ms",
            "02/14/2026 18:06:01: Game server connected",
        ];

        let events: Vec<_> = lines.iter().filter_map(|l| parse_event(l)).collect();
        assert_eq!(
            events,
            vec![
                ServerEvent::StartupPhase {
                    phase: StartupPhase::Initializing
                },
                ServerEvent::StartupPhase {
                    phase: StartupPhase::LoadingWorld
                },
                ServerEvent::StartupPhase {
                    phase: StartupPhase::GeneratingWorld
                },
                ServerEvent::WorldGenerated,
                ServerEvent::ServerReady,
            ]
        );
    }
}
