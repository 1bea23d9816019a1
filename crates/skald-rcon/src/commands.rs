//! Fixed command strings understood by the server-side console mod, and
//! parsing of their responses.

use std::collections::BTreeSet;

pub const PLAYERS: &str = "players";
pub const BANNED: &str = "banned";
pub const STOP_EVENT: &str = "stopevent";
pub const SLEEP: &str = "sleep";
pub const SAVE: &str = "save";
pub const REMOVE_DROPS: &str = "removedrops";

pub fn kick(player: &str) -> String {
    format!("kick {player}")
}

pub fn ban(player: &str) -> String {
    format!("ban {player}")
}

pub fn unban(player: &str) -> String {
    format!("unban {player}")
}

/// Start a world event such as `army_eikthyr`.
pub fn event(name: &str) -> String {
    format!("event {name}")
}

pub fn skip_time(seconds: u64) -> String {
    format!("skiptime {seconds}")
}

/// Player names from a `players` response.
///
/// Tolerates header lines (`Online players (2):`, `Players: a, b`), list
/// bullets and `Name (platform id)` suffixes. Empty-server messages yield
/// no names.
pub fn parse_player_list(response: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    for line in response.lines() {
        let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
        if line.is_empty() || is_empty_notice(line) {
            continue;
        }

        // "Players: a, b" or "Online players (2):"
        if let Some((head, rest)) = line.split_once(':') {
            if head.to_ascii_lowercase().contains("player") {
                names.extend(rest.split(',').filter_map(clean_name));
                continue;
            }
        }

        names.extend(clean_name(line));
    }

    names
}

fn is_empty_notice(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("no players") || lower.starts_with("there are no")
}

fn clean_name(raw: &str) -> Option<String> {
    let mut name = raw.trim();
    if name.ends_with(')') {
        if let Some(idx) = name.rfind(" (") {
            name = name[..idx].trim_end();
        }
    }
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Names in `current` but not `previous` (joined) and the reverse (left).
pub fn diff_players(
    previous: &BTreeSet<String>,
    current: &BTreeSet<String>,
) -> (Vec<String>, Vec<String>) {
    let joined = current.difference(previous).cloned().collect();
    let left = previous.difference(current).cloned().collect();
    (joined, left)
}
