use crate::domain::LogLevel;

/// Keyword rules checked in order against the lowercased message.
const LEVEL_RULES: &[(&[&str], LogLevel)] = &[
    (&["error", "exception"], LogLevel::Error),
    (&["warn"], LogLevel::Warn),
    (&["debug"], LogLevel::Debug),
];

/// Infer a level from message text. Case-insensitive, first rule wins.
pub fn infer_level(message: &str) -> LogLevel {
    let lowered = message.to_lowercase();
    LEVEL_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map_or(LogLevel::Info, |(_, level)| *level)
}
