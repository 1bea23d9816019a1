//! Terminal formatting for log lines, records and durations.

use chrono::{DateTime, Local, Utc};
use skald_core::{LogEntry, LogLevel, ProcessHandleRecord};

/// `HH:MM:SS LEVEL message`, in local time.
pub fn format_entry(entry: &LogEntry) -> String {
    let local: DateTime<Local> = entry.timestamp.into();
    format!(
        "{} {:<5} {}",
        local.format("%H:%M:%S"),
        level_tag(entry.level),
        entry.message
    )
}

const fn level_tag(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "DEBUG",
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

/// Compact human duration: `3d 4h`, `2h 5m`, `42s`.
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
    );

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Multi-line `key: value` view of a handle record.
pub fn format_record(record: &ProcessHandleRecord, now: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!("pid:      {}", record.pid),
        format!("world:    {}", record.world),
        format!("port:     {}", record.port),
        format!(
            "started:  {} ({} ago)",
            record.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            format_duration(now - record.started_at)
        ),
    ];
    if let Some(name) = &record.server_name {
        lines.push(format!("name:     {name}"));
    }
    lines.push(format!(
        "mode:     {}",
        if record.is_detached() { "detached" } else { "attached" }
    ));
    if let Some(log_file) = &record.log_file {
        lines.push(format!("log:      {}", log_file.display()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_pick_two_units() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(chrono::Duration::seconds(7_500)), "2h 5m");
        assert_eq!(format_duration(chrono::Duration::seconds(273_600)), "3d 4h");
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "0s");
    }

    #[test]
    fn record_view_includes_optional_fields() {
        let record = ProcessHandleRecord::new(4242, "Midgard", 2456)
            .with_log_file("/data/logs/valheim-2026-01-01.log")
            .with_detached(true)
            .with_server_name("Longhouse");
        let view = format_record(&record, record.started_at + chrono::Duration::seconds(90));

        assert!(view.contains("pid:      4242"));
        assert!(view.contains("(1m 30s ago)"));
        assert!(view.contains("name:     Longhouse"));
        assert!(view.contains("mode:     detached"));
        assert!(view.contains("valheim-2026-01-01.log"));
    }

    #[test]
    fn entry_shows_level_and_message() {
        let entry = skald_core::parse_line("Game server connected");
        let line = format_entry(&entry);
        assert!(line.contains("INFO"));
        assert!(line.ends_with("Game server connected"));
    }
}
