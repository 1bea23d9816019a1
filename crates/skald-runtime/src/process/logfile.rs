//! Daily log files for detached runs.
//!
//! Files are named `<prefix>-<YYYY-MM-DD>.log`. The fixed-width date makes
//! lexicographic order equal to chronological order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Log file for `date` under `dir`.
pub fn log_file_path(dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{prefix}-{}.log", date.format(DATE_FORMAT)))
}

fn is_dated_log(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(".log"))
        .is_some_and(|date| NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok())
}

/// Keep the `keep` most recent dated log files, delete the rest.
///
/// Files that do not follow the naming scheme are left alone. Returns the
/// paths that were removed.
pub fn prune_log_files(dir: &Path, prefix: &str, keep: usize) -> io::Result<Vec<PathBuf>> {
    let mut logs: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| is_dated_log(n, prefix))
            })
            .collect(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    // Newest first
    logs.sort_unstable_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = Vec::new();
    for path in logs.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Pruned old server log");
                removed.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to prune server log"),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn path_uses_fixed_width_date() {
        let path = log_file_path(Path::new("/logs"), "valheim", date(2026, 3, 7));
        assert_eq!(path, PathBuf::from("/logs/valheim-2026-03-07.log"));
    }

    #[test]
    fn prune_keeps_newest_files() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=5 {
            fs::write(log_file_path(dir.path(), "valheim", date(2026, 1, day)), "x").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        fs::write(dir.path().join("valheim-latest.log"), "keep me").unwrap();

        let removed = prune_log_files(dir.path(), "valheim", 2).unwrap();
        assert_eq!(removed.len(), 3);

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "notes.txt",
                "valheim-2026-01-04.log",
                "valheim-2026-01-05.log",
                "valheim-latest.log",
            ]
        );
    }

    #[test]
    fn prune_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let removed = prune_log_files(&dir.path().join("absent"), "valheim", 1).unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn other_prefixes_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(log_file_path(dir.path(), "other", date(2020, 1, 1)), "x").unwrap();
        assert!(prune_log_files(dir.path(), "valheim", 0).unwrap().is_empty());
    }
}
