//! Logs command handler.
//!
//! Reads the detached-mode log of the running server, or the newest log
//! file on disk when nothing is running.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use skald_core::LogLevel;
use skald_runtime::LogBuffer;

use crate::bootstrap::CliContext;
use crate::presentation::format_entry;

/// Print the last `lines` lines, optionally only those of `level`.
pub fn execute(ctx: &CliContext, lines: usize, level: Option<LogLevel>) -> Result<()> {
    let recorded = ctx
        .store()
        .resolve_running_server(ctx.probe())
        .and_then(|record| record.log_file);
    let Some(path) = recorded.or_else(|| latest_log_file(ctx.logs_dir())) else {
        println!("No server logs in {}", ctx.logs_dir().display());
        return Ok(());
    };

    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    // The buffer keeps only the newest `lines` entries
    let buffer = LogBuffer::new(lines.max(1));
    for line in content.lines() {
        buffer.add(line);
    }

    let entries = match level {
        Some(level) => buffer.get_filtered(level),
        None => buffer.get_all(),
    };
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

/// Newest `*.log` file in `dir`. Daily names sort by date.
fn latest_log_file(dir: &Path) -> Option<PathBuf> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .max()
}
