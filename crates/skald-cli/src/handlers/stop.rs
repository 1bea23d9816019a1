//! Stop and kill command handlers.
//!
//! These act on the server recorded in the handle file (or found by
//! process scan), not on a process owned by this invocation.

use std::time::Duration;

use anyhow::{Context, Result};
use skald_runtime::process::kill_pid;

use crate::bootstrap::CliContext;

/// Terminate gracefully, escalating to kill after the grace period.
pub async fn execute(ctx: &CliContext, timeout: Option<u64>) -> Result<()> {
    let grace = timeout.map_or_else(|| ctx.stop_timeout(), Duration::from_secs);
    terminate(ctx, grace, false).await
}

/// Kill immediately.
pub async fn execute_kill(ctx: &CliContext) -> Result<()> {
    terminate(ctx, Duration::ZERO, true).await
}

async fn terminate(ctx: &CliContext, grace: Duration, force: bool) -> Result<()> {
    let store = ctx.store();
    let Some(record) = store.resolve_running_server(ctx.probe()) else {
        println!("Server is not running");
        return Ok(());
    };

    if force {
        println!("Killing server (pid {})...", record.pid);
    } else {
        println!(
            "Stopping server (pid {}), waiting up to {}s...",
            record.pid,
            grace.as_secs()
        );
    }

    kill_pid(ctx.probe(), record.pid, grace, force)
        .await
        .with_context(|| format!("Failed to stop pid {}", record.pid))?;
    store.delete()?;

    println!("Server stopped.");
    Ok(())
}
