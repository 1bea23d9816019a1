//! Start command handler.

use anyhow::{Result, bail};
use skald_core::validate_settings;

use crate::bootstrap::CliContext;
use crate::handlers::supervise;

/// Launch the server under the watchdog and follow it.
pub async fn execute(
    ctx: &CliContext,
    detach: bool,
    world: Option<String>,
    no_restart: bool,
) -> Result<()> {
    validate_settings(ctx.settings())?;

    let store = ctx.store();
    if let Some(record) = store.resolve_running_server(ctx.probe()) {
        bail!(
            "A server is already running (pid {}, world {}). Use `skald attach` or `skald stop`.",
            record.pid,
            record.world
        );
    }

    let mut config = ctx.settings().server.clone();
    if let Some(world) = world {
        config.world = world;
    }
    config.detached = config.detached || detach;
    let detached = config.detached;

    let watchdog = ctx.watchdog(!no_restart)?;
    let pid = watchdog.start(config.clone()).await?;
    println!(
        "Started {} (world {}, port {}, pid {pid}){}",
        config.name,
        config.world,
        config.port,
        if detached { ", detached" } else { "" }
    );

    supervise::run(ctx, &watchdog, detached).await
}
