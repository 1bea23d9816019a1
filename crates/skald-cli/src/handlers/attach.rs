//! Attach command handler.

use anyhow::{Result, anyhow};

use crate::bootstrap::CliContext;
use crate::handlers::supervise;

/// Take over a running server and follow it. Ctrl-C detaches again.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let record = ctx
        .store()
        .resolve_running_server(ctx.probe())
        .ok_or_else(|| anyhow!("No running server found"))?;

    let mut config = ctx.settings().server.clone();
    config.detached = true;

    let watchdog = ctx.watchdog(true)?;
    let pid = record.pid;
    watchdog.attach(record, config).await?;
    println!("Attached to pid {pid} ({})", watchdog.state());

    supervise::run(ctx, &watchdog, true).await
}
