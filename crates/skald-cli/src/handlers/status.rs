//! Status command handler.

use anyhow::Result;
use chrono::Utc;

use crate::bootstrap::CliContext;
use crate::presentation::format_record;

/// Report the running server, if any. Dead handle records are swept.
pub fn execute(ctx: &CliContext, json: bool) -> Result<()> {
    let record = ctx.store().resolve_running_server(ctx.probe());

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    match record {
        Some(record) => {
            println!("Server is running");
            println!("{}", format_record(&record, Utc::now()));
        }
        None => println!("Server is not running"),
    }
    Ok(())
}
