//! Paths command handler.

use anyhow::Result;
use skald_core::handle_file_path;

use crate::bootstrap::CliContext;

/// Print resolved locations in `key = value` form.
pub fn execute(ctx: &CliContext) -> Result<()> {
    println!("data_root = {}", ctx.data_root().display());
    println!("settings = {}", ctx.settings_path().display());
    println!("handle_file = {}", handle_file_path()?.display());
    println!("logs_dir = {}", ctx.logs_dir().display());
    println!("executable = {}", ctx.executable().display());
    Ok(())
}
