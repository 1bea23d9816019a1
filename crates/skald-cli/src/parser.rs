//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Supervisor for a dedicated game server.
///
/// State lives under `SKALD_DATA_DIR` (or the platform data directory):
/// settings, the running-server handle and detached-mode logs.
#[derive(Parser)]
#[command(name = "skald")]
#[command(about = "Run, watch and control a dedicated game server")]
#[command(version)]
pub struct Cli {
    /// Dedicated server executable, overriding settings
    #[arg(long, global = true, env = "SKALD_SERVER_EXECUTABLE")]
    pub executable: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
