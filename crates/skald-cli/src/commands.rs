//! Commands enum and subcommands.

use clap::{Subcommand, ValueEnum};
use skald_core::LogLevel;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Launch the server and supervise it until Ctrl-C
    Start {
        /// Redirect output to a log file so the server outlives this command
        #[arg(short, long)]
        detach: bool,
        /// World to load, overriding settings
        #[arg(long)]
        world: Option<String>,
        /// Disable automatic restarts for this run
        #[arg(long)]
        no_restart: bool,
    },

    /// Reattach to a server left running by an earlier `start --detach`
    Attach,

    /// Show whether a server is running
    Status {
        /// Print the handle record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Gracefully stop the running server
    Stop {
        /// Seconds to wait before killing, overriding settings
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Kill the running server immediately
    Kill,

    /// Print the latest detached-mode server log
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
        /// Only show lines of this level
        #[arg(short, long)]
        level: Option<LevelArg>,
    },

    /// Send a remote console command
    Rcon {
        #[command(subcommand)]
        command: RconCommand,
    },

    /// Show resolved paths and the server executable
    Paths,
}

/// Remote console operations.
#[derive(Subcommand)]
pub enum RconCommand {
    /// List online players
    Players,
    /// Kick a player
    Kick { player: String },
    /// Ban a player
    Ban { player: String },
    /// Lift a ban
    Unban { player: String },
    /// List banned players
    Banned,
    /// Start a world event (e.g. `army_eikthyr`)
    Event { name: String },
    /// Stop the current world event
    StopEvent,
    /// Advance the world clock
    SkipTime { seconds: u64 },
    /// Skip to morning
    Sleep,
    /// Save the world now
    Save,
    /// Remove all dropped items
    RemoveDrops,
    /// Send a raw command
    Send {
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
}

/// Log level filter for `logs`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelArg {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LevelArg> for LogLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Debug => Self::Debug,
            LevelArg::Info => Self::Info,
            LevelArg::Warn => Self::Warn,
            LevelArg::Error => Self::Error,
        }
    }
}
