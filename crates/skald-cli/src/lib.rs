//! Command-line supervisor for a dedicated game server.
//!
//! `main.rs` is the composition root; everything it wires lives here so
//! the parser and handlers can be unit tested.

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, LevelArg, RconCommand};
pub use parser::Cli;
