//! CLI entry point - the composition root.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use skald_cli::{Cli, CliConfig, Commands, bootstrap, handlers};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment first so clap `env` fallbacks see .env values
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(CliConfig {
        executable: cli.executable,
    })?;

    match command {
        Commands::Start {
            detach,
            world,
            no_restart,
        } => handlers::start::execute(&ctx, detach, world, no_restart).await?,
        Commands::Attach => handlers::attach::execute(&ctx).await?,
        Commands::Status { json } => handlers::status::execute(&ctx, json)?,
        Commands::Stop { timeout } => handlers::stop::execute(&ctx, timeout).await?,
        Commands::Kill => handlers::stop::execute_kill(&ctx).await?,
        Commands::Logs { lines, level } => {
            handlers::logs::execute(&ctx, lines, level.map(Into::into))?;
        }
        Commands::Rcon { command } => handlers::rcon::execute(&ctx, command).await?,
        Commands::Paths => handlers::paths::execute(&ctx)?,
    }

    Ok(())
}
