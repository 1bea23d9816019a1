//! Remote console command handler.
//!
//! Opens a one-shot connection, runs a single command and prints the
//! response.

use anyhow::{Result, bail};
use skald_rcon::RconClient;

use crate::bootstrap::CliContext;
use crate::commands::RconCommand;

pub async fn execute(ctx: &CliContext, command: RconCommand) -> Result<()> {
    let settings = &ctx.settings().rcon;
    if settings.password.is_empty() {
        bail!(
            "No remote console password configured (rcon.password in {})",
            ctx.settings_path().display()
        );
    }

    let client = RconClient::connect(settings).await?;
    let result = run(&client, command).await;
    client.disconnect().await;
    result
}

async fn run(client: &RconClient, command: RconCommand) -> Result<()> {
    let response = match command {
        RconCommand::Players => {
            let players = client.players().await?;
            if players.is_empty() {
                println!("No players online");
            }
            for name in players {
                println!("{name}");
            }
            return Ok(());
        }
        RconCommand::Kick { player } => client.kick(&player).await?,
        RconCommand::Ban { player } => client.ban(&player).await?,
        RconCommand::Unban { player } => client.unban(&player).await?,
        RconCommand::Banned => client.banned().await?,
        RconCommand::Event { name } => client.start_event(&name).await?,
        RconCommand::StopEvent => client.stop_event().await?,
        RconCommand::SkipTime { seconds } => client.skip_time(seconds).await?,
        RconCommand::Sleep => client.sleep().await?,
        RconCommand::Save => client.save().await?,
        RconCommand::RemoveDrops => client.remove_drops().await?,
        RconCommand::Send { command } => client.send(&command.join(" ")).await?,
    };

    let response = response.trim_end();
    if !response.is_empty() {
        println!("{response}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use futures_util::{SinkExt, StreamExt};
    use skald_core::RconSettings;
    use skald_rcon::{PacketType, RconCodec, RconPacket};
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    /// Console server that accepts any password and answers every command
    /// with an empty body, recording what it was sent.
    async fn recording_server() -> (RconSettings, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(socket, RconCodec::server());
            while let Some(Ok(packet)) = framed.next().await {
                let reply = match packet.kind {
                    PacketType::Auth => RconPacket::auth_response(packet.id),
                    PacketType::ExecCommand => {
                        if !packet.body.is_empty() {
                            log.lock().unwrap().push(packet.body.clone());
                        }
                        RconPacket::response(packet.id, "")
                    }
                    _ => continue,
                };
                if framed.send(reply).await.is_err() {
                    return;
                }
            }
        });

        let settings = RconSettings {
            enabled: true,
            host: addr.ip().to_string(),
            port: addr.port(),
            password: "secret".to_string(),
            timeout_ms: 2_000,
            ..RconSettings::default()
        };
        (settings, seen)
    }

    #[tokio::test]
    async fn subcommands_reach_the_console_as_command_strings() {
        let (settings, seen) = recording_server().await;
        let client = RconClient::connect(&settings).await.unwrap();

        run(&client, RconCommand::Kick { player: "Ragnar".to_string() }).await.unwrap();
        run(&client, RconCommand::StopEvent).await.unwrap();
        run(&client, RconCommand::SkipTime { seconds: 600 }).await.unwrap();
        run(
            &client,
            RconCommand::Send {
                command: vec!["say".to_string(), "skal!".to_string()],
            },
        )
        .await
        .unwrap();
        run(&client, RconCommand::Players).await.unwrap();
        client.disconnect().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["kick Ragnar", "stopevent", "skiptime 600", "say skal!", "players"]
        );
    }
}
