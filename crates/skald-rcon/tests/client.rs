//! `RconClient` against an in-process fake server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeServer, Reply};
use skald_core::RconConnectionState;
use skald_rcon::{RconClient, RconError};

const PASSWORD: &str = "hunter2";

#[tokio::test]
async fn authenticates_and_runs_a_command() {
    let server = FakeServer::spawn(PASSWORD, |command| match command {
        "save" => Reply::Packets(vec!["World saved".to_string()]),
        _ => Reply::Packets(vec![String::new()]),
    })
    .await;

    let client = RconClient::connect(&server.settings(PASSWORD)).await.unwrap();
    assert_eq!(client.state(), RconConnectionState::Connected);
    assert_eq!(client.send("save").await.unwrap(), "World saved");
}

#[tokio::test]
async fn wrong_password_fails_fast() {
    let server = FakeServer::echo(PASSWORD).await;

    let result = RconClient::connect(&server.settings("nope")).await;
    assert!(matches!(result, Err(RconError::AuthFailed)));
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn multi_packet_response_is_reassembled() {
    let server = FakeServer::spawn(PASSWORD, |command| match command {
        "players" => Reply::Packets(vec![
            "Online players (3):\n".to_string(),
            "- Ragnar\n- Freya\n".to_string(),
            "- Bjorn\n".to_string(),
        ]),
        _ => Reply::Packets(vec![String::new()]),
    })
    .await;

    let client = RconClient::connect(&server.settings(PASSWORD)).await.unwrap();
    let response = client.send("players").await.unwrap();

    assert_eq!(response, "Online players (3):\n- Ragnar\n- Freya\n- Bjorn\n");
}

#[tokio::test]
async fn concurrent_sends_each_get_their_own_response() {
    let server = FakeServer::echo(PASSWORD).await;
    let client = RconClient::connect(&server.settings(PASSWORD)).await.unwrap();

    let (a, b, c) = tokio::join!(client.send("one"), client.send("two"), client.send("three"));

    assert_eq!(a.unwrap(), "echo one");
    assert_eq!(b.unwrap(), "echo two");
    assert_eq!(c.unwrap(), "echo three");
}

#[tokio::test]
async fn disconnect_resolves_in_flight_send() {
    let server = FakeServer::spawn(PASSWORD, |_| Reply::Silent).await;
    let client = Arc::new(RconClient::connect(&server.settings(PASSWORD)).await.unwrap());

    let pending = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.send("hang").await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.disconnect().await;

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(RconError::Disconnected)));
    assert_eq!(client.state(), RconConnectionState::Disconnected);
    assert!(matches!(client.send("save").await, Err(RconError::NotConnected)));
}

#[tokio::test]
async fn command_timeout_drops_the_connection() {
    let server = FakeServer::spawn(PASSWORD, |_| Reply::Silent).await;
    let mut settings = server.settings(PASSWORD);
    settings.timeout_ms = 200;
    let client = RconClient::connect(&settings).await.unwrap();

    let result = client.send("hang").await;
    assert!(matches!(result, Err(RconError::Timeout)));

    let mut state = client.state_receiver();
    tokio::time::timeout(
        Duration::from_secs(1),
        state.wait_for(|s| *s == RconConnectionState::Error),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn server_closing_fails_the_pending_command() {
    let server = FakeServer::spawn(PASSWORD, |command| match command {
        "quit" => Reply::Close,
        other => Reply::Packets(vec![format!("echo {other}")]),
    })
    .await;
    let client = RconClient::connect(&server.settings(PASSWORD)).await.unwrap();

    assert_eq!(client.send("ping").await.unwrap(), "echo ping");
    assert!(matches!(client.send("quit").await, Err(RconError::Disconnected)));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn command_helpers_send_console_strings() {
    let server = FakeServer::spawn(PASSWORD, |command| match command {
        "players" => Reply::Packets(vec![
            "Online players (2):\n- Ragnar\n- Freya\n".to_string(),
        ]),
        other => Reply::Packets(vec![format!("echo {other}")]),
    })
    .await;
    let client = RconClient::connect(&server.settings(PASSWORD)).await.unwrap();

    let players = client.players().await.unwrap();
    assert_eq!(
        players.into_iter().collect::<Vec<_>>(),
        vec!["Freya".to_string(), "Ragnar".to_string()]
    );
    assert_eq!(client.kick("Ragnar").await.unwrap(), "echo kick Ragnar");
    assert_eq!(client.ban("Loki").await.unwrap(), "echo ban Loki");
    assert_eq!(client.unban("Loki").await.unwrap(), "echo unban Loki");
    assert_eq!(client.banned().await.unwrap(), "echo banned");
    assert_eq!(
        client.start_event("army_eikthyr").await.unwrap(),
        "echo event army_eikthyr"
    );
    assert_eq!(client.stop_event().await.unwrap(), "echo stopevent");
    assert_eq!(client.skip_time(600).await.unwrap(), "echo skiptime 600");
    assert_eq!(client.sleep().await.unwrap(), "echo sleep");
    assert_eq!(client.save().await.unwrap(), "echo save");
    assert_eq!(client.remove_drops().await.unwrap(), "echo removedrops");

    client.disconnect().await;
}
