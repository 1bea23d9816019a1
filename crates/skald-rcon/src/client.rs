//! Single-connection RCON client.
//!
//! The socket is owned by one connection task. `send()` calls are queued
//! and executed one at a time, because the protocol has no request
//! multiplexing.
//!
//! # Response reassembly
//!
//! A long response may arrive as several `ResponseValue` packets with the
//! command's id. Right after each command the client sends an empty command
//! with the next id. The server answers in order, so the reply to that
//! follow-up marks the end of the original response. This is a convention
//! of common clients, not a protocol guarantee: the per-command timeout is
//! the safety net for servers that never answer the follow-up.

use std::collections::BTreeSet;

use futures_util::{SinkExt, StreamExt};
use skald_core::{RconConnectionState, RconSettings};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep_until, timeout};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{PacketType, RconCodec, RconPacket};
use crate::commands;
use crate::error::RconError;

const AUTH_ID: i32 = 1;
const FIRST_COMMAND_ID: i32 = 2;
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// Id the server returns on a rejected password.
const AUTH_REJECTED_ID: i32 = -1;

type Connection = Framed<TcpStream, RconCodec>;

struct Request {
    command: String,
    reply: oneshot::Sender<Result<String, RconError>>,
}

/// The command currently on the wire.
struct InFlight {
    command_id: i32,
    terminator_id: i32,
    body: String,
    deadline: Instant,
    reply: oneshot::Sender<Result<String, RconError>>,
}

/// Authenticated connection to the server's remote console.
pub struct RconClient {
    requests: mpsc::Sender<Request>,
    state: watch::Receiver<RconConnectionState>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RconClient {
    /// Connect and authenticate.
    ///
    /// Connect and authentication share the configured timeout. A rejected
    /// password returns [`RconError::AuthFailed`] immediately.
    pub async fn connect(settings: &RconSettings) -> Result<Self, RconError> {
        let address = settings.address();
        let limit = settings.timeout();
        debug!(address = %address, "Connecting to RCON");

        let stream = timeout(limit, TcpStream::connect(&address))
            .await
            .map_err(|_| RconError::Timeout)??;
        stream.set_nodelay(true)?;
        let mut connection = Framed::new(stream, RconCodec::client());

        timeout(limit, authenticate(&mut connection, &settings.password))
            .await
            .map_err(|_| RconError::Timeout)??;
        info!(address = %address, "RCON authenticated");

        let (state_tx, state) = watch::channel(RconConnectionState::Connected);
        let (requests, request_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_connection(
            connection,
            request_rx,
            state_tx,
            shutdown.clone(),
            limit,
        ));

        Ok(Self {
            requests,
            state,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn state(&self) -> RconConnectionState {
        *self.state.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<RconConnectionState> {
        self.state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == RconConnectionState::Connected
    }

    /// Run a command and return its full (reassembled) response.
    pub async fn send(&self, command: &str) -> Result<String, RconError> {
        if !self.is_connected() {
            return Err(RconError::NotConnected);
        }

        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request {
                command: command.to_string(),
                reply,
            })
            .await
            .map_err(|_| RconError::NotConnected)?;

        response.await.map_err(|_| RconError::Disconnected)?
    }

    /// Names currently on the server.
    pub async fn players(&self) -> Result<BTreeSet<String>, RconError> {
        let response = self.send(commands::PLAYERS).await?;
        Ok(commands::parse_player_list(&response))
    }

    pub async fn kick(&self, player: &str) -> Result<String, RconError> {
        self.send(&commands::kick(player)).await
    }

    pub async fn ban(&self, player: &str) -> Result<String, RconError> {
        self.send(&commands::ban(player)).await
    }

    pub async fn unban(&self, player: &str) -> Result<String, RconError> {
        self.send(&commands::unban(player)).await
    }

    pub async fn banned(&self) -> Result<String, RconError> {
        self.send(commands::BANNED).await
    }

    pub async fn start_event(&self, name: &str) -> Result<String, RconError> {
        self.send(&commands::event(name)).await
    }

    pub async fn stop_event(&self) -> Result<String, RconError> {
        self.send(commands::STOP_EVENT).await
    }

    pub async fn skip_time(&self, seconds: u64) -> Result<String, RconError> {
        self.send(&commands::skip_time(seconds)).await
    }

    pub async fn sleep(&self) -> Result<String, RconError> {
        self.send(commands::SLEEP).await
    }

    pub async fn save(&self) -> Result<String, RconError> {
        self.send(commands::SAVE).await
    }

    pub async fn remove_drops(&self) -> Result<String, RconError> {
        self.send(commands::REMOVE_DROPS).await
    }

    /// Close the socket. Pending and queued commands fail with
    /// [`RconError::Disconnected`].
    pub async fn disconnect(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "RCON connection task failed");
            }
        }
    }
}

impl Drop for RconClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn authenticate(connection: &mut Connection, password: &str) -> Result<(), RconError> {
    connection.send(RconPacket::auth(AUTH_ID, password)).await?;

    loop {
        let packet = connection.next().await.ok_or(RconError::Disconnected)??;
        match packet.kind {
            // Some servers send an empty response value ahead of the verdict
            PacketType::ResponseValue => continue,
            PacketType::AuthResponse if packet.id == AUTH_REJECTED_ID => {
                warn!("RCON password rejected");
                return Err(RconError::AuthFailed);
            }
            PacketType::AuthResponse if packet.id == AUTH_ID => return Ok(()),
            _ => debug!(id = %packet.id, kind = ?packet.kind, "Ignoring unexpected packet during auth"),
        }
    }
}

/// Next command id pair, skipping the auth id and never reaching -1.
fn next_ids(next_id: &mut i32) -> (i32, i32) {
    if *next_id >= i32::MAX - 1 {
        *next_id = FIRST_COMMAND_ID;
    }
    let command_id = *next_id;
    *next_id += 2;
    (command_id, command_id + 1)
}

async fn run_connection(
    mut connection: Connection,
    mut requests: mpsc::Receiver<Request>,
    state: watch::Sender<RconConnectionState>,
    shutdown: CancellationToken,
    command_timeout: Duration,
) {
    let mut next_id = FIRST_COMMAND_ID;
    let mut current: Option<InFlight> = None;

    let (final_state, reason) = loop {
        let deadline = current.as_ref().map_or_else(Instant::now, |c| c.deadline);

        tokio::select! {
            biased;
            () = shutdown.cancelled() => break (RconConnectionState::Disconnected, "closed by client".to_string()),
            frame = connection.next() => match frame {
                Some(Ok(packet)) => {
                    let done = current.as_mut().is_some_and(|c| accept(c, &packet));
                    if done {
                        if let Some(finished) = current.take() {
                            let _ = finished.reply.send(Ok(finished.body));
                        }
                    }
                }
                Some(Err(e)) => break (RconConnectionState::Error, e.to_string()),
                None => break (RconConnectionState::Disconnected, "closed by server".to_string()),
            },
            () = sleep_until(deadline), if current.is_some() => {
                if let Some(timed_out) = current.take() {
                    let _ = timed_out.reply.send(Err(RconError::Timeout));
                }
                break (RconConnectionState::Error, "command timed out".to_string());
            }
            request = requests.recv(), if current.is_none() => {
                let Some(request) = request else {
                    break (RconConnectionState::Disconnected, "client dropped".to_string());
                };
                let (command_id, terminator_id) = next_ids(&mut next_id);
                let written = write_command(&mut connection, command_id, terminator_id, &request.command).await;
                match written {
                    Ok(()) => {
                        current = Some(InFlight {
                            command_id,
                            terminator_id,
                            body: String::new(),
                            deadline: Instant::now() + command_timeout,
                            reply: request.reply,
                        });
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        let _ = request.reply.send(Err(e));
                        break (RconConnectionState::Error, reason);
                    }
                }
            }
        }
    };

    info!(reason = %reason, "RCON connection closed");
    state.send_replace(final_state);

    // Nothing queued may hang: fail everything still waiting
    if let Some(pending) = current.take() {
        let _ = pending.reply.send(Err(RconError::Disconnected));
    }
    requests.close();
    while let Ok(request) = requests.try_recv() {
        let _ = request.reply.send(Err(RconError::Disconnected));
    }
}

async fn write_command(
    connection: &mut Connection,
    command_id: i32,
    terminator_id: i32,
    command: &str,
) -> Result<(), RconError> {
    connection.feed(RconPacket::exec(command_id, command)).await?;
    connection.feed(RconPacket::exec(terminator_id, "")).await?;
    connection.flush().await?;
    Ok(())
}

/// Fold a packet into the in-flight response. Returns `true` once the
/// terminator's reply arrives.
fn accept(current: &mut InFlight, packet: &RconPacket) -> bool {
    if packet.id == current.terminator_id {
        return true;
    }
    if packet.id == current.command_id && packet.kind == PacketType::ResponseValue {
        current.body.push_str(&packet.body);
    } else {
        debug!(id = %packet.id, kind = ?packet.kind, "Ignoring stray RCON packet");
    }
    false
}
