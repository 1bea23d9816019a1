//! Session manager: one [`RconClient`] kept alive while the server is online.
//!
//! The session only connects while the supervised server reports
//! [`ProcessState::Online`]; the console mod is not listening before the
//! world is loaded. While connected it polls the player list and turns the
//! differences into join and leave notifications.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use skald_core::{ProcessState, RconConnectionState, RconSettings};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::RconClient;
use crate::commands;
use crate::error::RconError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications from the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RconEvent {
    Connected,
    Disconnected { reason: String },
    /// Raised before the reconnect delay starts.
    Reconnecting { attempt: u32, delay: Duration },
    /// Terminal for the configured password.
    AuthFailed,
    PlayerJoined { name: String },
    PlayerLeft { name: String },
}

/// Why a connected period ended.
enum Ended {
    Cancelled,
    ServerOffline,
    Lost(String),
}

struct Inner {
    settings: RconSettings,
    client: RwLock<Option<Arc<RconClient>>>,
    state: watch::Sender<RconConnectionState>,
    events: broadcast::Sender<RconEvent>,
    players: RwLock<BTreeSet<String>>,
}

impl Inner {
    fn emit(&self, event: RconEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_state(&self, state: RconConnectionState) {
        self.state.send_replace(state);
    }

    fn client(&self) -> Option<Arc<RconClient>> {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn install(&self, client: Option<Arc<RconClient>>) {
        *self.client.write().unwrap_or_else(|e| e.into_inner()) = client;
    }

    fn players(&self) -> BTreeSet<String> {
        self.players
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the roster and return the joins and leaves.
    fn update_players(&self, current: BTreeSet<String>) -> (Vec<String>, Vec<String>) {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        let diff = commands::diff_players(&players, &current);
        *players = current;
        diff
    }

    fn clear_players(&self) {
        self.players
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Remote console session bound to the server's lifecycle.
pub struct RconSession {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RconSession {
    /// Start managing the connection. Nothing connects until `server_state`
    /// reports the server online.
    ///
    /// With `settings.enabled == false` the session stays disconnected and
    /// every command fails with [`RconError::NotConnected`].
    pub fn start(settings: RconSettings, server_state: watch::Receiver<ProcessState>) -> Self {
        let (state, _) = watch::channel(RconConnectionState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let enabled = settings.enabled;
        let inner = Arc::new(Inner {
            settings,
            client: RwLock::new(None),
            state,
            events,
            players: RwLock::new(BTreeSet::new()),
        });
        let cancel = CancellationToken::new();

        let task = if enabled {
            Some(tokio::spawn(run_session(
                Arc::clone(&inner),
                server_state,
                cancel.clone(),
            )))
        } else {
            debug!("RCON disabled, session idle");
            None
        };

        Self {
            inner,
            cancel,
            task: Mutex::new(task),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RconEvent> {
        self.inner.events.subscribe()
    }

    pub fn connection_state(&self) -> RconConnectionState {
        *self.inner.state.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<RconConnectionState> {
        self.inner.state.subscribe()
    }

    /// Players seen in the most recent poll.
    pub fn online_players(&self) -> BTreeSet<String> {
        self.inner.players()
    }

    pub fn settings(&self) -> &RconSettings {
        &self.inner.settings
    }

    fn client(&self) -> Result<Arc<RconClient>, RconError> {
        self.inner.client().ok_or(RconError::NotConnected)
    }

    /// Run a raw console command.
    pub async fn send(&self, command: &str) -> Result<String, RconError> {
        self.client()?.send(command).await
    }

    /// Query the player list now.
    pub async fn players(&self) -> Result<BTreeSet<String>, RconError> {
        self.client()?.players().await
    }

    pub async fn kick(&self, player: &str) -> Result<String, RconError> {
        self.client()?.kick(player).await
    }

    pub async fn ban(&self, player: &str) -> Result<String, RconError> {
        self.client()?.ban(player).await
    }

    pub async fn unban(&self, player: &str) -> Result<String, RconError> {
        self.client()?.unban(player).await
    }

    pub async fn banned(&self) -> Result<String, RconError> {
        self.client()?.banned().await
    }

    pub async fn start_event(&self, name: &str) -> Result<String, RconError> {
        self.client()?.start_event(name).await
    }

    pub async fn stop_event(&self) -> Result<String, RconError> {
        self.client()?.stop_event().await
    }

    pub async fn skip_time(&self, seconds: u64) -> Result<String, RconError> {
        self.client()?.skip_time(seconds).await
    }

    pub async fn sleep(&self) -> Result<String, RconError> {
        self.client()?.sleep().await
    }

    pub async fn save(&self) -> Result<String, RconError> {
        self.client()?.save().await
    }

    pub async fn remove_drops(&self) -> Result<String, RconError> {
        self.client()?.remove_drops().await
    }

    /// Stop managing the connection and close it.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "RCON session task failed");
            }
        }
    }
}

impl Drop for RconSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_session(
    inner: Arc<Inner>,
    mut server_state: watch::Receiver<ProcessState>,
    cancel: CancellationToken,
) {
    let settings = inner.settings.clone();
    let mut attempt: u32 = 0;

    loop {
        if !wait_for_state(&mut server_state, &cancel, |s| s == ProcessState::Online).await {
            break;
        }

        inner.set_state(RconConnectionState::Connecting);
        let connected = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = RconClient::connect(&settings) => result,
        };

        match connected {
            Ok(client) => {
                attempt = 0;
                let client = Arc::new(client);
                inner.install(Some(Arc::clone(&client)));
                inner.set_state(RconConnectionState::Connected);
                inner.emit(RconEvent::Connected);

                let ended = run_connected(&inner, &client, &mut server_state, &cancel).await;

                inner.install(None);
                client.disconnect().await;
                inner.clear_players();
                inner.set_state(RconConnectionState::Disconnected);

                match ended {
                    Ended::Cancelled => break,
                    Ended::ServerOffline => {
                        info!("Server left online state, RCON disconnected");
                        inner.emit(RconEvent::Disconnected {
                            reason: "server offline".to_string(),
                        });
                        continue;
                    }
                    Ended::Lost(reason) => {
                        warn!(reason = %reason, "RCON connection lost");
                        inner.emit(RconEvent::Disconnected { reason });
                    }
                }
            }
            Err(RconError::AuthFailed) => {
                inner.set_state(RconConnectionState::Error);
                inner.emit(RconEvent::AuthFailed);
                break;
            }
            Err(e) => {
                warn!(error = %e, address = %settings.address(), "RCON connect failed");
                inner.set_state(RconConnectionState::Error);
            }
        }

        if !settings.auto_reconnect {
            // Next connection only on a fresh online transition
            if !wait_for_state(&mut server_state, &cancel, |s| s != ProcessState::Online).await {
                break;
            }
            continue;
        }

        attempt += 1;
        let delay = settings.reconnect_delay();
        inner.emit(RconEvent::Reconnecting { attempt, delay });
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!("RCON session ended");
}

/// Wait until `pred` holds for the server state. `false` on cancel or when
/// the state sender is gone.
async fn wait_for_state(
    server_state: &mut watch::Receiver<ProcessState>,
    cancel: &CancellationToken,
    pred: impl Fn(ProcessState) -> bool,
) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        reached = async { server_state.wait_for(|s| pred(*s)).await.is_ok() } => reached,
    }
}

async fn run_connected(
    inner: &Inner,
    client: &RconClient,
    server_state: &mut watch::Receiver<ProcessState>,
    cancel: &CancellationToken,
) -> Ended {
    let mut connection = client.state_receiver();
    let mut poll = inner.settings.poll_interval().map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    // The first poll after connecting only records who is already there
    let mut baseline = true;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ended::Cancelled,
            changed = server_state.changed() => {
                if changed.is_err() {
                    return Ended::Cancelled;
                }
                if *server_state.borrow_and_update() != ProcessState::Online {
                    return Ended::ServerOffline;
                }
            }
            changed = connection.changed() => {
                let state = *connection.borrow_and_update();
                if changed.is_err() || state != RconConnectionState::Connected {
                    return Ended::Lost(format!("connection {state}"));
                }
            }
            () = next_tick(&mut poll) => {
                let polled = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Ended::Cancelled,
                    polled = client.players() => polled,
                };
                match polled {
                    Ok(current) => {
                        let (joined, left) = inner.update_players(current);
                        if baseline {
                            baseline = false;
                            continue;
                        }
                        for name in joined {
                            info!(player = %name, "Player joined");
                            inner.emit(RconEvent::PlayerJoined { name });
                        }
                        for name in left {
                            info!(player = %name, "Player left");
                            inner.emit(RconEvent::PlayerLeft { name });
                        }
                    }
                    Err(e) if e.is_connection_loss() => return Ended::Lost(e.to_string()),
                    Err(e) => debug!(error = %e, "Player poll failed"),
                }
            }
        }
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
