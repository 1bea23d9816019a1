//! Restart policy around one game server process.
//!
//! The watchdog owns its [`GameServerProcess`] and is the only component
//! that drives it. Callers observe the process through the watchdog but
//! cannot mutate it directly.

use std::sync::Arc;
use std::time::Duration;

use skald_core::{LaunchConfig, ProcessHandleRecord, ProcessState, WatchdogPolicy};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::tracker::{RestartDecision, RestartTracker};
use crate::handle::HandleStore;
use crate::logs::LogBuffer;
use crate::process::{GameServerProcess, ProcessError, ProcessEvent, ProcessInfo};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Restart policy notifications.
///
/// `Restarting` means "will auto-retry"; `MaxRestartsExceeded` means the
/// operator has to step in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Raised before the restart delay starts.
    Restarting {
        attempt: u32,
        max_restarts: u32,
        delay: Duration,
    },
    Restarted {
        attempt: u32,
        pid: u32,
    },
    RestartFailed {
        attempt: u32,
        error: String,
    },
    /// Terminal: no further automatic restarts.
    MaxRestartsExceeded {
        crashes: u32,
        max_restarts: u32,
    },
}

/// Error from watchdog operations.
#[derive(Debug, thiserror::Error)]
pub enum WatchdogError {
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Armed crash monitor for the current run.
struct Monitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Crash-restart supervisor for one game server.
///
/// # Example
///
/// ```ignore
/// let watchdog = Watchdog::new(process, settings.watchdog.clone());
/// watchdog.start(settings.server.clone()).await?;
/// let mut notices = watchdog.subscribe();
/// watchdog.stop().await?;
/// ```
pub struct Watchdog {
    process: Arc<GameServerProcess>,
    policy: WatchdogPolicy,
    events: broadcast::Sender<WatchdogEvent>,
    monitor: Mutex<Option<Monitor>>,
}

impl Watchdog {
    pub fn new(process: GameServerProcess, policy: WatchdogPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            process: Arc::new(process),
            policy,
            events,
            monitor: Mutex::new(None),
        }
    }

    pub const fn policy(&self) -> &WatchdogPolicy {
        &self.policy
    }

    /// Restart policy notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchdogEvent> {
        self.events.subscribe()
    }

    /// Lifecycle, log and player notifications from the process.
    pub fn subscribe_process(&self) -> broadcast::Receiver<ProcessEvent> {
        self.process.subscribe()
    }

    pub fn state(&self) -> ProcessState {
        self.process.state()
    }

    pub fn state_receiver(&self) -> watch::Receiver<ProcessState> {
        self.process.state_receiver()
    }

    pub fn info(&self) -> ProcessInfo {
        self.process.info()
    }

    pub fn buffer(&self) -> Arc<LogBuffer> {
        self.process.buffer()
    }

    pub fn store(&self) -> &HandleStore {
        self.process.store()
    }

    /// Start the server and arm crash monitoring with a fresh crash count.
    ///
    /// A second start while a run is active is rejected.
    pub async fn start(&self, config: LaunchConfig) -> Result<u32, WatchdogError> {
        let mut monitor = self.monitor.lock().await;
        // Subscribe before starting so an early crash is not missed
        let state_rx = self.process.state_receiver();
        let pid = self.process.start(&config).await?;

        disarm(monitor.take()).await;
        *monitor = Some(self.arm(config, state_rx));
        info!(pid = %pid, enabled = self.policy.enabled, "Watchdog armed");
        Ok(pid)
    }

    /// Take over a running server and monitor it. Restarts after a crash
    /// use `config`.
    pub async fn attach(
        &self,
        record: ProcessHandleRecord,
        config: LaunchConfig,
    ) -> Result<(), WatchdogError> {
        let mut monitor = self.monitor.lock().await;
        let state_rx = self.process.state_receiver();
        self.process.attach(record).await?;

        disarm(monitor.take()).await;
        *monitor = Some(self.arm(config, state_rx));
        Ok(())
    }

    /// Disarm restarts, then stop the server gracefully.
    pub async fn stop(&self) -> Result<(), WatchdogError> {
        disarm(self.monitor.lock().await.take()).await;
        self.process.stop().await?;
        Ok(())
    }

    /// Disarm restarts, then kill the server.
    pub async fn kill(&self) -> Result<(), WatchdogError> {
        disarm(self.monitor.lock().await.take()).await;
        self.process.kill().await?;
        Ok(())
    }

    /// Disarm restarts and leave the server running.
    pub async fn detach(&self) -> Result<(), WatchdogError> {
        disarm(self.monitor.lock().await.take()).await;
        self.process.detach().await?;
        Ok(())
    }

    fn arm(&self, config: LaunchConfig, state_rx: watch::Receiver<ProcessState>) -> Monitor {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(monitor_crashes(
            Arc::clone(&self.process),
            self.policy.clone(),
            config,
            state_rx,
            self.events.clone(),
            cancel.clone(),
        ));
        Monitor { cancel, task }
    }
}

async fn disarm(monitor: Option<Monitor>) {
    let Some(monitor) = monitor else {
        return;
    };
    monitor.cancel.cancel();
    if let Err(e) = monitor.task.await {
        warn!(error = %e, "Watchdog monitor task failed");
    }
    debug!("Watchdog disarmed");
}

async fn monitor_crashes(
    process: Arc<GameServerProcess>,
    policy: WatchdogPolicy,
    config: LaunchConfig,
    mut state_rx: watch::Receiver<ProcessState>,
    events: broadcast::Sender<WatchdogEvent>,
    cancel: CancellationToken,
) {
    let mut tracker = RestartTracker::default();

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }

        if *state_rx.borrow_and_update() != ProcessState::Crashed {
            continue;
        }
        if !policy.enabled {
            info!("Game server crashed; automatic restart is disabled");
            continue;
        }

        // Keep retrying until a start succeeds, the policy gives up, or we
        // are disarmed. A failed start counts as another crash.
        loop {
            let (attempt, delay) = match tracker.record_crash(Instant::now(), &policy) {
                RestartDecision::Restart { attempt, delay } => (attempt, delay),
                RestartDecision::GiveUp { crashes } => {
                    error!(crashes = %crashes, max_restarts = %policy.max_restarts, "Max restarts exceeded; giving up");
                    let _ = events.send(WatchdogEvent::MaxRestartsExceeded {
                        crashes,
                        max_restarts: policy.max_restarts,
                    });
                    return;
                }
            };

            warn!(attempt = %attempt, max_restarts = %policy.max_restarts, delay_ms = %delay.as_millis(), "Restarting crashed game server");
            let _ = events.send(WatchdogEvent::Restarting {
                attempt,
                max_restarts: policy.max_restarts,
                delay,
            });

            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            match process.start(&config).await {
                Ok(pid) => {
                    info!(attempt = %attempt, pid = %pid, "Game server restarted");
                    let _ = events.send(WatchdogEvent::Restarted { attempt, pid });
                    break;
                }
                Err(e) => {
                    error!(attempt = %attempt, error = %e, "Restart failed");
                    let _ = events.send(WatchdogEvent::RestartFailed {
                        attempt,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}
