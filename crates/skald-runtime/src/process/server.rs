//! The supervised game server: one OS process, one state machine.
//!
//! A run is driven by a single task that owns the line source, the exit
//! wait and the stop/detach signals, so lines and the events derived from
//! them are published in exactly the order the server printed them.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use skald_core::{
    LaunchConfig, ProcessHandleRecord, ProcessProbe, ProcessState, ServerEvent, StartupPhase,
    parse_event,
};
use tokio::process::Child;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::command::{ProcessOptions, build_command};
use super::error::ProcessError;
use super::events::{ProcessEvent, ProcessInfo};
use super::logfile::{log_file_path, prune_log_files};
use super::shutdown::{kill_pid, shutdown_child};
use super::stream::{spawn_file_tail, spawn_stream_reader};
use crate::handle::HandleStore;
use crate::logs::LogBuffer;

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const LINE_CHANNEL_CAPACITY: usize = 1024;

/// Upper bound for reading the tail of the output after the process exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopKind {
    Graceful,
    Force,
}

/// Where the run's output goes and what we hold on the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    /// Spawned by us, output piped. Dies with the supervisor.
    Piped,
    /// Spawned by us, output to a log file. Survives the supervisor.
    Detached,
    /// Not our child: started by an earlier supervisor instance.
    External,
}

#[derive(Debug, Default)]
struct Status {
    phase: StartupPhase,
    players: BTreeSet<String>,
    record: Option<ProcessHandleRecord>,
    pid: Option<u32>,
    started_at: Option<DateTime<Utc>>,
    stop: Option<StopKind>,
}

struct Shared {
    options: ProcessOptions,
    state: watch::Sender<ProcessState>,
    events: broadcast::Sender<ProcessEvent>,
    buffer: Arc<LogBuffer>,
    status: Mutex<Status>,
    store: HandleStore,
    probe: Arc<dyn ProcessProbe>,
}

/// Control side of an active run.
struct RunHandle {
    pid: u32,
    mode: RunMode,
    stop: CancellationToken,
    detach: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for RunHandle {
    // Owner gone: stop following. A piped child is killed on drop, a
    // detached or external server keeps running.
    fn drop(&mut self) {
        self.detach.cancel();
    }
}

/// Channels feeding the run task.
struct RunIo {
    lines: mpsc::Receiver<String>,
    tail: Option<CancellationToken>,
    stop: CancellationToken,
    detach: CancellationToken,
}

enum Outcome {
    Exited(Option<i32>),
    Detached,
}

/// Wrapper around one dedicated server process.
///
/// Lifecycle: `offline → starting → online → stopping → offline`, with
/// `crashed` on any exit nobody asked for. `online` is only entered on the
/// server's own readiness line, never on OS liveness alone.
pub struct GameServerProcess {
    shared: Arc<Shared>,
    control: tokio::sync::Mutex<Option<RunHandle>>,
}

impl GameServerProcess {
    pub fn new(options: ProcessOptions, store: HandleStore, probe: Arc<dyn ProcessProbe>) -> Self {
        let (state, _) = watch::channel(ProcessState::Offline);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let buffer = Arc::new(LogBuffer::new(options.buffer_capacity));
        Self {
            shared: Arc::new(Shared {
                options,
                state,
                events,
                buffer,
                status: Mutex::new(Status::default()),
                store,
                probe,
            }),
            control: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> ProcessState {
        *self.shared.state.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<ProcessState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.shared.events.subscribe()
    }

    pub fn buffer(&self) -> Arc<LogBuffer> {
        Arc::clone(&self.shared.buffer)
    }

    pub fn store(&self) -> &HandleStore {
        &self.shared.store
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.shared.options
    }

    pub fn info(&self) -> ProcessInfo {
        let status = self.shared.lock_status();
        ProcessInfo {
            state: self.state(),
            phase: status.phase,
            pid: status.pid,
            started_at: status.started_at,
            record: status.record.clone(),
            players: status.players.iter().cloned().collect(),
        }
    }

    /// Launch the server. Returns the PID.
    ///
    /// Rejected while a run is active or while another server is found
    /// running on this host (live handle record or orphan process).
    pub async fn start(&self, config: &LaunchConfig) -> Result<u32, ProcessError> {
        let mut control = self.control.lock().await;
        if let Some(run) = control.as_ref().filter(|run| !run.task.is_finished()) {
            return Err(ProcessError::AlreadyRunning { pid: run.pid });
        }

        if let Some(record) = self
            .shared
            .store
            .resolve_running_server(self.shared.probe.as_ref())
        {
            warn!(pid = %record.pid, "Refusing to start: a game server is already running");
            return Err(ProcessError::AlreadyRunning { pid: record.pid });
        }

        self.shared.reset_status(Utc::now());
        self.shared.transition(ProcessState::Starting);

        match self.spawn_run(config) {
            Ok(run) => {
                let pid = run.pid;
                *control = Some(run);
                Ok(pid)
            }
            Err(e) => {
                error!(error = %e, "Failed to start game server");
                self.shared.emit(ProcessEvent::Fatal {
                    message: e.to_string(),
                });
                self.shared.lock_status().started_at = None;
                self.shared.transition(ProcessState::Offline);
                Err(e)
            }
        }
    }

    fn spawn_run(&self, config: &LaunchConfig) -> Result<RunHandle, ProcessError> {
        let options = &self.shared.options;
        let mut cmd = build_command(options, config);
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);

        let detached_log = if config.detached {
            Some(self.open_detached_log(&mut cmd)?)
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
            None
        };

        let mut child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
            path: options.program().to_path_buf(),
            source,
        })?;
        let pid = child.id().ok_or(ProcessError::NoPid)?;

        let (mode, tail) = match detached_log {
            Some((path, offset)) => {
                let record = ProcessHandleRecord::new(pid, &config.world, config.port)
                    .with_log_file(&path)
                    .with_detached(true)
                    .with_server_name(&config.name);
                if let Err(e) = self.shared.store.write(&record) {
                    warn!(pid = %pid, error = %e, "Failed to write handle record");
                }
                self.shared.lock_status().record = Some(record);

                let cancel = CancellationToken::new();
                spawn_file_tail(path, offset, options.tail_interval, tx, cancel.clone());
                (RunMode::Detached, Some(cancel))
            }
            None => {
                if let Some(stdout) = child.stdout.take() {
                    spawn_stream_reader(stdout, "stdout", tx.clone());
                }
                if let Some(stderr) = child.stderr.take() {
                    spawn_stream_reader(stderr, "stderr", tx);
                }
                (RunMode::Piped, None)
            }
        };

        self.shared.lock_status().pid = Some(pid);
        info!(pid = %pid, world = %config.world, port = %config.port, detached = config.detached, "Game server spawned");

        let stop = CancellationToken::new();
        let detach = CancellationToken::new();
        let io = RunIo {
            lines: rx,
            tail,
            stop: stop.clone(),
            detach: detach.clone(),
        };
        let task = tokio::spawn(supervise_child(Arc::clone(&self.shared), child, io));

        Ok(RunHandle {
            pid,
            mode,
            stop,
            detach,
            task,
        })
    }

    /// Point stdout/stderr at today's log file. Returns the file and the
    /// offset where this run's output begins.
    fn open_detached_log(
        &self,
        cmd: &mut tokio::process::Command,
    ) -> Result<(std::path::PathBuf, u64), ProcessError> {
        let options = &self.shared.options;
        let dir = &options.log_dir;
        let path = log_file_path(dir, &options.log_prefix, chrono::Local::now().date_naive());
        let log_err = |source| ProcessError::LogFile {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(log_err)?;
        if let Err(e) = prune_log_files(dir, &options.log_prefix, options.log_retention.max(1)) {
            warn!(dir = %dir.display(), error = %e, "Failed to prune server logs");
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(log_err)?;
        let offset = file.metadata().map_err(log_err)?.len();
        let stderr = file.try_clone().map_err(log_err)?;

        cmd.stdout(Stdio::from(file)).stderr(Stdio::from(stderr));
        cmd.kill_on_drop(false);
        #[cfg(unix)]
        cmd.process_group(0);

        Ok((path, offset))
    }

    /// Reattach to a server started by an earlier supervisor instance.
    ///
    /// Existing output in the record's log file is replayed to rebuild the
    /// startup phase and player roster; new lines are then followed. A live
    /// server without a log file is assumed online.
    pub async fn attach(&self, record: ProcessHandleRecord) -> Result<(), ProcessError> {
        let mut control = self.control.lock().await;
        if let Some(run) = control.as_ref().filter(|run| !run.task.is_finished()) {
            return Err(ProcessError::AlreadyRunning { pid: run.pid });
        }

        let pid = record.pid;
        if !self.shared.probe.is_alive(pid) {
            if let Err(e) = self.shared.store.delete() {
                warn!(error = %e, "Failed to remove stale handle record");
            }
            return Err(ProcessError::NotAlive(pid));
        }

        self.shared.reset_status(record.started_at);
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let mut tail = None;
        let mut ready = true;

        if let Some(path) = record.log_file.clone() {
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    // A half-written last line is left for the tail to finish.
                    let complete = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
                    let offset = complete as u64;
                    ready = self
                        .shared
                        .replay(&String::from_utf8_lossy(&bytes[..complete]));
                    let cancel = CancellationToken::new();
                    spawn_file_tail(
                        path,
                        offset,
                        self.shared.options.tail_interval,
                        tx,
                        cancel.clone(),
                    );
                    tail = Some(cancel);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read server log, assuming online");
                }
            }
        }

        {
            let mut status = self.shared.lock_status();
            status.pid = Some(pid);
            status.record = Some(record);
        }
        self.shared.transition(if ready {
            ProcessState::Online
        } else {
            ProcessState::Starting
        });
        info!(pid = %pid, "Attached to running game server");

        let stop = CancellationToken::new();
        let detach = CancellationToken::new();
        let io = RunIo {
            lines: rx,
            tail,
            stop: stop.clone(),
            detach: detach.clone(),
        };
        let task = tokio::spawn(supervise_external(Arc::clone(&self.shared), pid, io));

        *control = Some(RunHandle {
            pid,
            mode: RunMode::External,
            stop,
            detach,
            task,
        });
        Ok(())
    }

    /// Stop following the server without terminating it.
    ///
    /// The handle record stays on disk so a later instance can reattach.
    /// A piped server cannot outlive its pipes and is rejected.
    pub async fn detach(&self) -> Result<(), ProcessError> {
        let mut control = self.control.lock().await;
        let Some(run) = control.as_mut().filter(|run| !run.task.is_finished()) else {
            return Err(ProcessError::NotRunning);
        };
        if run.mode == RunMode::Piped {
            return Err(ProcessError::NotDetachable);
        }

        run.detach.cancel();
        if let Err(e) = (&mut run.task).await {
            warn!(error = %e, "Run task failed while detaching");
        }
        *control = None;
        Ok(())
    }

    /// Terminate gracefully, killing after the configured grace period.
    pub async fn stop(&self) -> Result<(), ProcessError> {
        self.shutdown(StopKind::Graceful).await
    }

    /// Kill immediately.
    pub async fn kill(&self) -> Result<(), ProcessError> {
        self.shutdown(StopKind::Force).await
    }

    async fn shutdown(&self, kind: StopKind) -> Result<(), ProcessError> {
        let mut control = self.control.lock().await;
        let Some(run) = control.as_mut().filter(|run| !run.task.is_finished()) else {
            // Nothing to stop; acknowledge a crash so the next start is clean
            if self.state() == ProcessState::Crashed {
                self.shared.transition(ProcessState::Offline);
            }
            debug!("Stop requested but no game server is running");
            return Ok(());
        };

        info!(pid = %run.pid, ?kind, "Stopping game server");
        self.shared.lock_status().stop = Some(kind);
        run.stop.cancel();

        if let Err(e) = (&mut run.task).await {
            warn!(error = %e, "Run task failed while stopping");
        }
        *control = None;
        Ok(())
    }
}

impl Shared {
    fn lock_status(&self) -> std::sync::MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reset_status(&self, started_at: DateTime<Utc>) {
        *self.lock_status() = Status {
            started_at: Some(started_at),
            ..Status::default()
        };
    }

    fn emit(&self, event: ProcessEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn stop_requested(&self) -> Option<StopKind> {
        self.lock_status().stop
    }

    /// Apply a state transition if the state machine allows it.
    fn transition(&self, to: ProcessState) -> bool {
        let mut from = None;
        self.state.send_if_modified(|state| {
            if *state == to {
                return false;
            }
            if !state.can_transition_to(to) {
                warn!(from = %state, to = %to, "Ignoring invalid state transition");
                return false;
            }
            from = Some(*state);
            *state = to;
            true
        });

        let Some(from) = from else {
            return false;
        };
        info!(from = %from, to = %to, "Game server state changed");
        self.emit(ProcessEvent::StateChanged { from, to });
        true
    }

    fn handle_line(&self, line: &str) {
        debug!(target: "skald::server", "{line}");
        let (entry, event) = self.buffer.add(line);
        self.emit(ProcessEvent::Log(entry));
        if let Some(event) = event {
            self.apply_event(event);
        }
    }

    fn apply_event(&self, event: ServerEvent) {
        let mut follow_up = None;
        {
            let mut status = self.lock_status();
            match &event {
                ServerEvent::StartupPhase { phase } => status.phase = *phase,
                ServerEvent::ServerReady => status.phase = StartupPhase::Ready,
                ServerEvent::PlayerJoin { name } => {
                    if status.players.insert(name.clone()) {
                        follow_up = Some(ProcessEvent::PlayerJoined { name: name.clone() });
                    }
                }
                ServerEvent::PlayerLeave { name } => {
                    if status.players.remove(name) {
                        follow_up = Some(ProcessEvent::PlayerLeft { name: name.clone() });
                    }
                }
                _ => {}
            }
        }

        let ready = event == ServerEvent::ServerReady;
        self.emit(ProcessEvent::Server(event));
        if let Some(follow_up) = follow_up {
            self.emit(follow_up);
        }
        if ready && *self.state.borrow() == ProcessState::Starting {
            self.transition(ProcessState::Online);
        }
    }

    /// Rebuild phase and roster from existing output. Returns whether the
    /// server had already reported ready.
    fn replay(&self, content: &str) -> bool {
        let mut ready = false;
        for line in content.lines() {
            self.buffer.add(line);
            let Some(event) = parse_event(line) else {
                continue;
            };

            let mut status = self.lock_status();
            match event {
                ServerEvent::StartupPhase { phase } => status.phase = phase,
                ServerEvent::ServerReady => {
                    status.phase = StartupPhase::Ready;
                    ready = true;
                }
                ServerEvent::PlayerJoin { name } => {
                    status.players.insert(name);
                }
                ServerEvent::PlayerLeave { name } => {
                    status.players.remove(&name);
                }
                // A previous run in the same daily file quit; what follows is a new boot
                ServerEvent::ServerShutdown => {
                    status.phase = StartupPhase::Idle;
                    status.players.clear();
                    ready = false;
                }
                _ => {}
            }
        }
        ready
    }

    /// Read whatever output is still in flight after the process is gone.
    async fn drain(&self, io: &mut RunIo) {
        if let Some(tail) = &io.tail {
            tail.cancel();
        }
        let drain = async {
            while let Some(line) = io.lines.recv().await {
                self.handle_line(&line);
            }
        };
        if timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            debug!("Output still open after exit; stopped draining");
        }
    }

    async fn finish(&self, outcome: Outcome, io: &mut RunIo) {
        match outcome {
            Outcome::Detached => {
                if let Some(tail) = &io.tail {
                    tail.cancel();
                }
                {
                    let mut status = self.lock_status();
                    status.pid = None;
                    status.started_at = None;
                }
                info!("Detached from game server; it keeps running");
                self.transition(ProcessState::Offline);
            }
            Outcome::Exited(code) => {
                self.drain(io).await;

                let had_record = {
                    let mut status = self.lock_status();
                    status.pid = None;
                    status.started_at = None;
                    status.record.take().is_some()
                };
                if had_record {
                    if let Err(e) = self.store.delete() {
                        warn!(error = %e, "Failed to delete handle record");
                    }
                }

                self.emit(ProcessEvent::Exited { code });
                if self.stop_requested().is_some() {
                    info!(?code, "Game server stopped");
                    self.transition(ProcessState::Offline);
                } else {
                    let message = code.map_or_else(
                        || "Game server exited unexpectedly".to_string(),
                        |code| format!("Game server exited unexpectedly with code {code}"),
                    );
                    error!(?code, "Game server crashed");
                    self.emit(ProcessEvent::Fatal { message });
                    self.transition(ProcessState::Crashed);
                }
            }
        }
    }
}

async fn supervise_child(shared: Arc<Shared>, mut child: Child, mut io: RunIo) {
    let outcome = loop {
        tokio::select! {
            biased;
            Some(line) = io.lines.recv() => shared.handle_line(&line),
            status = child.wait() => {
                break Outcome::Exited(status.ok().and_then(|s| s.code()));
            }
            () = io.stop.cancelled() => {
                shared.transition(ProcessState::Stopping);
                let force = shared.stop_requested() == Some(StopKind::Force);
                let grace = shared.options.stop_timeout;

                let status = {
                    let shutdown = shutdown_child(&mut child, grace, force);
                    tokio::pin!(shutdown);
                    loop {
                        tokio::select! {
                            biased;
                            Some(line) = io.lines.recv() => shared.handle_line(&line),
                            result = &mut shutdown => break result,
                        }
                    }
                };
                match status {
                    Ok(status) => break Outcome::Exited(status.code()),
                    Err(e) => {
                        warn!(error = %e, "Shutdown failed; waiting for exit");
                        break Outcome::Exited(child.wait().await.ok().and_then(|s| s.code()));
                    }
                }
            }
            () = io.detach.cancelled() => break Outcome::Detached,
        }
    };

    shared.finish(outcome, &mut io).await;
}

async fn supervise_external(shared: Arc<Shared>, pid: u32, mut io: RunIo) {
    let mut liveness = interval(shared.options.liveness_interval);
    liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let outcome = loop {
        tokio::select! {
            biased;
            Some(line) = io.lines.recv() => shared.handle_line(&line),
            _ = liveness.tick() => {
                if !shared.probe.is_alive(pid) {
                    break Outcome::Exited(None);
                }
            }
            () = io.stop.cancelled() => {
                shared.transition(ProcessState::Stopping);
                let force = shared.stop_requested() == Some(StopKind::Force);
                let grace = shared.options.stop_timeout;

                let kill = kill_pid(shared.probe.as_ref(), pid, grace, force);
                tokio::pin!(kill);
                let result = loop {
                    tokio::select! {
                        biased;
                        Some(line) = io.lines.recv() => shared.handle_line(&line),
                        result = &mut kill => break result,
                    }
                };
                if let Err(e) = result {
                    warn!(pid = %pid, error = %e, "Failed to kill external game server");
                }
                break Outcome::Exited(None);
            }
            () = io.detach.cancelled() => break Outcome::Detached,
        }
    };

    shared.finish(outcome, &mut io).await;
}
