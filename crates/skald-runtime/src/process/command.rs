//! Launch options and command construction for the dedicated server.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use skald_core::LaunchConfig;
use skald_core::settings::{
    DEFAULT_LOG_BUFFER_CAPACITY, DEFAULT_LOG_RETENTION, DEFAULT_STOP_TIMEOUT_SECS,
};
use tokio::process::Command;

/// Steam application id of the dedicated server.
pub const STEAM_APP_ID: &str = "892970";

/// How the supervisor runs the server binary and handles its output.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Dedicated server binary.
    pub executable: PathBuf,
    /// Optional program that runs `executable` (e.g. a compatibility shim).
    pub launcher: Option<PathBuf>,
    /// Defaults to the executable's directory.
    pub working_dir: Option<PathBuf>,
    /// Directory for detached-mode log files.
    pub log_dir: PathBuf,
    pub log_prefix: String,
    /// Daily detached log files kept on disk.
    pub log_retention: usize,
    /// Grace period between terminate and kill on `stop()`.
    pub stop_timeout: Duration,
    pub buffer_capacity: usize,
    /// How often an external (attached) server is probed for liveness.
    pub liveness_interval: Duration,
    /// How often a detached log file is polled for new lines.
    pub tail_interval: Duration,
}

impl ProcessOptions {
    pub fn new(executable: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            launcher: None,
            working_dir: None,
            log_dir: log_dir.into(),
            log_prefix: "valheim".to_string(),
            log_retention: DEFAULT_LOG_RETENTION,
            stop_timeout: Duration::from_secs(DEFAULT_STOP_TIMEOUT_SECS),
            buffer_capacity: DEFAULT_LOG_BUFFER_CAPACITY,
            liveness_interval: Duration::from_secs(2),
            tail_interval: Duration::from_millis(250),
        }
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: impl Into<PathBuf>) -> Self {
        self.launcher = Some(launcher.into());
        self
    }

    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_tail_interval(mut self, interval: Duration) -> Self {
        self.tail_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn with_log_retention(mut self, keep: usize) -> Self {
        self.log_retention = keep;
        self
    }

    fn executable_dir(&self) -> Option<&Path> {
        self.executable.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// The program actually spawned (the launcher when configured).
    pub fn program(&self) -> &Path {
        self.launcher.as_deref().unwrap_or(&self.executable)
    }
}

/// Build the server command. Stdio is configured by the caller.
pub(crate) fn build_command(options: &ProcessOptions, config: &LaunchConfig) -> Command {
    let mut cmd = Command::new(options.program());
    if options.launcher.is_some() {
        cmd.arg(&options.executable);
    }
    cmd.args(config.to_args());

    if let Some(dir) = options.working_dir.as_deref().or_else(|| options.executable_dir()) {
        cmd.current_dir(dir);
    }

    cmd.env("SteamAppId", STEAM_APP_ID);
    if cfg!(target_os = "linux") {
        if let Some(dir) = options.executable_dir() {
            cmd.env("LD_LIBRARY_PATH", library_path(dir));
        }
    }

    cmd.stdin(Stdio::null());
    cmd
}

/// `<dir>/linux64` prepended to the inherited `LD_LIBRARY_PATH`.
fn library_path(executable_dir: &Path) -> OsString {
    let mut value = executable_dir.join("linux64").into_os_string();
    if let Some(existing) = std::env::var_os("LD_LIBRARY_PATH").filter(|v| !v.is_empty()) {
        value.push(":");
        value.push(existing);
    }
    value
}
