//! CLI bootstrap - the composition root.
//!
//! Settings, paths, the handle store and the OS probe are resolved here.
//! Handlers receive the composed [`CliContext`] and never resolve paths
//! themselves.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use skald_core::{
    ProcessProbe, Settings, data_root, handle_file_path, load_settings, server_logs_dir,
    settings_path,
};
use skald_runtime::{
    GameServerProcess, HandleStore, ProcessOptions, SERVER_BINARY_NAME, SystemProbe, Watchdog,
};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Executable override from the command line or environment.
    pub executable: Option<PathBuf>,
}

/// Resolved state shared by all command handlers.
pub struct CliContext {
    settings: Settings,
    settings_path: PathBuf,
    data_root: PathBuf,
    handle_path: PathBuf,
    logs_dir: PathBuf,
    executable: PathBuf,
    probe: Arc<SystemProbe>,
}

/// Load settings and resolve paths.
pub fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let root = data_root()?;
    let settings_path = settings_path()?;
    let settings = load_settings(&settings_path)?;
    let executable = resolve_executable(config.executable, &settings, &root);

    Ok(CliContext {
        settings,
        settings_path,
        data_root: root,
        handle_path: handle_file_path()?,
        logs_dir: server_logs_dir()?,
        executable,
        probe: Arc::new(SystemProbe::default()),
    })
}

/// Command line, then settings, then `<data root>/server/<binary>`.
fn resolve_executable(cli: Option<PathBuf>, settings: &Settings, root: &Path) -> PathBuf {
    cli.or_else(|| settings.server_executable.clone())
        .unwrap_or_else(|| root.join("server").join(SERVER_BINARY_NAME))
}

impl CliContext {
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn store(&self) -> HandleStore {
        HandleStore::new(self.handle_path.clone())
    }

    pub fn probe(&self) -> &dyn ProcessProbe {
        self.probe.as_ref()
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.stop_timeout_secs)
    }

    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions::new(&self.executable, &self.logs_dir)
            .with_stop_timeout(self.stop_timeout())
            .with_buffer_capacity(self.settings.log_buffer_capacity)
            .with_log_retention(self.settings.log_retention)
    }

    /// Compose a watchdog around a fresh process wrapper.
    pub fn watchdog(&self, restarts_enabled: bool) -> Result<Watchdog> {
        if !self.executable.is_file() {
            bail!(
                "Server executable not found at {}\n\nSet serverExecutable in {} or pass --executable",
                self.executable.display(),
                self.settings_path.display()
            );
        }

        let process = GameServerProcess::new(
            self.process_options(),
            self.store(),
            Arc::clone(&self.probe) as Arc<dyn ProcessProbe>,
        );
        let mut policy = self.settings.watchdog.clone();
        policy.enabled = policy.enabled && restarts_enabled;
        Ok(Watchdog::new(process, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_prefers_command_line() {
        let mut settings = Settings::with_defaults();
        settings.server_executable = Some(PathBuf::from("/opt/from-settings"));
        let root = Path::new("/data");

        assert_eq!(
            resolve_executable(Some(PathBuf::from("/opt/from-cli")), &settings, root),
            PathBuf::from("/opt/from-cli")
        );
        assert_eq!(
            resolve_executable(None, &settings, root),
            PathBuf::from("/opt/from-settings")
        );
    }

    #[test]
    fn executable_defaults_under_data_root() {
        let settings = Settings::with_defaults();
        let resolved = resolve_executable(None, &settings, Path::new("/data"));
        assert_eq!(resolved, Path::new("/data/server").join(SERVER_BINARY_NAME));
    }
}
