//! Launch configuration for the dedicated server binary.

use serde::{Deserialize, Serialize};

/// Default UDP port the dedicated server listens on.
pub const DEFAULT_GAME_PORT: u16 = 2456;

/// How to launch one game server run.
///
/// This is an intent-based configuration; `to_args` renders it into the
/// argument vector the dedicated server binary understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Server name shown in the server browser.
    pub name: String,
    /// Game port. The server also binds `port + 1` for queries.
    pub port: u16,
    /// World (save) name.
    pub world: String,
    /// Join password.
    pub password: String,
    /// List the server in the public browser.
    pub public: bool,
    /// Enable crossplay (PlayFab relay).
    pub crossplay: bool,
    /// Autosave interval in seconds.
    pub save_interval_sec: u32,
    /// Number of rolling world backups to keep.
    pub backup_count: u32,
    /// Redirect output to a log file so the server outlives the supervisor.
    pub detached: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            name: "My Server".to_string(),
            port: DEFAULT_GAME_PORT,
            world: "Dedicated".to_string(),
            password: String::new(),
            public: false,
            crossplay: false,
            save_interval_sec: 1800,
            backup_count: 4,
            detached: false,
        }
    }
}

impl LaunchConfig {
    /// Create a configuration with the given identity and defaults elsewhere.
    pub fn new(name: impl Into<String>, world: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            world: world.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Set the game port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Run the server detached from the supervisor.
    #[must_use]
    pub const fn with_detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    /// Render the dedicated server command line.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-nographics".to_string(),
            "-batchmode".to_string(),
            "-name".to_string(),
            self.name.clone(),
            "-port".to_string(),
            self.port.to_string(),
            "-world".to_string(),
            self.world.clone(),
            "-password".to_string(),
            self.password.clone(),
            "-public".to_string(),
            if self.public { "1" } else { "0" }.to_string(),
        ];

        if self.crossplay {
            args.push("-crossplay".to_string());
        }

        args.push("-saveinterval".to_string());
        args.push(self.save_interval_sec.to_string());
        args.push("-backups".to_string());
        args.push(self.backup_count.to_string());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_include_identity_and_flags() {
        let config = LaunchConfig::new("Midgard", "Yggdrasil", "secret1").with_port(2500);
        let args = config.to_args();

        let pos = args.iter().position(|a| a == "-world").unwrap();
        assert_eq!(args[pos + 1], "Yggdrasil");
        let pos = args.iter().position(|a| a == "-port").unwrap();
        assert_eq!(args[pos + 1], "2500");
        let pos = args.iter().position(|a| a == "-public").unwrap();
        assert_eq!(args[pos + 1], "0");
        assert!(!args.contains(&"-crossplay".to_string()));
    }

    #[test]
    fn crossplay_flag_is_appended_when_enabled() {
        let config = LaunchConfig {
            crossplay: true,
            public: true,
            ..LaunchConfig::default()
        };
        let args = config.to_args();
        assert!(args.contains(&"-crossplay".to_string()));
        let pos = args.iter().position(|a| a == "-public").unwrap();
        assert_eq!(args[pos + 1], "1");
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let json = r#"{"name":"Srv","world":"W","saveIntervalSec":600}"#;
        let config: LaunchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.save_interval_sec, 600);
        assert_eq!(config.port, DEFAULT_GAME_PORT);
        assert!(!config.detached);
    }
}
