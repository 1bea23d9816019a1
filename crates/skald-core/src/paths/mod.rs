//! Filesystem locations for supervisor state.
//!
//! Everything lives under a single data root:
//!
//! ```text
//! <data_root>/
//! ├── server.json     # process handle record (single active server)
//! ├── settings.json   # application settings
//! └── logs/           # detached-mode server output, one file per day
//! ```

mod error;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "SKALD_DATA_DIR";

const APP_DIR_NAME: &str = "skald";

/// Root directory for all supervisor state.
///
/// Resolution order:
/// 1. `SKALD_DATA_DIR` environment variable
/// 2. System data directory (e.g., `~/.local/share/skald`)
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        let trimmed = dir.trim();
        if trimmed.is_empty() {
            return Err(PathError::EmptyPath);
        }
        return Ok(PathBuf::from(trimmed));
    }

    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(PathError::NoDataDir)
}

/// The process handle file. A process-wide singleton.
pub fn handle_file_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("server.json"))
}

/// Directory holding detached-mode server logs.
pub fn server_logs_dir() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("logs"))
}

/// Application settings file.
pub fn settings_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("settings.json"))
}

/// Create `path` (and parents) if missing.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_directory_creates_nested_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
        // Idempotent
        ensure_directory(&nested).unwrap();
    }

    #[test]
    fn files_live_under_data_root() {
        let root = data_root().unwrap();
        assert!(handle_file_path().unwrap().starts_with(&root));
        assert!(server_logs_dir().unwrap().ends_with("logs"));
    }
}
