//! Atomic handle record I/O.
//!
//! Format: a single JSON document (see [`ProcessHandleRecord`]).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use skald_core::{HandleValidationError, PathError, ProcessHandleRecord, handle_file_path};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from handle record persistence.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("Handle file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Refusing to persist invalid handle record: {0}")]
    Invalid(#[from] HandleValidationError),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Persistent store for the single active server's handle record.
#[derive(Debug, Clone)]
pub struct HandleStore {
    path: PathBuf,
}

impl HandleStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the canonical location under the data root.
    pub fn at_default_location() -> Result<Self, HandleError> {
        Ok(Self::new(handle_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and persist a record atomically.
    ///
    /// # Atomicity
    /// 1. Write to `<file>.<our pid>.tmp`
    /// 2. Rename over `<file>` (atomic on the same filesystem)
    pub fn write(&self, record: &ProcessHandleRecord) -> Result<(), HandleError> {
        record.validate()?;
        let content = record.to_json()?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, content).map_err(|e| self.io_error(e))?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(e));
        }

        debug!(pid = %record.pid, path = %self.path.display(), "Wrote handle record");
        Ok(())
    }

    /// Read and validate the record.
    ///
    /// Returns `None` when there is no file. A record that fails validation
    /// is deleted and reported as absent.
    pub fn read(&self) -> Option<ProcessHandleRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read handle record, treating as absent");
                return None;
            }
        };

        match ProcessHandleRecord::from_json(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding invalid handle record");
                if let Err(e) = self.delete() {
                    warn!(error = %e, "Failed to delete invalid handle record");
                }
                None
            }
        }
    }

    /// Delete the record (idempotent - no error if missing).
    pub fn delete(&self) -> Result<(), HandleError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Deleted handle record");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "handle".into(), |n| n.to_string_lossy().into_owned());
        self.path
            .with_file_name(format!("{name}.{}.tmp", std::process::id()))
    }

    fn io_error(&self, source: io::Error) -> HandleError {
        HandleError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
