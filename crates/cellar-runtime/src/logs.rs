//! Container log management.
//!
//! Detached containers write their stdout to `<state_dir>/<name>/container.log`.

use std::fs::File;
use std::path::{Path, PathBuf};

use cellar_common::config::RuntimeConfig;
use cellar_common::constants::LOG_FILE;
use cellar_common::error::{CellarError, Result};
use cellar_common::types::validate_container_name;

/// Provides the stdout sink for detached containers.
pub trait LogProvider {
    /// Opens a fresh, writable log file for the container called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn open_log_file(&self, name: &str) -> Result<File>;
}

/// [`LogProvider`] that keeps logs beside the container records.
#[derive(Debug, Clone)]
pub struct FileLogProvider {
    state_dir: PathBuf,
}

impl FileLogProvider {
    /// Creates a provider storing logs under `state_dir`.
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Creates a provider from the runtime configuration.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.state_dir.clone())
    }

    /// Returns the log file path for a container.
    ///
    /// # Errors
    ///
    /// Returns `CellarError::Config` if `name` is not a valid container name.
    pub fn log_path(&self, name: &str) -> Result<PathBuf> {
        log_path(&self.state_dir, name)
    }

    /// Reads container logs from disk.
    ///
    /// Returns an empty string if the log file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid or the file exists but cannot be
    /// read.
    pub fn read_logs(&self, name: &str) -> Result<String> {
        let path = self.log_path(name)?;
        if !path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&path).map_err(|e| CellarError::Io { path, source: e })
    }
}

impl LogProvider for FileLogProvider {
    fn open_log_file(&self, name: &str) -> Result<File> {
        let path = self.log_path(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CellarError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = File::create(&path).map_err(|e| CellarError::Io {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "log file opened");
        Ok(file)
    }
}

/// Returns the log file path for a container under `state_dir`.
///
/// # Errors
///
/// Returns `CellarError::Config` if `name` is not a valid container name.
pub fn log_path(state_dir: &Path, name: &str) -> Result<PathBuf> {
    validate_container_name(name)?;
    Ok(state_dir.join(name).join(LOG_FILE))
}
