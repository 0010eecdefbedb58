//! Persistent container records.
//!
//! Each container gets a directory `<state_dir>/<name>/` holding a JSON
//! record, enabling daemon-less listing of launched containers.

use std::path::{Path, PathBuf};

use cellar_common::config::RuntimeConfig;
use cellar_common::constants::RECORD_FILE;
use cellar_common::error::{CellarError, Result};
use cellar_common::types::{ContainerId, ContainerState, validate_container_name};
use serde::{Deserialize, Serialize};

/// Persists and removes container metadata.
pub trait LifecycleRecorder {
    /// Records a launched container.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    fn record(&self, pid: u32, name: &str, id: &ContainerId, command: &str) -> Result<()>;

    /// Removes the record of the container called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be removed.
    fn remove(&self, name: &str) -> Result<()>;
}

/// Persistent record of a launched container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// PID of the init process in the host PID namespace.
    pub pid: u32,
    /// Container identifier.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
    /// Command handed to the init process.
    pub command: String,
    /// Lifecycle state at the time of recording.
    pub status: ContainerState,
    /// RFC 3339 timestamp of creation.
    pub created_at: String,
}

/// [`LifecycleRecorder`] writing `<state_dir>/<name>/config.json`.
#[derive(Debug, Clone)]
pub struct JsonStateRecorder {
    state_dir: PathBuf,
}

impl JsonStateRecorder {
    /// Creates a recorder storing records under `state_dir`.
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Creates a recorder from the runtime configuration.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.state_dir.clone())
    }

    fn container_dir(&self, name: &str) -> Result<PathBuf> {
        validate_container_name(name)?;
        Ok(self.state_dir.join(name))
    }

    /// Loads the record of the container called `name`.
    ///
    /// # Errors
    ///
    /// Returns `CellarError::NotFound` if there is no record,
    /// `CellarError::Config` if `name` is not a valid container name, or an
    /// error if the record cannot be read or parsed.
    pub fn load(&self, name: &str) -> Result<ContainerRecord> {
        let path = self.container_dir(name)?.join(RECORD_FILE);
        if !path.exists() {
            return Err(CellarError::NotFound {
                kind: "container",
                id: name.to_string(),
            });
        }
        read_record(&path)
    }

    /// Lists every readable record, sorted by name.
    ///
    /// Unreadable records are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory exists but cannot be listed.
    pub fn list(&self) -> Result<Vec<ContainerRecord>> {
        if !self.state_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.state_dir).map_err(|e| CellarError::Io {
            path: self.state_dir.clone(),
            source: e,
        })?;
        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join(RECORD_FILE);
            if !path.is_file() {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping record"),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

fn read_record(path: &Path) -> Result<ContainerRecord> {
    let content = std::fs::read_to_string(path).map_err(|e| CellarError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

impl LifecycleRecorder for JsonStateRecorder {
    fn record(&self, pid: u32, name: &str, id: &ContainerId, command: &str) -> Result<()> {
        let dir = self.container_dir(name)?;
        std::fs::create_dir_all(&dir).map_err(|e| CellarError::Io {
            path: dir.clone(),
            source: e,
        })?;
        let record = ContainerRecord {
            pid,
            id: id.clone(),
            name: name.to_string(),
            command: command.to_string(),
            status: ContainerState::Running,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&record)?;

        let path = dir.join(RECORD_FILE);
        let tmp = dir.join(format!("{RECORD_FILE}.tmp"));
        std::fs::write(&tmp, json).map_err(|e| CellarError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CellarError::Io {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "container recorded");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let dir = self.container_dir(name)?;
        if !dir.exists() {
            return Ok(());
        }
        std::fs::remove_dir_all(&dir).map_err(|e| CellarError::Io {
            path: dir.clone(),
            source: e,
        })?;
        tracing::debug!(path = %dir.display(), "container record removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonStateRecorder::new(dir.path());
        let id = ContainerId::new("0123456789");

        recorder.record(4321, "web", &id, "echo hello").unwrap();
        let record = recorder.load("web").unwrap();

        assert_eq!(record.pid, 4321);
        assert_eq!(record.id, id);
        assert_eq!(record.command, "echo hello");
        assert_eq!(record.status, ContainerState::Running);
        assert!(dir.path().join("web/config.json").is_file());
    }

    #[test]
    fn remove_deletes_record_directory() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonStateRecorder::new(dir.path());
        recorder
            .record(1, "web", &ContainerId::new("a"), "sh")
            .unwrap();

        recorder.remove("web").unwrap();

        assert!(!dir.path().join("web").exists());
        assert!(matches!(
            recorder.load("web"),
            Err(CellarError::NotFound { .. })
        ));
    }

    #[test]
    fn remove_missing_record_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonStateRecorder::new(dir.path());
        assert!(recorder.remove("ghost").is_ok());
    }

    #[test]
    fn names_outside_state_dir_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let victim = dir.path().join("victim");
        std::fs::create_dir_all(&state).unwrap();
        std::fs::create_dir_all(&victim).unwrap();
        std::fs::write(victim.join("precious"), b"keep").unwrap();
        let recorder = JsonStateRecorder::new(&state);

        for name in ["../victim", "/tmp", "..", ""] {
            assert!(matches!(
                recorder.record(1, name, &ContainerId::new("a"), "sh"),
                Err(CellarError::Config { .. })
            ));
            assert!(matches!(recorder.remove(name), Err(CellarError::Config { .. })));
        }

        assert!(victim.join("precious").is_file());
        assert!(!victim.join(RECORD_FILE).exists());
    }

    #[test]
    fn list_returns_sorted_records_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonStateRecorder::new(dir.path());
        recorder.record(2, "b", &ContainerId::new("2"), "sh").unwrap();
        recorder.record(1, "a", &ContainerId::new("1"), "sh").unwrap();
        std::fs::create_dir(dir.path().join("broken")).unwrap();
        std::fs::write(dir.path().join("broken/config.json"), b"{").unwrap();

        let names: Vec<_> = recorder.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn list_without_state_dir_is_empty() {
        let recorder = JsonStateRecorder::new("/nonexistent/cellar-state");
        assert!(recorder.list().unwrap().is_empty());
    }
}
