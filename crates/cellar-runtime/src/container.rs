//! Core container struct and lifecycle transitions.

use std::path::PathBuf;

use cellar_common::types::{ContainerId, ContainerState};
use cellar_core::filesystem::volume::VolumeSpec;

/// A container instance with its configuration and runtime state.
#[derive(Debug, Clone)]
pub struct Container {
    /// Unique identifier.
    pub id: ContainerId,
    /// Human-readable name; the ID when none was given.
    pub name: String,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Command line handed to the init process.
    pub command: String,
    /// Whether stdio is attached to the launcher's terminal.
    pub tty: bool,
    /// Resolved root directory holding the container's layers.
    pub root: PathBuf,
    /// Host volumes grafted into the root, in mount order.
    pub volumes: Vec<VolumeSpec>,
    /// PID of the init process, once it exists.
    pub pid: Option<u32>,
}

impl Container {
    /// Creates a new container in the `Created` state.
    ///
    /// An empty or absent `name` defaults to the ID.
    #[must_use]
    pub fn new(
        id: ContainerId,
        name: Option<String>,
        command: String,
        tty: bool,
        root: PathBuf,
        volumes: Vec<VolumeSpec>,
    ) -> Self {
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| id.to_string());
        Self {
            id,
            name,
            state: ContainerState::Created,
            command,
            tty,
            root,
            volumes,
            pid: None,
        }
    }

    /// Records that the init process exists, transitioning to `Running`.
    pub fn mark_running(&mut self, pid: u32) {
        self.pid = Some(pid);
        self.state = ContainerState::Running;
        tracing::info!(id = %self.id, pid, "container running");
    }

    /// Records that the init process exited, transitioning to `Stopped`.
    pub fn mark_stopped(&mut self) {
        self.state = ContainerState::Stopped;
        tracing::info!(id = %self.id, "container stopped");
    }
}
