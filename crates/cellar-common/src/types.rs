//! Domain primitive types used across the cellar workspace.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::{CellarError, Result};

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks that `name` can serve as a container's state directory name.
///
/// A valid name is exactly one normal path component: no `/`, no NUL, and
/// neither `.` nor `..`.
///
/// # Errors
///
/// Returns `CellarError::Config` if `name` is not a valid container name.
pub fn validate_container_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains(['/', '\0']) {
        return Err(CellarError::Config {
            message: format!("invalid container name {name:?}: must be a single path component"),
        });
    }
    Ok(())
}

/// Resource limits applied to a container's cgroup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory limit in bytes.
    pub memory_bytes: Option<u64>,
    /// CPU shares (relative weight on the 2..=262144 scale).
    pub cpu_shares: Option<u64>,
    /// CPUs the container may run on, in cpuset list syntax (`0-1,3`).
    pub cpuset_cpus: Option<String>,
}

impl ResourceLimits {
    /// Returns `true` if no limit is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.memory_bytes.is_none() && self.cpu_shares.is_none() && self.cpuset_cpus.is_none()
    }
}

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Container has been created but its process has not started.
    Created,
    /// Container process is running.
    Running,
    /// Container process has exited.
    Stopped,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A step of layered root filesystem construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootfsStep {
    /// Creating the per-container writable layer.
    WriterLayer,
    /// Creating the union mount point directory.
    MountPoint,
    /// Mounting the union filesystem.
    UnionMount,
    /// Grafting a host volume, identified by its `host:container` spec.
    Volume(String),
}

impl fmt::Display for RootfsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriterLayer => write!(f, "writable layer"),
            Self::MountPoint => write!(f, "mount point"),
            Self::UnionMount => write!(f, "union mount"),
            Self::Volume(spec) => write!(f, "volume {spec}"),
        }
    }
}

/// Parses memory strings like `"100m"`, `"128MiB"`, `"1GB"` into bytes.
///
/// Single-letter suffixes (`k`, `m`, `g`) are binary multiples.
#[allow(clippy::option_if_let_else)]
#[must_use]
pub fn parse_memory(s: &str) -> Option<u64> {
    let s = s.trim();
    let (num_str, multiplier): (&str, u64) = if let Some(n) = s.strip_suffix("GiB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("GB") {
        (n, 1_000_000_000)
    } else if let Some(n) = s.strip_suffix("MiB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix("KiB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1000)
    } else if let Some(n) = s.strip_suffix(['g', 'G']) {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix(['m', 'M']) {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix(['k', 'K']) {
        (n, 1024)
    } else {
        (s, 1)
    };
    num_str
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = ContainerId::generate();
        let b = ContainerId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn container_names_must_be_one_component() {
        for name in ["web", "db-1", "a.b", "..hidden"] {
            assert!(validate_container_name(name).is_ok(), "{name}");
        }
        for name in ["", ".", "..", "../victim", "/etc", "a/b", "web/", "a\0b"] {
            assert!(
                matches!(validate_container_name(name), Err(CellarError::Config { .. })),
                "{name:?}"
            );
        }
    }

    #[test]
    fn container_state_serializes_lowercase() {
        let json = serde_json::to_string(&ContainerState::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }

    #[test]
    fn volume_step_display_names_the_volume() {
        let step = RootfsStep::Volume("/data:/srv".into());
        assert_eq!(step.to_string(), "volume /data:/srv");
    }

    #[test]
    fn empty_limits() {
        assert!(ResourceLimits::default().is_empty());
        let limits = ResourceLimits {
            cpu_shares: Some(512),
            ..ResourceLimits::default()
        };
        assert!(!limits.is_empty());
    }

    #[test]
    fn parse_memory_short_suffix() {
        assert_eq!(parse_memory("100m"), Some(100 * 1024 * 1024));
        assert_eq!(parse_memory("2g"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_memory("64k"), Some(64 * 1024));
    }

    #[test]
    fn parse_memory_mib() {
        assert_eq!(parse_memory("128MiB"), Some(128 * 1024 * 1024));
    }

    #[test]
    fn parse_memory_plain_bytes() {
        assert_eq!(parse_memory("1048576"), Some(1_048_576));
    }

    #[test]
    fn parse_memory_invalid() {
        assert_eq!(parse_memory("abc"), None);
        assert_eq!(parse_memory("m"), None);
    }
}
