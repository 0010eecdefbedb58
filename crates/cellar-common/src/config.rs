//! Global configuration model for the cellar runtime.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::ResourceLimits;

/// Root configuration for the cellar runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Root used when none is supplied or the base image cannot be materialized.
    pub default_root: PathBuf,
    /// Base image name; the archive is `<root>/<image>.tar`.
    pub image: String,
    /// Directory for container records and detached-container logs.
    pub state_dir: PathBuf,
    /// Mount point of the cgroups v2 hierarchy.
    pub cgroup_root: PathBuf,
    /// Limits applied when a run does not specify its own.
    pub default_limits: ResourceLimits,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_root: PathBuf::from(constants::DEFAULT_ROOT),
            image: constants::DEFAULT_IMAGE.to_string(),
            state_dir: PathBuf::from(constants::DEFAULT_STATE_DIR),
            cgroup_root: PathBuf::from(constants::CGROUP_V2_PATH),
            default_limits: ResourceLimits::default(),
        }
    }
}

impl RuntimeConfig {
    /// Returns a copy with `image` replaced.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Returns a copy with `default_root` replaced.
    #[must_use]
    pub fn with_default_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.default_root = root.into();
        self
    }

    /// Returns a copy with `state_dir` replaced.
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_constants() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.default_root, PathBuf::from(constants::DEFAULT_ROOT));
        assert_eq!(cfg.image, "busybox");
        assert!(cfg.default_limits.is_empty());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str(r#"{"image":"alpine"}"#).unwrap();
        assert_eq!(cfg.image, "alpine");
        assert_eq!(cfg.state_dir, PathBuf::from(constants::DEFAULT_STATE_DIR));
    }

    #[test]
    fn builders_override_fields() {
        let cfg = RuntimeConfig::default()
            .with_image("alpine")
            .with_default_root("/srv/cellar")
            .with_state_dir("/tmp/state");
        assert_eq!(cfg.image, "alpine");
        assert_eq!(cfg.default_root, PathBuf::from("/srv/cellar"));
        assert_eq!(cfg.state_dir, PathBuf::from("/tmp/state"));
    }
}
