//! Cgroups v2 resource control for container processes.
//!
//! Each container gets `<cgroup_root>/cellar/<id>`. Limits are written as
//! [`controls::Control`]s after the matching controllers have been enabled
//! in the parent's `cgroup.subtree_control`.

pub mod controls;

use std::path::{Path, PathBuf};

use cellar_common::constants::CGROUP_PARENT;
use cellar_common::error::{CellarError, Result};
use cellar_common::types::ResourceLimits;

use self::controls::Control;

const SUBTREE_CONTROL: &str = "cgroup.subtree_control";
const PROCS: &str = "cgroup.procs";

/// A container's cgroup directory.
#[derive(Debug)]
pub struct CgroupManager {
    root: PathBuf,
    path: PathBuf,
}

impl CgroupManager {
    /// Creates `<cgroup_root>/cellar/<container_id>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(cgroup_root: &Path, container_id: &str) -> Result<Self> {
        let path = cgroup_root.join(CGROUP_PARENT).join(container_id);
        std::fs::create_dir_all(&path).map_err(|e| CellarError::Io {
            path: path.clone(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "cgroup created");
        Ok(Self {
            root: cgroup_root.to_path_buf(),
            path,
        })
    }

    /// Returns the cgroup directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes every limit in `limits`.
    ///
    /// Controllers are enabled on the way down first. That step is
    /// best-effort since a controller may already be enabled or delegated.
    ///
    /// # Errors
    ///
    /// Returns an error if a control file cannot be written.
    pub fn apply_limits(&self, limits: &ResourceLimits) -> Result<()> {
        let controls = Control::from_limits(limits);
        if controls.is_empty() {
            return Ok(());
        }
        let mut controllers: Vec<_> = controls.iter().map(Control::controller).collect();
        controllers.dedup();
        self.enable_controllers(&controllers);

        for control in &controls {
            control.write(&self.path)?;
        }
        Ok(())
    }

    fn enable_controllers(&self, controllers: &[&str]) {
        let request = controllers
            .iter()
            .map(|c| format!("+{c}"))
            .collect::<Vec<_>>()
            .join(" ");
        for dir in [self.root.clone(), self.root.join(CGROUP_PARENT)] {
            let file = dir.join(SUBTREE_CONTROL);
            if let Err(e) = std::fs::write(&file, &request) {
                tracing::warn!(file = %file.display(), controllers = %request, error = %e, "enabling controllers failed");
            }
        }
    }

    /// Moves `pid` into this cgroup.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `cgroup.procs` fails.
    pub fn add_process(&self, pid: u32) -> Result<()> {
        let procs = self.path.join(PROCS);
        std::fs::write(&procs, pid.to_string()).map_err(|e| CellarError::Io {
            path: procs,
            source: e,
        })?;
        tracing::debug!(pid, path = %self.path.display(), "process added to cgroup");
        Ok(())
    }

    /// Removes the cgroup directory; a missing directory is not an error.
    ///
    /// The kernel refuses while processes are still attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed.
    pub fn destroy(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        std::fs::remove_dir(&self.path).map_err(|e| CellarError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        tracing::info!(path = %self.path.display(), "cgroup destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(dir: &tempfile::TempDir) -> CgroupManager {
        CgroupManager::create(dir.path(), "abc").unwrap()
    }

    #[test]
    fn create_places_cgroup_under_parent() {
        let dir = tempfile::tempdir().unwrap();
        let cg = manager(&dir);
        assert_eq!(cg.path(), dir.path().join("cellar/abc"));
        assert!(cg.path().is_dir());
    }

    #[test]
    fn apply_limits_writes_controls_and_enables_controllers() {
        let dir = tempfile::tempdir().unwrap();
        let cg = manager(&dir);
        let limits = ResourceLimits {
            memory_bytes: Some(100 * 1024 * 1024),
            cpu_shares: Some(1024),
            cpuset_cpus: Some("0-1".into()),
        };

        cg.apply_limits(&limits).unwrap();

        let read = |p: PathBuf| std::fs::read_to_string(p).unwrap();
        assert_eq!(read(cg.path().join("memory.max")), "104857600");
        assert_eq!(read(cg.path().join("cpu.weight")), "39");
        assert_eq!(read(cg.path().join("cpuset.cpus")), "0-1");
        assert_eq!(
            read(dir.path().join("cellar").join(SUBTREE_CONTROL)),
            "+memory +cpu +cpuset"
        );
    }

    #[test]
    fn empty_limits_touch_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cg = manager(&dir);
        cg.apply_limits(&ResourceLimits::default()).unwrap();
        assert!(!dir.path().join(SUBTREE_CONTROL).exists());
        assert_eq!(std::fs::read_dir(cg.path()).unwrap().count(), 0);
    }

    #[test]
    fn destroy_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cg = manager(&dir);
        cg.add_process(4242).unwrap();
        assert_eq!(std::fs::read_to_string(cg.path().join(PROCS)).unwrap(), "4242");
        std::fs::remove_file(cg.path().join(PROCS)).unwrap();

        cg.destroy().unwrap();
        assert!(!cg.path().exists());
        cg.destroy().unwrap();
    }
}
