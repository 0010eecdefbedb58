//! `OverlayFS` management for layered container filesystems.
//!
//! Stacks the read-only base image layer under a per-container writable
//! layer: writes at the merged mount land in the upper layer, and reads
//! fall through to the lower layer when the upper layer has no entry.

use std::path::{Path, PathBuf};

use cellar_common::error::{CellarError, Result};
use nix::mount::{MntFlags, MsFlags, mount, umount2};

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Read-only lower layers (top to bottom).
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`, on the upper layer's filesystem.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Renders the `mount(2)` data string for this overlay.
    #[must_use]
    pub fn options(&self) -> String {
        let lowers = self
            .lower_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        format!(
            "lowerdir={},upperdir={},workdir={}",
            lowers,
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// All directories must already exist.
///
/// # Errors
///
/// Returns an error if the mount syscall fails.
pub fn mount_overlay(config: &OverlayConfig) -> Result<()> {
    let opts = config.options();
    mount(
        Some("overlay"),
        &config.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| CellarError::Mount {
        target: config.merged_dir.clone(),
        message: format!("overlay mount ({opts}) failed: {e}"),
    })?;

    tracing::info!(merged = %config.merged_dir.display(), "overlayfs mounted");
    Ok(())
}

/// Force-unmounts the filesystem at `target`.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails, including when nothing
/// is mounted at `target`.
pub fn force_unmount(target: &Path) -> Result<()> {
    umount2(target, MntFlags::MNT_FORCE).map_err(|e| CellarError::Mount {
        target: target.to_path_buf(),
        message: format!("force unmount failed: {e}"),
    })?;
    tracing::info!(path = %target.display(), "unmounted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_list_lower_upper_and_work() {
        let cfg = OverlayConfig {
            lower_dirs: vec!["/r/busybox".into()],
            upper_dir: "/r/writerLayer".into(),
            work_dir: "/r/workLayer".into(),
            merged_dir: "/r/mnt".into(),
        };
        assert_eq!(
            cfg.options(),
            "lowerdir=/r/busybox,upperdir=/r/writerLayer,workdir=/r/workLayer"
        );
    }

    #[test]
    fn options_join_multiple_lowers_with_colon() {
        let cfg = OverlayConfig {
            lower_dirs: vec!["/a".into(), "/b".into()],
            upper_dir: "/u".into(),
            work_dir: "/w".into(),
            merged_dir: "/m".into(),
        };
        assert!(cfg.options().starts_with("lowerdir=/a:/b,"));
    }
}
