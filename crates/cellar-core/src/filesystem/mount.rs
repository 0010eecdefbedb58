//! Mount utilities for container filesystem setup.
//!
//! Root construction and teardown go through the [`Mounter`] trait so the
//! ordering logic can be exercised without `CAP_SYS_ADMIN`.
//! [`SyscallMounter`] is the implementation backed by `mount(2)`.

use std::path::Path;

use cellar_common::error::{CellarError, Result};
use nix::mount::{MsFlags, mount};

use super::overlayfs::{self, OverlayConfig};

/// Mount operations needed to build and tear down a container root.
pub trait Mounter {
    /// Mounts a union filesystem described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount fails.
    fn mount_union(&self, config: &OverlayConfig) -> Result<()>;

    /// Mounts `source` at `target` so both paths show the same tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount fails.
    fn bind(&self, source: &Path, target: &Path) -> Result<()>;

    /// Force-unmounts whatever is mounted at `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the unmount fails.
    fn unmount(&self, target: &Path) -> Result<()>;
}

/// [`Mounter`] that issues real mount syscalls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallMounter;

impl Mounter for SyscallMounter {
    fn mount_union(&self, config: &OverlayConfig) -> Result<()> {
        overlayfs::mount_overlay(config)
    }

    fn bind(&self, source: &Path, target: &Path) -> Result<()> {
        bind_mount(source, target)
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        overlayfs::force_unmount(target)
    }
}

/// Creates a recursive bind mount from source to target.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
pub fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    mount(
        Some(source),
        target,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| CellarError::Mount {
        target: target.to_path_buf(),
        message: format!("bind mount of {} failed: {e}", source.display()),
    })?;
    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        "bind mount created"
    );
    Ok(())
}

/// Mounts a fresh `proc` filesystem at `target`.
///
/// Called by the init process after `pivot_root`, inside the new PID
/// namespace, so `/proc` only lists the container's processes.
///
/// # Errors
///
/// Returns an error if the target cannot be created or the mount fails.
pub fn mount_proc(target: &Path) -> Result<()> {
    std::fs::create_dir_all(target).map_err(|e| CellarError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;
    mount(
        Some("proc"),
        target,
        Some("proc"),
        MsFlags::MS_NOEXEC | MsFlags::MS_NOSUID | MsFlags::MS_NODEV,
        None::<&str>,
    )
    .map_err(|e| CellarError::Mount {
        target: target.to_path_buf(),
        message: format!("proc mount failed: {e}"),
    })?;
    tracing::debug!(target = %target.display(), "proc mounted");
    Ok(())
}
