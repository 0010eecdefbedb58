//! Secure root filesystem switching via `pivot_root(2)`.
//!
//! More secure than `chroot` because it actually changes the root mount
//! point rather than just the process's view of `/`.

use std::path::Path;

use cellar_common::error::{CellarError, Result};
use nix::mount::{MntFlags, MsFlags, mount, umount2};

const PUT_OLD: &str = ".pivot_root";

/// Switches the root filesystem to `new_root` using `pivot_root(2)`.
///
/// `new_root` is bind-mounted onto itself first so it is a mount point even
/// when it is a plain directory (the base-image fallback). The old root is
/// detached and its directory removed afterwards.
///
/// # Errors
///
/// Returns an error if any of the mount, pivot, chdir, or cleanup steps fail.
pub fn pivot_root(new_root: &Path) -> Result<()> {
    tracing::info!(new_root = %new_root.display(), "performing pivot_root");

    mount(
        Some(new_root),
        new_root,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| CellarError::Mount {
        target: new_root.to_path_buf(),
        message: format!("self bind mount failed: {e}"),
    })?;

    let put_old = new_root.join(PUT_OLD);
    std::fs::create_dir_all(&put_old).map_err(|e| CellarError::Io {
        path: put_old.clone(),
        source: e,
    })?;

    nix::unistd::pivot_root(new_root, &put_old).map_err(|e| CellarError::PermissionDenied {
        message: format!("pivot_root into {} failed: {e}", new_root.display()),
    })?;
    nix::unistd::chdir("/").map_err(|e| CellarError::Io {
        path: "/".into(),
        source: e.into(),
    })?;

    let old_root = Path::new("/").join(PUT_OLD);
    umount2(&old_root, MntFlags::MNT_DETACH).map_err(|e| CellarError::Mount {
        target: old_root.clone(),
        message: format!("detaching old root failed: {e}"),
    })?;
    std::fs::remove_dir(&old_root).map_err(|e| CellarError::Io {
        path: old_root,
        source: e,
    })?;
    Ok(())
}
