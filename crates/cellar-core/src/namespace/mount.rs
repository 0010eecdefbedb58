//! Mount namespace setup performed inside the container.

use cellar_common::error::{CellarError, Result};
use nix::mount::{MsFlags, mount};

/// Makes every mount in the calling process's mount namespace private.
///
/// Must run inside a fresh mount namespace before any container mounts, so
/// they do not propagate back to the host.
///
/// # Errors
///
/// Returns an error if the remount of `/` fails.
pub fn make_mounts_private() -> Result<()> {
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_PRIVATE | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| CellarError::Mount {
        target: "/".into(),
        message: format!("making mounts private failed: {e}"),
    })?;
    tracing::debug!("mount propagation set to private");
    Ok(())
}
