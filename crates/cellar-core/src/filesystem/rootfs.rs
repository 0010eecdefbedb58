//! Layered root filesystem construction and teardown.
//!
//! [`build`] is fail-fast: it stops at the first failing step and returns a
//! [`CellarError::Rootfs`] naming that step, leaving partial state behind.
//! [`teardown`] is best-effort: it walks the layers in reverse construction
//! order, logs every failure, and never returns one. [`RootfsGuard`] ties the
//! two together by running teardown on every exit path of the caller.

use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use cellar_common::error::{CellarError, Result};
use cellar_common::types::RootfsStep;

use super::layout::RootLayout;
use super::mount::Mounter;
use super::overlayfs::OverlayConfig;
use super::volume::VolumeSpec;

const LAYER_MODE: u32 = 0o777;

/// Builds the layered root described by `layout` and grafts `volumes` into it.
///
/// Returns the union mount point, which becomes the init working directory.
///
/// # Errors
///
/// Returns `CellarError::Rootfs` identifying the first step that failed.
/// Nothing is rolled back; pair this with a [`RootfsGuard`].
pub fn build(layout: &RootLayout, volumes: &[VolumeSpec], mounter: &dyn Mounter) -> Result<PathBuf> {
    let writer = layout.writer_layer();
    let work = layout.work_layer();
    create_layer_dir(&writer)
        .and_then(|()| create_layer_dir(&work))
        .map_err(|e| e.at_step(RootfsStep::WriterLayer))?;

    let mount_point = layout.mount_point();
    create_layer_dir(&mount_point).map_err(|e| e.at_step(RootfsStep::MountPoint))?;

    let overlay = OverlayConfig {
        lower_dirs: vec![layout.base_layer()],
        upper_dir: writer,
        work_dir: work,
        merged_dir: mount_point.clone(),
    };
    mounter
        .mount_union(&overlay)
        .map_err(|e| e.at_step(RootfsStep::UnionMount))?;

    for volume in volumes {
        graft_volume(layout, volume, mounter)
            .map_err(|e| e.at_step(RootfsStep::Volume(volume.to_string())))?;
    }

    tracing::info!(
        root = %layout.root().display(),
        volumes = volumes.len(),
        "layered root built"
    );
    Ok(mount_point)
}

fn graft_volume(layout: &RootLayout, volume: &VolumeSpec, mounter: &dyn Mounter) -> Result<()> {
    let host = volume.host_path();
    if !host.exists() {
        create_dir_tree(host)?;
        tracing::debug!(path = %host.display(), "created volume host path");
    }
    let target = layout.volume_target(volume);
    create_dir_tree(&target)?;
    mounter.bind(host, &target)?;
    tracing::info!(
        host = %host.display(),
        target = %target.display(),
        "volume mounted"
    );
    Ok(())
}

/// Creates a single directory; an existing directory is an error.
fn create_layer_dir(path: &Path) -> Result<()> {
    DirBuilder::new()
        .mode(LAYER_MODE)
        .create(path)
        .map_err(|e| CellarError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn create_dir_tree(path: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(LAYER_MODE)
        .create(path)
        .map_err(|e| CellarError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Tears down whatever [`build`] created for `layout`, in reverse order.
///
/// 1. Each volume target is unmounted and removed.
/// 2. The union mount point is unmounted and removed.
/// 3. The writable layer and overlay work directory are removed.
///
/// Missing paths are skipped. When an unmount fails the target is removed
/// only if it is an empty directory, so a tree that is still mounted is
/// never deleted recursively.
pub fn teardown(layout: &RootLayout, volumes: &[VolumeSpec], mounter: &dyn Mounter) {
    for volume in volumes {
        release_mount(mounter, &layout.volume_target(volume));
    }
    release_mount(mounter, &layout.mount_point());
    remove_tree(&layout.writer_layer());
    remove_tree(&layout.work_layer());
    tracing::info!(root = %layout.root().display(), "layered root torn down");
}

fn release_mount(mounter: &dyn Mounter, target: &Path) {
    if !target.exists() {
        tracing::debug!(path = %target.display(), "nothing to unmount");
        return;
    }
    match mounter.unmount(target) {
        Ok(()) => remove_tree(target),
        Err(e) => {
            tracing::warn!(path = %target.display(), error = %e, "unmount failed");
            if let Err(e) = std::fs::remove_dir(target) {
                tracing::warn!(
                    path = %target.display(),
                    error = %e,
                    "left in place after failed unmount"
                );
            }
        }
    }
}

fn remove_tree(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(path) {
        tracing::warn!(path = %path.display(), error = %e, "remove failed");
    }
}

/// Scoped ownership of a container's layered root.
///
/// Created before [`build`] runs; dropping it runs [`teardown`] no matter how
/// far construction got or how the owning scope exits.
pub struct RootfsGuard<'a> {
    layout: &'a RootLayout,
    volumes: &'a [VolumeSpec],
    mounter: &'a dyn Mounter,
}

impl<'a> RootfsGuard<'a> {
    /// Takes responsibility for tearing down `layout` and `volumes`.
    #[must_use]
    pub fn new(layout: &'a RootLayout, volumes: &'a [VolumeSpec], mounter: &'a dyn Mounter) -> Self {
        Self {
            layout,
            volumes,
            mounter,
        }
    }

    /// Builds the layered root; see [`build`].
    ///
    /// # Errors
    ///
    /// Propagates the step-identifying error from [`build`]. The guard still
    /// tears down on drop.
    pub fn build(&self) -> Result<PathBuf> {
        build(self.layout, self.volumes, self.mounter)
    }
}

impl Drop for RootfsGuard<'_> {
    fn drop(&mut self) {
        teardown(self.layout, self.volumes, self.mounter);
    }
}
