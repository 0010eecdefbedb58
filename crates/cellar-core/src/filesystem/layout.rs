//! On-disk layout of a container root.
//!
//! ```text
//! <root>/<image>.tar       base image archive (read only)
//! <root>/<image>/          extracted base layer
//! <root>/writerLayer/      per-container writable layer
//! <root>/workLayer/        overlayfs work directory
//! <root>/mnt/              union mount point, the init working directory
//! <root>/mnt/<container>   volume targets
//! ```

use std::path::{Path, PathBuf};

use cellar_common::constants::{
    IMAGE_ARCHIVE_EXTENSION, MOUNT_POINT_DIR, WORK_LAYER_DIR, WRITER_LAYER_DIR,
};

use super::volume::VolumeSpec;

/// Paths of every layer belonging to one resolved root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootLayout {
    root: PathBuf,
    image: String,
}

impl RootLayout {
    /// Creates the layout for `image` under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, image: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            image: image.into(),
        }
    }

    /// Returns the resolved root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the image name.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Returns the base image archive path.
    #[must_use]
    pub fn archive(&self) -> PathBuf {
        self.root
            .join(format!("{}.{IMAGE_ARCHIVE_EXTENSION}", self.image))
    }

    /// Returns the extracted, read-only base layer.
    #[must_use]
    pub fn base_layer(&self) -> PathBuf {
        self.root.join(&self.image)
    }

    /// Returns the per-container writable layer.
    #[must_use]
    pub fn writer_layer(&self) -> PathBuf {
        self.root.join(WRITER_LAYER_DIR)
    }

    /// Returns the overlayfs work directory.
    #[must_use]
    pub fn work_layer(&self) -> PathBuf {
        self.root.join(WORK_LAYER_DIR)
    }

    /// Returns the union mount point.
    #[must_use]
    pub fn mount_point(&self) -> PathBuf {
        self.root.join(MOUNT_POINT_DIR)
    }

    /// Returns where `volume` is mounted inside the union mount point.
    #[must_use]
    pub fn volume_target(&self, volume: &VolumeSpec) -> PathBuf {
        volume.target_under(&self.mount_point())
    }
}
