//! Base image materialization with default-path fallback.
//!
//! [`ImageMaterializer::materialize`] never fails. Any problem locating or
//! extracting the base image yields the configured default root instead,
//! and the caller cannot tell "no image" apart from "misconfigured root".

use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use cellar_common::config::RuntimeConfig;
use cellar_common::error::{CellarError, Result};
use cellar_core::filesystem::layout::RootLayout;

use crate::layer::{self, Layer};

/// Resolves the root directory whose `<image>/` subdirectory is the base layer.
#[derive(Debug, Clone)]
pub struct ImageMaterializer {
    default_root: PathBuf,
    image: String,
}

impl ImageMaterializer {
    /// Creates a materializer for `image` that falls back to `default_root`.
    #[must_use]
    pub fn new(default_root: impl Into<PathBuf>, image: impl Into<String>) -> Self {
        Self {
            default_root: default_root.into(),
            image: image.into(),
        }
    }

    /// Creates a materializer from the runtime configuration.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.default_root.clone(), config.image.clone())
    }

    /// Returns the fallback root.
    #[must_use]
    pub fn default_root(&self) -> &Path {
        &self.default_root
    }

    /// Ensures the base image is extracted under `root` and returns the root.
    ///
    /// `None` or an empty path means the default root. If `<root>/<image>.tar`
    /// is missing the default root is returned without touching `root`.
    /// Otherwise `<root>/<image>/` is recreated from the archive; if that
    /// fails, the default root is returned as well.
    pub fn materialize(&self, root: Option<&Path>) -> PathBuf {
        let root = match root {
            Some(r) if !r.as_os_str().is_empty() => r.to_path_buf(),
            _ => {
                tracing::info!(
                    default = %self.default_root.display(),
                    "no root given, using default"
                );
                self.default_root.clone()
            }
        };
        let layout = RootLayout::new(&root, &self.image);

        let archive = layout.archive();
        if !archive.exists() {
            tracing::info!(
                archive = %archive.display(),
                default = %self.default_root.display(),
                "image archive not found, using default root"
            );
            return self.default_root.clone();
        }

        match self.extract(&layout) {
            Ok(layer) => {
                tracing::info!(
                    root = %root.display(),
                    image = %self.image,
                    digest = %layer.digest,
                    "base image materialized"
                );
                root
            }
            Err(e) => {
                tracing::warn!(
                    root = %root.display(),
                    default = %self.default_root.display(),
                    error = %e,
                    "base image materialization failed, using default root"
                );
                self.default_root.clone()
            }
        }
    }

    fn extract(&self, layout: &RootLayout) -> Result<Layer> {
        let base = layout.base_layer();
        if base.exists() {
            std::fs::remove_dir_all(&base).map_err(|e| CellarError::Io {
                path: base.clone(),
                source: e,
            })?;
            tracing::debug!(path = %base.display(), "removed stale base layer");
        }
        DirBuilder::new()
            .mode(0o777)
            .create(&base)
            .map_err(|e| CellarError::Io {
                path: base.clone(),
                source: e,
            })?;
        layer::extract_layer(&layout.archive(), &base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image_tar(path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(file);
        let data = b"#!/bin/sh\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, "bin/sh", &data[..]).unwrap();
        builder.finish().unwrap();
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn missing_archive_returns_default_without_mutation() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("unrelated"), b"x").unwrap();
        let before = entries(root.path());
        let materializer = ImageMaterializer::new("/fallback", "busybox");

        let resolved = materializer.materialize(Some(root.path()));

        assert_eq!(resolved, PathBuf::from("/fallback"));
        assert_eq!(entries(root.path()), before);
    }

    #[test]
    fn misconfigured_root_looks_like_missing_image() {
        let materializer = ImageMaterializer::new("/fallback", "busybox");
        let resolved = materializer.materialize(Some(Path::new("/definitely/not/a/root")));
        assert_eq!(resolved, PathBuf::from("/fallback"));
    }

    #[test]
    fn no_root_uses_default_root() {
        let default = tempfile::tempdir().unwrap();
        write_image_tar(&default.path().join("busybox.tar"));
        let materializer = ImageMaterializer::new(default.path(), "busybox");

        assert_eq!(materializer.materialize(None), default.path());
        assert_eq!(materializer.materialize(Some(Path::new(""))), default.path());
        assert!(default.path().join("busybox/bin/sh").exists());
    }

    #[test]
    fn archive_is_extracted_under_root() {
        let root = tempfile::tempdir().unwrap();
        write_image_tar(&root.path().join("busybox.tar"));
        let materializer = ImageMaterializer::new("/fallback", "busybox");

        let resolved = materializer.materialize(Some(root.path()));

        assert_eq!(resolved, root.path());
        assert!(root.path().join("busybox/bin/sh").is_file());
    }

    #[test]
    fn stale_base_layer_is_replaced() {
        let root = tempfile::tempdir().unwrap();
        write_image_tar(&root.path().join("busybox.tar"));
        std::fs::create_dir(root.path().join("busybox")).unwrap();
        std::fs::write(root.path().join("busybox/stale"), b"old").unwrap();
        let materializer = ImageMaterializer::new("/fallback", "busybox");

        let _ = materializer.materialize(Some(root.path()));

        assert!(!root.path().join("busybox/stale").exists());
        assert!(root.path().join("busybox/bin/sh").exists());
    }

    #[test]
    fn corrupt_archive_falls_back_to_default() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("busybox.tar"), vec![0xffu8; 1024]).unwrap();
        let materializer = ImageMaterializer::new("/fallback", "busybox");

        assert_eq!(
            materializer.materialize(Some(root.path())),
            PathBuf::from("/fallback")
        );
    }

    #[test]
    fn from_config_uses_configured_default() {
        let cfg = RuntimeConfig::default()
            .with_default_root("/srv/default")
            .with_image("alpine");
        let materializer = ImageMaterializer::from_config(&cfg);
        assert_eq!(materializer.default_root(), Path::new("/srv/default"));
        assert_eq!(
            materializer.materialize(Some(Path::new("/nope"))),
            PathBuf::from("/srv/default")
        );
    }
}
