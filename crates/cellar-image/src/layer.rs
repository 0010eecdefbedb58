//! Base layer extraction from an image archive.

use std::fs::File;
use std::path::Path;

use cellar_common::error::{CellarError, Result};

use crate::hash;

/// Provenance of an extracted base layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    /// Hex SHA-256 digest of the source archive.
    pub digest: String,
    /// Archive size in bytes.
    pub size_bytes: u64,
}

/// Unpacks the tar archive at `archive` into `target`, which must exist.
///
/// File modes from the archive are preserved so image binaries stay
/// executable.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or unpacked, or if
/// `target` is missing.
pub fn extract_layer(archive: &Path, target: &Path) -> Result<Layer> {
    let archive_err = |e| CellarError::Io {
        path: archive.to_path_buf(),
        source: e,
    };
    if !target.is_dir() {
        return Err(CellarError::NotFound {
            kind: "layer directory",
            id: target.display().to_string(),
        });
    }

    let file = File::open(archive).map_err(archive_err)?;
    let size_bytes = file.metadata().map_err(archive_err)?.len();
    let mut unpacker = tar::Archive::new(file);
    unpacker.set_preserve_permissions(true);
    unpacker.unpack(target).map_err(|e| CellarError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;

    let layer = Layer {
        digest: hash::hash_file(archive)?,
        size_bytes,
    };
    tracing::info!(
        archive = %archive.display(),
        target = %target.display(),
        digest = %layer.digest,
        size = layer.size_bytes,
        "layer extracted"
    );
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use super::*;

    fn busybox_like_tar(dir: &Path) -> PathBuf {
        let path = dir.join("image.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());
        for (name, mode, body) in [
            ("bin/busybox", 0o755, &b"\x7fELF"[..]),
            ("etc/hostname", 0o644, &b"cellar\n"[..]),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(mode);
            header.set_cksum();
            builder.append_data(&mut header, name, body).unwrap();
        }
        builder.finish().unwrap();
        path
    }

    #[test]
    fn unpacks_files_with_their_modes() {
        let dir = tempfile::tempdir().unwrap();
        let archive = busybox_like_tar(dir.path());
        let target = dir.path().join("busybox");
        std::fs::create_dir(&target).unwrap();

        let layer = extract_layer(&archive, &target).unwrap();

        assert_eq!(layer.digest, hash::hash_file(&archive).unwrap());
        assert_eq!(layer.size_bytes, std::fs::metadata(&archive).unwrap().len());
        assert_eq!(
            std::fs::read_to_string(target.join("etc/hostname")).unwrap(),
            "cellar\n"
        );
        let mode = std::fs::metadata(target.join("bin/busybox"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn missing_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = busybox_like_tar(dir.path());
        let err = extract_layer(&archive, &dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CellarError::NotFound { .. }));
    }

    #[test]
    fn missing_or_corrupt_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(extract_layer(&dir.path().join("missing.tar"), dir.path()).is_err());

        let corrupt = dir.path().join("corrupt.tar");
        std::fs::write(&corrupt, [0xffu8; 1024]).unwrap();
        assert!(extract_layer(&corrupt, dir.path()).is_err());
    }
}
