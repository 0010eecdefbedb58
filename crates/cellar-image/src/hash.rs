//! SHA-256 content digests.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use cellar_common::error::{CellarError, Result};
use sha2::{Digest, Sha256};

/// Computes the hex-encoded SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let io_err = |e| CellarError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hash_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(hash_file(&dir.path().join("missing")).is_err());
    }
}
