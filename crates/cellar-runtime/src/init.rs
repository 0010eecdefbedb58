//! Entry point of the container init process.
//!
//! Runs as PID 1 of the new PID namespace, started by the launcher with
//! `init` as its only argument and the container root as working directory.

use std::convert::Infallible;
use std::ffi::CString;
use std::path::Path;

use cellar_common::error::{CellarError, Result};
use cellar_core::filesystem::mount::mount_proc;
use cellar_core::filesystem::pivot_root::pivot_root;
use cellar_core::handshake::HandshakeReceiver;
use cellar_core::namespace::mount::make_mounts_private;

/// Receives the command, switches into the container root, and execs it.
///
/// Only returns on failure; on success the process image is replaced.
///
/// # Errors
///
/// Returns an error if the handshake descriptor is missing, the command is
/// empty, the root switch or `/proc` mount fails, or the exec fails.
pub fn run_init() -> Result<Infallible> {
    let command = HandshakeReceiver::inherited()?.recv()?;
    let argv = parse_command(&command)?;
    tracing::info!(command = %command.trim(), "init received command");

    make_mounts_private()?;
    let root = std::env::current_dir().map_err(|e| CellarError::Io {
        path: ".".into(),
        source: e,
    })?;
    pivot_root(&root)?;
    mount_proc(Path::new("/proc"))?;

    let program = &argv[0];
    nix::unistd::execvp(program, &argv).map_err(|e| CellarError::Process {
        message: format!("exec {} failed: {e}", program.to_string_lossy()),
    })
}

/// Splits a handshake message into exec arguments on whitespace.
fn parse_command(command: &str) -> Result<Vec<CString>> {
    let argv = command
        .split_whitespace()
        .map(|word| {
            CString::new(word).map_err(|_| CellarError::Config {
                message: format!("command word contains a NUL byte: {word:?}"),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if argv.is_empty() {
        return Err(CellarError::Config {
            message: "no command received over the handshake channel".into(),
        });
    }
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_split_on_whitespace() {
        let argv = parse_command("  sh -c\ttop \n").unwrap();
        let words: Vec<_> = argv.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(words, ["sh", "-c", "top"]);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(parse_command(""), Err(CellarError::Config { .. })));
        assert!(matches!(parse_command(" \n "), Err(CellarError::Config { .. })));
    }

    #[test]
    fn nul_byte_is_rejected() {
        assert!(parse_command("echo a\0b").is_err());
    }
}
