//! Single-shot command handshake between the launcher and the init process.
//!
//! The launcher writes the user command into an anonymous pipe and closes it;
//! the init process inherits the read end as descriptor
//! [`HANDSHAKE_FD`](cellar_common::constants::HANDSHAKE_FD) and reads to EOF.
//! The command therefore never shows up in the init process's `argv`.
//!
//! Both halves are consumed by their single operation, so a channel carries
//! at most one message.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use cellar_common::constants::{HANDSHAKE_FD, MAX_COMMAND_BYTES};
use cellar_common::error::{CellarError, Result};
use nix::fcntl::OFlag;

/// Write half of the handshake channel, held by the launcher.
#[derive(Debug)]
pub struct HandshakeSender {
    file: File,
}

/// Read half of the handshake channel, handed to the init process.
#[derive(Debug)]
pub struct HandshakeReceiver {
    fd: OwnedFd,
}

/// Creates a new handshake channel.
///
/// Both descriptors are close-on-exec; the launcher re-enables inheritance
/// only on the copy it places at the handshake descriptor number.
///
/// # Errors
///
/// Returns an error if the pipe cannot be created.
pub fn channel() -> Result<(HandshakeSender, HandshakeReceiver)> {
    let (read, write) = nix::unistd::pipe2(OFlag::O_CLOEXEC).map_err(|e| CellarError::Process {
        message: format!("handshake pipe creation failed: {e}"),
    })?;
    tracing::debug!(
        read_fd = read.as_raw_fd(),
        write_fd = write.as_raw_fd(),
        "handshake channel created"
    );
    Ok((
        HandshakeSender {
            file: File::from(write),
        },
        HandshakeReceiver { fd: read },
    ))
}

impl HandshakeSender {
    /// Sends `message` and closes the write end.
    ///
    /// # Errors
    ///
    /// Returns `CellarError::Config` if `message` is longer than
    /// [`MAX_COMMAND_BYTES`], or an error if the write fails. The write end is
    /// closed either way.
    pub fn send(mut self, message: &str) -> Result<()> {
        if message.len() > MAX_COMMAND_BYTES {
            return Err(CellarError::Config {
                message: format!(
                    "command is {} bytes, the limit is {MAX_COMMAND_BYTES}",
                    message.len()
                ),
            });
        }
        self.file
            .write_all(message.as_bytes())
            .map_err(|e| CellarError::Io {
                path: "handshake".into(),
                source: e,
            })?;
        tracing::debug!(bytes = message.len(), "handshake message sent");
        Ok(())
    }
}

impl HandshakeReceiver {
    /// Adopts the handshake descriptor inherited from the launcher.
    ///
    /// # Errors
    ///
    /// Returns an error if no descriptor is open at
    /// [`HANDSHAKE_FD`](cellar_common::constants::HANDSHAKE_FD).
    pub fn inherited() -> Result<Self> {
        // SAFETY: F_GETFD only inspects the descriptor table entry.
        let flags = unsafe { libc::fcntl(HANDSHAKE_FD, libc::F_GETFD) };
        if flags < 0 {
            return Err(CellarError::Process {
                message: format!(
                    "handshake descriptor {HANDSHAKE_FD} is not open: {}",
                    std::io::Error::last_os_error()
                ),
            });
        }
        // SAFETY: the descriptor is open and was placed there by the launcher
        // for this process alone; nothing else in the process owns it.
        let fd = unsafe { OwnedFd::from_raw_fd(HANDSHAKE_FD) };
        Ok(Self { fd })
    }

    /// Reads the whole message, then closes the read end.
    ///
    /// A closed channel with nothing written yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the message is not UTF-8.
    pub fn recv(self) -> Result<String> {
        let mut file = File::from(self.fd);
        let mut message = String::new();
        let _ = file
            .read_to_string(&mut message)
            .map_err(|e| CellarError::Io {
                path: "handshake".into(),
                source: e,
            })?;
        tracing::debug!(bytes = message.len(), "handshake message received");
        Ok(message)
    }
}

impl AsFd for HandshakeReceiver {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for HandshakeReceiver {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
