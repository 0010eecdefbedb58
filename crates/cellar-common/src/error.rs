//! Unified error types for the cellar workspace.
//!
//! Every fallible operation in the library crates returns [`CellarError`].
//! Root filesystem construction wraps the underlying failure in
//! [`CellarError::Rootfs`] so callers can tell which step broke.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RootfsStep;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CellarError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A permission or capability error.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denied operation.
        message: String,
    },

    /// A mount or unmount syscall failed.
    #[error("mount operation on {target} failed: {message}")]
    Mount {
        /// Mount target the operation acted on.
        target: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Creating, waiting on, or exec'ing a process failed.
    #[error("process error: {message}")]
    Process {
        /// Description of the failure.
        message: String,
    },

    /// Layered root filesystem construction failed at a specific step.
    #[error("rootfs construction failed at {step}: {source}")]
    Rootfs {
        /// The construction step that failed.
        step: RootfsStep,
        /// The failure reported by that step.
        source: Box<CellarError>,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl CellarError {
    /// Wraps an error as the failure of a root filesystem construction step.
    #[must_use]
    pub fn at_step(self, step: RootfsStep) -> Self {
        Self::Rootfs {
            step,
            source: Box::new(self),
        }
    }

    /// Returns the failing construction step, if this is a rootfs error.
    #[must_use]
    pub const fn rootfs_step(&self) -> Option<&RootfsStep> {
        match self {
            Self::Rootfs { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CellarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_step_reports_the_failing_step() {
        let err = CellarError::Io {
            path: PathBuf::from("/root/writerLayer"),
            source: std::io::Error::from(std::io::ErrorKind::AlreadyExists),
        }
        .at_step(RootfsStep::WriterLayer);

        assert_eq!(err.rootfs_step(), Some(&RootfsStep::WriterLayer));
        let msg = err.to_string();
        assert!(msg.contains("writable layer"), "{msg}");
        assert!(msg.contains("/root/writerLayer"), "{msg}");
    }

    #[test]
    fn non_rootfs_errors_have_no_step() {
        let err = CellarError::Config {
            message: "bad".into(),
        };
        assert!(err.rootfs_step().is_none());
    }
}
