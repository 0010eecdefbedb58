//! # cellar-image
//!
//! Base image handling for the cellar runtime.
//!
//! Handles:
//! - **Layers**: extracting a base image archive into a directory tree.
//! - **Hashing**: SHA-256 digests of archives for provenance logging.
//! - **Materialization**: resolving a usable root, degrading to the
//!   configured default whenever the image cannot be prepared.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod hash;
pub mod layer;
pub mod materialize;
