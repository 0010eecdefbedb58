//! Filesystem management for container isolation.
//!
//! Provides the on-disk layout of a container root, `OverlayFS` and bind
//! mounts behind the [`mount::Mounter`] seam, layered root construction with
//! guaranteed teardown, and `pivot_root` for the init process.

pub mod layout;
pub mod mount;
pub mod overlayfs;
pub mod pivot_root;
pub mod rootfs;
pub mod volume;
