//! # cellar-core
//!
//! Low-level Linux isolation primitives for the cellar runtime.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: the fixed isolation profile a container is cloned with.
//! - **Handshake**: the single-shot pipe that carries the command to init.
//! - **Filesystem**: overlay root construction, volumes, teardown, `pivot_root`.
//! - **Cgroups v2**: CPU, cpuset, and memory resource limiting.
//!
//! The crate targets Linux only. All unsafe system calls are encapsulated
//! in safe wrappers with proper error handling and `// SAFETY:` documentation.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod handshake;
pub mod namespace;
