//! Container launch orchestration for the cellar runtime.
//!
//! [`engine::Engine::run`] drives one container from image to teardown:
//! materialize the base image, build the layered root, hand the command over
//! the handshake pipe, clone the init process into new namespaces, bind it to
//! its cgroup, record it, and (for interactive runs) wait for it.
//!
//! The collaborators the engine talks to sit behind traits:
//! [`launcher::ProcessLauncher`], [`binder::ResourceBinder`],
//! [`recorder::LifecycleRecorder`], [`logs::LogProvider`], and
//! [`cellar_core::filesystem::mount::Mounter`].

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod binder;
pub mod container;
pub mod engine;
pub mod init;
pub mod launcher;
pub mod logs;
pub mod recorder;
