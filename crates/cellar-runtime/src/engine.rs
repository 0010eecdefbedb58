//! Runtime engine that orchestrates a single container run.

use std::fmt;
use std::path::PathBuf;

use cellar_common::config::RuntimeConfig;
use cellar_common::error::Result;
use cellar_common::types::{ContainerId, ResourceLimits, validate_container_name};
use cellar_core::filesystem::layout::RootLayout;
use cellar_core::filesystem::mount::{Mounter, SyscallMounter};
use cellar_core::filesystem::rootfs::RootfsGuard;
use cellar_core::filesystem::volume::VolumeSpec;
use cellar_core::handshake;
use cellar_core::namespace::IsolationProfile;
use cellar_image::materialize::ImageMaterializer;

use crate::binder::{BinderFactory, BinderGuard, CgroupBinderFactory};
use crate::container::Container;
use crate::launcher::{LaunchRequest, LaunchStdio, NamespaceLauncher, ProcessLauncher};
use crate::logs::{FileLogProvider, LogProvider};
use crate::recorder::{JsonStateRecorder, LifecycleRecorder};

/// Parameters of one `run`.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Command line executed by the init process.
    pub command: String,
    /// Interactive run: inherit stdio and wait for exit.
    pub tty: bool,
    /// Root holding the image archive; `None` selects the configured default.
    pub root: Option<PathBuf>,
    /// Container name; defaults to the generated ID.
    pub name: Option<String>,
    /// Host directories grafted into the container root.
    pub volumes: Vec<VolumeSpec>,
    /// Resource limits; empty limits fall back to the configured defaults.
    pub limits: ResourceLimits,
}

impl RunRequest {
    /// Creates a request for `command` with every option at its default.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }
}

/// Result of [`Engine::run`].
#[derive(Debug)]
pub enum RunOutcome {
    /// An interactive container ran to completion.
    Exited {
        /// Final container state.
        container: Container,
        /// Exit code of the init process.
        exit_code: i32,
    },
    /// A detached container was started and left running.
    Detached(DetachedContainer),
}

/// A container left running after [`Engine::run`] returned.
///
/// Owns the container's resource binding, which is destroyed when the handle
/// is released or dropped.
pub struct DetachedContainer {
    container: Container,
    binder: BinderGuard,
}

impl DetachedContainer {
    /// The detached container.
    #[must_use]
    pub const fn container(&self) -> &Container {
        &self.container
    }

    /// Destroys the resource binding now.
    pub fn release(self) {
        tracing::debug!(id = %self.container.id, "releasing detached container");
        self.binder.release();
    }
}

impl fmt::Debug for DetachedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetachedContainer")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// The runtime engine that coordinates one container run.
///
/// Every collaborator is replaceable so the orchestration can be driven
/// without privileges.
pub struct Engine {
    config: RuntimeConfig,
    materializer: ImageMaterializer,
    mounter: Box<dyn Mounter>,
    launcher: Box<dyn ProcessLauncher>,
    recorder: Box<dyn LifecycleRecorder>,
    logs: Box<dyn LogProvider>,
    binders: Box<dyn BinderFactory>,
}

impl Engine {
    /// Creates an engine backed by real mounts, namespaces, and cgroups.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            materializer: ImageMaterializer::from_config(&config),
            mounter: Box::new(SyscallMounter),
            launcher: Box::new(NamespaceLauncher::default()),
            recorder: Box::new(JsonStateRecorder::from_config(&config)),
            logs: Box::new(FileLogProvider::from_config(&config)),
            binders: Box::new(CgroupBinderFactory::from_config(&config)),
            config,
        }
    }

    /// Replaces the mounter used to build and tear down roots.
    #[must_use]
    pub fn with_mounter(mut self, mounter: impl Mounter + 'static) -> Self {
        self.mounter = Box::new(mounter);
        self
    }

    /// Replaces the process launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: impl ProcessLauncher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    /// Replaces the lifecycle recorder.
    #[must_use]
    pub fn with_recorder(mut self, recorder: impl LifecycleRecorder + 'static) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    /// Replaces the log provider for detached containers.
    #[must_use]
    pub fn with_log_provider(mut self, logs: impl LogProvider + 'static) -> Self {
        self.logs = Box::new(logs);
        self
    }

    /// Replaces the resource binder factory.
    #[must_use]
    pub fn with_binder_factory(mut self, binders: impl BinderFactory + 'static) -> Self {
        self.binders = Box::new(binders);
        self
    }

    /// Returns the runtime configuration.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Runs `request.command` in a new isolated container.
    ///
    /// The layered root is torn down before this returns, whatever the
    /// outcome. Interactive runs block until the init process exits; detached
    /// runs return as soon as the process is bound and recorded.
    ///
    /// If the layered root cannot be built, the container runs directly from
    /// the base image directory and its volumes are unavailable.
    ///
    /// # Errors
    ///
    /// Returns `CellarError::Config` for an invalid container name or an
    /// oversized command. Otherwise returns an error if the handshake channel
    /// cannot be created or written, if the init process cannot be started,
    /// or if waiting for an interactive container fails.
    pub fn run(&self, request: RunRequest) -> Result<RunOutcome> {
        if let Some(name) = request.name.as_deref().filter(|n| !n.is_empty()) {
            validate_container_name(name)?;
        }
        let root = self.materializer.materialize(request.root.as_deref());
        let layout = RootLayout::new(&root, &self.config.image);
        let (sender, receiver) = handshake::channel()?;

        let rootfs = RootfsGuard::new(&layout, &request.volumes, self.mounter.as_ref());
        let working_dir = rootfs.build().unwrap_or_else(|e| {
            tracing::warn!(
                root = %root.display(),
                step = ?e.rootfs_step(),
                error = %e,
                "layered root construction failed, running from base image"
            );
            layout.base_layer()
        });
        sender.send(&request.command)?;

        let mut container = Container::new(
            ContainerId::generate(),
            request.name.clone(),
            request.command.clone(),
            request.tty,
            root.clone(),
            request.volumes.clone(),
        );
        let stdio = if request.tty {
            LaunchStdio::Inherit
        } else {
            LaunchStdio::Detached {
                log: self.open_log(&container.name),
            }
        };

        let mut process = self.launcher.launch(LaunchRequest {
            working_dir,
            stdio,
            handshake: receiver,
            profile: IsolationProfile::default(),
        })?;
        let pid = process.pid();
        container.mark_running(pid);

        let limits = if request.limits.is_empty() {
            &self.config.default_limits
        } else {
            &request.limits
        };
        let mut binder = BinderGuard::new(self.binders.binder(&container.id, limits));
        binder.bind(pid);

        if let Err(e) =
            self.recorder
                .record(pid, &container.name, &container.id, &container.command)
        {
            tracing::warn!(id = %container.id, error = %e, "recording container failed");
        }

        if !request.tty {
            tracing::info!(id = %container.id, name = %container.name, pid, "container detached");
            return Ok(RunOutcome::Detached(DetachedContainer { container, binder }));
        }

        let waited = process.wait();
        container.mark_stopped();
        if let Err(e) = self.recorder.remove(&container.name) {
            tracing::warn!(name = %container.name, error = %e, "removing container record failed");
        }
        let exit_code = waited?;
        Ok(RunOutcome::Exited {
            container,
            exit_code,
        })
    }

    fn open_log(&self, name: &str) -> Option<std::fs::File> {
        match self.logs.open_log_file(name) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(name, error = %e, "log file unavailable, discarding output");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_request_defaults() {
        let req = RunRequest::new("sh");
        assert_eq!(req.command, "sh");
        assert!(!req.tty);
        assert!(req.root.is_none());
        assert!(req.volumes.is_empty());
        assert!(req.limits.is_empty());
    }

    #[test]
    fn engine_keeps_config() {
        let config = RuntimeConfig::default().with_image("alpine");
        let engine = Engine::new(config.clone());
        assert_eq!(engine.config(), &config);
    }
}
