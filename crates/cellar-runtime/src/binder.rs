//! Resource binding: attaching a launched process to its resource limits.
//!
//! The engine only guarantees the call order `create`, `attach(pid)`, and
//! finally `destroy`. [`BinderGuard`] makes the last step unconditional.

use std::path::PathBuf;

use cellar_common::config::RuntimeConfig;
use cellar_common::error::{CellarError, Result};
use cellar_common::types::{ContainerId, ResourceLimits};
use cellar_core::cgroup::CgroupManager;

/// Applies resource limits to one container's process.
pub trait ResourceBinder {
    /// Creates the resource-control group and configures its limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the group cannot be created or configured.
    fn create(&mut self) -> Result<()>;

    /// Moves `pid` into the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be attached.
    fn attach(&mut self, pid: u32) -> Result<()>;

    /// Releases the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the group cannot be removed.
    fn destroy(&mut self) -> Result<()>;
}

/// Produces a [`ResourceBinder`] for each launched container.
pub trait BinderFactory {
    /// Returns a binder for container `id` with `limits`.
    fn binder(&self, id: &ContainerId, limits: &ResourceLimits) -> Box<dyn ResourceBinder>;
}

impl<F> BinderFactory for F
where
    F: Fn(&ContainerId, &ResourceLimits) -> Box<dyn ResourceBinder>,
{
    fn binder(&self, id: &ContainerId, limits: &ResourceLimits) -> Box<dyn ResourceBinder> {
        self(id, limits)
    }
}

/// [`ResourceBinder`] backed by a cgroups v2 directory.
#[derive(Debug)]
pub struct CgroupBinder {
    cgroup_root: PathBuf,
    id: ContainerId,
    limits: ResourceLimits,
    manager: Option<CgroupManager>,
}

impl CgroupBinder {
    /// Creates a binder that will manage `<cgroup_root>/cellar/<id>`.
    #[must_use]
    pub fn new(cgroup_root: impl Into<PathBuf>, id: ContainerId, limits: ResourceLimits) -> Self {
        Self {
            cgroup_root: cgroup_root.into(),
            id,
            limits,
            manager: None,
        }
    }

    fn manager(&self) -> Result<&CgroupManager> {
        self.manager.as_ref().ok_or_else(|| CellarError::NotFound {
            kind: "cgroup",
            id: self.id.to_string(),
        })
    }
}

impl ResourceBinder for CgroupBinder {
    fn create(&mut self) -> Result<()> {
        // Kept before limits are applied so destroy removes the directory
        // even when a limit write fails.
        let manager = self
            .manager
            .insert(CgroupManager::create(&self.cgroup_root, self.id.as_str())?);
        manager.apply_limits(&self.limits)
    }

    fn attach(&mut self, pid: u32) -> Result<()> {
        self.manager()?.add_process(pid)
    }

    fn destroy(&mut self) -> Result<()> {
        match self.manager.take() {
            Some(manager) => manager.destroy(),
            None => Ok(()),
        }
    }
}

/// [`BinderFactory`] producing [`CgroupBinder`]s under one cgroup root.
#[derive(Debug, Clone)]
pub struct CgroupBinderFactory {
    cgroup_root: PathBuf,
}

impl CgroupBinderFactory {
    /// Creates a factory rooted at `cgroup_root`.
    #[must_use]
    pub fn new(cgroup_root: impl Into<PathBuf>) -> Self {
        Self {
            cgroup_root: cgroup_root.into(),
        }
    }

    /// Creates a factory from the runtime configuration.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.cgroup_root.clone())
    }
}

impl BinderFactory for CgroupBinderFactory {
    fn binder(&self, id: &ContainerId, limits: &ResourceLimits) -> Box<dyn ResourceBinder> {
        Box::new(CgroupBinder::new(
            self.cgroup_root.clone(),
            id.clone(),
            limits.clone(),
        ))
    }
}

/// Owns a [`ResourceBinder`] and destroys it exactly once.
///
/// Destruction happens on [`release`](Self::release) or on drop, whichever
/// comes first.
pub struct BinderGuard {
    binder: Box<dyn ResourceBinder>,
    destroyed: bool,
}

impl BinderGuard {
    /// Wraps `binder`; its destroy step is now guaranteed.
    #[must_use]
    pub fn new(binder: Box<dyn ResourceBinder>) -> Self {
        Self {
            binder,
            destroyed: false,
        }
    }

    /// Creates the group and attaches `pid` to it.
    ///
    /// The process is already running, so failures are logged rather than
    /// returned; the container runs without limits in that case.
    pub fn bind(&mut self, pid: u32) {
        if let Err(e) = self.binder.create() {
            tracing::warn!(pid, error = %e, "resource group creation failed");
            return;
        }
        match self.binder.attach(pid) {
            Ok(()) => tracing::debug!(pid, "resource limits attached"),
            Err(e) => tracing::warn!(pid, error = %e, "resource attach failed"),
        }
    }

    /// Destroys the binder now.
    pub fn release(mut self) {
        self.destroy();
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Err(e) = self.binder.destroy() {
            tracing::warn!(error = %e, "resource group destroy failed");
        }
    }
}

impl Drop for BinderGuard {
    fn drop(&mut self) {
        self.destroy();
    }
}
