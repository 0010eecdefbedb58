//! Individual cgroups v2 control-file writes.

use std::path::Path;

use cellar_common::error::{CellarError, Result};
use cellar_common::types::ResourceLimits;

/// One limit, expressed as the control file that enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// `memory.max` in bytes.
    MemoryMax(u64),
    /// `cpu.weight` in 1..=10000.
    CpuWeight(u64),
    /// `cpuset.cpus` in list syntax, e.g. `0-2,4`.
    CpusetCpus(String),
}

impl Control {
    /// Translates resource limits into control writes; unset limits produce none.
    #[must_use]
    pub fn from_limits(limits: &ResourceLimits) -> Vec<Self> {
        let mut controls = Vec::new();
        if let Some(bytes) = limits.memory_bytes {
            controls.push(Self::MemoryMax(bytes));
        }
        if let Some(shares) = limits.cpu_shares {
            controls.push(Self::CpuWeight(shares_to_weight(shares)));
        }
        if let Some(cpus) = &limits.cpuset_cpus {
            controls.push(Self::CpusetCpus(cpus.clone()));
        }
        controls
    }

    /// Controller that must be enabled in the parent for this file to exist.
    #[must_use]
    pub const fn controller(&self) -> &'static str {
        match self {
            Self::MemoryMax(_) => "memory",
            Self::CpuWeight(_) => "cpu",
            Self::CpusetCpus(_) => "cpuset",
        }
    }

    /// Control file name inside the cgroup directory.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::MemoryMax(_) => "memory.max",
            Self::CpuWeight(_) => "cpu.weight",
            Self::CpusetCpus(_) => "cpuset.cpus",
        }
    }

    fn value(&self) -> String {
        match self {
            Self::MemoryMax(n) | Self::CpuWeight(n) => n.to_string(),
            Self::CpusetCpus(cpus) => cpus.clone(),
        }
    }

    /// Writes this control into `cgroup_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the control file cannot be written.
    pub fn write(&self, cgroup_path: &Path) -> Result<()> {
        let file = cgroup_path.join(self.file_name());
        let value = self.value();
        std::fs::write(&file, &value).map_err(|e| CellarError::Io {
            path: file.clone(),
            source: e,
        })?;
        tracing::debug!(file = %file.display(), value = %value, "cgroup control written");
        Ok(())
    }
}

/// Converts cgroup v1 CPU shares (2..=262144) to a v2 weight (1..=10000).
///
/// Linear mapping shared with other OCI runtimes; `1024` shares gives `39`.
#[must_use]
pub fn shares_to_weight(shares: u64) -> u64 {
    let shares = shares.clamp(2, 262_144);
    1 + ((shares - 2) * 9999) / 262_142
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_map_onto_weight_range() {
        assert_eq!(shares_to_weight(2), 1);
        assert_eq!(shares_to_weight(1024), 39);
        assert_eq!(shares_to_weight(262_144), 10_000);
        assert_eq!(shares_to_weight(0), 1);
        assert_eq!(shares_to_weight(u64::MAX), 10_000);
    }

    #[test]
    fn only_set_limits_become_controls() {
        let limits = ResourceLimits {
            memory_bytes: Some(4096),
            cpu_shares: None,
            cpuset_cpus: Some("1".into()),
        };
        assert_eq!(
            Control::from_limits(&limits),
            [Control::MemoryMax(4096), Control::CpusetCpus("1".into())]
        );
        assert!(Control::from_limits(&ResourceLimits::default()).is_empty());
    }

    #[test]
    fn write_targets_the_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        Control::CpuWeight(39).write(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("cpu.weight")).unwrap(), "39");
        assert_eq!(Control::CpuWeight(1).controller(), "cpu");
    }
}
