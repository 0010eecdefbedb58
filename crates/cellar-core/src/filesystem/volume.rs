//! Host directory volumes grafted into a container root.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use cellar_common::error::{CellarError, Result};

/// A `hostPath:containerPath` volume specification.
///
/// Both components are non-empty. The container path is interpreted relative
/// to the container's mount point and may not contain `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeSpec {
    host_path: PathBuf,
    container_path: PathBuf,
}

impl VolumeSpec {
    /// Parses a `hostPath:containerPath` string.
    ///
    /// # Errors
    ///
    /// Returns `CellarError::Config` if there is not exactly one separator,
    /// either side is empty, or the container path has `.` or `..`
    /// components.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| CellarError::Config {
            message: format!("invalid volume spec {spec:?}: {reason}"),
        };
        let (host, container) = spec
            .split_once(':')
            .ok_or_else(|| invalid("expected hostPath:containerPath"))?;
        if container.contains(':') {
            return Err(invalid("expected exactly one ':'"));
        }
        if host.is_empty() {
            return Err(invalid("host path is empty"));
        }
        if container.trim_start_matches('/').is_empty() {
            return Err(invalid("container path is empty"));
        }
        if container
            .split('/')
            .any(|part| part == "." || part == "..")
        {
            return Err(invalid("container path may not contain '.' or '..'"));
        }
        Ok(Self {
            host_path: PathBuf::from(host),
            container_path: PathBuf::from(container),
        })
    }

    /// Parses every non-empty entry of `specs`, skipping blank strings.
    ///
    /// # Errors
    ///
    /// Returns the first parse failure.
    pub fn parse_all<S: AsRef<str>>(specs: &[S]) -> Result<Vec<Self>> {
        specs
            .iter()
            .map(AsRef::as_ref)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Returns the host-side directory.
    #[must_use]
    pub fn host_path(&self) -> &Path {
        &self.host_path
    }

    /// Returns the container-side path as written in the spec.
    #[must_use]
    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    /// Resolves the container-side path under `mount_point`.
    ///
    /// Only normal components are joined, so the result always lies inside
    /// `mount_point`.
    #[must_use]
    pub fn target_under(&self, mount_point: &Path) -> PathBuf {
        self.container_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .fold(mount_point.to_path_buf(), |target, part| target.join(part))
    }
}

impl FromStr for VolumeSpec {
    type Err = CellarError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VolumeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.host_path.display(),
            self.container_path.display()
        )
    }
}
