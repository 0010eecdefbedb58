//! Linux namespace management for container isolation.
//!
//! A container is always cloned into the same set of new namespaces, so the
//! set is modelled as an [`IsolationProfile`] rather than independent flags.

pub mod mount;

use std::fmt;

use nix::sched::CloneFlags;

/// A single kind of Linux namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    /// Hostname and domain name.
    Uts,
    /// Process ID space; the first process becomes PID 1.
    Pid,
    /// Mount table.
    Mount,
    /// Network stack.
    Network,
    /// System V IPC and POSIX message queues.
    Ipc,
}

impl NamespaceKind {
    /// Returns the clone flag that requests a new namespace of this kind.
    #[must_use]
    pub const fn clone_flag(self) -> CloneFlags {
        match self {
            Self::Uts => CloneFlags::CLONE_NEWUTS,
            Self::Pid => CloneFlags::CLONE_NEWPID,
            Self::Mount => CloneFlags::CLONE_NEWNS,
            Self::Network => CloneFlags::CLONE_NEWNET,
            Self::Ipc => CloneFlags::CLONE_NEWIPC,
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uts => "uts",
            Self::Pid => "pid",
            Self::Mount => "mnt",
            Self::Network => "net",
            Self::Ipc => "ipc",
        };
        f.write_str(name)
    }
}

/// The set of namespaces a launched container process is cloned into.
///
/// Partial isolation is not a supported mode, so there is no way to build a
/// profile from individual namespace kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IsolationProfile {
    /// New UTS, PID, mount, network, and IPC namespaces, requested together.
    #[default]
    Container,
}

impl IsolationProfile {
    /// Returns the namespace kinds this profile creates.
    #[must_use]
    pub const fn namespaces(self) -> &'static [NamespaceKind] {
        match self {
            Self::Container => &[
                NamespaceKind::Uts,
                NamespaceKind::Pid,
                NamespaceKind::Mount,
                NamespaceKind::Network,
                NamespaceKind::Ipc,
            ],
        }
    }

    /// Returns the combined clone flags for this profile.
    #[must_use]
    pub fn clone_flags(self) -> CloneFlags {
        self.namespaces()
            .iter()
            .fold(CloneFlags::empty(), |flags, kind| flags | kind.clone_flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_profile_requests_all_five_namespaces() {
        let flags = IsolationProfile::Container.clone_flags();
        assert_eq!(
            flags,
            CloneFlags::CLONE_NEWUTS
                | CloneFlags::CLONE_NEWPID
                | CloneFlags::CLONE_NEWNS
                | CloneFlags::CLONE_NEWNET
                | CloneFlags::CLONE_NEWIPC
        );
    }

    #[test]
    fn container_profile_excludes_user_namespace() {
        let flags = IsolationProfile::default().clone_flags();
        assert!(!flags.contains(CloneFlags::CLONE_NEWUSER));
    }

    #[test]
    fn namespace_kinds_display_like_proc_entries() {
        let names: Vec<String> = IsolationProfile::Container
            .namespaces()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["uts", "pid", "mnt", "net", "ipc"]);
    }
}
