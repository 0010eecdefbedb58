//! System-wide constants and default paths.

/// Root used when none is given, or when the base image cannot be materialized.
pub const DEFAULT_ROOT: &str = "/var/lib/cellar/default";

/// Name of the base image; its archive is `<root>/<image>.tar`.
pub const DEFAULT_IMAGE: &str = "busybox";

/// Directory holding per-container records and logs.
pub const DEFAULT_STATE_DIR: &str = "/var/run/cellar";

/// Cgroups v2 unified hierarchy mount point.
pub const CGROUP_V2_PATH: &str = "/sys/fs/cgroup";

/// Sub-hierarchy under the cgroup root that holds container cgroups.
pub const CGROUP_PARENT: &str = "cellar";

/// Per-container writable layer directory under the root.
pub const WRITER_LAYER_DIR: &str = "writerLayer";

/// Overlayfs work directory under the root, paired with the writable layer.
pub const WORK_LAYER_DIR: &str = "workLayer";

/// Union mount point directory under the root.
pub const MOUNT_POINT_DIR: &str = "mnt";

/// File extension of base image archives.
pub const IMAGE_ARCHIVE_EXTENSION: &str = "tar";

/// Subcommand the launcher re-executes itself with.
pub const INIT_SUBCOMMAND: &str = "init";

/// Path the launcher re-executes.
pub const SELF_EXE: &str = "/proc/self/exe";

/// Descriptor number the handshake read end occupies in the init process.
pub const HANDSHAKE_FD: i32 = 3;

/// Largest command the handshake accepts, in bytes.
///
/// The command is written before the init process exists, so it must fit in
/// the pipe without a reader; Linux guarantees `PIPE_BUF` (4096).
pub const MAX_COMMAND_BYTES: usize = 4096;

/// Record file name inside a container's state directory.
pub const RECORD_FILE: &str = "config.json";

/// Log file name inside a container's state directory.
pub const LOG_FILE: &str = "container.log";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "cellar";
