//! Launching the container init process into fresh namespaces.
//!
//! [`NamespaceLauncher`] clones the current process with the isolation
//! profile's namespace flags and immediately re-executes `/proc/self/exe init`
//! in the child. Namespaces are therefore created at clone time, and the init
//! process is PID 1 of its new PID namespace.
//!
//! Between clone and exec the child only rewires descriptors and changes
//! directory: standard streams, then the handshake read end onto
//! descriptor 3.

use std::ffi::{CStr, CString};
use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use cellar_common::constants::{HANDSHAKE_FD, INIT_SUBCOMMAND, SELF_EXE};
use cellar_common::error::{CellarError, Result};
use cellar_core::handshake::HandshakeReceiver;
use cellar_core::namespace::IsolationProfile;
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

const STACK_SIZE: usize = 1024 * 1024;

/// Exit code of the cloned child when descriptor setup fails before exec.
const SETUP_FAILED: isize = 126;
/// Exit code of the cloned child when exec itself fails.
const EXEC_FAILED: isize = 127;

/// How the init process's standard streams are connected.
#[derive(Debug)]
pub enum LaunchStdio {
    /// Share the launcher's stdin, stdout, and stderr.
    Inherit,
    /// Stdout goes to `log` (or nowhere if absent); stdin and stderr are not connected.
    Detached {
        /// Log file receiving stdout.
        log: Option<File>,
    },
}

/// Everything needed to start one init process.
#[derive(Debug)]
pub struct LaunchRequest {
    /// Working directory of the init process: the container root.
    pub working_dir: PathBuf,
    /// Standard stream wiring.
    pub stdio: LaunchStdio,
    /// Read end of the handshake channel, inherited as descriptor 3.
    pub handshake: HandshakeReceiver,
    /// Namespaces to create.
    pub profile: IsolationProfile,
}

/// A started init process.
pub trait LaunchedProcess {
    /// PID of the process in the launcher's PID namespace.
    fn pid(&self) -> u32;

    /// Blocks until the process exits and returns its exit code.
    ///
    /// A process killed by a signal reports `128 + signal`.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    fn wait(&mut self) -> Result<i32>;
}

/// Starts init processes.
pub trait ProcessLauncher {
    /// Starts the init process described by `request` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    fn launch(&self, request: LaunchRequest) -> Result<Box<dyn LaunchedProcess>>;
}

/// [`ProcessLauncher`] that clones into new namespaces and re-executes itself.
#[derive(Debug, Clone)]
pub struct NamespaceLauncher {
    exe: PathBuf,
}

impl NamespaceLauncher {
    /// Creates a launcher that re-executes `exe` with the `init` subcommand.
    #[must_use]
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }
}

impl Default for NamespaceLauncher {
    fn default() -> Self {
        Self::new(SELF_EXE)
    }
}

/// Descriptors to place on 0, 1, and 2 in the child; `None` leaves the
/// inherited stream in place.
#[derive(Debug, Clone, Copy)]
struct StdioFds {
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    stderr: Option<RawFd>,
}

fn path_cstring(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| CellarError::Config {
        message: format!("path contains a NUL byte: {}", path.display()),
    })
}

fn open_dev_null() -> Result<File> {
    File::options()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| CellarError::Io {
            path: "/dev/null".into(),
            source: e,
        })
}

impl ProcessLauncher for NamespaceLauncher {
    fn launch(&self, request: LaunchRequest) -> Result<Box<dyn LaunchedProcess>> {
        let exe = path_cstring(&self.exe)?;
        let init = CString::new(INIT_SUBCOMMAND).map_err(|_| CellarError::Config {
            message: "init subcommand contains a NUL byte".into(),
        })?;
        let dir = path_cstring(&request.working_dir)?;
        let argv = [exe.as_ptr(), init.as_ptr(), std::ptr::null()];

        let null = match request.stdio {
            LaunchStdio::Inherit => None,
            LaunchStdio::Detached { .. } => Some(open_dev_null()?),
        };
        let stdio = match (&request.stdio, &null) {
            (LaunchStdio::Detached { log }, Some(null)) => StdioFds {
                stdin: Some(null.as_raw_fd()),
                stdout: Some(log.as_ref().unwrap_or(null).as_raw_fd()),
                stderr: Some(null.as_raw_fd()),
            },
            _ => StdioFds {
                stdin: None,
                stdout: None,
                stderr: None,
            },
        };
        let handshake_fd = request.handshake.as_raw_fd();

        let mut stack = vec![0u8; STACK_SIZE];
        let child_main: nix::sched::CloneCb<'_> =
            Box::new(|| exec_init(&argv, &dir, stdio, handshake_fd));
        // SAFETY: the child gets a copy-on-write image of this single-threaded
        // launcher and only performs async-signal-safe calls before execv.
        let pid = unsafe {
            nix::sched::clone(
                child_main,
                &mut stack,
                request.profile.clone_flags(),
                Some(libc::SIGCHLD),
            )
        }
        .map_err(|e| CellarError::Process {
            message: format!("cloning init process into new namespaces failed: {e}"),
        })?;

        let raw_pid = u32::try_from(pid.as_raw()).map_err(|_| CellarError::Process {
            message: format!("clone returned invalid pid {pid}"),
        })?;
        tracing::info!(
            pid = raw_pid,
            dir = %request.working_dir.display(),
            namespaces = ?request.profile.namespaces(),
            "init process started"
        );
        Ok(Box::new(InitProcess { pid }))
    }
}

/// Runs in the cloned child: rewires descriptors, then execs init.
fn exec_init(
    argv: &[*const libc::c_char; 3],
    dir: &CStr,
    stdio: StdioFds,
    handshake_fd: RawFd,
) -> isize {
    // SAFETY: plain descriptor and exec syscalls on descriptors the parent
    // kept open across the clone; pointers come from live CStrings.
    unsafe {
        for (src, dst) in [(stdio.stdin, 0), (stdio.stdout, 1), (stdio.stderr, 2)] {
            if let Some(src) = src {
                if libc::dup2(src, dst) < 0 {
                    return SETUP_FAILED;
                }
            }
        }
        if handshake_fd == HANDSHAKE_FD {
            if libc::fcntl(handshake_fd, libc::F_SETFD, 0) < 0 {
                return SETUP_FAILED;
            }
        } else if libc::dup2(handshake_fd, HANDSHAKE_FD) < 0 {
            return SETUP_FAILED;
        }
        if libc::chdir(dir.as_ptr()) < 0 {
            return SETUP_FAILED;
        }
        let _ = libc::execv(argv[0], argv.as_ptr());
    }
    EXEC_FAILED
}

/// A running init process started by [`NamespaceLauncher`].
#[derive(Debug)]
struct InitProcess {
    pid: Pid,
}

impl LaunchedProcess for InitProcess {
    fn pid(&self) -> u32 {
        self.pid.as_raw().unsigned_abs()
    }

    fn wait(&mut self) -> Result<i32> {
        loop {
            match waitpid(self.pid, None) {
                Ok(WaitStatus::Exited(_, code)) => {
                    tracing::info!(pid = %self.pid, code, "init process exited");
                    return Ok(code);
                }
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    tracing::info!(pid = %self.pid, ?signal, "init process killed");
                    return Ok(128 + signal as i32);
                }
                Ok(_) | Err(Errno::EINTR) => {}
                Err(e) => {
                    return Err(CellarError::Process {
                        message: format!("waiting for pid {} failed: {e}", self.pid),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_launcher_reexecutes_self() {
        assert_eq!(NamespaceLauncher::default().exe, PathBuf::from("/proc/self/exe"));
    }

    #[test]
    fn nul_in_working_dir_is_rejected() {
        let bad = PathBuf::from(std::ffi::OsStr::from_bytes(b"/tmp/a\0b"));
        assert!(path_cstring(&bad).is_err());
    }

    #[test]
    #[ignore = "requires CAP_SYS_ADMIN to create namespaces"]
    fn clone_runs_in_new_pid_namespace() {
        let (tx, rx) = cellar_core::handshake::channel().unwrap();
        tx.send("unused").unwrap();
        let launcher = NamespaceLauncher::new("/bin/true");
        let mut child = launcher
            .launch(LaunchRequest {
                working_dir: PathBuf::from("/"),
                stdio: LaunchStdio::Detached { log: None },
                handshake: rx,
                profile: IsolationProfile::Container,
            })
            .unwrap();
        assert!(child.pid() > 0);
        assert_eq!(child.wait().unwrap(), 0);
    }
}
