//! `cellar init`: Container init process, started by `cellar run`.

use cellar_runtime::init::run_init;

/// Executes the `init` command.
///
/// Never returns successfully: on success the process is replaced by the
/// container command.
///
/// # Errors
///
/// Returns an error if the container command cannot be started.
pub fn execute() -> anyhow::Result<i32> {
    match run_init() {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}
