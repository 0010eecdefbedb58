//! `cellar logs`: Print a detached container's output.

use cellar_common::config::RuntimeConfig;
use cellar_runtime::logs::FileLogProvider;
use clap::Args;

/// Arguments for the `logs` command.
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Container name.
    pub container: String,
}

/// Executes the `logs` command.
///
/// # Errors
///
/// Returns an error if the log file exists but cannot be read.
pub fn execute(args: &LogsArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    let logs = FileLogProvider::from_config(config).read_logs(&args.container)?;

    if logs.is_empty() {
        println!("No logs available for container: {}", args.container);
    } else {
        print!("{logs}");
    }

    Ok(())
}
