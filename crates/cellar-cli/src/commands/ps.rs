//! `cellar ps`: List recorded containers.

use cellar_common::config::RuntimeConfig;
use cellar_runtime::recorder::JsonStateRecorder;
use clap::Args;

use crate::output;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Only print container IDs.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if the state directory cannot be read.
pub fn execute(args: PsArgs, config: &RuntimeConfig) -> anyhow::Result<()> {
    let records = JsonStateRecorder::from_config(config).list()?;

    if args.quiet {
        for r in &records {
            println!("{}", r.id);
        }
        return Ok(());
    }

    if records.is_empty() {
        println!("No containers found.");
        return Ok(());
    }
    print!("{}", output::records_table(&records));
    Ok(())
}
