//! # cellar: minimal namespace container runtime
//!
//! Runs a command inside fresh UTS, PID, mount, network, and IPC namespaces
//! on top of a layered root built from a base image archive.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let code = commands::execute(cli)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
