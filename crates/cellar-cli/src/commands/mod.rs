//! CLI command definitions and dispatch.

pub mod init;
pub mod logs;
pub mod ps;
pub mod run;

use std::path::PathBuf;

use cellar_common::config::RuntimeConfig;
use cellar_common::constants::BIN_NAME;
use clap::{Parser, Subcommand};

/// cellar: minimal namespace container runtime.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Root used when none is given or the image cannot be extracted.
    #[arg(long, global = true, env = "CELLAR_DEFAULT_ROOT")]
    pub default_root: Option<PathBuf>,

    /// Base image name; its archive is `<root>/<image>.tar`.
    #[arg(long, global = true, env = "CELLAR_IMAGE")]
    pub image: Option<String>,

    /// Directory holding container records and logs.
    #[arg(long, global = true, env = "CELLAR_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl Cli {
    /// Builds the runtime configuration from defaults and global flags.
    fn config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        if let Some(root) = &self.default_root {
            config = config.with_default_root(root);
        }
        if let Some(image) = &self.image {
            config = config.with_image(image);
        }
        if let Some(dir) = &self.state_dir {
            config = config.with_state_dir(dir);
        }
        config
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command in a new container.
    Run(run::RunArgs),
    /// List recorded containers.
    Ps(ps::PsArgs),
    /// Print a detached container's output.
    Logs(logs::LogsArgs),
    /// Container init process; started by `run`, not by users.
    #[command(hide = true)]
    Init,
}

/// Dispatches the parsed CLI command to its handler.
///
/// Returns the process exit code.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.config();
    match cli.command {
        Command::Run(args) => run::execute(args, config),
        Command::Ps(args) => ps::execute(args, &config).map(|()| 0),
        Command::Logs(args) => logs::execute(&args, &config).map(|()| 0),
        Command::Init => init::execute(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "cellar",
            "--image",
            "alpine",
            "--state-dir",
            "/tmp/state",
            "ps",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.image, "alpine");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/state"));
        assert_eq!(config.default_root, RuntimeConfig::default().default_root);
    }

    #[test]
    fn init_is_hidden_but_parses() {
        let cli = Cli::try_parse_from(["cellar", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init));
        let help = Cli::command().render_help().to_string();
        assert!(!help.contains("init"));
    }
}
