//! `cellar run`: Run a command in a new container.

use std::path::PathBuf;

use cellar_common::config::RuntimeConfig;
use cellar_common::types::{ResourceLimits, parse_memory};
use cellar_core::filesystem::volume::VolumeSpec;
use cellar_runtime::engine::{Engine, RunOutcome, RunRequest};
use clap::Args;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Attach the container to this terminal and wait for it.
    ///
    /// This is already the default; the flag exists so `-t` and `-d` are
    /// rejected together.
    #[arg(short = 't', long, conflicts_with = "detach")]
    pub tty: bool,

    /// Leave the container running in the background.
    #[arg(short, long)]
    pub detach: bool,

    /// Bind a host directory into the container, as `host:container`.
    #[arg(short, long = "volume", value_name = "HOST:CONTAINER")]
    pub volumes: Vec<String>,

    /// Container name; defaults to the generated ID.
    #[arg(long)]
    pub name: Option<String>,

    /// Root holding the image archive and container layers.
    #[arg(long, env = "CELLAR_ROOT")]
    pub root: Option<PathBuf>,

    /// Memory limit, e.g. `100m` or `1GiB`.
    #[arg(short, long, value_parser = parse_memory_arg)]
    pub memory: Option<u64>,

    /// Relative CPU shares.
    #[arg(long)]
    pub cpu_shares: Option<u64>,

    /// CPUs the container may run on, e.g. `0-1`.
    #[arg(long)]
    pub cpuset: Option<String>,

    /// Command and arguments to run.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    fn into_request(self) -> anyhow::Result<RunRequest> {
        Ok(RunRequest {
            command: self.command.join(" "),
            tty: !self.detach,
            root: self.root,
            name: self.name,
            volumes: VolumeSpec::parse_all(&self.volumes)?,
            limits: ResourceLimits {
                memory_bytes: self.memory,
                cpu_shares: self.cpu_shares,
                cpuset_cpus: self.cpuset,
            },
        })
    }
}

fn parse_memory_arg(s: &str) -> Result<u64, String> {
    parse_memory(s).ok_or_else(|| format!("invalid memory size: {s}"))
}

/// Executes the `run` command and returns the container's exit code.
///
/// # Errors
///
/// Returns an error if the container cannot be started.
pub fn execute(args: RunArgs, config: RuntimeConfig) -> anyhow::Result<i32> {
    let request = args.into_request()?;
    if request.tty {
        // The terminal's SIGINT reaches the container too; the launcher stays
        // alive so it can tear down once the container exits.
        ctrlc::set_handler(|| tracing::info!("interrupt received, waiting for container"))?;
    }

    match Engine::new(config).run(request)? {
        RunOutcome::Exited {
            container,
            exit_code,
        } => {
            tracing::info!(id = %container.id, exit_code, "container exited");
            Ok(exit_code)
        }
        RunOutcome::Detached(detached) => {
            println!("{}", detached.container().id);
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        Wrapper::try_parse_from(std::iter::once("run").chain(args.iter().copied()))
            .unwrap()
            .run
    }

    #[test]
    fn interactive_by_default() {
        let req = parse(&["sh"]).into_request().unwrap();
        assert!(req.tty);
        assert_eq!(req.command, "sh");
    }

    #[test]
    fn command_words_are_joined() {
        let req = parse(&["-t", "sh", "-c", "echo hi"]).into_request().unwrap();
        assert_eq!(req.command, "sh -c echo hi");
    }

    #[test]
    fn detach_volumes_and_limits() {
        let req = parse(&[
            "-d", "-v", "/data:/srv", "--name", "web", "-m", "100m", "--cpu-shares", "512",
            "--cpuset", "0-1", "top",
        ])
        .into_request()
        .unwrap();
        assert!(!req.tty);
        assert_eq!(req.name.as_deref(), Some("web"));
        assert_eq!(req.volumes.len(), 1);
        assert_eq!(req.volumes[0].to_string(), "/data:/srv");
        assert_eq!(req.limits.memory_bytes, Some(100 * 1024 * 1024));
        assert_eq!(req.limits.cpu_shares, Some(512));
        assert_eq!(req.limits.cpuset_cpus.as_deref(), Some("0-1"));
    }

    #[test]
    fn tty_and_detach_conflict() {
        assert!(Wrapper::try_parse_from(["run", "-t", "-d", "sh"]).is_err());
    }

    #[test]
    fn bad_volume_and_memory_are_rejected() {
        assert!(parse(&["-v", "nocolon", "sh"]).into_request().is_err());
        assert!(parse(&["-v", "/h:../../etc", "sh"]).into_request().is_err());
        assert!(parse(&["-v", "/h:/a:/b", "sh"]).into_request().is_err());
        assert!(Wrapper::try_parse_from(["run", "-m", "lots", "sh"]).is_err());
    }

    #[test]
    fn empty_volume_is_skipped() {
        let req = parse(&["-v", "", "sh"]).into_request().unwrap();
        assert!(req.volumes.is_empty());
    }

    #[test]
    fn command_is_required() {
        assert!(Wrapper::try_parse_from(["run", "-t"]).is_err());
    }
}
