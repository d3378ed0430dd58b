use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "CGMD CLI - Coarse-grained molecular dynamics of protein chains with quasi-adiabatic contacts.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of worker threads for the simulation.
    /// Overrides `threads` from the config file; defaults to the number of logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulation and print a summary of the final state.
    Run(RunArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Particle table in CSV format with columns `chain,residue,x,y,z`.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub particles: PathBuf,

    /// Per-residue parameter file in TOML format.
    #[arg(long, required = true, value_name = "PATH")]
    pub params: PathBuf,

    /// Simulation configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the simulated time span from the config file.
    #[arg(short, long, value_name = "TIME")]
    pub duration: Option<f64>,

    /// Native contact list in CSV format with columns `i,j,r_min`.
    #[arg(short, long, value_name = "PATH")]
    pub native_contacts: Option<PathBuf>,

    /// Write final positions and velocities to this CSV file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Override a config file value, e.g. `-S verlet.pad=8` (repeatable).
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_parses_required_and_optional_arguments() {
        let cli = Cli::try_parse_from([
            "cgmd",
            "-vv",
            "run",
            "--particles",
            "chain.csv",
            "--params",
            "params.toml",
            "-c",
            "run.toml",
            "--duration",
            "25",
            "-j",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, Some(4));
        let Commands::Run(args) = cli.command;
        assert_eq!(args.particles, PathBuf::from("chain.csv"));
        assert_eq!(args.duration, Some(25.0));
        assert!(args.native_contacts.is_none());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from([
            "cgmd", "-q", "-v", "run", "-p", "a.csv", "--params", "b.toml", "-c", "c.toml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_config_is_rejected() {
        let result = Cli::try_parse_from(["cgmd", "run", "-p", "a.csv", "--params", "b.toml"]);
        assert!(result.is_err());
    }
}
