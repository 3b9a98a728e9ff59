use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Markov state model estimation and validation.
#[derive(Parser)]
#[command(
    name = "msm",
    version,
    about = "Markov state model estimation and validation"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Scan implied timescales over a range of lag times.
    Its(ItsArgs),
    /// Estimate a model at one lag time.
    Estimate(EstimateArgs),
    /// Run a Chapman-Kolmogorov test on a coarse-grained model.
    Ck(CkArgs),
}

/// Options shared by every subcommand.
#[derive(clap::Args)]
pub struct InputArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "msm.toml")]
    pub config: PathBuf,

    /// Discrete trajectory files (whitespace-separated labels, negative = missing).
    #[arg(short, long = "traj", num_args = 1.., required = true)]
    pub trajectories: Vec<PathBuf>,

    /// Override global RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Arguments for the `its` subcommand.
#[derive(clap::Args)]
pub struct ItsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Path for JSON output (stdout if omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `estimate` subcommand.
#[derive(clap::Args)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Lag time in steps (overrides `[estimator].lag`).
    #[arg(short, long)]
    pub lag: Option<usize>,

    /// Path for JSON output (stdout if omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save the model as a named snapshot.
    #[arg(long, requires = "store")]
    pub save: Option<String>,

    /// Snapshot store directory.
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Attach posterior samples (`[bayes]` settings) to the saved snapshot.
    #[arg(long, requires = "save")]
    pub posterior: bool,
}

/// Arguments for the `ck` subcommand.
#[derive(clap::Args)]
pub struct CkArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Lag time in steps (overrides `[estimator].lag`).
    #[arg(short, long)]
    pub lag: Option<usize>,

    /// Coarse-graining map file (`fine coarse` per line).
    #[arg(long)]
    pub coarse_map: PathBuf,

    /// Path for JSON output (stdout if omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_estimate_with_store() {
        let cli = Cli::try_parse_from([
            "msm", "-vv", "estimate", "--traj", "a.txt", "b.txt", "--lag", "5", "--save", "m1",
            "--store", "models",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.input.trajectories.len(), 2);
        assert_eq!(args.lag, Some(5));
        assert_eq!(args.save.as_deref(), Some("m1"));
    }

    #[test]
    fn save_requires_store() {
        assert!(Cli::try_parse_from(["msm", "estimate", "--traj", "a.txt", "--save", "m"]).is_err());
    }
}
