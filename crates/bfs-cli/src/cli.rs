use clap::Parser;
use std::path::PathBuf;

/// Adaptive basis-function sampling of a double-well free-energy surface.
///
/// Runs one or more Langevin walkers in a quartic double well with the
/// bias engine attached, and writes the reconstructed surface and the
/// coefficient vector once per update period.
#[derive(Debug, Parser)]
#[command(name = "bfsample", version, about)]
pub struct Cli {
    /// Total integration steps per walker.
    #[arg(long, default_value_t = 200_000)]
    pub steps: u64,

    /// Histogram bins over the sampled coordinate.
    #[arg(long, default_value_t = 20)]
    pub bins: usize,

    /// Maximum Legendre polynomial order.
    #[arg(long, default_value_t = 6)]
    pub order: usize,

    /// Steps between coefficient update sweeps.
    #[arg(long, default_value_t = 2_000)]
    pub update_period: u64,

    /// Reduced temperature of the Langevin bath.
    #[arg(long, default_value_t = 1.0)]
    pub temperature: f64,

    /// Convergence tolerance on the summed squared coefficient change.
    #[arg(long, default_value_t = 1e-4)]
    pub tolerance: f64,

    /// Terminate the run once the expansion converges.
    #[arg(long)]
    pub exit_on_convergence: bool,

    /// Number of walkers sharing the bias model (one thread each).
    #[arg(long, default_value_t = 1)]
    pub walkers: usize,

    /// Directory for basis*.out / coeff*.out.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Load the bias configuration from a TOML file instead of flags.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for the Langevin noise (offset per walker).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
