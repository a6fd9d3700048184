mod cli;
mod dynamics;
mod error;
mod logging;

use crate::cli::Cli;
use crate::dynamics::DoubleWellLangevin;
use crate::error::{CliError, Result};
use bfsample::core::cv::CartesianComponent;
use bfsample::workflows::sample;
use bfsample::{
    BasisSampler, BiasConfig, BiasConfigBuilder, CollectiveVariable, GridAxis, HistogramGrid,
    InProcessTransport, Restraint, RunSummary, Snapshot, WalkerTransport,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread;
use tracing::info;

/// Sampled domain of the double-well coordinate, in reduced units.
const DOMAIN: f64 = 1.5;
/// Position of the two minima.
const WELL: f64 = 0.7;
/// Barrier height prefactor of the quartic potential.
const BARRIER: f64 = 5.0;
/// Wall spring constant at the domain edges.
const WALL_SPRING: f64 = 50.0;
const TIMESTEP: f64 = 0.01;

fn main() {
    let cli = Cli::parse();
    logging::setup(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    info!("bfsample v{} starting up", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => BiasConfig::load(path)?,
        None => BiasConfigBuilder::new()
            .polynomial_orders(vec![cli.order])
            .update_period(cli.update_period)
            .convergence_tolerance(cli.tolerance)
            .exit_on_convergence(cli.exit_on_convergence)
            .restraint(Restraint {
                lower: -DOMAIN,
                upper: DOMAIN,
                spring: WALL_SPRING,
            })
            .build()?,
    };

    let bar = ProgressBar::new(cli.steps);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} steps ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let handles: Vec<_> = InProcessTransport::group(cli.walkers.max(1))
        .into_iter()
        .map(|transport| {
            let config = config.clone();
            let output_dir = cli.output_dir.clone();
            let progress = (transport.walker_id() == 0).then(|| bar.clone());
            let (steps, bins, temperature, seed) =
                (cli.steps, cli.bins, cli.temperature, cli.seed);

            thread::spawn(move || -> Result<RunSummary> {
                run_walker(
                    config,
                    transport,
                    output_dir,
                    steps,
                    bins,
                    temperature,
                    seed,
                    progress,
                )
            })
        })
        .collect();

    let mut summaries = Vec::new();
    for handle in handles {
        summaries.push(handle.join().map_err(|_| CliError::WalkerPanicked)??);
    }
    bar.finish();

    let summary = &summaries[0];
    println!(
        "Completed {} steps over {} sweep(s); converged: {}{}",
        summary.steps_completed,
        summary.sweeps,
        summary.converged,
        summary
            .final_metric
            .map(|m| format!(" (final metric {m:.3e})"))
            .unwrap_or_default(),
    );
    println!(
        "Surface written to {}",
        cli.output_dir
            .join(format!("basis{}.out", config.basis_suffix))
            .display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_walker(
    config: BiasConfig,
    transport: InProcessTransport,
    output_dir: PathBuf,
    steps: u64,
    bins: usize,
    temperature: f64,
    seed: u64,
    progress: Option<ProgressBar>,
) -> Result<RunSummary> {
    let walker = transport.walker_id();

    let grid = HistogramGrid::new(vec![GridAxis::new(bins, -DOMAIN, DOMAIN, false)])?;
    let mut sampler =
        BasisSampler::new(config, grid, 1, transport)?.with_output_dir(output_dir);

    let mut cvs: Vec<Box<dyn CollectiveVariable>> =
        vec![Box::new(CartesianComponent::new(0, 0, -DOMAIN, DOMAIN))];

    // Reduced units: k_B = 1, so kT is the configured temperature.
    let mut snapshot = Snapshot::new(1, temperature, 1.0);
    let mut dynamics = DoubleWellLangevin::new(
        BARRIER,
        WELL,
        temperature,
        TIMESTEP,
        seed.wrapping_add(walker as u64),
    );
    if let Some(bar) = progress {
        dynamics = dynamics.with_progress(bar);
    }

    // Alternate starting wells so the walkers cover both basins early.
    let x0 = if walker % 2 == 0 { -WELL } else { WELL };
    dynamics.initialize(&mut snapshot, x0);
    cvs[0].update(&snapshot);

    Ok(sample::run(
        &mut dynamics,
        &mut cvs,
        &mut sampler,
        &mut snapshot,
        steps,
    )?)
}
