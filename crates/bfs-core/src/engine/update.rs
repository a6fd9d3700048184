//! The periodic reduce / reweight / integrate cycle.
//!
//! Once per update period every walker's local visit counts are merged
//! into one global histogram, the merged counts are importance-reweighted
//! under the bias they were gathered with, and the reweighted density is
//! integrated against the basis to produce the next coefficient set. The
//! reduction is the sole synchronization point of the run; every walker
//! must enter it on the same global step.

use super::config::BiasConfig;
use super::error::BiasError;
use super::model::BiasModel;
use super::transport::WalkerTransport;
use crate::core::grid::HistogramGrid;
use tracing::{debug, info};

/// Result of one completed update sweep.
#[derive(Debug, Clone, Copy)]
pub struct UpdateOutcome {
    /// Sum of squared coefficient changes, constant slot excluded.
    pub convergence_metric: f64,
    pub converged: bool,
}

/// Runs one full sweep: reduce, reweight, reset, integrate.
pub fn run_cycle<T: WalkerTransport>(
    model: &mut BiasModel,
    grid: &mut HistogramGrid,
    config: &BiasConfig,
    transport: &mut T,
) -> Result<UpdateOutcome, BiasError> {
    model.iteration += 1;

    let merged = transport.reduce_counts(grid.counts())?;
    grid.install_counts(&merged);

    accumulate_unbiased_density(model, grid, config);

    // The working histogram measures one period at a time.
    grid.reset();

    let metric = refresh_coefficients(model, grid);
    let converged = metric < config.convergence_tolerance;

    info!(
        walker = transport.walker_id(),
        sweep = model.iteration,
        metric,
        "Completed bias update sweep"
    );
    if converged {
        info!(
            sweep = model.iteration,
            metric,
            tolerance = config.convergence_tolerance,
            "Bias expansion has converged"
        );
    }

    Ok(UpdateOutcome {
        convergence_metric: metric,
        converged,
    })
}

/// Folds the merged histogram into the unbiased-density accumulator.
///
/// Interior bins with zero merged counts are clamped to one sample here,
/// and only here: the clamp keeps the projection defined over the full
/// surface and never feeds back into the stored counts.
fn accumulate_unbiased_density(model: &mut BiasModel, grid: &HistogramGrid, config: &BiasConfig) {
    let counts = grid.counts();
    let period = config.update_period as f64;

    let mut ordinal = 0;
    for point in grid.iter() {
        if point.is_under_overflow_bin() {
            continue;
        }

        let count = counts[point.flat].max(1) as f64;
        let bias = model.bias_at(point.indices());
        model.unbias[ordinal] += count * bias.exp() * config.walker_weight / period;
        ordinal += 1;
    }

    debug!(
        interior_bins = ordinal,
        "Reweighted merged histogram into density accumulator"
    );
}

/// Integrates `log(unbias)` against each non-constant basis slot with
/// trapezoidal quadrature and replaces the coefficient set, returning the
/// summed squared change.
///
/// The quadrature base weight is `2^D`, halved once for every non-periodic
/// dimension whose bin touches a grid boundary; each dimension contributes
/// the `(2·order + 1)` Legendre normalization divided by its bin count,
/// and the whole sum is normalized back by `2^D`.
fn refresh_coefficients(model: &mut BiasModel, grid: &HistogramGrid) -> f64 {
    let dims = model.index.dims();
    let base = 2f64.powi(dims as i32);
    let nslots = model.index.len();

    let mut next = vec![0.0; nslots];
    for (slot, value) in next.iter_mut().enumerate().skip(1) {
        let orders = model.index.orders_for(slot);

        let mut ordinal = 0;
        for point in grid.iter() {
            if point.is_under_overflow_bin() {
                continue;
            }

            let mut weight = base;
            for dim in 0..dims {
                if grid.periodic(dim) {
                    continue;
                }
                let idx = point.index(dim);
                if idx == 0 || idx == grid.num_points(dim) as isize - 1 {
                    weight /= 2.0;
                }
            }

            let mut basis = 1.0;
            for (dim, &order) in orders.iter().enumerate() {
                let nbins = grid.num_points(dim) as f64;
                basis *= model.tables[dim].value(point.index(dim) as usize, order) / nbins;
                basis *= 2.0 * order as f64 + 1.0;
            }

            *value += basis * model.unbias[ordinal].ln() * weight / base;
            ordinal += 1;
        }
    }

    let mut metric = 0.0;
    for slot in 1..nslots {
        let delta = model.coefficients[slot] - next[slot];
        metric += delta * delta;
    }
    model.coefficients = next;
    metric
}
