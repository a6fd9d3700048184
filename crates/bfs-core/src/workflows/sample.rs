use crate::core::cv::CollectiveVariable;
use crate::core::snapshot::Snapshot;
use crate::engine::error::BiasError;
use crate::engine::method::BasisSampler;
use crate::engine::transport::WalkerTransport;
use tracing::{info, instrument};

/// One step of the underlying simulation.
///
/// An implementation advances its own dynamical state, writes the new
/// positions into the snapshot, and leaves the snapshot's force array
/// holding the fresh unbiased forces. The bias force from the previous
/// step is already folded into the forces the implementation read before
/// moving the particles.
pub trait Dynamics {
    fn step(&mut self, snapshot: &mut Snapshot);
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub steps_completed: u64,
    pub sweeps: u64,
    pub converged: bool,
    /// Metric of the last completed sweep, if any sweep ran.
    pub final_metric: Option<f64>,
}

/// Drives a simulation with the sampler hooked in after every integrator
/// step. Returns early when all walkers agree to terminate on convergence.
#[instrument(skip_all, name = "sampling_run", fields(steps = steps))]
pub fn run<D, T>(
    dynamics: &mut D,
    cvs: &mut [Box<dyn CollectiveVariable>],
    sampler: &mut BasisSampler<T>,
    snapshot: &mut Snapshot,
    steps: u64,
) -> Result<RunSummary, BiasError>
where
    D: Dynamics,
    T: WalkerTransport,
{
    info!("Starting sampling run");

    let mut steps_completed = 0;
    let mut converged = false;
    let mut final_metric = None;

    for _ in 0..steps {
        snapshot.iteration += 1;
        dynamics.step(snapshot);
        for cv in cvs.iter_mut() {
            cv.update(snapshot);
        }

        let outcome = sampler.post_integration(snapshot, cvs)?;
        steps_completed += 1;

        if outcome.updated {
            converged = outcome.converged;
            final_metric = Some(outcome.convergence_metric);
        }
        if outcome.stop {
            info!(
                step = snapshot.iteration,
                "Terminating run on collective convergence decision"
            );
            break;
        }
    }

    sampler.post_run();
    Ok(RunSummary {
        steps_completed,
        sweeps: sampler.model().iteration(),
        converged,
        final_metric,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cv::CartesianComponent;
    use crate::core::grid::{GridAxis, HistogramGrid};
    use crate::engine::config::BiasConfigBuilder;
    use crate::engine::transport::SingleWalker;

    /// Scripted dynamics: walks the particle through the bin centers in
    /// round-robin order, visiting every bin equally often.
    struct BinWalk {
        bins: usize,
        cursor: usize,
    }

    impl Dynamics for BinWalk {
        fn step(&mut self, snapshot: &mut Snapshot) {
            let bin = self.cursor % self.bins;
            snapshot.positions[0].x = -1.0 + (2.0 * bin as f64 + 1.0) / self.bins as f64;
            self.cursor += 1;
        }
    }

    fn setup(
        update_period: u64,
        walker_weight: f64,
        exit_on_convergence: bool,
        tmp: &std::path::Path,
    ) -> (
        BinWalk,
        Vec<Box<dyn CollectiveVariable>>,
        BasisSampler<SingleWalker>,
        Snapshot,
    ) {
        let grid = HistogramGrid::new(vec![GridAxis::new(10, -1.0, 1.0, false)]).unwrap();
        let config = BiasConfigBuilder::new()
            .polynomial_orders(vec![4])
            .update_period(update_period)
            .walker_weight(walker_weight)
            .convergence_tolerance(1e-10)
            .exit_on_convergence(exit_on_convergence)
            .build()
            .unwrap();
        let sampler = BasisSampler::new(config, grid, 1, SingleWalker)
            .unwrap()
            .with_output_dir(tmp);

        let dynamics = BinWalk {
            bins: 10,
            cursor: 0,
        };
        let cvs: Vec<Box<dyn CollectiveVariable>> =
            vec![Box::new(CartesianComponent::new(0, 0, -1.0, 1.0))];
        let snapshot = Snapshot::new(1, 300.0, 1.0);
        (dynamics, cvs, sampler, snapshot)
    }

    #[test]
    fn run_completes_requested_steps_and_counts_sweeps() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut dynamics, mut cvs, mut sampler, mut snapshot) =
            setup(50, 1.0, false, tmp.path());

        let summary = run(&mut dynamics, &mut cvs, &mut sampler, &mut snapshot, 150).unwrap();

        assert_eq!(summary.steps_completed, 150);
        assert_eq!(summary.sweeps, 3);
        assert!(summary.final_metric.is_some());
    }

    #[test]
    fn converged_run_stops_early_when_configured() {
        let tmp = tempfile::tempdir().unwrap();
        // Equal visits with walker weight equal to the bin count make the
        // reweighted density exactly one per bin, so the very first sweep
        // has zero coefficient change.
        let (mut dynamics, mut cvs, mut sampler, mut snapshot) =
            setup(100, 10.0, true, tmp.path());

        let summary = run(&mut dynamics, &mut cvs, &mut sampler, &mut snapshot, 1000).unwrap();

        assert!(summary.converged);
        assert_eq!(summary.steps_completed, 100);
        assert_eq!(summary.sweeps, 1);
    }

    #[test]
    fn converged_run_continues_when_exit_is_not_configured() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut dynamics, mut cvs, mut sampler, mut snapshot) =
            setup(100, 10.0, false, tmp.path());

        let summary = run(&mut dynamics, &mut cvs, &mut sampler, &mut snapshot, 300).unwrap();

        // The first sweep converges, but without the exit flag the run
        // keeps going to the requested step count.
        assert_eq!(summary.steps_completed, 300);
        assert_eq!(summary.sweeps, 3);
    }
}
