//! The sampling method itself.
//!
//! [`BasisSampler`] owns the histogram, the bias model, the force state,
//! and the walker transport, and exposes the two hooks a simulation driver
//! calls: construction at startup and [`post_integration`] after every
//! integrator step. All cross-walker coordination happens inside the
//! update cycle; force evaluation is purely local.
//!
//! [`post_integration`]: BasisSampler::post_integration

use super::config::BiasConfig;
use super::error::BiasError;
use super::force::BiasForce;
use super::model::BiasModel;
use super::report;
use super::transport::WalkerTransport;
use super::update::{self, UpdateOutcome};
use crate::core::cv::CollectiveVariable;
use crate::core::grid::HistogramGrid;
use crate::core::snapshot::Snapshot;
use std::path::PathBuf;
use tracing::info;

/// What happened during one `post_integration` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutcome {
    /// An update sweep ran on this step.
    pub updated: bool,
    /// The sweep's coefficient change fell below the tolerance.
    pub converged: bool,
    /// All walkers agreed to terminate the run.
    pub stop: bool,
    pub convergence_metric: f64,
}

pub struct BasisSampler<T: WalkerTransport> {
    config: BiasConfig,
    grid: HistogramGrid,
    model: BiasModel,
    force: BiasForce,
    transport: T,
    output_dir: PathBuf,
    cv_values: Vec<f64>,
}

impl<T: WalkerTransport> BasisSampler<T> {
    /// Validates the grid against the CV count, normalizes the
    /// configuration, and allocates all run state zeroed.
    ///
    /// A grid whose dimensionality differs from the CV count is fatal for
    /// the whole run; the caller must abort every walker, not just this
    /// one, or the group deadlocks at the next reduction.
    pub fn new(
        config: BiasConfig,
        grid: HistogramGrid,
        num_cvs: usize,
        transport: T,
    ) -> Result<Self, BiasError> {
        if grid.dimension() != num_cvs {
            return Err(BiasError::DimensionMismatch {
                grid: grid.dimension(),
                cvs: num_cvs,
            });
        }

        let config = config.normalized(num_cvs)?;
        let model = BiasModel::new(&config.polynomial_orders, &grid);
        let force = BiasForce::new(num_cvs);

        info!(
            walker = transport.walker_id(),
            walkers = transport.num_walkers(),
            dims = num_cvs,
            coefficients = model.index().len(),
            "Initialized basis sampler"
        );

        Ok(Self {
            config,
            grid,
            model,
            force,
            transport,
            output_dir: PathBuf::from("."),
            cv_values: vec![0.0; num_cvs],
        })
    }

    /// Directory the periodic report files are written into.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn model(&self) -> &BiasModel {
        &self.model
    }

    pub fn grid(&self) -> &HistogramGrid {
        &self.grid
    }

    pub fn config(&self) -> &BiasConfig {
        &self.config
    }

    /// Per-CV derivative vector from the last step, for callers that
    /// project the bias themselves.
    pub fn derivatives(&self) -> &[f64] {
        self.force.derivatives()
    }

    /// The per-step hook. Bins the current CV vector (unless a boundary
    /// tracker has suspended gathering), runs the update cycle when the
    /// global step count hits the update period, evaluates the bias force,
    /// and projects it onto the snapshot's forces and virial through each
    /// CV's gradients.
    pub fn post_integration(
        &mut self,
        snapshot: &mut Snapshot,
        cvs: &[Box<dyn CollectiveVariable>],
    ) -> Result<StepOutcome, BiasError> {
        for (value, cv) in self.cv_values.iter_mut().zip(cvs) {
            *value = cv.value();
        }

        self.force.update_boundaries(&self.cv_values, &self.grid);
        if self.force.gathering() {
            self.grid.accumulate(&self.cv_values);
        }

        let mut outcome = StepOutcome::default();
        if snapshot.iteration % self.config.update_period == 0 {
            let beta = self.resolve_beta(snapshot)?;
            let update = update::run_cycle(
                &mut self.model,
                &mut self.grid,
                &self.config,
                &mut self.transport,
            )?;

            if self.transport.is_designated_writer() {
                report::write_surface(&self.model, &self.grid, beta, &self.config, &self.output_dir)?;
            }

            outcome = self.coordinate_stop(update)?;
        }

        self.force
            .evaluate(&self.model, &self.grid, &self.config, &self.cv_values);

        for (dim, cv) in cvs.iter().enumerate() {
            let derivative = self.force.derivatives()[dim];
            for (force, gradient) in snapshot.forces.iter_mut().zip(cv.gradient()) {
                *force += *gradient * derivative;
            }
            snapshot.virial -= *cv.box_gradient() * derivative;
        }

        Ok(outcome)
    }

    /// Logs completion; the counterpart of the startup hook.
    pub fn post_run(&self) {
        info!(
            walker = self.transport.walker_id(),
            sweeps = self.model.iteration(),
            "Run has finished"
        );
    }

    /// Every walker votes and receives the same decision, so a converged
    /// run winds down at a collective point instead of one walker exiting
    /// underneath the others.
    fn coordinate_stop(&mut self, update: UpdateOutcome) -> Result<StepOutcome, BiasError> {
        let vote = update.converged && self.config.exit_on_convergence;
        let stop = self.transport.agree_on_stop(vote)?;
        if stop {
            info!("All walkers agreed to terminate on convergence");
        }
        Ok(StepOutcome {
            updated: true,
            converged: update.converged,
            stop,
            convergence_metric: update.convergence_metric,
        })
    }

    fn resolve_beta(&self, snapshot: &Snapshot) -> Result<f64, BiasError> {
        if snapshot.temperature != 0.0 {
            return Ok(1.0 / (snapshot.temperature * snapshot.kb));
        }
        match self.config.fallback_temperature {
            Some(temperature) if temperature != 0.0 => Ok(1.0 / (temperature * snapshot.kb)),
            _ => Err(BiasError::MissingTemperature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cv::CartesianComponent;
    use crate::core::grid::GridAxis;
    use crate::engine::config::BiasConfigBuilder;
    use crate::engine::transport::SingleWalker;
    use std::fs;

    fn grid_1d(bins: usize) -> HistogramGrid {
        HistogramGrid::new(vec![GridAxis::new(bins, -1.0, 1.0, false)]).unwrap()
    }

    fn config(update_period: u64) -> BiasConfig {
        BiasConfigBuilder::new()
            .polynomial_orders(vec![4])
            .update_period(update_period)
            .convergence_tolerance(1e-12)
            .build()
            .unwrap()
    }

    fn cv_list() -> Vec<Box<dyn CollectiveVariable>> {
        vec![Box::new(CartesianComponent::new(0, 0, -1.0, 1.0))]
    }

    #[test]
    fn grid_dimensionality_mismatch_is_fatal() {
        let result = BasisSampler::new(config(10), grid_1d(10), 2, SingleWalker);
        assert!(matches!(
            result,
            Err(BiasError::DimensionMismatch { grid: 1, cvs: 2 })
        ));
    }

    #[test]
    fn missing_temperature_without_fallback_is_fatal() {
        let mut sampler = BasisSampler::new(config(1), grid_1d(10), 1, SingleWalker).unwrap();
        let dir = tempfile::tempdir().unwrap();
        sampler.output_dir = dir.path().to_path_buf();

        let mut snapshot = Snapshot::new(1, 0.0, 1.0);
        let mut cvs = cv_list();
        cvs[0].update(&snapshot);
        snapshot.iteration = 1;

        let result = sampler.post_integration(&mut snapshot, &cvs);
        assert!(matches!(result, Err(BiasError::MissingTemperature)));
    }

    #[test]
    fn fallback_temperature_rescues_zero_snapshot_temperature() {
        let config = BiasConfigBuilder::new()
            .polynomial_orders(vec![4])
            .update_period(1)
            .convergence_tolerance(1e-12)
            .fallback_temperature(300.0)
            .build()
            .unwrap();
        let mut sampler = BasisSampler::new(config, grid_1d(10), 1, SingleWalker).unwrap();
        let dir = tempfile::tempdir().unwrap();
        sampler.output_dir = dir.path().to_path_buf();

        let mut snapshot = Snapshot::new(1, 0.0, 1.0);
        let mut cvs = cv_list();
        cvs[0].update(&snapshot);
        snapshot.iteration = 1;

        sampler.post_integration(&mut snapshot, &cvs).unwrap();
    }

    #[test]
    fn uniform_sampling_reconstructs_a_flat_surface() {
        // Single CV, 10 bins, order 4, exactly uniform visits for one
        // update period: the reweighted density must be flat, so the PMF
        // estimate has no variation across bins.
        let period = 1000u64;
        let mut sampler =
            BasisSampler::new(config(period), grid_1d(10), 1, SingleWalker).unwrap();
        let dir = tempfile::tempdir().unwrap();
        sampler = sampler.with_output_dir(dir.path());

        let mut snapshot = Snapshot::new(1, 300.0, 1.0);
        let mut cvs = cv_list();

        let mut outcome = StepOutcome::default();
        for step in 1..=period {
            // Walk the bins in round-robin order: 100 visits each.
            let bin = (step % 10) as f64;
            snapshot.positions[0].x = -1.0 + (2.0 * bin + 1.0) / 10.0;
            snapshot.iteration = step;
            cvs[0].update(&snapshot);
            outcome = sampler.post_integration(&mut snapshot, &cvs).unwrap();
        }

        assert!(outcome.updated);
        let density = &sampler.model().unbias[..10];
        let min = density.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = density.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(max - min < 1e-9, "density not flat: {:?}", density);

        // The constant slot stays exactly zero in the written output.
        let coeff = fs::read_to_string(dir.path().join("coeff.out")).unwrap();
        assert_eq!(coeff.lines().nth(1).unwrap().parse::<f64>().unwrap(), 0.0);
        assert!(dir.path().join("basis.out").exists());
    }

    #[test]
    fn bias_force_projects_onto_atoms_through_cv_gradients() {
        let period = 4u64;
        let mut sampler =
            BasisSampler::new(config(period), grid_1d(10), 1, SingleWalker).unwrap();
        let dir = tempfile::tempdir().unwrap();
        sampler = sampler.with_output_dir(dir.path());

        let mut snapshot = Snapshot::new(2, 300.0, 1.0);
        let mut cvs = cv_list();

        // Sample one side of the domain only, then cross the update so a
        // bias exists, and check the next step pushes the tracked particle.
        for step in 1..=period {
            snapshot.positions[0].x = -0.5;
            snapshot.iteration = step;
            cvs[0].update(&snapshot);
            sampler.post_integration(&mut snapshot, &cvs).unwrap();
        }

        snapshot.forces[0] = nalgebra::Vector3::zeros();
        snapshot.forces[1] = nalgebra::Vector3::zeros();
        snapshot.iteration += 1;
        snapshot.positions[0].x = 0.1;
        cvs[0].update(&snapshot);
        sampler.post_integration(&mut snapshot, &cvs).unwrap();

        let derivative = sampler.derivatives()[0];
        assert!(derivative != 0.0);
        assert!((snapshot.forces[0].x - derivative).abs() < 1e-12);
        assert_eq!(snapshot.forces[1], nalgebra::Vector3::zeros());
        assert_eq!(snapshot.forces[0].y, 0.0);
    }

    #[test]
    fn no_update_runs_between_periods() {
        let mut sampler = BasisSampler::new(config(100), grid_1d(10), 1, SingleWalker).unwrap();
        let mut snapshot = Snapshot::new(1, 300.0, 1.0);
        let mut cvs = cv_list();

        snapshot.iteration = 57;
        cvs[0].update(&snapshot);
        let outcome = sampler.post_integration(&mut snapshot, &cvs).unwrap();

        assert!(!outcome.updated);
        assert_eq!(sampler.model().iteration(), 0);
    }
}
