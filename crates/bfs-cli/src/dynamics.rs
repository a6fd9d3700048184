use bfsample::workflows::sample::Dynamics;
use bfsample::Snapshot;
use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Overdamped Langevin dynamics of one particle in a quartic double well,
/// `V(x) = height * (x^2 - a^2)^2` with minima at `±a`.
///
/// Each step reads the total force left in the snapshot (the unbiased
/// force from the previous step plus whatever bias the sampler added),
/// moves the particle, and writes the fresh unbiased force back.
pub struct DoubleWellLangevin {
    rng: StdRng,
    height: f64,
    well: f64,
    mobility: f64,
    dt: f64,
    kt: f64,
    progress: Option<ProgressBar>,
}

impl DoubleWellLangevin {
    pub fn new(height: f64, well: f64, kt: f64, dt: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            height,
            well,
            mobility: 1.0,
            dt,
            kt,
            progress: None,
        }
    }

    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    fn potential_force(&self, x: f64) -> f64 {
        -4.0 * self.height * x * (x * x - self.well * self.well)
    }

    /// Seeds the snapshot with a starting position and its unbiased force.
    pub fn initialize(&mut self, snapshot: &mut Snapshot, x0: f64) {
        snapshot.positions[0].x = x0;
        snapshot.forces[0].x = self.potential_force(x0);
    }
}

impl Dynamics for DoubleWellLangevin {
    fn step(&mut self, snapshot: &mut Snapshot) {
        let force = snapshot.forces[0].x;
        let noise: f64 = self.rng.sample(StandardNormal);
        let drift = self.mobility * force * self.dt;
        let diffusion = (2.0 * self.mobility * self.kt * self.dt).sqrt() * noise;

        let x = snapshot.positions[0].x + drift + diffusion;
        snapshot.positions[0].x = x;
        snapshot.forces[0].x = self.potential_force(x);

        if let Some(bar) = &self.progress {
            bar.inc(1);
        }
    }
}
