//! Collective-variable contract.
//!
//! A collective variable is a scalar reduction of the particle coordinates;
//! the sampler only ever sees this trait. CV implementations cache their
//! value and gradients in [`update`] so the per-step hook can read them
//! repeatedly without recomputation.
//!
//! [`update`]: CollectiveVariable::update

use super::snapshot::Snapshot;
use nalgebra::{Matrix3, Vector3};

pub trait CollectiveVariable {
    /// Recomputes the value and gradients from the current coordinates.
    fn update(&mut self, snapshot: &Snapshot);

    /// Current scalar value.
    fn value(&self) -> f64;

    /// Gradient with respect to each particle position.
    fn gradient(&self) -> &[Vector3<f64>];

    /// Gradient with respect to the simulation box, for the virial.
    fn box_gradient(&self) -> &Matrix3<f64>;

    /// Periodic-aware signed difference `value - target`.
    fn difference(&self, target: f64) -> f64 {
        let diff = self.value() - target;
        if !self.periodic() {
            return diff;
        }
        let (lower, upper) = self.bounds();
        let period = upper - lower;
        diff - period * (diff / period).round()
    }

    fn periodic(&self) -> bool;

    /// Natural domain of the variable.
    fn bounds(&self) -> (f64, f64);
}

/// One Cartesian component of a single particle's position.
///
/// The simplest useful CV; it is what toy systems and the bundled
/// double-well demo sample over.
#[derive(Debug, Clone)]
pub struct CartesianComponent {
    particle: usize,
    axis: usize,
    lower: f64,
    upper: f64,
    value: f64,
    gradient: Vec<Vector3<f64>>,
    box_gradient: Matrix3<f64>,
}

impl CartesianComponent {
    pub fn new(particle: usize, axis: usize, lower: f64, upper: f64) -> Self {
        assert!(axis < 3, "Cartesian axis must be 0, 1, or 2");
        Self {
            particle,
            axis,
            lower,
            upper,
            value: 0.0,
            gradient: Vec::new(),
            box_gradient: Matrix3::zeros(),
        }
    }
}

impl CollectiveVariable for CartesianComponent {
    fn update(&mut self, snapshot: &Snapshot) {
        self.value = snapshot.positions[self.particle][self.axis];
        self.gradient = vec![Vector3::zeros(); snapshot.positions.len()];
        self.gradient[self.particle][self.axis] = 1.0;
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn gradient(&self) -> &[Vector3<f64>] {
        &self.gradient
    }

    fn box_gradient(&self) -> &Matrix3<f64> {
        &self.box_gradient
    }

    fn periodic(&self) -> bool {
        false
    }

    fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }
}
