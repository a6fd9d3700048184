//! Mechanical state exchanged with the simulation driver.

use nalgebra::{Matrix3, Vector3};

/// Per-step view of the simulation handed to the sampler.
///
/// Positions are read-only as far as the sampler is concerned; forces and
/// the virial are accumulated into when the bias is projected back onto
/// the atoms.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub positions: Vec<Vector3<f64>>,
    pub forces: Vec<Vector3<f64>>,
    pub virial: Matrix3<f64>,
    pub temperature: f64,
    pub kb: f64,
    /// Global step counter, shared across all walkers of a run.
    pub iteration: u64,
}

impl Snapshot {
    pub fn new(num_particles: usize, temperature: f64, kb: f64) -> Self {
        Self {
            positions: vec![Vector3::zeros(); num_particles],
            forces: vec![Vector3::zeros(); num_particles],
            virial: Matrix3::zeros(),
            temperature,
            kb,
            iteration: 0,
        }
    }
}
