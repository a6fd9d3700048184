//! Per-step evaluation of the generalized bias force.
//!
//! Runs every step, independent of the update period: the gradient of the
//! current bias expansion with respect to each CV, a per-dimension boundary
//! tracker that gates histogram accumulation while any non-periodic CV is
//! outside its soft domain, and an unconditional harmonic wall at the hard
//! envelope.

use super::config::BiasConfig;
use super::model::BiasModel;
use crate::core::grid::HistogramGrid;
use tracing::{info, warn};

/// Soft-domain state of one non-periodic CV dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryState {
    Inside,
    AboveMax,
    BelowMin,
}

/// Bias derivative vector plus the boundary bookkeeping behind it.
pub struct BiasForce {
    derivatives: Vec<f64>,
    boundary: Vec<BoundaryState>,
    gathering: bool,
}

impl BiasForce {
    pub fn new(dims: usize) -> Self {
        Self {
            derivatives: vec![0.0; dims],
            boundary: vec![BoundaryState::Inside; dims],
            gathering: true,
        }
    }

    /// Per-CV derivative of the bias potential, as of the last `evaluate`.
    pub fn derivatives(&self) -> &[f64] {
        &self.derivatives
    }

    /// Whether the walker is inside the soft domain on every dimension and
    /// may contribute to the histogram.
    pub fn gathering(&self) -> bool {
        self.gathering
    }

    pub fn boundary_state(&self, dim: usize) -> BoundaryState {
        self.boundary[dim]
    }

    /// Advances the boundary trackers for the current CV vector. Periodic
    /// dimensions have no soft boundary and stay `Inside` permanently.
    pub fn update_boundaries(&mut self, values: &[f64], grid: &HistogramGrid) {
        for (dim, &x) in values.iter().enumerate() {
            if grid.periodic(dim) {
                continue;
            }

            let next = if x > grid.upper(dim) {
                BoundaryState::AboveMax
            } else if x < grid.lower(dim) {
                BoundaryState::BelowMin
            } else {
                BoundaryState::Inside
            };

            if next != self.boundary[dim] {
                match next {
                    BoundaryState::AboveMax => warn!(
                        dim,
                        value = x,
                        upper = grid.upper(dim),
                        "CV is above the maximum boundary; statistics will \
                         not be gathered during this interval"
                    ),
                    BoundaryState::BelowMin => warn!(
                        dim,
                        value = x,
                        lower = grid.lower(dim),
                        "CV is below the minimum boundary; statistics will \
                         not be gathered during this interval"
                    ),
                    BoundaryState::Inside => info!(dim, "CV has returned inside its boundaries"),
                }
                self.boundary[dim] = next;
            }
        }

        let inside = self
            .boundary
            .iter()
            .all(|&state| state == BoundaryState::Inside);
        if inside && !self.gathering {
            info!("All CVs are back inside their boundaries; statistics gathering resumes");
        }
        self.gathering = inside;
    }

    /// Recomputes the derivative vector for the current CV values.
    ///
    /// Inside the soft domain the basis contribution for dimension `j` is
    /// the chain-rule product of basis values on every other dimension and
    /// the basis derivative on `j`, rescaled by `2/(upper - lower)` from
    /// the internal (-1, 1) coordinate to physical units. The harmonic
    /// wall applies regardless of the soft-domain state and stacks on top.
    pub fn evaluate(
        &mut self,
        model: &BiasModel,
        grid: &HistogramGrid,
        config: &BiasConfig,
        values: &[f64],
    ) {
        self.derivatives.fill(0.0);
        let dims = grid.dimension();

        if self.gathering {
            let indices: Vec<usize> = grid
                .bin_indices(values)
                .iter()
                .enumerate()
                .map(|(dim, &idx)| idx.clamp(0, grid.num_points(dim) as isize - 1) as usize)
                .collect();

            for slot in 1..model.index().len() {
                let orders = model.index().orders_for(slot);
                for j in 0..dims {
                    let mut term = 1.0;
                    for k in 0..dims {
                        let table = model.table(k);
                        term *= if j == k {
                            table.deriv(indices[k], orders[k]) * 2.0
                                / (grid.upper(j) - grid.lower(j))
                        } else {
                            table.value(indices[k], orders[k])
                        };
                    }
                    self.derivatives[j] -= model.coefficients()[slot] * term;
                }
            }
        }

        for (j, &x) in values.iter().enumerate() {
            if grid.periodic(j) {
                continue;
            }
            let restraint = &config.restraints[j];
            if x > restraint.upper {
                self.derivatives[j] -= restraint.spring * (x - restraint.upper);
            } else if x < restraint.lower {
                self.derivatives[j] -= restraint.spring * (x - restraint.lower);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::GridAxis;
    use crate::engine::config::{BiasConfigBuilder, Restraint};

    fn grid_1d(periodic: bool) -> HistogramGrid {
        HistogramGrid::new(vec![GridAxis::new(10, -2.0, 2.0, periodic)]).unwrap()
    }

    fn config_with_wall(spring: f64) -> BiasConfig {
        BiasConfigBuilder::new()
            .polynomial_orders(vec![2])
            .update_period(100)
            .convergence_tolerance(1e-6)
            .restraint(Restraint {
                lower: -2.0,
                upper: 2.0,
                spring,
            })
            .build()
            .unwrap()
            .normalized(1)
            .unwrap()
    }

    #[test]
    fn zero_coefficients_give_zero_force_inside_domain() {
        let grid = grid_1d(false);
        let model = BiasModel::new(&[2], &grid);
        let config = config_with_wall(0.0);
        let mut force = BiasForce::new(1);

        force.update_boundaries(&[0.3], &grid);
        force.evaluate(&model, &grid, &config, &[0.3]);
        assert_eq!(force.derivatives(), &[0.0]);
    }

    #[test]
    fn linear_slot_gives_constant_rescaled_force() {
        let grid = grid_1d(false);
        let mut model = BiasModel::new(&[2], &grid);
        model.coefficients[1] = 3.0;
        let config = config_with_wall(0.0);
        let mut force = BiasForce::new(1);

        force.update_boundaries(&[0.5], &grid);
        force.evaluate(&model, &grid, &config, &[0.5]);

        // d/dx of c1 * P1(u(x)) with u' = 2 / (upper - lower) = 0.5.
        assert!((force.derivatives()[0] - -1.5).abs() < 1e-12);
    }

    #[test]
    fn cross_dimension_slot_mixes_values_and_derivatives() {
        let grid = HistogramGrid::new(vec![
            GridAxis::new(10, -1.0, 1.0, false),
            GridAxis::new(10, -1.0, 1.0, false),
        ])
        .unwrap();
        let mut model = BiasModel::new(&[1, 1], &grid);
        // The (1, 1) slot makes the bias c * x * y on the internal domain.
        assert_eq!(model.index().orders_for(3), &[1, 1]);
        model.coefficients[3] = 2.0;
        let config = BiasConfigBuilder::new()
            .polynomial_orders(vec![1, 1])
            .update_period(100)
            .convergence_tolerance(1e-6)
            .build()
            .unwrap()
            .normalized(2)
            .unwrap();
        let mut force = BiasForce::new(2);

        // Bin centers of bins (2, 7), where the rescale 2 / (1 - -1) = 1
        // leaves the lookup-table coordinates in physical units.
        let values = [-0.5, 0.5];
        force.update_boundaries(&values, &grid);
        force.evaluate(&model, &grid, &config, &values);

        // -d(c x y)/dx = -c y and -d(c x y)/dy = -c x.
        assert!((force.derivatives()[0] - -1.0).abs() < 1e-12);
        assert!((force.derivatives()[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wall_force_restores_linearly_with_configured_spring() {
        let grid = grid_1d(false);
        let model = BiasModel::new(&[2], &grid);
        let config = config_with_wall(25.0);
        let mut force = BiasForce::new(1);

        force.update_boundaries(&[2.4], &grid);
        force.evaluate(&model, &grid, &config, &[2.4]);
        let above = force.derivatives()[0];
        assert!((above - -25.0 * 0.4).abs() < 1e-12);

        force.update_boundaries(&[-2.8], &grid);
        force.evaluate(&model, &grid, &config, &[-2.8]);
        let below = force.derivatives()[0];
        assert!((below - 25.0 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn wall_magnitude_is_linear_in_displacement() {
        let grid = grid_1d(false);
        let model = BiasModel::new(&[2], &grid);
        let config = config_with_wall(10.0);
        let mut force = BiasForce::new(1);

        force.update_boundaries(&[2.5], &grid);
        force.evaluate(&model, &grid, &config, &[2.5]);
        let f1 = force.derivatives()[0];
        force.evaluate(&model, &grid, &config, &[3.0]);
        let f2 = force.derivatives()[0];

        let slope = (f2 - f1) / 0.5;
        assert!((slope - -10.0).abs() < 1e-12);
    }

    #[test]
    fn leaving_the_domain_suspends_gathering_until_return() {
        let grid = grid_1d(false);
        let mut force = BiasForce::new(1);

        force.update_boundaries(&[0.0], &grid);
        assert!(force.gathering());

        force.update_boundaries(&[2.5], &grid);
        assert!(!force.gathering());
        assert_eq!(force.boundary_state(0), BoundaryState::AboveMax);

        force.update_boundaries(&[-2.5], &grid);
        assert_eq!(force.boundary_state(0), BoundaryState::BelowMin);
        assert!(!force.gathering());

        force.update_boundaries(&[1.0], &grid);
        assert!(force.gathering());
        assert_eq!(force.boundary_state(0), BoundaryState::Inside);
    }

    #[test]
    fn periodic_dimension_never_leaves_the_domain() {
        let grid = grid_1d(true);
        let mut force = BiasForce::new(1);

        force.update_boundaries(&[17.0], &grid);
        assert!(force.gathering());
        assert_eq!(force.boundary_state(0), BoundaryState::Inside);
    }

    #[test]
    fn basis_force_is_suppressed_outside_domain_but_wall_is_not() {
        let grid = grid_1d(false);
        let mut model = BiasModel::new(&[2], &grid);
        model.coefficients[1] = 3.0;
        let config = config_with_wall(25.0);
        let mut force = BiasForce::new(1);

        force.update_boundaries(&[2.4], &grid);
        force.evaluate(&model, &grid, &config, &[2.4]);

        // Only the harmonic wall contributes out here.
        assert!((force.derivatives()[0] - -25.0 * 0.4).abs() < 1e-12);
    }
}
