//! Owned mutable state of the bias.
//!
//! Everything the update cycle mutates lives here: the coefficient array,
//! the importance-reweighted accumulator, and the sweep counter, together
//! with the immutable lookup tables they are read against. One instance
//! exists per run and is threaded by reference through the components;
//! there are no ambient globals.

use crate::core::basis::PolynomialTable;
use crate::core::coeff::CoefficientIndex;
use crate::core::grid::HistogramGrid;

pub struct BiasModel {
    /// Completed update sweeps.
    pub(crate) iteration: u64,

    /// One coefficient per slot of [`CoefficientIndex`], in index order.
    /// Slot 0 (the constant basis function) stays zero for the whole run.
    pub(crate) coefficients: Vec<f64>,

    /// Importance-reweighted accumulation of the unbiased distribution.
    /// Sized like the histogram storage; outflow slots are never touched
    /// and the array is indexed by interior-bin ordinal.
    pub(crate) unbias: Vec<f64>,

    pub(crate) index: CoefficientIndex,
    pub(crate) tables: Vec<PolynomialTable>,
}

impl BiasModel {
    /// Allocates zeroed state for the given per-dimension orders and grid.
    /// The order list must already be normalized to the CV count.
    pub fn new(orders: &[usize], grid: &HistogramGrid) -> Self {
        let index = CoefficientIndex::new(orders);
        let tables = index
            .max_orders()
            .iter()
            .enumerate()
            .map(|(dim, &order)| PolynomialTable::new(order, grid.num_points(dim)))
            .collect();

        Self {
            iteration: 0,
            coefficients: vec![0.0; index.len()],
            unbias: vec![0.0; grid.size()],
            index,
            tables,
        }
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn index(&self) -> &CoefficientIndex {
        &self.index
    }

    pub fn table(&self, dim: usize) -> &PolynomialTable {
        &self.tables[dim]
    }

    /// Bias estimate at an interior bin: the sum over all non-constant
    /// slots of `coefficient × Π_dim value(bin_dim, order_dim)`.
    pub fn bias_at(&self, indices: &[isize]) -> f64 {
        let mut bias = 0.0;
        for slot in 1..self.index.len() {
            let mut basis = 1.0;
            for (dim, &order) in self.index.orders_for(slot).iter().enumerate() {
                basis *= self.tables[dim].value(indices[dim] as usize, order);
            }
            bias += self.coefficients[slot] * basis;
        }
        bias
    }
}
