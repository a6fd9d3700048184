//! D-dimensional visit histogram over collective-variable space.
//!
//! Each axis carries its interior bin count, bounds, and periodicity.
//! Non-periodic axes get one underflow and one overflow slot so that
//! excursions outside the domain land somewhere addressable; those slots
//! are excluded from all integration and reporting. Periodic axes wrap
//! instead and have no outflow slots.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("Axis {0} has zero bins")]
    EmptyAxis(usize),

    #[error("Axis {dim} has inverted bounds: [{lower}, {upper}]")]
    InvertedBounds { dim: usize, lower: f64, upper: f64 },
}

/// One histogram axis.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis {
    pub bins: usize,
    pub lower: f64,
    pub upper: f64,
    pub periodic: bool,
}

impl GridAxis {
    pub fn new(bins: usize, lower: f64, upper: f64, periodic: bool) -> Self {
        Self {
            bins,
            lower,
            upper,
            periodic,
        }
    }

    fn span(&self) -> usize {
        if self.periodic { self.bins } else { self.bins + 2 }
    }

    fn offset(&self) -> usize {
        if self.periodic { 0 } else { 1 }
    }
}

/// Visit-count histogram with per-axis outflow handling.
#[derive(Debug, Clone)]
pub struct HistogramGrid {
    axes: Vec<GridAxis>,
    strides: Vec<usize>,
    counts: Vec<i64>,
}

impl HistogramGrid {
    pub fn new(axes: Vec<GridAxis>) -> Result<Self, GridError> {
        for (dim, axis) in axes.iter().enumerate() {
            if axis.bins == 0 {
                return Err(GridError::EmptyAxis(dim));
            }
            if axis.upper <= axis.lower {
                return Err(GridError::InvertedBounds {
                    dim,
                    lower: axis.lower,
                    upper: axis.upper,
                });
            }
        }

        let mut strides = Vec::with_capacity(axes.len());
        let mut stride = 1;
        for axis in &axes {
            strides.push(stride);
            stride *= axis.span();
        }

        Ok(Self {
            axes,
            strides,
            counts: vec![0; stride.max(1)],
        })
    }

    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// Interior bin count of an axis (outflow slots excluded).
    pub fn num_points(&self, dim: usize) -> usize {
        self.axes[dim].bins
    }

    pub fn lower(&self, dim: usize) -> f64 {
        self.axes[dim].lower
    }

    pub fn upper(&self, dim: usize) -> f64 {
        self.axes[dim].upper
    }

    pub fn periodic(&self, dim: usize) -> bool {
        self.axes[dim].periodic
    }

    pub fn bin_width(&self, dim: usize) -> f64 {
        let axis = &self.axes[dim];
        (axis.upper - axis.lower) / axis.bins as f64
    }

    /// Total storage size, outflow slots included.
    pub fn size(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[i64] {
        &self.counts
    }

    pub fn reset(&mut self) {
        self.counts.fill(0);
    }

    /// Physical coordinate of an interior bin center on one axis.
    pub fn coordinate(&self, dim: usize, bin: isize) -> f64 {
        self.axes[dim].lower + (bin as f64 + 0.5) * self.bin_width(dim)
    }

    /// Per-dimension bin index of a CV vector. Periodic axes wrap into
    /// `[0, bins)`; non-periodic axes clamp to `-1` (underflow) or `bins`
    /// (overflow) when the value lies outside the domain.
    pub fn bin_indices(&self, values: &[f64]) -> Vec<isize> {
        debug_assert_eq!(values.len(), self.dimension());
        values
            .iter()
            .zip(&self.axes)
            .map(|(&x, axis)| {
                let width = (axis.upper - axis.lower) / axis.bins as f64;
                let raw = ((x - axis.lower) / width).floor() as isize;
                if axis.periodic {
                    raw.rem_euclid(axis.bins as isize)
                } else {
                    raw.clamp(-1, axis.bins as isize)
                }
            })
            .collect()
    }

    /// Increments the bin holding the given CV vector.
    pub fn accumulate(&mut self, values: &[f64]) {
        let flat = self.flat_index(&self.bin_indices(values));
        self.counts[flat] += 1;
    }

    /// Flat storage index of a per-dimension bin index vector.
    pub fn flat_index(&self, indices: &[isize]) -> usize {
        indices
            .iter()
            .zip(&self.axes)
            .zip(&self.strides)
            .map(|((&idx, axis), stride)| (idx + axis.offset() as isize) as usize * stride)
            .sum()
    }

    /// Installs externally merged counts (same layout as [`counts`]).
    ///
    /// [`counts`]: HistogramGrid::counts
    pub fn install_counts(&mut self, merged: &[i64]) {
        debug_assert_eq!(merged.len(), self.counts.len());
        self.counts.copy_from_slice(merged);
    }

    /// Iterates over every storage cell in flat order.
    pub fn iter(&self) -> GridIter<'_> {
        GridIter {
            grid: self,
            flat: 0,
            cursor: vec![0; self.axes.len()],
        }
    }
}

/// One histogram cell as seen by the flat-order iterator.
#[derive(Debug, Clone)]
pub struct GridPoint {
    pub flat: usize,
    indices: Vec<isize>,
    outflow: bool,
}

impl GridPoint {
    /// Signed interior bin index along one dimension; `-1` and `bins`
    /// mark the outflow slots of a non-periodic axis.
    pub fn index(&self, dim: usize) -> isize {
        self.indices[dim]
    }

    pub fn indices(&self) -> &[isize] {
        &self.indices
    }

    pub fn is_under_overflow_bin(&self) -> bool {
        self.outflow
    }
}

pub struct GridIter<'a> {
    grid: &'a HistogramGrid,
    flat: usize,
    cursor: Vec<usize>,
}

impl<'a> Iterator for GridIter<'a> {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.flat >= self.grid.size() {
            return None;
        }

        let mut outflow = false;
        let indices: Vec<isize> = self
            .cursor
            .iter()
            .zip(&self.grid.axes)
            .map(|(&storage, axis)| {
                let idx = storage as isize - axis.offset() as isize;
                if idx < 0 || idx >= axis.bins as isize {
                    outflow = true;
                }
                idx
            })
            .collect();

        let point = GridPoint {
            flat: self.flat,
            indices,
            outflow,
        };

        self.flat += 1;
        for (storage, axis) in self.cursor.iter_mut().zip(&self.grid.axes) {
            *storage += 1;
            if *storage < axis.span() {
                break;
            }
            *storage = 0;
        }

        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_1d(bins: usize, periodic: bool) -> HistogramGrid {
        HistogramGrid::new(vec![GridAxis::new(bins, -1.0, 1.0, periodic)]).unwrap()
    }

    #[test]
    fn non_periodic_axis_carries_two_outflow_slots() {
        let grid = grid_1d(10, false);
        assert_eq!(grid.size(), 12);
        assert_eq!(grid.iter().filter(|p| !p.is_under_overflow_bin()).count(), 10);
    }

    #[test]
    fn periodic_axis_has_no_outflow_slots() {
        let grid = grid_1d(10, true);
        assert_eq!(grid.size(), 10);
        assert!(grid.iter().all(|p| !p.is_under_overflow_bin()));
    }

    #[test]
    fn accumulate_bins_values_into_interior() {
        let mut grid = grid_1d(4, false);
        grid.accumulate(&[-0.9]);
        grid.accumulate(&[-0.9]);
        grid.accumulate(&[0.9]);

        let hits: Vec<(isize, i64)> = grid
            .iter()
            .filter(|p| grid.counts()[p.flat] > 0)
            .map(|p| (p.index(0), grid.counts()[p.flat]))
            .collect();
        assert_eq!(hits, vec![(0, 2), (3, 1)]);
    }

    #[test]
    fn out_of_domain_values_land_in_outflow_slots() {
        let mut grid = grid_1d(4, false);
        grid.accumulate(&[-5.0]);
        grid.accumulate(&[5.0]);

        for point in grid.iter() {
            if grid.counts()[point.flat] > 0 {
                assert!(point.is_under_overflow_bin());
            }
        }
    }

    #[test]
    fn periodic_axis_wraps_out_of_domain_values() {
        let mut grid = grid_1d(4, true);
        // One full period above the domain maps back to the same bin.
        grid.accumulate(&[0.1]);
        grid.accumulate(&[2.1]);

        let indices = grid.bin_indices(&[0.1]);
        let flat = grid.flat_index(&indices);
        assert_eq!(grid.counts()[flat], 2);
    }

    #[test]
    fn iteration_varies_dimension_zero_fastest() {
        let grid = HistogramGrid::new(vec![
            GridAxis::new(2, 0.0, 1.0, true),
            GridAxis::new(2, 0.0, 1.0, true),
        ])
        .unwrap();
        let order: Vec<(isize, isize)> = grid.iter().map(|p| (p.index(0), p.index(1))).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn coordinates_are_bin_centers() {
        let grid = grid_1d(4, false);
        assert!((grid.coordinate(0, 0) - -0.75).abs() < 1e-12);
        assert!((grid.coordinate(0, 3) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn construction_rejects_degenerate_axes() {
        assert_eq!(
            HistogramGrid::new(vec![GridAxis::new(0, 0.0, 1.0, false)]).unwrap_err(),
            GridError::EmptyAxis(0)
        );
        assert!(matches!(
            HistogramGrid::new(vec![GridAxis::new(4, 1.0, 0.0, false)]).unwrap_err(),
            GridError::InvertedBounds { dim: 0, .. }
        ));
    }
}
