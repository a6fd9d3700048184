//! Legendre basis lookup table.
//!
//! The free-energy surface is expanded in Legendre polynomials, one family
//! per collective-variable dimension. Because an axis is only ever sampled
//! at its histogram bin centers, both the polynomial values and their
//! derivatives are tabulated once at startup and read back by index for the
//! rest of the run.

/// Tabulated Legendre values and derivatives for one CV axis.
///
/// Storage is flat with the bin index varying fastest:
/// `values[bin + order * nbins]` holds `P_order` at the bin's internal
/// coordinate, and `derivs` holds `P'_order` with the same layout.
#[derive(Debug, Clone)]
pub struct PolynomialTable {
    nbins: usize,
    order: usize,
    values: Vec<f64>,
    derivs: Vec<f64>,
}

impl PolynomialTable {
    /// Builds the table for polynomial orders `0..=order` over `nbins` bins.
    ///
    /// Bin `i` maps to the internal coordinate `x_i = (2i+1)/nbins - 1`,
    /// a uniform sampling of (-1, 1). Restart files depend on this exact
    /// mapping, so it must not be replaced with a bin-center formula.
    pub fn new(order: usize, nbins: usize) -> Self {
        let ncoeff = order + 1;
        let mut values = vec![0.0; nbins * ncoeff];
        let mut derivs = vec![0.0; nbins * ncoeff];
        let x: Vec<f64> = (0..nbins)
            .map(|i| (2.0 * i as f64 + 1.0) / nbins as f64 - 1.0)
            .collect();

        for i in 0..nbins {
            values[i] = 1.0;
            derivs[i] = 0.0;
        }
        if ncoeff > 1 {
            for i in 0..nbins {
                values[i + nbins] = x[i];
                derivs[i + nbins] = 1.0;
            }
        }

        // Bonnet's recurrence gives values and derivatives in one pass.
        for j in 2..ncoeff {
            let jf = j as f64;
            for i in 0..nbins {
                values[i + j * nbins] = ((2.0 * jf - 1.0) * x[i] * values[i + (j - 1) * nbins]
                    - (jf - 1.0) * values[i + (j - 2) * nbins])
                    / jf;
                derivs[i + j * nbins] = ((2.0 * jf - 1.0)
                    * (values[i + (j - 1) * nbins] + x[i] * derivs[i + (j - 1) * nbins])
                    - (jf - 1.0) * derivs[i + (j - 2) * nbins])
                    / jf;
            }
        }

        Self {
            nbins,
            order,
            values,
            derivs,
        }
    }

    pub fn nbins(&self) -> usize {
        self.nbins
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Internal coordinate of bin `i`.
    pub fn coordinate(&self, bin: usize) -> f64 {
        (2.0 * bin as f64 + 1.0) / self.nbins as f64 - 1.0
    }

    #[inline]
    pub fn value(&self, bin: usize, order: usize) -> f64 {
        self.values[bin + order * self.nbins]
    }

    #[inline]
    pub fn deriv(&self, bin: usize, order: usize) -> f64 {
        self.derivs[bin + order * self.nbins]
    }
}
