//! Tensor-product coefficient indexing.
//!
//! The bias expansion has one coefficient per combination of per-dimension
//! polynomial orders. The combinations are enumerated by a mixed-radix
//! counter with dimension 0 varying fastest; the resulting flat order is
//! what the coefficient output file and restart data are written in, so it
//! must stay stable.

/// Bijection between flat coefficient slots and per-dimension order tuples.
#[derive(Debug, Clone)]
pub struct CoefficientIndex {
    orders: Vec<usize>,
    // Multi-indices stored back to back, `dims` entries per slot.
    multi: Vec<usize>,
    dims: usize,
}

impl CoefficientIndex {
    /// Enumerates the full tensor product for the given per-dimension
    /// maximum orders. Slot 0 is always the all-zero multi-index: the
    /// constant basis function, which carries no force and is excluded
    /// from every update and evaluation loop.
    pub fn new(max_orders: &[usize]) -> Self {
        let dims = max_orders.len();
        let len: usize = max_orders.iter().map(|&p| p + 1).product();
        let mut multi = Vec::with_capacity(len * dims);
        let mut counter = vec![0usize; dims];
        for _ in 0..len {
            multi.extend_from_slice(&counter);
            for k in 0..dims {
                counter[k] += 1;
                if counter[k] <= max_orders[k] {
                    break;
                }
                // Dimension `dims - 1` never carries; the loop ends first.
                counter[k] = 0;
            }
        }
        Self {
            orders: max_orders.to_vec(),
            multi,
            dims,
        }
    }

    /// Number of coefficient slots, `Π (p_k + 1)`.
    pub fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.multi.len() / self.dims
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Maximum polynomial order per dimension.
    pub fn max_orders(&self) -> &[usize] {
        &self.orders
    }

    /// Per-dimension polynomial orders of the given slot.
    #[inline]
    pub fn orders_for(&self, slot: usize) -> &[usize] {
        &self.multi[slot * self.dims..(slot + 1) * self.dims]
    }
}
