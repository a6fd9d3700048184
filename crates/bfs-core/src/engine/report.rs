//! Periodic output of the reconstructed free-energy surface.
//!
//! Two files per run, rewritten on every update sweep by the designated
//! walker: `basis{suffix}.out` with one row per interior histogram bin,
//! and `coeff{suffix}.out` with the sweep count followed by the raw
//! coefficient vector in index order.

use super::config::BiasConfig;
use super::error::BiasError;
use super::model::BiasModel;
use crate::core::grid::HistogramGrid;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

const COLUMN: usize = 35;

/// Writes both output files into `dir`.
pub fn write_surface(
    model: &BiasModel,
    grid: &HistogramGrid,
    beta: f64,
    config: &BiasConfig,
    dir: &Path,
) -> Result<(), BiasError> {
    let basis_path = dir.join(format!("basis{}.out", config.basis_suffix));
    let coeff_path = dir.join(format!("coeff{}.out", config.coeff_suffix));

    let mut basis_out = BufWriter::new(File::create(&basis_path)?);
    let mut coeff_out = BufWriter::new(File::create(&coeff_path)?);

    write!(
        basis_out,
        "{:<width$}",
        "CV Values",
        width = COLUMN * grid.dimension()
    )?;
    writeln!(
        basis_out,
        "{:>width$}{:>width$}{:>width$}",
        "Basis Set Bias",
        "PMF Estimate",
        "Biased Histogram",
        width = COLUMN
    )?;

    let mut ordinal = 0;
    for point in grid.iter() {
        if point.is_under_overflow_bin() {
            continue;
        }

        for dim in 0..grid.dimension() {
            write!(
                basis_out,
                "{:<width$.5}",
                grid.coordinate(dim, point.index(dim)),
                width = COLUMN
            )?;
        }

        let bias = model.bias_at(point.indices());
        let unbias = model.unbias[ordinal];
        write!(basis_out, "{:>width$.5}", -bias, width = COLUMN)?;
        if unbias != 0.0 {
            write!(basis_out, "{:>width$.5}", -unbias.ln() / beta, width = COLUMN)?;
        } else {
            write!(basis_out, "{:>width$}", "0", width = COLUMN)?;
        }
        writeln!(basis_out, "{:>width$.5}", unbias, width = COLUMN)?;

        ordinal += 1;
    }

    writeln!(coeff_out, "{}", model.iteration())?;
    for &coefficient in model.coefficients() {
        writeln!(coeff_out, "{:.5}", coefficient)?;
    }

    basis_out.flush()?;
    coeff_out.flush()?;

    debug!(
        basis = %basis_path.display(),
        coeff = %coeff_path.display(),
        sweep = model.iteration(),
        "Wrote reconstructed surface"
    );
    Ok(())
}
