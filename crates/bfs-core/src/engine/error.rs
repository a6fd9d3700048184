use thiserror::Error;

use super::config::ConfigError;
use super::transport::TransportError;
use crate::core::grid::GridError;

#[derive(Debug, Error)]
pub enum BiasError {
    #[error("Histogram grid dimensionality ({grid}) does not match number of CVs ({cvs})")]
    DimensionMismatch { grid: usize, cvs: usize },

    #[error(
        "Snapshot temperature is zero and no fallback temperature is configured; \
         the bias cannot be reweighted without one"
    )]
    MissingTemperature,

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Grid error: {source}")]
    Grid {
        #[from]
        source: GridError,
    },

    #[error("Walker collective failed: {source}")]
    Transport {
        #[from]
        source: TransportError,
    },

    #[error("Failed to write output: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
