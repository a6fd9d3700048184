use bfsample::BiasError;
use bfsample::engine::config::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Bias(#[from] BiasError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Grid setup failed: {0}")]
    Grid(#[from] bfsample::core::grid::GridError),

    #[error("Walker thread panicked")]
    WalkerPanicked,
}
