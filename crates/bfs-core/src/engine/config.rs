use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("At least one polynomial order must be configured")]
    NoPolynomialOrders,

    #[error("Update period must be at least one step")]
    ZeroUpdatePeriod,

    #[error("Configured {got} restraints for {expected} CVs")]
    RestraintCountMismatch { expected: usize, got: usize },

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Harmonic hard-wall restraint for one non-periodic CV.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Restraint {
    pub lower: f64,
    pub upper: f64,
    /// Spring constant; zero disables the wall.
    pub spring: f64,
}

impl Restraint {
    /// A wall that never engages.
    pub fn inactive() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            spring: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BiasConfig {
    /// Maximum polynomial order per CV dimension.
    pub polynomial_orders: Vec<usize>,

    /// Steps between coefficient refresh cycles.
    pub update_period: u64,

    /// Per-bin weight of this walker's samples in the reweighting sum.
    #[serde(default = "default_walker_weight")]
    pub walker_weight: f64,

    /// Threshold on the summed squared coefficient change per cycle.
    pub convergence_tolerance: f64,

    /// Terminate the run (all walkers) once converged.
    #[serde(default)]
    pub exit_on_convergence: bool,

    /// Used when the snapshot reports exactly zero temperature.
    #[serde(default)]
    pub fallback_temperature: Option<f64>,

    /// Hard-wall envelope per CV; filled with inactive walls when omitted.
    #[serde(default)]
    pub restraints: Vec<Restraint>,

    /// Suffix of the reconstructed-surface output file.
    #[serde(default)]
    pub basis_suffix: String,

    /// Suffix of the coefficient output file.
    #[serde(default)]
    pub coeff_suffix: String,
}

fn default_walker_weight() -> f64 {
    1.0
}

impl BiasConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validates and completes the configuration for a run over `num_cvs`
    /// dimensions. Runs exactly once at initialization; nothing mutates a
    /// configuration mid-run.
    ///
    /// An order-count mismatch is recoverable: the first configured order
    /// is replicated across all dimensions, with a warning. A restraint
    /// count mismatch is not, since a wrong wall silently distorts the
    /// sampled ensemble.
    pub fn normalized(mut self, num_cvs: usize) -> Result<Self, ConfigError> {
        if self.polynomial_orders.is_empty() {
            return Err(ConfigError::NoPolynomialOrders);
        }
        if self.update_period == 0 {
            return Err(ConfigError::ZeroUpdatePeriod);
        }

        if self.polynomial_orders.len() != num_cvs {
            warn!(
                configured = self.polynomial_orders.len(),
                cvs = num_cvs,
                order = self.polynomial_orders[0],
                "Polynomial order count does not match the number of CVs; \
                 replicating the first configured order across all dimensions"
            );
            self.polynomial_orders = vec![self.polynomial_orders[0]; num_cvs];
        }

        if self.restraints.is_empty() {
            self.restraints = vec![Restraint::inactive(); num_cvs];
        } else if self.restraints.len() != num_cvs {
            return Err(ConfigError::RestraintCountMismatch {
                expected: num_cvs,
                got: self.restraints.len(),
            });
        }

        Ok(self)
    }
}

#[derive(Default)]
pub struct BiasConfigBuilder {
    polynomial_orders: Option<Vec<usize>>,
    update_period: Option<u64>,
    walker_weight: Option<f64>,
    convergence_tolerance: Option<f64>,
    exit_on_convergence: bool,
    fallback_temperature: Option<f64>,
    restraints: Vec<Restraint>,
    basis_suffix: String,
    coeff_suffix: String,
}

impl BiasConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polynomial_orders(mut self, orders: Vec<usize>) -> Self {
        self.polynomial_orders = Some(orders);
        self
    }
    pub fn update_period(mut self, steps: u64) -> Self {
        self.update_period = Some(steps);
        self
    }
    pub fn walker_weight(mut self, weight: f64) -> Self {
        self.walker_weight = Some(weight);
        self
    }
    pub fn convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence_tolerance = Some(tolerance);
        self
    }
    pub fn exit_on_convergence(mut self, exit: bool) -> Self {
        self.exit_on_convergence = exit;
        self
    }
    pub fn fallback_temperature(mut self, temperature: f64) -> Self {
        self.fallback_temperature = Some(temperature);
        self
    }
    pub fn restraint(mut self, restraint: Restraint) -> Self {
        self.restraints.push(restraint);
        self
    }
    pub fn basis_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.basis_suffix = suffix.into();
        self
    }
    pub fn coeff_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.coeff_suffix = suffix.into();
        self
    }

    pub fn build(self) -> Result<BiasConfig, ConfigError> {
        Ok(BiasConfig {
            polynomial_orders: self
                .polynomial_orders
                .ok_or(ConfigError::MissingParameter("polynomial_orders"))?,
            update_period: self
                .update_period
                .ok_or(ConfigError::MissingParameter("update_period"))?,
            walker_weight: self.walker_weight.unwrap_or_else(default_walker_weight),
            convergence_tolerance: self
                .convergence_tolerance
                .ok_or(ConfigError::MissingParameter("convergence_tolerance"))?,
            exit_on_convergence: self.exit_on_convergence,
            fallback_temperature: self.fallback_temperature,
            restraints: self.restraints,
            basis_suffix: self.basis_suffix,
            coeff_suffix: self.coeff_suffix,
        })
    }
}
