//! # Basis-Function Sampling Core Library
//!
//! An adaptive basis-function bias engine for enhanced-sampling molecular
//! simulation: it estimates a free-energy surface over a low-dimensional
//! space of collective variables by projecting a running histogram of
//! visited states onto an orthogonal Legendre basis, and converts that
//! running estimate into generalized forces applied back into the
//! simulation every step.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers with a strict dependency
//! direction, so the numerical core stays testable in isolation:
//!
//! - **[`core`]: The Foundation.** Stateless math (the Legendre lookup
//!   table, the tensor-product coefficient index) and the data contracts
//!   shared with the simulation driver (the histogram grid, the
//!   `CollectiveVariable` trait, the `Snapshot`).
//!
//! - **[`engine`]: The Logic Core.** The stateful layer: configuration and
//!   its normalization, the walker transport collectives, the mutable
//!   `BiasModel`, the periodic reduce/reweight/integrate update, per-step
//!   force evaluation, and the periodic surface report. `BasisSampler`
//!   ties these into the hook a driver calls after every step.
//!
//! - **[`workflows`]: The Public API.** A generic run loop that advances
//!   any `Dynamics` implementation with the sampler attached, returning a
//!   `RunSummary`.

pub mod core;
pub mod engine;
pub mod workflows;

pub use crate::core::cv::CollectiveVariable;
pub use crate::core::grid::{GridAxis, HistogramGrid};
pub use crate::core::snapshot::Snapshot;
pub use crate::engine::config::{BiasConfig, BiasConfigBuilder, Restraint};
pub use crate::engine::error::BiasError;
pub use crate::engine::method::{BasisSampler, StepOutcome};
pub use crate::engine::transport::{InProcessTransport, SingleWalker, WalkerTransport};
pub use crate::workflows::sample::{Dynamics, RunSummary};
