//! # Engine Module
//!
//! The stateful layer of the bias engine. It owns the run state (the
//! coefficient expansion, the reweighted density accumulator, the visit
//! histogram) and orchestrates the per-step and per-period work:
//!
//! - **Configuration** ([`config`]) - run parameters, builder, TOML
//!   loading, and the one-shot normalization step
//! - **Transport** ([`transport`]) - the blocking collectives that keep
//!   multiple walkers on one shared bias model
//! - **Model** ([`model`]) - the mutable bias state and the shared
//!   bias-at-bin evaluation
//! - **Update** ([`update`]) - the reduce / reweight / integrate sweep and
//!   its convergence metric
//! - **Force** ([`force`]) - per-step chain-rule force evaluation, boundary
//!   tracking, and hard walls
//! - **Report** ([`report`]) - periodic surface and coefficient output
//! - **Method** ([`method`]) - the [`method::BasisSampler`] facade a
//!   simulation driver hooks into
//! - **Error Handling** ([`error`]) - engine-wide error type

pub mod config;
pub mod error;
pub mod force;
pub mod method;
pub mod model;
pub mod report;
pub mod transport;
pub mod update;
