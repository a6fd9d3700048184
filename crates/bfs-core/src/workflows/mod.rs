//! The public, user-facing entry point: a run loop that drives any
//! [`Dynamics`] implementation with the sampler hooked in after each step.
//!
//! [`Dynamics`]: sample::Dynamics

pub mod sample;
