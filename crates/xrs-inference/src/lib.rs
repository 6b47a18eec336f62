//! # xrs-inference
//!
//! Statistical post-processing for xrstat.
//!
//! This crate provides:
//! - systematic resampling of weighted nested-sampling draws into an
//!   equally-weighted posterior sample set
//! - per-parameter prior building blocks for recomputing joint
//!   log-probabilities
//!
//! ## Architecture
//!
//! This crate depends on the [`xrs_core::LogPrior`] trait, NOT on any
//! concrete model or reader implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Per-parameter prior building blocks.
pub mod prior;
/// Systematic resampling of weighted posterior draws.
pub mod resample;

pub use prior::{IndependentPriors, Prior};
pub use resample::{resample_equal, resample_posterior, systematic_indices, NestedRun};
