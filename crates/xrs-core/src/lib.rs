//! # xrs-core
//!
//! Core building blocks shared across the xrstat workspace:
//! - the workspace-level [`Error`] type and [`Result`] alias
//! - cross-layer traits ([`traits::LogPrior`])
//! - shared result entities ([`types::PosteriorSamples`])
//!
//! Higher-level crates (readers, inference) depend on this crate, never on
//! each other's internals.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::LogPrior;
pub use types::PosteriorSamples;
