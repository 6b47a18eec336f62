//! # xrs-ogip
//!
//! Native OGIP PHA spectral file reader for xrstat.
//!
//! Reads Type I (single-spectrum) and Type II (multi-spectrum) PHA files
//! from their FITS containers without external FITS libraries. Keyword
//! resolution tolerates the common real-world deviations from the OGIP
//! standard (values in columns instead of the header, missing `POISSERR`
//! or `ANCRFILE`), and the resulting spectrum is always expressed in
//! rate units regardless of whether the file stored counts or rates.
//!
//! ## Example
//!
//! ```no_run
//! use xrs_ogip::{FileType, PhaSpectrum};
//!
//! // Spectrum 1 of a type II file, via the `{N}` path selector.
//! let spectrum = PhaSpectrum::open("obs.pha{1}", None, FileType::Observed).unwrap();
//! println!("{} channels over {} s", spectrum.n_channels(), spectrum.exposure());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bintable;
pub mod buffer;
pub mod error;
pub mod file;
pub mod header;
pub mod keywords;
pub mod spectrum;

pub use bintable::{Column, RawTable};
pub use error::{PhaError, Result};
pub use file::{FitsFile, HduInfo};
pub use header::{Header, HeaderValue};
pub use keywords::{FileType, ResolvedKeywords};
pub use spectrum::{PhaSpectrum, SpectrumShape};
