//! Error types for the OGIP PHA reader.

use thiserror::Error;

/// Errors produced while reading OGIP PHA spectral files.
///
/// Container-level parse failures and PHA-semantic failures share one enum
/// so a caller can match on exactly why a file was unusable. Every variant
/// is fatal for the parse that raised it; the caller decides whether to
/// skip the file or abort the wider analysis.
#[derive(Error, Debug)]
pub enum PhaError {
    /// I/O failure opening or mapping the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with a FITS primary header.
    #[error("bad magic: not a FITS container")]
    BadMagic,

    /// Read past the end of the underlying buffer.
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Offset at which the read was attempted.
        offset: usize,
        /// Bytes the read required.
        need: usize,
        /// Bytes actually available from that offset.
        have: usize,
    },

    /// Malformed container structure (header cards, TFORM codes, sizes).
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The container has no SPECTRUM extension.
    #[error("no SPECTRUM extension in '{path}': not a PHA file")]
    NotAPhaFile {
        /// Path of the offending file.
        path: String,
    },

    /// The file declares a CORRFILE rescaling, which the reader does not
    /// implement.
    #[error("CORRFILE '{corrfile}' requests rescaling, which is not supported")]
    UnsupportedRescaling {
        /// The declared correction file.
        corrfile: String,
    },

    /// The table carries neither a COUNTS nor a RATE column.
    #[error("no COUNTS or RATE column: not a valid PHA table")]
    UnrecognizedDataColumn,

    /// A type II file was opened without a spectrum number.
    #[error("type II PHA file requires a spectrum number")]
    MissingSpectrumIndex,

    /// The requested spectrum number does not select a row.
    #[error("spectrum number {index} out of range [1, {rows}]")]
    IndexOutOfRange {
        /// Requested 1-based spectrum number.
        index: usize,
        /// Number of spectra stored in the file.
        rows: usize,
    },

    /// A required keyword resolved neither from the header nor from a
    /// column, and no fallback applies.
    #[error("keyword {keyword} not found in '{path}': not a proper PHA file")]
    MissingKeyword {
        /// The unresolved header/column keyword (uppercase).
        keyword: String,
        /// Path of the offending file.
        path: String,
    },

    /// A column the table must carry is absent.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// The data column length disagrees with the declared channel count.
    #[error("data column has {actual} channels but DETCHANS declares {detchans}")]
    ChannelCountMismatch {
        /// Channel count declared by the DETCHANS keyword.
        detchans: usize,
        /// Actual data column length.
        actual: usize,
    },

    /// Rate errors were requested from a Poisson spectrum, which carries
    /// none by definition.
    #[error("cannot request rate errors for a Poisson spectrum")]
    PoissonErrorRequested,

    /// A `{N}` spectrum selector suffix on the path did not parse.
    #[error("invalid spectrum selector in path '{0}'")]
    InvalidSpectrumSelector(String),
}

/// Result type alias for PHA reads.
pub type Result<T> = std::result::Result<T, PhaError>;
