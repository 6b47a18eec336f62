//! Keyword resolution for PHA spectral tables.
//!
//! OGIP keywords may live in the extension header, in a per-spectrum
//! column of a type II file, or be legally absent with a documented
//! fallback. Resolution is deterministic: header first, then a column
//! override (column wins, so per-spectrum metadata can vary within one
//! multi-row file), then the fallback or a hard failure.

use crate::bintable::RawTable;
use crate::error::{PhaError, Result};
use crate::header::HeaderValue;

/// Which keyword set applies to the file being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// An observed (source) spectrum.
    Observed,
    /// A background spectrum; file-reference keywords are not required.
    Background,
}

/// Keywords whose value may be overridden by an identically-named column
/// in a type II file. Each context uses strictly its own list.
const OBSERVED_COLUMN_OVERRIDES: &[&str] =
    &["EXPOSURE", "BACKFILE", "CORRFILE", "CORRSCAL", "RESPFILE", "ANCRFILE", "BACKSCAL"];
const BACKGROUND_COLUMN_OVERRIDES: &[&str] = &["EXPOSURE", "BACKSCAL"];

impl FileType {
    fn column_overrides(self) -> &'static [&'static str] {
        match self {
            FileType::Observed => OBSERVED_COLUMN_OVERRIDES,
            FileType::Background => BACKGROUND_COLUMN_OVERRIDES,
        }
    }
}

/// The fully-resolved keyword record for one spectrum.
///
/// Every field required by the active [`FileType`] is populated, or
/// [`resolve`](Self::resolve) has failed; there is no partially-resolved
/// state. File-reference values equal to the literal `"NONE"` are kept
/// verbatim here — mapping to "absent" happens at the spectrum accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedKeywords {
    /// TELESCOP: mission or telescope name.
    pub mission: String,
    /// INSTRUME: instrument name.
    pub instrument: String,
    /// FILTER: filter in use.
    pub filter: String,
    /// EXPOSURE: integration time in seconds.
    pub exposure: f64,
    /// BACKFILE: associated background file (observed files only).
    pub backfile: Option<String>,
    /// RESPFILE: associated redistribution matrix (observed files only).
    pub respfile: Option<String>,
    /// ANCRFILE: associated ancillary response (observed files only).
    pub ancrfile: Option<String>,
    /// HDUCLASS: format family declared by the writer.
    pub hduclass: String,
    /// HDUCLAS1: extension class declared by the writer.
    pub hduclas1: String,
    /// POISSERR: whether counting errors are Poisson-distributed.
    pub poisserr: bool,
    /// CHANTYPE: channel numbering scheme (PHA or PI).
    pub chantype: String,
    /// DETCHANS: declared number of detector channels.
    pub detchans: usize,
    /// BACKSCAL: background scale factor.
    pub backscal: f64,
}

impl ResolvedKeywords {
    /// Resolve all keywords required by `file_type` from `table`.
    ///
    /// `row` is the 0-based spectrum row for type II files (already range
    /// checked by the caller), `None` for type I files; column overrides
    /// apply only when it is `Some`.
    pub fn resolve(table: &RawTable, file_type: FileType, row: Option<usize>) -> Result<Self> {
        let mission = require_str(table, file_type, row, "TELESCOP")?;
        let instrument = require_str(table, file_type, row, "INSTRUME")?;
        let filter = require_str(table, file_type, row, "FILTER")?;
        let exposure = require_f64(table, file_type, row, "EXPOSURE")?;

        let (backfile, respfile, ancrfile) = match file_type {
            FileType::Observed => (
                Some(require_str(table, file_type, row, "BACKFILE")?),
                Some(require_str(table, file_type, row, "RESPFILE")?),
                Some(resolve_ancrfile(table, file_type, row)?),
            ),
            FileType::Background => (None, None, None),
        };

        let hduclass = require_str(table, file_type, row, "HDUCLASS")?;
        let hduclas1 = require_str(table, file_type, row, "HDUCLAS1")?;
        let poisserr = resolve_poisserr(table, file_type, row)?;
        let chantype = require_str(table, file_type, row, "CHANTYPE")?;
        let detchans = require_usize(table, file_type, row, "DETCHANS")?;
        let backscal = require_f64(table, file_type, row, "BACKSCAL")?;

        Ok(Self {
            mission,
            instrument,
            filter,
            exposure,
            backfile,
            respfile,
            ancrfile,
            hduclass,
            hduclas1,
            poisserr,
            chantype,
            detchans,
            backscal,
        })
    }
}

/// Header lookup with the type II column override applied.
fn lookup(
    table: &RawTable,
    file_type: FileType,
    row: Option<usize>,
    keyword: &str,
) -> Result<Option<HeaderValue>> {
    let mut value = table.header.get(keyword).cloned();

    if let Some(row) = row {
        if file_type.column_overrides().contains(&keyword) {
            if let Some(column) = table.column(keyword) {
                value = Some(column.keyword_value(row, keyword)?);
            }
        }
    }

    Ok(value)
}

fn missing(table: &RawTable, keyword: &str) -> PhaError {
    PhaError::MissingKeyword {
        keyword: keyword.to_string(),
        path: table.path.display().to_string(),
    }
}

fn type_error(keyword: &str, expected: &str, value: &HeaderValue) -> PhaError {
    PhaError::Deserialization(format!(
        "keyword {keyword} has type {}, expected {expected}",
        value.type_name()
    ))
}

fn require(
    table: &RawTable,
    file_type: FileType,
    row: Option<usize>,
    keyword: &str,
) -> Result<HeaderValue> {
    lookup(table, file_type, row, keyword)?.ok_or_else(|| missing(table, keyword))
}

fn require_str(
    table: &RawTable,
    file_type: FileType,
    row: Option<usize>,
    keyword: &str,
) -> Result<String> {
    let value = require(table, file_type, row, keyword)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| type_error(keyword, "string", &value))
}

fn require_f64(
    table: &RawTable,
    file_type: FileType,
    row: Option<usize>,
    keyword: &str,
) -> Result<f64> {
    let value = require(table, file_type, row, keyword)?;
    value.as_f64().ok_or_else(|| type_error(keyword, "number", &value))
}

fn require_usize(
    table: &RawTable,
    file_type: FileType,
    row: Option<usize>,
    keyword: &str,
) -> Result<usize> {
    let value = require(table, file_type, row, keyword)?;
    let n = value.as_i64().ok_or_else(|| type_error(keyword, "integer", &value))?;
    usize::try_from(n).map_err(|_| {
        PhaError::Deserialization(format!("keyword {keyword} must be non-negative, got {n}"))
    })
}

/// POISSERR falls back to `false` when a STAT_ERR column is present:
/// explicit errors are stored, so Poisson-only statistics cannot be
/// assumed. The fallback is a diagnostic, not a failure.
fn resolve_poisserr(table: &RawTable, file_type: FileType, row: Option<usize>) -> Result<bool> {
    match lookup(table, file_type, row, "POISSERR")? {
        Some(value) => {
            value.as_bool().ok_or_else(|| type_error("POISSERR", "logical", &value))
        }
        None if table.has_column("STAT_ERR") => {
            tracing::warn!(
                path = %table.path.display(),
                "POISSERR is not set; assuming non-Poisson errors from the STAT_ERR column"
            );
            Ok(false)
        }
        None => Err(missing(table, "POISSERR")),
    }
}

/// ANCRFILE falls back to the literal `"NONE"`: files without an
/// ancillary response are accepted with a diagnostic.
fn resolve_ancrfile(table: &RawTable, file_type: FileType, row: Option<usize>) -> Result<String> {
    match lookup(table, file_type, row, "ANCRFILE")? {
        Some(value) => value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_error("ANCRFILE", "string", &value)),
        None => {
            tracing::warn!(
                path = %table.path.display(),
                "ANCRFILE is not set; assuming no ancillary response"
            );
            Ok("NONE".to_string())
        }
    }
}
