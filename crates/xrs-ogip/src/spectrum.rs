//! PHA spectrum extraction and the immutable rate-domain entity.

use std::path::{Path, PathBuf};

use crate::bintable::{Column, RawTable};
use crate::error::{PhaError, Result};
use crate::file::FitsFile;
use crate::keywords::{FileType, ResolvedKeywords};

/// Storage layout of the data column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumShape {
    /// Single spectrum, one channel per table row.
    TypeI,
    /// Multiple spectra, one spectrum per table row.
    TypeII {
        /// Number of spectra stored in the file.
        row_count: usize,
    },
}

/// One PHA spectrum, normalized to the rate domain.
///
/// Whether the source file stored counts or rates, and whether it was a
/// type I or type II file, the data here is always rate per channel. The
/// entity is immutable once built; a parse either yields a fully
/// validated spectrum or a typed error, never a partial value.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaSpectrum {
    rates: Vec<f64>,
    rate_errors: Option<Vec<f64>>,
    sys_errors: Vec<f64>,
    keywords: ResolvedKeywords,
    file_type: FileType,
    shape: SpectrumShape,
}

impl PhaSpectrum {
    /// Read one spectrum from a PHA file on disk.
    ///
    /// The path may carry a `{N}` suffix (`spectrum.pha{3}`) selecting the
    /// 1-based spectrum row of a type II file; the suffix takes precedence
    /// over `spectrum_number`. The underlying container handle is released
    /// before this returns, on success and on every failure path alike.
    pub fn open(
        path: impl AsRef<Path>,
        spectrum_number: Option<usize>,
        file_type: FileType,
    ) -> Result<Self> {
        let (path, suffix_number) = split_spectrum_suffix(path.as_ref())?;
        let spectrum_number = suffix_number.or(spectrum_number);
        let file = FitsFile::open(&path)?;
        let table = file.spectrum_table()?;
        Self::from_table(&table, spectrum_number, file_type)
    }

    /// Read one spectrum from an in-memory container (for testing).
    pub fn from_bytes(
        bytes: Vec<u8>,
        path: impl Into<PathBuf>,
        spectrum_number: Option<usize>,
        file_type: FileType,
    ) -> Result<Self> {
        let file = FitsFile::from_bytes(bytes, path.into())?;
        let table = file.spectrum_table()?;
        Self::from_table(&table, spectrum_number, file_type)
    }

    /// Build a spectrum from an already-decoded SPECTRUM table.
    pub fn from_table(
        table: &RawTable,
        spectrum_number: Option<usize>,
        file_type: FileType,
    ) -> Result<Self> {
        // Rescaling via a correction file is deliberately unsupported;
        // reject up front rather than silently ignoring the declaration.
        if let Some(value) = table.header.get("CORRFILE") {
            let corrfile = value.as_str().ok_or_else(|| {
                PhaError::Deserialization("CORRFILE keyword is not a string".into())
            })?;
            if !corrfile.trim().eq_ignore_ascii_case("NONE") {
                return Err(PhaError::UnsupportedRescaling {
                    corrfile: corrfile.trim().to_string(),
                });
            }
        }

        let (data_column, data_name, has_rates) = if let Some(c) = table.column("COUNTS") {
            (c, "COUNTS", false)
        } else if let Some(c) = table.column("RATE") {
            (c, "RATE", true)
        } else {
            return Err(PhaError::UnrecognizedDataColumn);
        };

        let shape = match data_column {
            Column::Array(rows) => SpectrumShape::TypeII { row_count: rows.len() },
            Column::Scalar(_) => SpectrumShape::TypeI,
            Column::Text(_) => {
                return Err(PhaError::Deserialization(format!(
                    "data column {data_name} is not numeric"
                )));
            }
        };

        // Type II needs a valid 1-based row; type I ignores any supplied
        // number (the whole column is the spectrum).
        let row = match shape {
            SpectrumShape::TypeII { row_count } => {
                let index = spectrum_number.ok_or(PhaError::MissingSpectrumIndex)?;
                if index < 1 || index > row_count {
                    return Err(PhaError::IndexOutOfRange { index, rows: row_count });
                }
                Some(index - 1)
            }
            SpectrumShape::TypeI => None,
        };

        let keywords = ResolvedKeywords::resolve(table, file_type, row)?;

        let raw = select_row(data_column, row, data_name)?;
        let rates: Vec<f64> = if has_rates {
            raw
        } else {
            raw.iter().map(|c| c / keywords.exposure).collect()
        };

        let rate_errors = if keywords.poisserr {
            None
        } else {
            let column = table
                .column("STAT_ERR")
                .ok_or_else(|| PhaError::ColumnNotFound("STAT_ERR".to_string()))?;
            let errors = select_row(column, row, "STAT_ERR")?;
            Some(if has_rates {
                errors
            } else {
                errors.iter().map(|e| e / keywords.exposure).collect()
            })
        };

        let sys_errors = match table.column("SYS_ERR") {
            Some(column) => select_row(column, row, "SYS_ERR")?,
            None => vec![0.0; rates.len()],
        };

        if rates.len() != keywords.detchans {
            return Err(PhaError::ChannelCountMismatch {
                detchans: keywords.detchans,
                actual: rates.len(),
            });
        }

        Ok(Self { rates, rate_errors, sys_errors, keywords, file_type, shape })
    }

    /// Rate per channel, in counts per second.
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Statistical errors on the rates, from the STAT_ERR column.
    ///
    /// A Poisson spectrum stores no error array by definition; requesting
    /// one is a caller bug surfaced as [`PhaError::PoissonErrorRequested`]
    /// (the variance must be computed from the rates instead).
    pub fn rate_errors(&self) -> Result<&[f64]> {
        match &self.rate_errors {
            Some(errors) => Ok(errors),
            None => Err(PhaError::PoissonErrorRequested),
        }
    }

    /// Systematic errors per channel; all zero when the file carried no
    /// SYS_ERR column.
    pub fn sys_errors(&self) -> &[f64] {
        &self.sys_errors
    }

    /// Exposure in seconds.
    pub fn exposure(&self) -> f64 {
        self.keywords.exposure
    }

    /// BACKSCAL scale factor for background/source region rescaling.
    pub fn scale_factor(&self) -> f64 {
        self.keywords.backscal
    }

    /// Whether counting errors are Poisson-distributed.
    pub fn is_poisson(&self) -> bool {
        self.keywords.poisserr
    }

    /// Number of detector channels (DETCHANS).
    pub fn n_channels(&self) -> usize {
        self.keywords.detchans
    }

    /// Background file declared by the spectrum, or `None` when absent or
    /// declared as the literal `"NONE"`.
    pub fn background_file(&self) -> Option<&str> {
        optional_file(&self.keywords.backfile)
    }

    /// Response file declared by the spectrum, or `None`.
    pub fn response_file(&self) -> Option<&str> {
        optional_file(&self.keywords.respfile)
    }

    /// Ancillary response file declared by the spectrum, or `None`.
    pub fn ancillary_file(&self) -> Option<&str> {
        optional_file(&self.keywords.ancrfile)
    }

    /// Mission or telescope name (TELESCOP).
    pub fn mission(&self) -> &str {
        &self.keywords.mission
    }

    /// Instrument name (INSTRUME).
    pub fn instrument(&self) -> &str {
        &self.keywords.instrument
    }

    /// Filter in use (FILTER).
    pub fn filter(&self) -> &str {
        &self.keywords.filter
    }

    /// Channel numbering scheme (CHANTYPE).
    pub fn chan_type(&self) -> &str {
        &self.keywords.chantype
    }

    /// The keyword context this spectrum was parsed under.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Storage layout of the source file.
    pub fn shape(&self) -> SpectrumShape {
        self.shape
    }
}

/// Map a file-reference keyword to an optional path: absent values and
/// the literal `"NONE"` (case-insensitive) both mean "no file".
fn optional_file(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().eq_ignore_ascii_case("NONE"))
}

/// Select the spectrum's slice of a numeric column.
///
/// Type I (`row == None`) takes the whole column; type II takes the
/// selected row of a vector column.
fn select_row(column: &Column, row: Option<usize>, name: &str) -> Result<Vec<f64>> {
    match (column, row) {
        (Column::Scalar(values), None) => Ok(values.clone()),
        (Column::Array(rows), Some(r)) => rows.get(r).cloned().ok_or_else(|| {
            PhaError::Deserialization(format!("column {name} has no row {r}"))
        }),
        (Column::Scalar(_), Some(_)) => Err(PhaError::Deserialization(format!(
            "column {name} is not a vector column in a type II file"
        ))),
        (Column::Array(_), None) => Err(PhaError::Deserialization(format!(
            "column {name} is a vector column in a type I file"
        ))),
        (Column::Text(_), _) => {
            Err(PhaError::Deserialization(format!("column {name} is not numeric")))
        }
    }
}

/// Split an optional `{N}` spectrum selector off a path.
///
/// `spectrum.pha{3}` selects spectrum 3 (1-based) of `spectrum.pha`.
fn split_spectrum_suffix(path: &Path) -> Result<(PathBuf, Option<usize>)> {
    let text = path.to_string_lossy();
    let Some(stripped) = text.strip_suffix('}') else {
        return Ok((path.to_path_buf(), None));
    };
    let Some((base, selector)) = stripped.rsplit_once('{') else {
        return Ok((path.to_path_buf(), None));
    };
    let number = selector
        .trim()
        .parse::<usize>()
        .map_err(|_| PhaError::InvalidSpectrumSelector(text.to_string()))?;
    Ok((PathBuf::from(base), Some(number)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{Header, HeaderValue};

    fn spectrum_header(detchans: usize) -> Header {
        let mut h = Header::new();
        h.push("TELESCOP", HeaderValue::Str("NICER".into()));
        h.push("INSTRUME", HeaderValue::Str("XTI".into()));
        h.push("FILTER", HeaderValue::Str("NONE".into()));
        h.push("EXPOSURE", HeaderValue::Float(50.0));
        h.push("BACKFILE", HeaderValue::Str("NONE".into()));
        h.push("RESPFILE", HeaderValue::Str("nicer.rmf".into()));
        h.push("ANCRFILE", HeaderValue::Str("nicer.arf".into()));
        h.push("HDUCLASS", HeaderValue::Str("OGIP".into()));
        h.push("HDUCLAS1", HeaderValue::Str("SPECTRUM".into()));
        h.push("POISSERR", HeaderValue::Bool(true));
        h.push("CHANTYPE", HeaderValue::Str("PI".into()));
        h.push("DETCHANS", HeaderValue::Int(detchans as i64));
        h.push("BACKSCAL", HeaderValue::Float(2.0));
        h
    }

    fn test_table(detchans: usize, columns: Vec<(String, Column)>) -> RawTable {
        RawTable {
            path: PathBuf::from("unit.pha"),
            header: spectrum_header(detchans),
            columns,
            n_rows: detchans,
        }
    }

    #[test]
    fn counts_are_normalized_by_exposure() {
        let t = test_table(
            3,
            vec![("COUNTS".to_string(), Column::Scalar(vec![100.0, 200.0, 300.0]))],
        );
        let s = PhaSpectrum::from_table(&t, None, FileType::Observed).unwrap();
        assert_eq!(s.rates(), &[2.0, 4.0, 6.0]);
        assert_eq!(s.sys_errors(), &[0.0, 0.0, 0.0]);
        assert_eq!(s.shape(), SpectrumShape::TypeI);
    }

    #[test]
    fn rates_pass_through_unmodified() {
        let t = test_table(
            2,
            vec![("RATE".to_string(), Column::Scalar(vec![1.5, 2.5]))],
        );
        let s = PhaSpectrum::from_table(&t, None, FileType::Observed).unwrap();
        assert_eq!(s.rates(), &[1.5, 2.5]);
    }

    #[test]
    fn counts_win_over_rate_when_both_exist() {
        let t = test_table(
            2,
            vec![
                ("RATE".to_string(), Column::Scalar(vec![1.0, 1.0])),
                ("COUNTS".to_string(), Column::Scalar(vec![50.0, 100.0])),
            ],
        );
        let s = PhaSpectrum::from_table(&t, None, FileType::Observed).unwrap();
        assert_eq!(s.rates(), &[1.0, 2.0]);
    }

    #[test]
    fn poisson_spectrum_refuses_rate_errors() {
        let t = test_table(
            1,
            vec![("RATE".to_string(), Column::Scalar(vec![1.0]))],
        );
        let s = PhaSpectrum::from_table(&t, None, FileType::Observed).unwrap();
        assert!(s.is_poisson());
        assert!(matches!(s.rate_errors(), Err(PhaError::PoissonErrorRequested)));
    }

    #[test]
    fn non_poisson_requires_stat_err_column() {
        let mut t = test_table(
            1,
            vec![("RATE".to_string(), Column::Scalar(vec![1.0]))],
        );
        let mut h = Header::new();
        for (k, v) in t.header.iter() {
            if k != "POISSERR" {
                h.push(k, v.clone());
            }
        }
        h.push("POISSERR", HeaderValue::Bool(false));
        t.header = h;
        assert!(matches!(
            PhaSpectrum::from_table(&t, None, FileType::Observed),
            Err(PhaError::ColumnNotFound(name)) if name == "STAT_ERR"
        ));
    }

    #[test]
    fn channel_count_mismatch_is_fatal() {
        let t = test_table(
            4,
            vec![("COUNTS".to_string(), Column::Scalar(vec![1.0, 2.0]))],
        );
        assert!(matches!(
            PhaSpectrum::from_table(&t, None, FileType::Observed),
            Err(PhaError::ChannelCountMismatch { detchans: 4, actual: 2 })
        ));
    }

    #[test]
    fn type_two_requires_a_spectrum_number() {
        let t = test_table(
            2,
            vec![(
                "COUNTS".to_string(),
                Column::Array(vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
            )],
        );
        assert!(matches!(
            PhaSpectrum::from_table(&t, None, FileType::Observed),
            Err(PhaError::MissingSpectrumIndex)
        ));
        assert!(matches!(
            PhaSpectrum::from_table(&t, Some(3), FileType::Observed),
            Err(PhaError::IndexOutOfRange { index: 3, rows: 2 })
        ));
        assert!(matches!(
            PhaSpectrum::from_table(&t, Some(0), FileType::Observed),
            Err(PhaError::IndexOutOfRange { index: 0, rows: 2 })
        ));
    }

    #[test]
    fn type_one_ignores_a_supplied_spectrum_number() {
        let t = test_table(
            2,
            vec![("RATE".to_string(), Column::Scalar(vec![1.0, 2.0]))],
        );
        let s = PhaSpectrum::from_table(&t, Some(7), FileType::Observed).unwrap();
        assert_eq!(s.rates(), &[1.0, 2.0]);
    }

    #[test]
    fn corrfile_rescaling_is_rejected() {
        let mut t = test_table(
            1,
            vec![("RATE".to_string(), Column::Scalar(vec![1.0]))],
        );
        t.header.push("CORRFILE", HeaderValue::Str("corr.pha".into()));
        assert!(matches!(
            PhaSpectrum::from_table(&t, None, FileType::Observed),
            Err(PhaError::UnsupportedRescaling { corrfile }) if corrfile == "corr.pha"
        ));

        // The literal NONE means no correction and is accepted.
        let mut t = test_table(
            1,
            vec![("RATE".to_string(), Column::Scalar(vec![1.0]))],
        );
        t.header.push("CORRFILE", HeaderValue::Str("none".into()));
        assert!(PhaSpectrum::from_table(&t, None, FileType::Observed).is_ok());
    }

    #[test]
    fn missing_data_column_is_unrecognized() {
        let t = test_table(
            1,
            vec![("CHANNEL".to_string(), Column::Scalar(vec![1.0]))],
        );
        assert!(matches!(
            PhaSpectrum::from_table(&t, None, FileType::Observed),
            Err(PhaError::UnrecognizedDataColumn)
        ));
    }

    #[test]
    fn file_reference_accessors_map_none_literal() {
        let t = test_table(
            1,
            vec![("RATE".to_string(), Column::Scalar(vec![1.0]))],
        );
        let s = PhaSpectrum::from_table(&t, None, FileType::Observed).unwrap();
        assert_eq!(s.background_file(), None);
        assert_eq!(s.response_file(), Some("nicer.rmf"));
        assert_eq!(s.ancillary_file(), Some("nicer.arf"));
        assert_eq!(s.scale_factor(), 2.0);
        assert_eq!(s.mission(), "NICER");
        assert_eq!(s.chan_type(), "PI");
    }

    #[test]
    fn spectrum_suffix_parsing() {
        let (path, n) = split_spectrum_suffix(Path::new("spec.pha{3}")).unwrap();
        assert_eq!(path, PathBuf::from("spec.pha"));
        assert_eq!(n, Some(3));

        let (path, n) = split_spectrum_suffix(Path::new("spec.pha")).unwrap();
        assert_eq!(path, PathBuf::from("spec.pha"));
        assert_eq!(n, None);

        assert!(matches!(
            split_spectrum_suffix(Path::new("spec.pha{three}")),
            Err(PhaError::InvalidSpectrumSelector(_))
        ));
    }
}
