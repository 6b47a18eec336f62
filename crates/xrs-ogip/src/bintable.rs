//! BINTABLE extension parsing: fixed-width big-endian rows into columns.

use std::path::{Path, PathBuf};

use crate::buffer::BeBuffer;
use crate::error::{PhaError, Result};
use crate::header::{Header, HeaderValue};

/// One decoded table column.
///
/// Numeric cells are widened to `f64` on decode regardless of the on-disk
/// type, so downstream code sees a single numeric representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Repeat-1 numeric column: one value per table row (the 1-D case).
    Scalar(Vec<f64>),
    /// Vector numeric column: `repeat` values per table row (the 2-D case).
    Array(Vec<Vec<f64>>),
    /// Fixed-width string column, trailing blanks stripped.
    Text(Vec<String>),
}

impl Column {
    /// Number of table rows in this column.
    pub fn n_rows(&self) -> usize {
        match self {
            Column::Scalar(v) => v.len(),
            Column::Array(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    /// Per-row cell interpreted as a header-style value, for keyword
    /// override resolution in type II files.
    pub(crate) fn keyword_value(&self, row: usize, name: &str) -> Result<HeaderValue> {
        let out_of_range = || {
            PhaError::Deserialization(format!("column {name} has no row {row}"))
        };
        match self {
            Column::Scalar(v) => {
                v.get(row).copied().map(HeaderValue::Float).ok_or_else(out_of_range)
            }
            Column::Text(v) => {
                v.get(row).cloned().map(HeaderValue::Str).ok_or_else(out_of_range)
            }
            Column::Array(_) => Err(PhaError::Deserialization(format!(
                "column {name} is a vector column and cannot override a scalar keyword"
            ))),
        }
    }
}

/// One parsed SPECTRUM extension: header plus decoded columns.
///
/// Fields are public so tests (and callers that already hold a table) can
/// build values directly without going through a container file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Path of the originating file, for diagnostics.
    pub path: PathBuf,
    /// The extension header.
    pub header: Header,
    /// Decoded columns in file order, names uppercase.
    pub columns: Vec<(String, Column)>,
    /// Number of table rows (NAXIS2).
    pub n_rows: usize,
}

impl RawTable {
    /// Look up a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&Column> {
        let key = name.to_ascii_uppercase();
        self.columns.iter().find(|(n, _)| *n == key).map(|(_, c)| c)
    }

    /// Whether the table carries the named column.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column names in file order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// Parsed TFORM descriptor: repeat count plus type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TForm {
    repeat: usize,
    code: char,
}

fn parse_tform(s: &str, field: usize) -> Result<TForm> {
    let s = s.trim();
    let digits: String = s.chars().take_while(char::is_ascii_digit).collect();
    let repeat = if digits.is_empty() {
        1
    } else {
        digits.parse::<usize>().map_err(|_| {
            PhaError::Deserialization(format!("bad repeat count in TFORM{field} '{s}'"))
        })?
    };
    let code = s[digits.len()..].chars().next().ok_or_else(|| {
        PhaError::Deserialization(format!("empty type code in TFORM{field} '{s}'"))
    })?;
    Ok(TForm { repeat, code })
}

/// Bytes per element for a TFORM type code.
///
/// Variable-length descriptors (`P`/`Q`), bit arrays (`X`), and complex
/// types are not used by PHA tables and are rejected.
fn type_width(code: char, field: usize) -> Result<usize> {
    match code {
        'L' | 'B' | 'A' => Ok(1),
        'I' => Ok(2),
        'J' | 'E' => Ok(4),
        'K' | 'D' => Ok(8),
        other => Err(PhaError::Deserialization(format!(
            "unsupported TFORM type code '{other}' in field {field}"
        ))),
    }
}

fn read_numeric_cell(r: &mut BeBuffer<'_>, code: char) -> Result<f64> {
    Ok(match code {
        'L' => {
            let b = r.read_u8()?;
            if b == b'T' || b == 1 { 1.0 } else { 0.0 }
        }
        'B' => f64::from(r.read_u8()?),
        'I' => f64::from(r.read_i16()?),
        'J' => f64::from(r.read_i32()?),
        'K' => r.read_i64()? as f64,
        'E' => f64::from(r.read_f32()?),
        'D' => r.read_f64()?,
        _ => unreachable!("type_width admits only numeric codes here"),
    })
}

/// Decode a BINTABLE data unit into a [`RawTable`].
///
/// `data` is the whole container; `data_start` points at the first byte of
/// the table's data unit.
pub(crate) fn parse_bintable(
    data: &[u8],
    header: Header,
    data_start: usize,
    path: &Path,
) -> Result<RawTable> {
    let naxis1 = usize::try_from(header.require_int("NAXIS1")?)
        .map_err(|_| PhaError::Deserialization("negative NAXIS1".into()))?;
    let n_rows = usize::try_from(header.require_int("NAXIS2")?)
        .map_err(|_| PhaError::Deserialization("negative NAXIS2".into()))?;
    let tfields = usize::try_from(header.require_int("TFIELDS")?)
        .map_err(|_| PhaError::Deserialization("negative TFIELDS".into()))?;

    let table_len = n_rows.checked_mul(naxis1).ok_or_else(|| {
        PhaError::Deserialization(format!("table size overflow: {n_rows} rows of {naxis1} bytes"))
    })?;
    if data_start + table_len > data.len() {
        return Err(PhaError::BufferUnderflow {
            offset: data_start,
            need: table_len,
            have: data.len().saturating_sub(data_start),
        });
    }

    let mut columns = Vec::with_capacity(tfields);
    let mut field_offset = 0usize;
    let mut r = BeBuffer::new(data);

    for field in 1..=tfields {
        let name = header
            .get(&format!("TTYPE{field}"))
            .and_then(HeaderValue::as_str)
            .ok_or_else(|| {
                PhaError::Deserialization(format!("missing or non-string TTYPE{field} keyword"))
            })?
            .trim()
            .to_ascii_uppercase();
        let tform_raw = header
            .get(&format!("TFORM{field}"))
            .and_then(HeaderValue::as_str)
            .ok_or_else(|| {
                PhaError::Deserialization(format!("missing or non-string TFORM{field} keyword"))
            })?
            .to_string();
        let tform = parse_tform(&tform_raw, field)?;
        let width = type_width(tform.code, field)? * tform.repeat;
        if field_offset + width > naxis1 {
            return Err(PhaError::Deserialization(format!(
                "fields overrun the declared row width NAXIS1={naxis1}"
            )));
        }

        let column = match tform.code {
            'A' => {
                let mut values = Vec::with_capacity(n_rows);
                for row in 0..n_rows {
                    r.set_pos(data_start + row * naxis1 + field_offset);
                    let bytes = r.read_bytes(tform.repeat)?;
                    let text = String::from_utf8_lossy(bytes);
                    values.push(text.trim_end_matches(['\0', ' ']).to_string());
                }
                Column::Text(values)
            }
            code if tform.repeat == 1 => {
                let mut values = Vec::with_capacity(n_rows);
                for row in 0..n_rows {
                    r.set_pos(data_start + row * naxis1 + field_offset);
                    values.push(read_numeric_cell(&mut r, code)?);
                }
                Column::Scalar(values)
            }
            code => {
                let mut values = Vec::with_capacity(n_rows);
                for row in 0..n_rows {
                    r.set_pos(data_start + row * naxis1 + field_offset);
                    let mut cells = Vec::with_capacity(tform.repeat);
                    for _ in 0..tform.repeat {
                        cells.push(read_numeric_cell(&mut r, code)?);
                    }
                    values.push(cells);
                }
                Column::Array(values)
            }
        };

        columns.push((name, column));
        field_offset += width;
    }

    Ok(RawTable { path: path.to_path_buf(), header, columns, n_rows })
}
