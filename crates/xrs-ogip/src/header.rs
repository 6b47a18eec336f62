//! FITS header parsing: 80-byte cards grouped in 2880-byte blocks.
//!
//! Only the card grammar PHA files exercise is implemented: quoted strings
//! (with `''` escapes), logicals `T`/`F`, integers, and floats (including
//! Fortran `D` exponents). `CONTINUE` long-string cards are not supported.

use crate::error::{PhaError, Result};

/// Size of one FITS block in bytes.
pub const BLOCK_SIZE: usize = 2880;
/// Size of one header card in bytes.
pub const CARD_SIZE: usize = 80;

/// A parsed header card value.
///
/// This is a closed variant: every consumer goes through the typed
/// accessors below, so string/number/bool interpretation happens in
/// exactly one place and never by implicit coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Quoted string value, trailing blanks stripped.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Logical `T`/`F` value.
    Bool(bool),
}

impl HeaderValue {
    /// String content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Logical content, if this is a logical value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric content widened to `f64`. Accepts integers and floats only;
    /// strings are never parsed here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(i) => Some(*i as f64),
            HeaderValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Human-readable name of the stored type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            HeaderValue::Str(_) => "string",
            HeaderValue::Int(_) => "integer",
            HeaderValue::Float(_) => "float",
            HeaderValue::Bool(_) => "logical",
        }
    }
}

/// One header unit: an ordered mapping of uppercase keyword to value.
///
/// Lookup is case-insensitive on the query side; keywords are normalized
/// to uppercase at parse time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<(String, HeaderValue)>,
}

impl Header {
    /// Create an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a card. The keyword is normalized to uppercase.
    pub fn push(&mut self, keyword: impl Into<String>, value: HeaderValue) {
        self.cards.push((keyword.into().to_ascii_uppercase(), value));
    }

    /// Look up a keyword (case-insensitive). First occurrence wins.
    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        let key = keyword.to_ascii_uppercase();
        self.cards.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Whether the header carries the given keyword.
    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Number of value cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the header has no value cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate over `(keyword, value)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Required structural integer keyword (NAXIS1, TFIELDS, ...).
    pub(crate) fn require_int(&self, keyword: &str) -> Result<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64).ok_or_else(|| {
            PhaError::Deserialization(format!("missing or non-integer {keyword} keyword"))
        })
    }
}

/// Parse one header unit starting at `start`.
///
/// Returns the header and the offset of the first byte past the final
/// (END-terminated) header block, i.e. where the data unit begins.
pub(crate) fn parse_header(data: &[u8], start: usize) -> Result<(Header, usize)> {
    let mut header = Header::new();
    let mut pos = start;

    loop {
        if pos + CARD_SIZE > data.len() {
            return Err(PhaError::Deserialization(format!(
                "header starting at offset {start} has no END card"
            )));
        }
        let card = &data[pos..pos + CARD_SIZE];
        pos += CARD_SIZE;

        let keyword = String::from_utf8_lossy(&card[0..8]).trim_end().to_ascii_uppercase();
        if keyword == "END" {
            break;
        }
        // Commentary and blank cards carry no value.
        if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
            continue;
        }
        if card[8] != b'=' || card[9] != b' ' {
            continue;
        }
        if let Some(value) = parse_value(&card[10..], &keyword)? {
            header.push(keyword, value);
        }
    }

    let consumed = pos - start;
    let padded = consumed.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    Ok((header, start + padded))
}

/// Parse the value field of one card (bytes 10..80).
///
/// Returns `Ok(None)` for undefined values (`KEY     =` with nothing
/// before the comment), which FITS permits; such cards are dropped.
fn parse_value(raw: &[u8], keyword: &str) -> Result<Option<HeaderValue>> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim_start();

    if let Some(rest) = trimmed.strip_prefix('\'') {
        return Ok(Some(HeaderValue::Str(parse_quoted(rest, keyword)?)));
    }

    // Strip the inline comment; quotes are already handled above, so the
    // first slash always opens the comment.
    let token = match trimmed.split_once('/') {
        Some((v, _)) => v.trim(),
        None => trimmed.trim_end(),
    };

    if token.is_empty() {
        return Ok(None);
    }
    if token == "T" {
        return Ok(Some(HeaderValue::Bool(true)));
    }
    if token == "F" {
        return Ok(Some(HeaderValue::Bool(false)));
    }
    if let Ok(i) = token.parse::<i64>() {
        return Ok(Some(HeaderValue::Int(i)));
    }
    // Fortran-style exponents (1.0D3) appear in older writers.
    let normalized = token.replace(['D', 'd'], "E");
    if let Ok(f) = normalized.parse::<f64>() {
        return Ok(Some(HeaderValue::Float(f)));
    }

    Err(PhaError::Deserialization(format!(
        "unparseable value '{token}' for keyword {keyword}"
    )))
}

/// Parse a quoted string body (opening quote already consumed).
///
/// A doubled `''` is an escaped quote; trailing blanks inside the string
/// are not significant per the standard and are stripped.
fn parse_quoted(rest: &str, keyword: &str) -> Result<String> {
    let mut out = String::new();
    let mut chars = rest.chars();
    loop {
        match chars.next() {
            Some('\'') => {
                if chars.clone().next() == Some('\'') {
                    chars.next();
                    out.push('\'');
                } else {
                    return Ok(out.trim_end().to_string());
                }
            }
            Some(c) => out.push(c),
            None => {
                return Err(PhaError::Deserialization(format!(
                    "unterminated string value for keyword {keyword}"
                )));
            }
        }
    }
}
