//! In-memory FITS container builder for PHA reader tests.
//!
//! Builds byte-exact containers (2880-byte blocks, big-endian table data)
//! so integration tests exercise the whole parse pipeline without fixture
//! files on disk.

pub const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

/// A header keyword to write into the SPECTRUM extension.
#[derive(Clone)]
pub enum Key {
    /// String keyword.
    S(&'static str, &'static str),
    /// Float keyword (always written with a decimal point).
    F(&'static str, f64),
    /// Integer keyword.
    I(&'static str, i64),
    /// Logical keyword.
    B(&'static str, bool),
}

/// A table column to write into the SPECTRUM extension.
#[derive(Clone)]
pub enum Col {
    /// Scalar f64 column (TFORM `D`).
    F64(&'static str, Vec<f64>),
    /// Vector f64 column (TFORM `nD`), one spectrum per row.
    F64Vec(&'static str, Vec<Vec<f64>>),
    /// Scalar i32 column (TFORM `J`).
    I32(&'static str, Vec<i32>),
    /// Fixed-width string column (TFORM `wA`).
    Text(&'static str, usize, Vec<&'static str>),
}

impl Col {
    fn name(&self) -> &'static str {
        match self {
            Col::F64(n, _) | Col::F64Vec(n, _) | Col::I32(n, _) | Col::Text(n, _, _) => n,
        }
    }

    fn n_rows(&self) -> usize {
        match self {
            Col::F64(_, v) => v.len(),
            Col::F64Vec(_, v) => v.len(),
            Col::I32(_, v) => v.len(),
            Col::Text(_, _, v) => v.len(),
        }
    }

    fn width(&self) -> usize {
        match self {
            Col::F64(_, _) => 8,
            Col::F64Vec(_, v) => 8 * v.first().map_or(0, Vec::len),
            Col::I32(_, _) => 4,
            Col::Text(_, w, _) => *w,
        }
    }

    fn tform(&self) -> String {
        match self {
            Col::F64(_, _) => "D".to_string(),
            Col::F64Vec(_, v) => format!("{}D", v.first().map_or(0, Vec::len)),
            Col::I32(_, _) => "J".to_string(),
            Col::Text(_, w, _) => format!("{w}A"),
        }
    }

    fn write_cell(&self, row: usize, out: &mut Vec<u8>) {
        match self {
            Col::F64(_, v) => out.extend_from_slice(&v[row].to_be_bytes()),
            Col::F64Vec(_, v) => {
                for x in &v[row] {
                    out.extend_from_slice(&x.to_be_bytes());
                }
            }
            Col::I32(_, v) => out.extend_from_slice(&v[row].to_be_bytes()),
            Col::Text(_, w, v) => {
                let mut bytes = v[row].as_bytes().to_vec();
                assert!(bytes.len() <= *w, "text cell wider than column");
                bytes.resize(*w, b' ');
                out.extend_from_slice(&bytes);
            }
        }
    }
}

fn card(text: &str) -> Vec<u8> {
    assert!(text.len() <= CARD_SIZE, "card too long: {text}");
    let mut out = vec![b' '; CARD_SIZE];
    out[..text.len()].copy_from_slice(text.as_bytes());
    out
}

fn key_card(key: &Key) -> Vec<u8> {
    match key {
        Key::S(k, v) => card(&format!("{k:<8}= '{v}'")),
        Key::F(k, v) => card(&format!("{k:<8}= {v:>20?}")),
        Key::I(k, v) => card(&format!("{k:<8}= {v:>20}")),
        Key::B(k, v) => card(&format!("{k:<8}= {:>20}", if *v { "T" } else { "F" })),
    }
}

fn pad_to_block(data: &mut Vec<u8>, fill: u8) {
    while data.len() % BLOCK_SIZE != 0 {
        data.push(fill);
    }
}

fn primary_hdu() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(card("SIMPLE  =                    T"));
    out.extend(card("BITPIX  =                    8"));
    out.extend(card("NAXIS   =                    0"));
    out.extend(card("END"));
    pad_to_block(&mut out, b' ');
    out
}

/// Build a complete container whose table extension is named `extname`.
pub fn fits_file(extname: &str, keywords: &[Key], cols: &[Col]) -> Vec<u8> {
    let n_rows = cols.first().map_or(0, Col::n_rows);
    for c in cols {
        assert_eq!(c.n_rows(), n_rows, "all columns must have the same row count");
    }
    let naxis1: usize = cols.iter().map(Col::width).sum();

    let mut out = primary_hdu();

    out.extend(card("XTENSION= 'BINTABLE'"));
    out.extend(card("BITPIX  =                    8"));
    out.extend(card("NAXIS   =                    2"));
    out.extend(key_card(&Key::I("NAXIS1", naxis1 as i64)));
    out.extend(key_card(&Key::I("NAXIS2", n_rows as i64)));
    out.extend(card("PCOUNT  =                    0"));
    out.extend(card("GCOUNT  =                    1"));
    out.extend(key_card(&Key::I("TFIELDS", cols.len() as i64)));
    for (i, c) in cols.iter().enumerate() {
        let ttype = format!("TTYPE{}", i + 1);
        let tform = format!("TFORM{}", i + 1);
        out.extend(card(&format!("{ttype:<8}= '{}'", c.name())));
        out.extend(card(&format!("{tform:<8}= '{}'", c.tform())));
    }
    out.extend(card(&format!("EXTNAME = '{extname}'")));
    for key in keywords {
        out.extend(key_card(key));
    }
    out.extend(card("END"));
    pad_to_block(&mut out, b' ');

    let mut data = Vec::new();
    for row in 0..n_rows {
        for c in cols {
            c.write_cell(row, &mut data);
        }
    }
    pad_to_block(&mut data, 0);
    out.extend(data);
    out
}

/// Build a PHA container (extension named `SPECTRUM`).
pub fn pha_file(keywords: &[Key], cols: &[Col]) -> Vec<u8> {
    fits_file("SPECTRUM", keywords, cols)
}

/// The full observed-context keyword set, header-only, Poisson errors.
pub fn observed_keywords(exposure: f64, detchans: i64) -> Vec<Key> {
    vec![
        Key::S("TELESCOP", "GLAST"),
        Key::S("INSTRUME", "GBM"),
        Key::S("FILTER", "NONE"),
        Key::F("EXPOSURE", exposure),
        Key::S("BACKFILE", "glg_bak.pha"),
        Key::S("RESPFILE", "glg_rsp.rsp"),
        Key::S("ANCRFILE", "NONE"),
        Key::S("HDUCLASS", "OGIP"),
        Key::S("HDUCLAS1", "SPECTRUM"),
        Key::B("POISSERR", true),
        Key::S("CHANTYPE", "PHA"),
        Key::I("DETCHANS", detchans),
        Key::F("BACKSCAL", 1.0),
    ]
}

/// `observed_keywords` with one keyword replaced (or appended).
pub fn with_key(mut keywords: Vec<Key>, replacement: Key) -> Vec<Key> {
    let name = match &replacement {
        Key::S(k, _) | Key::F(k, _) | Key::I(k, _) | Key::B(k, _) => *k,
    };
    keywords.retain(|key| {
        let k = match key {
            Key::S(k, _) | Key::F(k, _) | Key::I(k, _) | Key::B(k, _) => *k,
        };
        k != name
    });
    keywords.push(replacement);
    keywords
}

/// `observed_keywords` with one keyword removed.
pub fn without_key(mut keywords: Vec<Key>, name: &str) -> Vec<Key> {
    keywords.retain(|key| {
        let k = match key {
            Key::S(k, _) | Key::F(k, _) | Key::I(k, _) | Key::B(k, _) => *k,
        };
        k != name
    });
    keywords
}
