//! FITS container walking and top-level file interface.

use std::fs;
use std::path::{Path, PathBuf};

use crate::bintable::{self, RawTable};
use crate::error::{PhaError, Result};
use crate::header::{parse_header, Header, HeaderValue, BLOCK_SIZE};

const FITS_MAGIC: &[u8] = b"SIMPLE";

/// Byte backing for a container: memory-mapped from disk, or an owned
/// vector for `from_bytes()` and tests.
enum DataSource {
    Owned(Vec<u8>),
    Mmap(memmap2::Mmap),
}

impl std::ops::Deref for DataSource {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            DataSource::Owned(v) => v,
            DataSource::Mmap(m) => m,
        }
    }
}

/// One header-data unit located in the container.
struct Hdu {
    /// EXTNAME, if declared.
    name: Option<String>,
    /// XTENSION class for extensions (`BINTABLE`, `IMAGE`, ...); `None`
    /// for the primary HDU.
    xtension: Option<String>,
    /// Parsed header.
    header: Header,
    /// Offset of the first data byte.
    data_start: usize,
}

/// Public info about one HDU, as listed by [`FitsFile::list_hdus`].
#[derive(Debug, Clone, PartialEq)]
pub struct HduInfo {
    /// Position in the container (0 = primary).
    pub index: usize,
    /// EXTNAME, if declared.
    pub name: Option<String>,
    /// XTENSION class, or `"PRIMARY"` for the first HDU.
    pub kind: String,
}

/// A FITS container opened for reading spectral tables.
///
/// The whole container is walked once at open time; data units are
/// located by size arithmetic and decoded only on demand.
pub struct FitsFile {
    /// Raw file bytes (owned or memory-mapped).
    data: DataSource,
    /// Located HDUs in file order.
    hdus: Vec<Hdu>,
    /// Path for diagnostics.
    path: PathBuf,
}

impl FitsFile {
    /// Open and parse a FITS container from disk using memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: We only read the file, and rely on the OS to handle
        // concurrent modifications (which is UB for mmap but acceptable
        // for our read-only scientific-data use case).
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::from_datasource(DataSource::Mmap(mmap), path)
    }

    /// Parse a FITS container from a byte vector (for testing).
    pub fn from_bytes(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        Self::from_datasource(DataSource::Owned(data), path)
    }

    fn from_datasource(data: DataSource, path: PathBuf) -> Result<Self> {
        if data.len() < BLOCK_SIZE || !data.starts_with(FITS_MAGIC) {
            return Err(PhaError::BadMagic);
        }

        let mut hdus = Vec::new();
        let mut pos = 0usize;
        while pos < data.len() {
            let (header, data_start) = parse_header(&data, pos)?;
            let data_len = data_unit_size(&header)?;
            let name = header
                .get("EXTNAME")
                .and_then(HeaderValue::as_str)
                .map(|s| s.trim().to_string());
            let xtension = if hdus.is_empty() {
                None
            } else {
                Some(
                    header
                        .get("XTENSION")
                        .and_then(HeaderValue::as_str)
                        .ok_or_else(|| {
                            PhaError::Deserialization(format!(
                                "extension header at offset {pos} has no XTENSION keyword"
                            ))
                        })?
                        .trim()
                        .to_ascii_uppercase(),
                )
            };
            hdus.push(Hdu { name, xtension, header, data_start });
            pos = data_start + data_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        }

        Ok(Self { data, hdus, path })
    }

    /// Path this container was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List all HDUs in file order.
    pub fn list_hdus(&self) -> Vec<HduInfo> {
        self.hdus
            .iter()
            .enumerate()
            .map(|(index, hdu)| HduInfo {
                index,
                name: hdu.name.clone(),
                kind: hdu.xtension.clone().unwrap_or_else(|| "PRIMARY".to_string()),
            })
            .collect()
    }

    /// Decode the `SPECTRUM` binary table extension.
    ///
    /// Fails with [`PhaError::NotAPhaFile`] when the container has no such
    /// extension, which is the defining test for a PHA file.
    pub fn spectrum_table(&self) -> Result<RawTable> {
        let hdu = self
            .hdus
            .iter()
            .find(|h| {
                h.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case("SPECTRUM"))
            })
            .ok_or_else(|| PhaError::NotAPhaFile {
                path: self.path.display().to_string(),
            })?;

        if hdu.xtension.as_deref() != Some("BINTABLE") {
            return Err(PhaError::Deserialization(format!(
                "SPECTRUM extension is {} not BINTABLE",
                hdu.xtension.as_deref().unwrap_or("PRIMARY")
            )));
        }

        bintable::parse_bintable(&self.data, hdu.header.clone(), hdu.data_start, &self.path)
    }
}

/// Size in bytes of an HDU's data unit, before block padding.
///
/// `size = |BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`,
/// zero when `NAXIS = 0`.
fn data_unit_size(header: &Header) -> Result<usize> {
    let naxis = usize::try_from(header.require_int("NAXIS")?)
        .map_err(|_| PhaError::Deserialization("negative NAXIS".into()))?;
    if naxis == 0 {
        return Ok(0);
    }

    let bitpix = header.require_int("BITPIX")?;
    let elem_bytes = usize::try_from(bitpix.abs() / 8)
        .map_err(|_| PhaError::Deserialization(format!("bad BITPIX {bitpix}")))?;

    let mut elems = 1usize;
    for i in 1..=naxis {
        let n = usize::try_from(header.require_int(&format!("NAXIS{i}"))?)
            .map_err(|_| PhaError::Deserialization(format!("negative NAXIS{i}")))?;
        elems = elems.checked_mul(n).ok_or_else(|| {
            PhaError::Deserialization("data unit size overflow".into())
        })?;
    }

    let gcount = header.get("GCOUNT").and_then(HeaderValue::as_i64).unwrap_or(1);
    let pcount = header.get("PCOUNT").and_then(HeaderValue::as_i64).unwrap_or(0);
    let groups = usize::try_from(gcount)
        .map_err(|_| PhaError::Deserialization(format!("bad GCOUNT {gcount}")))?;
    let heap = usize::try_from(pcount)
        .map_err(|_| PhaError::Deserialization(format!("bad PCOUNT {pcount}")))?;

    elems
        .checked_add(heap)
        .and_then(|n| n.checked_mul(groups))
        .and_then(|n| n.checked_mul(elem_bytes))
        .ok_or_else(|| PhaError::Deserialization("data unit size overflow".into()))
}
