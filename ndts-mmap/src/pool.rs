//! Zero-copy column views over a per-symbol set of ndts files.
//!
//! For an uncompressed, single-chunk file the pool maps the whole file and
//! hands back slices that borrow directly from the mmap. Anything else
//! (compressed, or written in more than one chunk) falls back to decoding
//! through [`ndts_io::AppendReader`] into owned buffers, presented through
//! the same [`ColumnView`] API.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ndts_format::{ChunkFrame, ColumnType, Header};
use ndts_io::ColumnData;

use crate::error::{MmapError, Result};
use crate::view::{cast_aligned, ColumnView};

/// Per-column byte range within a mapped file's single chunk, plus its type.
#[derive(Debug, Clone, Copy)]
struct ColumnOffset {
    col_type: ColumnType,
    byte_offset: usize,
    byte_len: usize,
}

enum Backing {
    /// Direct mmap: `offsets` locate each column's contiguous raw payload
    /// within `mmap`.
    Mapped {
        mmap: Mmap,
        offsets: HashMap<String, ColumnOffset>,
    },
    /// Decoded once into owned buffers (compressed file, or more than one
    /// chunk on disk).
    Owned(HashMap<String, ColumnData>),
}

/// One symbol's mapped (or decoded-owned) file.
pub struct MmapFile {
    header: Header,
    backing: Backing,
}

impl MmapFile {
    /// Map `path`. Parses the header from the mapped bytes; if the file is
    /// uncompressed and holds exactly one chunk, computes per-column byte
    /// offsets into the mmap and verifies each is aligned to its element
    /// size (at least 8 bytes, per the writer's guarantee) — a misaligned
    /// offset is a writer bug and fails with `BadAlignment` rather than
    /// silently falling back. Anything else falls back to
    /// [`ndts_io::AppendReader::read_all`] and owns its decoded buffers.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the pool treats the backing file as immutable for the
        // handle's lifetime, per the single-writer-per-file contract; no
        // other process is expected to truncate or rewrite it concurrently.
        let mmap = unsafe { Mmap::map(&file)? };

        let (header, chunk_offset) = Header::from_bytes(&mmap)?;

        if header_is_all_raw(&header) {
            if let Some(offsets) = single_chunk_offsets(&header, &mmap, chunk_offset)? {
                return Ok(MmapFile {
                    header,
                    backing: Backing::Mapped { mmap, offsets },
                });
            }
        }

        let (header, columns, _recovered, err) = ndts_io::AppendReader::read_all(path)?;
        if let Some(e) = err {
            return Err(MmapError::IoLayer(e));
        }
        Ok(MmapFile {
            header,
            backing: Backing::Owned(columns),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// True when this file's columns are borrowed directly from the mmap
    /// region rather than owned, decoded buffers.
    pub fn is_zero_copy(&self) -> bool {
        matches!(self.backing, Backing::Mapped { .. })
    }

    pub fn get_column(&self, name: &str) -> Result<ColumnView<'_>> {
        self.header.column(name)?;
        match &self.backing {
            Backing::Mapped { mmap, offsets } => {
                let off = offsets
                    .get(name)
                    .ok_or_else(|| MmapError::ColumnNotFound(name.to_string()))?;
                let bytes = &mmap[off.byte_offset..off.byte_offset + off.byte_len];
                Ok(match off.col_type {
                    ColumnType::Int16 => ColumnView::Int16(cast_aligned(bytes, 2, off.byte_offset)?),
                    ColumnType::Int32 => ColumnView::Int32(cast_aligned(bytes, 4, off.byte_offset)?),
                    ColumnType::Int64 => ColumnView::Int64(cast_aligned(bytes, 8, off.byte_offset)?),
                    ColumnType::Float64 => ColumnView::Float64(cast_aligned(bytes, 8, off.byte_offset)?),
                })
            }
            Backing::Owned(columns) => {
                let data = columns
                    .get(name)
                    .ok_or_else(|| MmapError::ColumnNotFound(name.to_string()))?;
                Ok(match data {
                    ColumnData::Int16(v) => ColumnView::Int16(v),
                    ColumnData::Int32(v) => ColumnView::Int32(v),
                    ColumnData::Int64(v) => ColumnView::Int64(v),
                    ColumnData::Float64(v) => ColumnView::Float64(v),
                })
            }
        }
    }

    /// Best-effort sequential-access hint for the whole file. A no-op under
    /// the owned-decode fallback, since there is no mmap to advise.
    pub fn advise_sequential(&self) -> Result<()> {
        self.advise(memmap2::Advice::Sequential)
    }

    pub fn advise_willneed(&self) -> Result<()> {
        self.advise(memmap2::Advice::WillNeed)
    }

    pub fn advise_dontneed(&self) -> Result<()> {
        self.advise(memmap2::Advice::DontNeed)
    }

    fn advise(&self, advice: memmap2::Advice) -> Result<()> {
        if let Backing::Mapped { mmap, .. } = &self.backing {
            // Best-effort: a failed madvise must never affect correctness.
            let _ = mmap.advise(advice);
        }
        Ok(())
    }
}

fn header_is_all_raw(header: &Header) -> bool {
    if !header.compression.enabled {
        return true;
    }
    header.columns.iter().all(|c| header.codec_name(&c.name) == "none")
}

/// If `mmap[chunk_offset..]` holds exactly one chunk frame, return each
/// column's `(type, byte_offset, byte_len)` within `mmap`; if it holds zero
/// or more than one chunk, return `None` so the caller falls back to the
/// owned decode path (multi-chunk raw columns are not byte-contiguous:
/// each chunk interleaves every column's payload).
fn single_chunk_offsets(
    header: &Header,
    mmap: &Mmap,
    chunk_offset: usize,
) -> Result<Option<HashMap<String, ColumnOffset>>> {
    if chunk_offset >= mmap.len() {
        // Header-only file: zero rows, trivially "one chunk" of nothing.
        let offsets = header
            .columns
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    ColumnOffset {
                        col_type: c.col_type,
                        byte_offset: chunk_offset,
                        byte_len: 0,
                    },
                )
            })
            .collect();
        return Ok(Some(offsets));
    }

    let (_frame, consumed) = ChunkFrame::decode(&mmap[chunk_offset..], header.columns.len(), chunk_offset as u64)?;
    if chunk_offset + consumed != mmap.len() {
        return Ok(None);
    }

    let mut offsets = HashMap::with_capacity(header.columns.len());
    let mut pos = chunk_offset + 4; // past row_count
    for schema_col in &header.columns {
        pos += ndts_format::column_pad(pos - chunk_offset);
        let len_bytes = &mmap[pos..pos + 4];
        let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
        pos += 4;
        offsets.insert(
            schema_col.name.clone(),
            ColumnOffset {
                col_type: schema_col.col_type,
                byte_offset: pos,
                byte_len: len,
            },
        );
        pos += len;
    }
    Ok(Some(offsets))
}

/// A pool of mapped per-symbol files: a per-symbol file set with a
/// column-offset directory.
pub struct MmapPool {
    files: HashMap<String, MmapFile>,
}

impl MmapPool {
    pub fn new() -> Self {
        MmapPool { files: HashMap::new() }
    }

    /// Open every `<symbol>.ndts` file named by `symbols`, rooted at `dir`.
    pub fn open_symbols<P: AsRef<Path>>(dir: P, symbols: &[&str]) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = HashMap::with_capacity(symbols.len());
        for &symbol in symbols {
            let path = symbol_path(dir, symbol);
            files.insert(symbol.to_string(), MmapFile::open(path)?);
        }
        Ok(MmapPool { files })
    }

    /// Map every `*.ndts` file directly inside `dir`, keyed by file stem.
    pub fn open_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("ndts") {
                let symbol = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                files.insert(symbol, MmapFile::open(&path)?);
            }
        }
        Ok(MmapPool { files })
    }

    pub fn insert(&mut self, symbol: impl Into<String>, file: MmapFile) {
        self.files.insert(symbol.into(), file);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn get_column(&self, symbol: &str, name: &str) -> Result<ColumnView<'_>> {
        self.files
            .get(symbol)
            .ok_or_else(|| MmapError::ColumnNotFound(format!("{symbol}/{name}")))?
            .get_column(name)
    }

    pub fn file(&self, symbol: &str) -> Option<&MmapFile> {
        self.files.get(symbol)
    }
}

impl Default for MmapPool {
    fn default() -> Self {
        Self::new()
    }
}

fn symbol_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{symbol}.ndts"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndts_format::ColumnSchema;
    use ndts_io::{AppendWriter, WriterOptions};

    fn schema() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema { name: "ts".to_string(), col_type: ColumnType::Int64 },
            ColumnSchema { name: "price".to_string(), col_type: ColumnType::Float64 },
        ]
    }

    #[test]
    fn single_chunk_raw_file_is_zero_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL.ndts");

        let mut writer = AppendWriter::open(&path, schema(), WriterOptions::default()).unwrap();
        writer
            .append(vec![ColumnData::Int64(vec![1, 2, 3]), ColumnData::Float64(vec![1.0, 2.0, 3.0])])
            .unwrap();
        writer.close().unwrap();

        let file = MmapFile::open(&path).unwrap();
        assert!(file.is_zero_copy());
        let view = file.get_column("price").unwrap();
        assert_eq!(view.as_f64().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn multi_chunk_file_falls_back_to_owned_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MSFT.ndts");

        let mut writer = AppendWriter::open(&path, schema(), WriterOptions::default().with_flush_threshold(1)).unwrap();
        writer.append(vec![ColumnData::Int64(vec![1]), ColumnData::Float64(vec![1.0])]).unwrap();
        writer.append(vec![ColumnData::Int64(vec![2]), ColumnData::Float64(vec![2.0])]).unwrap();
        writer.close().unwrap();

        let file = MmapFile::open(&path).unwrap();
        assert!(!file.is_zero_copy());
        let view = file.get_column("ts").unwrap();
        assert_eq!(view.as_i64().unwrap(), &[1, 2]);
    }

    #[test]
    fn compressed_file_falls_back_to_owned_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GOOG.ndts");

        let mut writer = AppendWriter::open(
            &path,
            schema(),
            WriterOptions::default().with_codecs(vec![ndts_codec::CodecKind::Delta, ndts_codec::CodecKind::Gorilla]),
        )
        .unwrap();
        writer.append(vec![ColumnData::Int64(vec![1, 2, 3]), ColumnData::Float64(vec![1.0, 2.0, 3.0])]).unwrap();
        writer.close().unwrap();

        let file = MmapFile::open(&path).unwrap();
        assert!(!file.is_zero_copy());
        assert_eq!(file.get_column("ts").unwrap().as_i64().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn header_only_file_returns_empty_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EMPTY.ndts");
        AppendWriter::open(&path, schema(), WriterOptions::default()).unwrap().close().unwrap();

        let file = MmapFile::open(&path).unwrap();
        let view = file.get_column("ts").unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn unknown_column_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("X.ndts");
        AppendWriter::open(&path, schema(), WriterOptions::default()).unwrap().close().unwrap();

        let file = MmapFile::open(&path).unwrap();
        assert!(file.get_column("volume").is_err());
    }

    #[test]
    fn pool_opens_multiple_symbols_and_routes_get_column() {
        let dir = tempfile::tempdir().unwrap();
        for (sym, price) in [("AAPL", 100.0), ("MSFT", 200.0)] {
            let path = symbol_path(dir.path(), sym);
            let mut writer = AppendWriter::open(&path, schema(), WriterOptions::default()).unwrap();
            writer.append(vec![ColumnData::Int64(vec![1]), ColumnData::Float64(vec![price])]).unwrap();
            writer.close().unwrap();
        }

        let pool = MmapPool::open_symbols(dir.path(), &["AAPL", "MSFT"]).unwrap();
        assert_eq!(pool.get_column("AAPL", "price").unwrap().as_f64().unwrap(), &[100.0]);
        assert_eq!(pool.get_column("MSFT", "price").unwrap().as_f64().unwrap(), &[200.0]);
        assert!(pool.get_column("TSLA", "price").is_err());
    }
}
