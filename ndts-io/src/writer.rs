//! Streaming append writer: buffers rows, encodes one chunk per flush,
//! fsyncs on close, and rewrites only the header region when possible.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ndts_codec::CodecKind;
use ndts_format::{ChunkFrame, ColumnSchema, Header};

use crate::codec_dispatch;
use crate::column_data::ColumnData;
use crate::error::Result;

/// Default number of buffered rows before a chunk is flushed to disk.
/// A performance parameter only; correctness does not depend on it.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 65_536;

/// Builder-style writer configuration (`with_*` methods) rather than an
/// external config file.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    flush_threshold: usize,
    codecs: Option<Vec<CodecKind>>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            codecs: None,
        }
    }
}

impl WriterOptions {
    pub fn with_flush_threshold(mut self, rows: usize) -> Self {
        self.flush_threshold = rows;
        self
    }

    /// Per-column codec choice, in schema order. Defaults to raw for every
    /// column when not set.
    pub fn with_codecs(mut self, codecs: Vec<CodecKind>) -> Self {
        self.codecs = Some(codecs);
        self
    }
}

pub struct AppendWriter {
    path: PathBuf,
    file: File,
    schema: Vec<ColumnSchema>,
    codecs: Vec<CodecKind>,
    buffer: Vec<ColumnData>,
    buffered_rows: usize,
    flush_threshold: usize,
    total_rows: u64,
    chunk_count: u32,
    header_json_len: usize,
    chunk_region_start: u64,
    write_offset: u64,
}

impl AppendWriter {
    /// Open `path` for append. If it exists with a compatible header, scans
    /// to the last CRC-valid chunk and positions there, discarding any
    /// trailing partial/corrupt bytes; otherwise writes a fresh header.
    pub fn open<P: AsRef<Path>>(path: P, schema: Vec<ColumnSchema>, options: WriterOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let codecs = options
            .codecs
            .unwrap_or_else(|| vec![CodecKind::Raw; schema.len()]);

        if path.exists() && fs::metadata(&path)?.len() > 0 {
            Self::reopen(path, schema, codecs, options.flush_threshold)
        } else {
            Self::create(path, schema, codecs, options.flush_threshold)
        }
    }

    fn create(path: PathBuf, schema: Vec<ColumnSchema>, codecs: Vec<CodecKind>, flush_threshold: usize) -> Result<Self> {
        let mut header = Header::new(schema.clone());
        apply_codecs_to_header(&mut header, &schema, &codecs);
        let bytes = header.to_bytes()?;
        let (_, header_json_len, chunk_offset) = Header::from_bytes_with_json_len(&bytes)?;

        let mut file = OpenOptions::new().create(true).write(true).read(true).open(&path)?;
        file.write_all(&bytes)?;

        let buffer = schema.iter().map(|c| ColumnData::new(c.col_type)).collect();

        Ok(AppendWriter {
            path,
            file,
            schema,
            codecs,
            buffer,
            buffered_rows: 0,
            flush_threshold,
            total_rows: 0,
            chunk_count: 0,
            header_json_len,
            chunk_region_start: chunk_offset as u64,
            write_offset: chunk_offset as u64,
        })
    }

    fn reopen(path: PathBuf, schema: Vec<ColumnSchema>, _requested_codecs: Vec<CodecKind>, flush_threshold: usize) -> Result<Self> {
        let bytes = fs::read(&path)?;
        let (header, header_json_len, chunk_offset) = Header::from_bytes_with_json_len(&bytes)?;
        if header.columns != schema {
            return Err(crate::error::IoLayerError::SchemaMismatch(format!(
                "on-disk schema {:?} does not match requested schema {:?}",
                header.columns, schema
            )));
        }
        // A column's codec may not change within a file: once written, the
        // on-disk header is authoritative and any codec choice the caller
        // passed to `open` is ignored for an existing file.
        let codecs: Vec<CodecKind> = header
            .columns
            .iter()
            .map(|c| CodecKind::from_str_lossy(header.codec_name(&c.name)))
            .collect();

        let mut offset = chunk_offset;
        let mut total_rows = 0u64;
        let mut chunk_count = 0u32;
        while offset < bytes.len() {
            match ChunkFrame::decode(&bytes[offset..], header.columns.len(), offset as u64) {
                Ok((frame, consumed)) => {
                    total_rows += frame.row_count as u64;
                    chunk_count += 1;
                    offset += consumed;
                }
                Err(_) => break,
            }
        }

        let mut file = OpenOptions::new().write(true).read(true).open(&path)?;
        file.set_len(offset as u64)?;
        file.seek(SeekFrom::Start(offset as u64))?;

        let buffer = schema.iter().map(|c| ColumnData::new(c.col_type)).collect();

        Ok(AppendWriter {
            path,
            file,
            schema,
            codecs,
            buffer,
            buffered_rows: 0,
            flush_threshold,
            total_rows,
            chunk_count,
            header_json_len,
            chunk_region_start: chunk_offset as u64,
            write_offset: offset as u64,
        })
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows + self.buffered_rows as u64
    }

    /// Buffer one batch of columns (one `ColumnData` per schema column, in
    /// order, all the same length). Flushes automatically once the
    /// buffered row count reaches the configured threshold.
    pub fn append(&mut self, columns: Vec<ColumnData>) -> Result<()> {
        let rows = columns.first().map(ColumnData::len).unwrap_or(0);
        for (dst, src) in self.buffer.iter_mut().zip(columns) {
            dst.extend_from(src);
        }
        self.buffered_rows += rows;
        if self.buffered_rows >= self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Encode and append the buffered rows as one chunk. A no-op if nothing
    /// is buffered.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffered_rows == 0 {
            return Ok(());
        }
        let payloads: Vec<Vec<u8>> = self
            .buffer
            .iter()
            .zip(&self.codecs)
            .map(|(col, codec)| codec_dispatch::encode(col, *codec))
            .collect();
        let frame = ChunkFrame::new(self.buffered_rows as u32, payloads);
        let bytes = frame.encode();

        self.file.seek(SeekFrom::Start(self.write_offset))?;
        self.file.write_all(&bytes)?;
        self.write_offset += bytes.len() as u64;
        self.total_rows += self.buffered_rows as u64;
        self.chunk_count += 1;
        self.buffered_rows = 0;
        for col in &mut self.buffer {
            col.clear();
        }
        Ok(())
    }

    /// Flush any buffered rows, rewrite the header's row/chunk counts, and
    /// fsync. Consumes the writer.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;

        let mut header = Header::new(self.schema.clone());
        header.total_rows = self.total_rows;
        header.chunk_count = self.chunk_count;
        apply_codecs_to_header(&mut header, &self.schema, &self.codecs);

        match header.to_bytes_matching(self.header_json_len)? {
            Some(bytes) => {
                self.file.seek(SeekFrom::Start(0))?;
                self.file.write_all(&bytes)?;
                self.file.sync_all()?;
            }
            None => self.rewrite_with_grown_header(&header)?,
        }
        Ok(())
    }

    /// The new header no longer fits in the original header region: write a
    /// fresh file (new header + the already-committed chunk bytes) and swap
    /// it in atomically via rename.
    fn rewrite_with_grown_header(&mut self, header: &Header) -> Result<()> {
        let mut chunk_bytes = vec![0u8; (self.write_offset - self.chunk_region_start) as usize];
        self.file.seek(SeekFrom::Start(self.chunk_region_start))?;
        self.file.read_exact(&mut chunk_bytes)?;

        let mut tmp_path = self.path.clone();
        tmp_path.set_extension("ndts.tmp");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&header.to_bytes()?)?;
        tmp.write_all(&chunk_bytes)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn apply_codecs_to_header(header: &mut Header, schema: &[ColumnSchema], codecs: &[CodecKind]) {
    let enabled = codecs.iter().any(|c| *c != CodecKind::Raw);
    header.compression.enabled = enabled;
    if enabled {
        for (col, codec) in schema.iter().zip(codecs) {
            header
                .compression
                .algorithms
                .insert(col.name.clone(), codec.as_str().to_string());
        }
    }
}
