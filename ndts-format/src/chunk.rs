//! Chunk frame encode/decode: `rowCount | (pad | payloadLen | payload) per column | crc32`.
//!
//! Pure byte-level framing only — codec encode/decode of the payload bytes
//! themselves lives in `ndts-codec` and is applied by the caller before
//! `encode`/after `decode`.

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher;

use crate::error::{FormatError, Result};

/// Every column payload starts at a multiple of this many bytes from the
/// start of the chunk (and, since chunk offsets are themselves 8-byte
/// aligned, from the start of the file). 8 is a multiple of every column
/// element size this format supports (2, 4, 8), so one alignment covers
/// every column type without per-type branching.
const COLUMN_ALIGNMENT: usize = 8;

/// One chunk's row count plus its per-column (already codec-encoded) payloads,
/// in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFrame {
    pub row_count: u32,
    pub payloads: Vec<Vec<u8>>,
}

/// Zero-padding bytes needed before a 4-byte length prefix so that the
/// payload immediately following it starts at `COLUMN_ALIGNMENT`. `pos` is
/// the position, relative to the chunk's own start, at which the length
/// prefix would otherwise begin.
///
/// Exposed so callers that walk a chunk's bytes directly without going
/// through [`ChunkFrame::decode`] (a zero-copy mmap view, say) can locate the
/// same column boundaries `encode`/`decode` agree on.
pub fn column_pad(pos: usize) -> usize {
    (COLUMN_ALIGNMENT - (pos + 4) % COLUMN_ALIGNMENT) % COLUMN_ALIGNMENT
}

impl ChunkFrame {
    pub fn new(row_count: u32, payloads: Vec<Vec<u8>>) -> Self {
        ChunkFrame { row_count, payloads }
    }

    /// Encode this chunk to `rowCount | (pad | len | bytes)* | crc32`, each
    /// column's payload starting at a `COLUMN_ALIGNMENT`-aligned offset from
    /// the chunk's start.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        let mut row_count_buf = [0u8; 4];
        LittleEndian::write_u32(&mut row_count_buf, self.row_count);
        body.extend_from_slice(&row_count_buf);

        for payload in &self.payloads {
            let pad = column_pad(body.len());
            body.extend(std::iter::repeat(0u8).take(pad));

            let mut len_buf = [0u8; 4];
            LittleEndian::write_u32(&mut len_buf, payload.len() as u32);
            body.extend_from_slice(&len_buf);
            body.extend_from_slice(payload);
        }

        let crc = crc32(&body);
        let mut out = body;
        let mut crc_buf = [0u8; 4];
        LittleEndian::write_u32(&mut crc_buf, crc);
        out.extend_from_slice(&crc_buf);
        out
    }

    /// Decode one chunk frame with exactly `num_columns` column payloads,
    /// starting at `buf[0]`, which is assumed to sit at file offset `offset`
    /// (used only to annotate errors). Returns the frame and the number of
    /// bytes consumed from `buf`.
    pub fn decode(buf: &[u8], num_columns: usize, offset: u64) -> Result<(ChunkFrame, usize)> {
        if buf.len() < 4 {
            return Err(FormatError::Truncated(offset));
        }
        let row_count = LittleEndian::read_u32(&buf[0..4]);

        let mut pos = 4usize;
        let mut payloads = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            pos += column_pad(pos);
            if buf.len() < pos + 4 {
                return Err(FormatError::Truncated(offset + pos as u64));
            }
            let len = LittleEndian::read_u32(&buf[pos..pos + 4]) as usize;
            pos += 4;
            if buf.len() < pos + len {
                return Err(FormatError::Truncated(offset + pos as u64));
            }
            payloads.push(buf[pos..pos + len].to_vec());
            pos += len;
        }

        if buf.len() < pos + 4 {
            return Err(FormatError::Truncated(offset + pos as u64));
        }
        let stored_crc = LittleEndian::read_u32(&buf[pos..pos + 4]);
        let actual_crc = crc32(&buf[0..pos]);
        if stored_crc != actual_crc {
            return Err(FormatError::CorruptChunk {
                offset,
                expected: stored_crc,
                actual: actual_crc,
            });
        }
        pos += 4;

        Ok((ChunkFrame { row_count, payloads }, pos))
    }
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}
