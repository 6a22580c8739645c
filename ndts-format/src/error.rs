//! Error types shared by header parsing and chunk framing.

use thiserror::Error;

/// Errors surfaced while parsing a file header or a chunk frame.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The header magic did not match `"NDTS"`.
    #[error("bad magic: expected 'NDTS', got {0:?}")]
    BadMagic(Vec<u8>),

    /// The header declared a format version this reader does not understand.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// The header JSON was malformed or missing a required field.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A chunk's stored CRC32 did not match the computed CRC32 of its bytes.
    #[error("corrupt chunk at offset {offset}: crc mismatch (expected {expected:#010x}, got {actual:#010x})")]
    CorruptChunk {
        offset: u64,
        expected: u32,
        actual: u32,
    },

    /// The file (or a chunk within it) ended before the declared length.
    #[error("truncated at offset {0}")]
    Truncated(u64),

    /// A requested column is not part of the schema.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// An I/O error occurred while reading or writing the header/frame bytes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for format operations.
pub type Result<T> = std::result::Result<T, FormatError>;
