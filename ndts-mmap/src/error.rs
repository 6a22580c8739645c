use thiserror::Error;

#[derive(Error, Debug)]
pub enum MmapError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("column access out of bounds: index {index} len {len}")]
    ColumnOutOfBounds { index: usize, len: usize },

    #[error("misaligned column at byte offset {0}")]
    BadAlignment(usize),

    #[error("truncated at offset {0}")]
    Truncated(u64),

    #[error("format error: {0}")]
    Format(#[from] ndts_format::FormatError),

    #[error("I/O layer error: {0}")]
    IoLayer(#[from] ndts_io::IoLayerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MmapError>;
