//! Error types for partition routing, directory reconstruction, and query.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("partition key column {0:?} not found in schema")]
    KeyColumnNotFound(String),

    #[error("partition key column {0:?} must be an integer column")]
    KeyColumnNotInteger(String),

    #[error("timestamp {0} is out of range for UTC label formatting")]
    TimestampOutOfRange(i64),

    #[error("column arrays in one append batch have mismatched lengths")]
    RowLengthMismatch,

    #[error("format error: {0}")]
    Format(#[from] ndts_format::FormatError),

    #[error("I/O layer error: {0}")]
    IoLayer(#[from] ndts_io::IoLayerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory sidecar error: {0}")]
    Directory(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PartitionError>;
