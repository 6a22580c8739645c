//! Error types for WAL append, flush, and recovery.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalError {
    /// A log line's trailing CRC32 did not match its JSON body, or the line
    /// had no trailing CRC field at all. Non-fatal: `recover()` drops the
    /// line and continues, since WAL rows are non-authoritative once a
    /// corrupt line is detected.
    #[error("corrupt WAL line in {path:?} at line {line_no}")]
    CorruptLine { path: std::path::PathBuf, line_no: usize },

    /// A log file name did not follow the `wal-<millis>.log[.archived]`
    /// convention this writer uses.
    #[error("unrecognized WAL file name: {0:?}")]
    UnrecognizedFileName(std::path::PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WalError>;
