//! Error types for codec encode/decode operations.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a column buffer.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The encoded payload ended before the declared element count was reached.
    #[error("corrupt payload: expected {expected} elements, frame ended after {got}")]
    CorruptPayload { expected: usize, got: usize },

    /// A varint continuation ran past the end of the buffer.
    #[error("corrupt payload: truncated varint at byte offset {0}")]
    TruncatedVarint(usize),

    /// The bit-packed stream ended before the declared element count was reached.
    #[error("corrupt payload: truncated bitstream at bit offset {0}")]
    TruncatedBitstream(usize),
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
