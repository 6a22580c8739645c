//! Error types for flattening and sorting per-symbol tick streams.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("symbol stream's price/volume arrays don't match its timestamp array's length")]
    MismatchedColumnLengths,

    #[error("timestamp {0} loses precision when converted to float64")]
    TimestampPrecisionLoss(i64),

    #[error("counting-sort timestamp domain is not integer-valued")]
    NonIntegerTimestampDomain,

    #[error("counting-sort bucket count does not fit in i32")]
    BucketIndexOverflow,
}

pub type Result<T> = std::result::Result<T, MergeError>;
