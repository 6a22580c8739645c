//! Write-ahead log of row inserts: batched/periodic flush, size-based
//! rotation, and ordered, corruption-tolerant recovery.

pub mod entry;
pub mod error;
pub mod wal;

pub use entry::WalEntry;
pub use error::{Result, WalError};
pub use wal::{
    RecoveredRow, Wal, WalOptions, WalRecovery, DEFAULT_ARCHIVE_GRACE, DEFAULT_BATCH_SIZE,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_FILE_BYTES,
};
