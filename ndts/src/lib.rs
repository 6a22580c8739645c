//! Embedded columnar time-series storage engine for financial tick and
//! OHLCV data: codecs, file format, in-memory table, streaming I/O,
//! zero-copy mmap views, partitioning, write-ahead log, and the merge
//! engine, assembled behind one facade crate.

pub mod error;
pub mod symbol;

pub use error::{NdtsError, Result};
pub use symbol::SymbolDictionary;

// Re-export every member crate so a consumer of `ndts` never needs its own
// Cargo.toml entries for the subsystem crates.
pub use ndts_codec;
pub use ndts_format;
pub use ndts_io;
pub use ndts_merge;
pub use ndts_mmap;
pub use ndts_partition;
pub use ndts_table;
pub use ndts_wal;
