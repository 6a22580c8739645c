//! Top-level error type wrapping every member crate's error, in the
//! teacher's `DppError` shape.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NdtsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] ndts_codec::CodecError),

    #[error("format error: {0}")]
    Format(#[from] ndts_format::FormatError),

    #[error("table error: {0}")]
    Table(#[from] ndts_table::TableError),

    #[error("I/O layer error: {0}")]
    IoLayer(#[from] ndts_io::IoLayerError),

    #[error("mmap error: {0}")]
    Mmap(#[from] ndts_mmap::MmapError),

    #[error("partition error: {0}")]
    Partition(#[from] ndts_partition::PartitionError),

    #[error("WAL error: {0}")]
    Wal(#[from] ndts_wal::WalError),

    #[error("merge error: {0}")]
    Merge(#[from] ndts_merge::MergeError),

    #[error("symbol {0:?} is not registered")]
    UnknownSymbol(String),

    #[error("symbol id {0} is out of range")]
    UnknownSymbolId(u32),

    #[error("symbol dictionary JSON error: {0}")]
    SymbolDictionary(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NdtsError>;
