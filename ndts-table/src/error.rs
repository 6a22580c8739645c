use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("format error: {0}")]
    Format(#[from] ndts_format::FormatError),

    #[error("codec error: {0}")]
    Codec(#[from] ndts_codec::CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TableError>;
