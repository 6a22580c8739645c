//! On-disk header and chunk frame layout for the ndts columnar file format.
//!
//! Pure byte/JSON framing: no file handles, no codec logic. `ndts-io` owns
//! the file I/O and drives `ndts-codec` to fill/consume chunk payloads.

pub mod chunk;
pub mod error;
pub mod header;
pub mod types;

pub use chunk::{column_pad, ChunkFrame};
pub use error::{FormatError, Result};
pub use header::{ColumnSchema, CompressionPolicy, Header, HeaderVersion, CURRENT_VERSION, MAGIC};
pub use types::ColumnType;
