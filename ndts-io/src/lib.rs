//! Streaming `AppendWriter`/`AppendReader` over the ndts columnar file format.

mod codec_dispatch;
pub mod column_data;
pub mod error;
pub mod reader;
pub mod writer;

pub use column_data::ColumnData;
pub use error::{IoLayerError, Result};
pub use reader::AppendReader;
pub use writer::{AppendWriter, WriterOptions, DEFAULT_FLUSH_THRESHOLD};
