//! Zero-copy mmap column views over ndts files, with a decode fallback for
//! compressed or multi-chunk files.

pub mod error;
pub mod pool;
pub mod view;

pub use error::{MmapError, Result};
pub use pool::{MmapFile, MmapPool};
pub use view::ColumnView;
