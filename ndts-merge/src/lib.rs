//! N-way time-ordered merge of per-symbol tick streams into a replayable
//! tick and snapshot timeline, with ASOF point-in-time lookups.

pub mod engine;
pub mod error;

pub use engine::{
    MergeEngine, MergeOptions, SnapshotCursor, SnapshotView, SymbolInput, Tick,
    DEFAULT_COUNTING_SORT_RANGE_FACTOR,
};
pub use error::{MergeError, Result};
