//! Hash- or time-bucket partition routing, directory reconstruction, range
//! pruning, and AND-tree time-range extraction for partitioned ndts tables.

pub mod directory;
pub mod error;
pub mod manager;
pub mod predicate;
pub mod scheme;

pub use directory::{PartitionDirectory, PartitionStats};
pub use error::{PartitionError, Result};
pub use manager::{PartitionManager, PartitionWarning, QueryResult};
pub use predicate::{extract_time_range, WhereExpr};
pub use scheme::{fnv1a64, hash_bucket, hash_label, time_label, Granularity, PartitionScheme};
