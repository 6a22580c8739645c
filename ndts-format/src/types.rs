//! Column type tags used in the file header's schema array.

use serde::{Deserialize, Serialize};

/// The on-disk element type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int16,
    Int32,
    Int64,
    Float64,
}

impl ColumnType {
    /// Byte width of one element of this type.
    pub fn element_size(&self) -> usize {
        match self {
            ColumnType::Int16 => 2,
            ColumnType::Int32 => 4,
            ColumnType::Int64 => 8,
            ColumnType::Float64 => 8,
        }
    }

    /// The name stored in the header's `columns[].type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int16 => "int16",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
        }
    }
}
