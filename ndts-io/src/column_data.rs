//! Typed column buffer used to stage rows before a flush and to return
//! decoded columns from [`crate::reader::AppendReader`].
//!
//! This mirrors `ndts-table::Column` in shape, but `ndts-io` does not
//! depend on `ndts-table` (the streaming writer/reader layer sits below the
//! in-memory table, not on top of it), so it owns a small copy of the same
//! pattern.

use ndts_format::ColumnType;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
}

impl ColumnData {
    pub fn new(col_type: ColumnType) -> Self {
        match col_type {
            ColumnType::Int16 => ColumnData::Int16(Vec::new()),
            ColumnType::Int32 => ColumnData::Int32(Vec::new()),
            ColumnType::Int64 => ColumnData::Int64(Vec::new()),
            ColumnType::Float64 => ColumnData::Float64(Vec::new()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Int16(_) => ColumnType::Int16,
            ColumnData::Int32(_) => ColumnType::Int32,
            ColumnData::Int64(_) => ColumnType::Int64,
            ColumnData::Float64(_) => ColumnType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self {
            ColumnData::Int16(v) => v.clear(),
            ColumnData::Int32(v) => v.clear(),
            ColumnData::Int64(v) => v.clear(),
            ColumnData::Float64(v) => v.clear(),
        }
    }

    pub fn extend_from(&mut self, other: ColumnData) {
        match (self, other) {
            (ColumnData::Int16(d), ColumnData::Int16(s)) => d.extend(s),
            (ColumnData::Int32(d), ColumnData::Int32(s)) => d.extend(s),
            (ColumnData::Int64(d), ColumnData::Int64(s)) => d.extend(s),
            (ColumnData::Float64(d), ColumnData::Float64(s)) => d.extend(s),
            _ => unreachable!("column type fixed at construction"),
        }
    }

    pub fn to_raw_bytes(&self) -> Vec<u8> {
        match self {
            ColumnData::Int16(v) => ndts_codec::raw::encode_i16(v),
            ColumnData::Int32(v) => ndts_codec::raw::encode_i32(v),
            ColumnData::Int64(v) => ndts_codec::raw::encode_i64(v),
            ColumnData::Float64(v) => ndts_codec::raw::encode_f64(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_from_appends_same_variant() {
        let mut a = ColumnData::Int32(vec![1, 2]);
        a.extend_from(ColumnData::Int32(vec![3, 4]));
        assert_eq!(a, ColumnData::Int32(vec![1, 2, 3, 4]));
    }
}
