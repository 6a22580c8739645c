//! Typed column buffers and the dynamic field value used by `append`.

use ndts_format::ColumnType;

/// A single field value as handed to `ColumnarTable::append`, before it is
/// coerced to the destination column's type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
}

impl Value {
    fn as_i64(&self) -> i64 {
        match self {
            Value::Int16(v) => *v as i64,
            Value::Int32(v) => *v as i64,
            Value::Int64(v) => *v,
            Value::Float64(v) => *v as i64,
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Value::Int16(v) => *v as f64,
            Value::Int32(v) => *v as f64,
            Value::Int64(v) => *v as f64,
            Value::Float64(v) => *v,
        }
    }
}

/// One column's buffer, typed per [`ColumnType`].
///
/// Growth is geometric (≥1.5x) via `Vec`'s own amortized growth; callers
/// never see a shrink except through [`Column::reset`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
}

impl Column {
    pub fn new(col_type: ColumnType) -> Self {
        match col_type {
            ColumnType::Int16 => Column::Int16(Vec::new()),
            ColumnType::Int32 => Column::Int32(Vec::new()),
            ColumnType::Int64 => Column::Int64(Vec::new()),
            ColumnType::Float64 => Column::Float64(Vec::new()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int16(_) => ColumnType::Int16,
            Column::Int32(_) => ColumnType::Int32,
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int16(v) => v.len(),
            Column::Int32(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&mut self) {
        match self {
            Column::Int16(v) => v.clear(),
            Column::Int32(v) => v.clear(),
            Column::Int64(v) => v.clear(),
            Column::Float64(v) => v.clear(),
        }
    }

    /// Push `value`, coerced to this column's element type.
    pub fn push_coerced(&mut self, value: Value) {
        match self {
            Column::Int16(v) => v.push(value.as_i64() as i16),
            Column::Int32(v) => v.push(value.as_i64() as i32),
            Column::Int64(v) => v.push(value.as_i64()),
            Column::Float64(v) => v.push(value.as_f64()),
        }
    }

    /// Read element `i` back out as a generic [`Value`].
    pub fn get(&self, i: usize) -> Option<Value> {
        match self {
            Column::Int16(v) => v.get(i).map(|&x| Value::Int16(x)),
            Column::Int32(v) => v.get(i).map(|&x| Value::Int32(x)),
            Column::Int64(v) => v.get(i).map(|&x| Value::Int64(x)),
            Column::Float64(v) => v.get(i).map(|&x| Value::Float64(x)),
        }
    }

    /// Element `i` as `f64`, for comparator/aggregate purposes.
    pub fn get_f64(&self, i: usize) -> f64 {
        match self {
            Column::Int16(v) => v[i] as f64,
            Column::Int32(v) => v[i] as f64,
            Column::Int64(v) => v[i] as f64,
            Column::Float64(v) => v[i],
        }
    }

    pub fn as_i16(&self) -> Option<&[i16]> {
        match self {
            Column::Int16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            Column::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            Column::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Column::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// Little-endian raw bytes for the raw codec / single-chunk save path.
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        match self {
            Column::Int16(v) => ndts_codec::raw::encode_i16(v),
            Column::Int32(v) => ndts_codec::raw::encode_i32(v),
            Column::Int64(v) => ndts_codec::raw::encode_i64(v),
            Column::Float64(v) => ndts_codec::raw::encode_f64(v),
        }
    }

    pub fn from_raw_bytes(col_type: ColumnType, bytes: &[u8], count: u32) -> ndts_codec::Result<Self> {
        Ok(match col_type {
            ColumnType::Int16 => Column::Int16(ndts_codec::raw::decode_i16(bytes, count)?),
            ColumnType::Int32 => Column::Int32(ndts_codec::raw::decode_i32(bytes, count)?),
            ColumnType::Int64 => Column::Int64(ndts_codec::raw::decode_i64(bytes, count)?),
            ColumnType::Float64 => Column::Float64(ndts_codec::raw::decode_f64(bytes, count)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_coerced_casts_across_types() {
        let mut col = Column::new(ColumnType::Int32);
        col.push_coerced(Value::Int16(5));
        col.push_coerced(Value::Float64(3.9));
        assert_eq!(col.as_i32(), Some([5i32, 3].as_slice()));
    }

    #[test]
    fn raw_round_trips() {
        let col = Column::Float64(vec![1.5, -2.5, 3.0]);
        let bytes = col.to_raw_bytes();
        let decoded = Column::from_raw_bytes(ColumnType::Float64, &bytes, 3).unwrap();
        assert_eq!(col, decoded);
    }

    #[test]
    fn reset_clears_without_changing_type() {
        let mut col = Column::Int64(vec![1, 2, 3]);
        col.reset();
        assert!(col.is_empty());
        assert_eq!(col.column_type(), ColumnType::Int64);
    }
}
