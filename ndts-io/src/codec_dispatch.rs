//! Bridges a column's declared `(type, codec)` pair to the right
//! `ndts_codec` function. See `ndts-table`'s copy of this pattern; kept
//! separate per crate since `ndts-io` does not depend on `ndts-table`.

use ndts_codec::{CodecError, CodecKind};
use ndts_format::ColumnType;

use crate::column_data::ColumnData;

pub fn encode(column: &ColumnData, codec: CodecKind) -> Vec<u8> {
    match (column, codec) {
        (ColumnData::Int64(v), CodecKind::Delta) => ndts_codec::delta::encode(v),
        (ColumnData::Int32(v), CodecKind::Rle) => ndts_codec::rle::encode(v),
        (ColumnData::Float64(v), CodecKind::Gorilla) => ndts_codec::gorilla::encode(v),
        _ => column.to_raw_bytes(),
    }
}

pub fn decode(
    col_type: ColumnType,
    codec: CodecKind,
    payload: &[u8],
    count: u32,
) -> Result<ColumnData, CodecError> {
    match (col_type, codec) {
        (ColumnType::Int64, CodecKind::Delta) => {
            Ok(ColumnData::Int64(ndts_codec::delta::decode(payload, count)?))
        }
        (ColumnType::Int32, CodecKind::Rle) => {
            Ok(ColumnData::Int32(ndts_codec::rle::decode(payload, count)?))
        }
        (ColumnType::Float64, CodecKind::Gorilla) => {
            Ok(ColumnData::Float64(ndts_codec::gorilla::decode(payload, count)?))
        }
        (ColumnType::Int16, _) => Ok(ColumnData::Int16(ndts_codec::raw::decode_i16(payload, count)?)),
        (ColumnType::Int32, _) => Ok(ColumnData::Int32(ndts_codec::raw::decode_i32(payload, count)?)),
        (ColumnType::Int64, _) => Ok(ColumnData::Int64(ndts_codec::raw::decode_i64(payload, count)?)),
        (ColumnType::Float64, _) => Ok(ColumnData::Float64(ndts_codec::raw::decode_f64(payload, count)?)),
    }
}
