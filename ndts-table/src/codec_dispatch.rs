//! Bridges a column's declared `(type, codec)` pair to the right
//! `ndts_codec` function. Each I/O-capable crate (`ndts-table`, `ndts-io`)
//! owns a small dispatch like this rather than sharing one generic trait
//! object across crate boundaries.

use ndts_codec::{CodecError, CodecKind};
use ndts_format::ColumnType;

use crate::column::Column;

pub fn encode(column: &Column, codec: CodecKind) -> Vec<u8> {
    match (column, codec) {
        (Column::Int64(v), CodecKind::Delta) => ndts_codec::delta::encode(v),
        (Column::Int32(v), CodecKind::Rle) => ndts_codec::rle::encode(v),
        (Column::Float64(v), CodecKind::Gorilla) => ndts_codec::gorilla::encode(v),
        _ => column.to_raw_bytes(),
    }
}

pub fn decode(
    col_type: ColumnType,
    codec: CodecKind,
    payload: &[u8],
    count: u32,
) -> Result<Column, CodecError> {
    match (col_type, codec) {
        (ColumnType::Int64, CodecKind::Delta) => {
            Ok(Column::Int64(ndts_codec::delta::decode(payload, count)?))
        }
        (ColumnType::Int32, CodecKind::Rle) => {
            Ok(Column::Int32(ndts_codec::rle::decode(payload, count)?))
        }
        (ColumnType::Float64, CodecKind::Gorilla) => {
            Ok(Column::Float64(ndts_codec::gorilla::decode(payload, count)?))
        }
        (col_type, _) => Column::from_raw_bytes(col_type, payload, count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_raw_for_mismatched_type_codec_pair() {
        let col = Column::Int16(vec![1, 2, 3]);
        let bytes = encode(&col, CodecKind::Gorilla);
        let decoded = decode(ColumnType::Int16, CodecKind::Gorilla, &bytes, 3).unwrap();
        assert_eq!(decoded, col);
    }
}
