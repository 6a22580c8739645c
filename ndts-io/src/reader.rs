//! Whole-file reader: validates the header, decodes every chunk, and
//! concatenates into per-column typed arrays.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use ndts_codec::CodecKind;
use ndts_format::{ChunkFrame, Header};

use crate::codec_dispatch;
use crate::column_data::ColumnData;
use crate::error::{IoLayerError, Result};

pub struct AppendReader;

impl AppendReader {
    /// Parse just the header, without touching any chunk.
    pub fn read_header<P: AsRef<Path>>(path: P) -> Result<Header> {
        let mut file = File::open(path)?;
        let mut len_buf = [0u8; 4];
        file.read_exact(&mut len_buf)?;
        let json_len = LittleEndian::read_u32(&len_buf) as usize;

        let mut buf = Vec::with_capacity(4 + json_len);
        buf.extend_from_slice(&len_buf);
        let mut json_buf = vec![0u8; json_len];
        file.read_exact(&mut json_buf)?;
        buf.extend_from_slice(&json_buf);

        let (header, _) = Header::from_bytes(&buf)?;
        Ok(header)
    }

    /// Validate the header, decode every chunk, and return the per-column
    /// arrays keyed by column name, how many rows were recovered, and (in
    /// the best-effort recovery case) the error that stopped decoding.
    ///
    /// Structural errors (bad magic, unsupported version, malformed header)
    /// are returned immediately with no partial result; corruption
    /// encountered mid-file instead yields every row decoded before the
    /// failure plus `Some(error)`.
    pub fn read_all<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Header, HashMap<String, ColumnData>, u64, Option<IoLayerError>)> {
        let bytes = fs::read(path)?;
        let (header, chunk_offset) = Header::from_bytes(&bytes)?;

        let mut columns: HashMap<String, ColumnData> = header
            .columns
            .iter()
            .map(|c| (c.name.clone(), ColumnData::new(c.col_type)))
            .collect();

        let mut offset = chunk_offset;
        let mut rows_recovered: u64 = 0;
        let mut failure: Option<IoLayerError> = None;

        'chunks: while offset < bytes.len() {
            match ChunkFrame::decode(&bytes[offset..], header.columns.len(), offset as u64) {
                Ok((frame, consumed)) => {
                    for (i, schema_col) in header.columns.iter().enumerate() {
                        let codec = CodecKind::from_str_lossy(header.codec_name(&schema_col.name));
                        match codec_dispatch::decode(schema_col.col_type, codec, &frame.payloads[i], frame.row_count) {
                            Ok(decoded) => {
                                columns.get_mut(&schema_col.name).unwrap().extend_from(decoded);
                            }
                            Err(e) => {
                                failure = Some(e.into());
                                break 'chunks;
                            }
                        }
                    }
                    rows_recovered += frame.row_count as u64;
                    offset += consumed;
                }
                Err(e) => {
                    failure = Some(e.into());
                    break;
                }
            }
        }

        Ok((header, columns, rows_recovered, failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_data::ColumnData as CD;
    use crate::writer::{AppendWriter, WriterOptions};
    use ndts_format::{ColumnSchema, ColumnType};

    fn schema() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema { name: "ts".to_string(), col_type: ColumnType::Int64 },
            ColumnSchema { name: "symbol_id".to_string(), col_type: ColumnType::Int32 },
            ColumnSchema { name: "price".to_string(), col_type: ColumnType::Float64 },
        ]
    }

    #[test]
    fn scenario_delta_rle_gorilla_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.ndts");

        let base = 1_000_000_000_000i64;
        let ts: Vec<i64> = (0..1000).map(|i| base + i * 1_000_000).collect();
        let symbol_id: Vec<i32> = (0..1000).map(|i| i / 100).collect();
        let price: Vec<f64> = (0..1000).map(|i| 50_000.0 + i as f64).collect();

        let mut writer = AppendWriter::open(
            &path,
            schema(),
            WriterOptions::default().with_codecs(vec![CodecKind::Delta, CodecKind::Rle, CodecKind::Gorilla]),
        )
        .unwrap();
        writer
            .append(vec![CD::Int64(ts.clone()), CD::Int32(symbol_id.clone()), CD::Float64(price.clone())])
            .unwrap();
        writer.close().unwrap();

        let (_, columns, recovered, err) = AppendReader::read_all(&path).unwrap();
        assert!(err.is_none());
        assert_eq!(recovered, 1000);

        match columns.get("symbol_id").unwrap() {
            CD::Int32(v) => {
                assert_eq!(v[0], 0);
                assert_eq!(v[999], 9);
            }
            _ => panic!("wrong type"),
        }
        match columns.get("ts").unwrap() {
            CD::Int64(v) => assert_eq!(v, &ts),
            _ => panic!("wrong type"),
        }
        match columns.get("price").unwrap() {
            CD::Float64(v) => assert_eq!(v[999], 50_999.0),
            _ => panic!("wrong type"),
        }
    }

    #[test]
    fn corrupt_tail_returns_partial_rows_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.ndts");

        let mut writer = AppendWriter::open(&path, schema(), WriterOptions::default().with_flush_threshold(1000)).unwrap();
        for batch in 0..10 {
            let ts: Vec<i64> = (0..1000).map(|i| (batch * 1000 + i) as i64).collect();
            let sym: Vec<i32> = vec![0; 1000];
            let price: Vec<f64> = vec![1.0; 1000];
            writer.append(vec![CD::Int64(ts), CD::Int32(sym), CD::Float64(price)]).unwrap();
        }
        writer.close().unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let len = bytes.len();
        for b in bytes.iter_mut().skip(len - 100) {
            *b ^= 0xFF;
        }
        fs::write(&path, &bytes).unwrap();

        let (_, _columns, recovered, err) = AppendReader::read_all(&path).unwrap();
        assert!(recovered >= 9000);
        assert!(err.is_some());

        let mut writer2 = AppendWriter::open(&path, schema(), WriterOptions::default()).unwrap();
        writer2
            .append(vec![CD::Int64(vec![1]), CD::Int32(vec![0]), CD::Float64(vec![1.0])])
            .unwrap();
        writer2.close().unwrap();

        let (_, _, recovered2, err2) = AppendReader::read_all(&path).unwrap();
        assert!(err2.is_none());
        assert_eq!(recovered2, recovered + 1);
    }

    #[test]
    fn header_only_file_returns_zero_length_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.ndts");
        let writer = AppendWriter::open(&path, schema(), WriterOptions::default()).unwrap();
        writer.close().unwrap();

        let (_, columns, recovered, err) = AppendReader::read_all(&path).unwrap();
        assert!(err.is_none());
        assert_eq!(recovered, 0);
        for col in columns.values() {
            assert!(col.is_empty());
        }
    }
}
