//! In-memory strongly-typed columnar table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ndts_codec::CodecKind;
use ndts_format::{ChunkFrame, ColumnSchema, Header};

use crate::column::{Column, Value};
use crate::error::{Result, TableError};

/// A single field in a row passed to [`ColumnarTable::append`].
pub type Field<'a> = (&'a str, Value);

/// Comparator used by [`ColumnarTable::filter`]. The threshold is compared
/// against each row's value (cast to `f64`, so it works uniformly across
/// integer and float columns).
#[derive(Debug, Clone, Copy)]
pub enum Comparator {
    Gt(f64),
    Lt(f64),
    Eq(f64),
}

/// Aggregate reducer used by [`ColumnarTable::aggregate`] and `sampleBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Min,
    Max,
    Avg,
    Count,
    First,
    Last,
}

/// One `sampleBy` request: aggregate `column` with `op`, in output order.
#[derive(Debug, Clone, Copy)]
pub struct SampleSpec<'a> {
    pub column: &'a str,
    pub op: AggOp,
}

/// One bucket's worth of aggregated results, in the same order as the
/// `ops` slice passed to `sampleBy`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBucket {
    pub bucket_start: i64,
    pub values: Vec<f64>,
}

/// An ordered collection of equal-length, strongly-typed column buffers.
#[derive(Debug, Clone)]
pub struct ColumnarTable {
    schema: Vec<ColumnSchema>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    row_count: usize,
}

impl ColumnarTable {
    pub fn new(schema: Vec<ColumnSchema>) -> Self {
        let columns = schema.iter().map(|c| Column::new(c.col_type)).collect();
        let index = schema
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        ColumnarTable {
            schema,
            columns,
            index,
            row_count: 0,
        }
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    /// Append one row. Fields not present in `row` default to zero for that
    /// column; fields naming a column not in the schema are ignored.
    pub fn append(&mut self, row: &[Field<'_>]) {
        for (i, schema_col) in self.schema.iter().enumerate() {
            let value = row
                .iter()
                .find(|(name, _)| *name == schema_col.name)
                .map(|(_, v)| *v)
                .unwrap_or(zero_value(schema_col.col_type));
            self.columns[i].push_coerced(value);
        }
        self.row_count += 1;
    }

    /// Append many rows. Column buffers grow geometrically via `Vec`'s own
    /// amortized-doubling growth; no extra bookkeeping needed here.
    pub fn append_batch(&mut self, rows: &[&[Field<'_>]]) {
        for col in &mut self.columns {
            reserve_for(col, rows.len());
        }
        for row in rows {
            self.append(row);
        }
    }

    pub fn get_column(&self, name: &str) -> Result<&Column> {
        Ok(&self.columns[self.column_index(name)?])
    }

    /// Dense list of row indices where `comparator` holds against `col`.
    pub fn filter(&self, col: &str, comparator: Comparator) -> Result<Vec<usize>> {
        let column = self.get_column(col)?;
        let mut out = Vec::new();
        for i in 0..column.len() {
            let v = column.get_f64(i);
            let hit = match comparator {
                Comparator::Gt(t) => v > t,
                Comparator::Lt(t) => v < t,
                Comparator::Eq(t) => v == t,
            };
            if hit {
                out.push(i);
            }
        }
        Ok(out)
    }

    /// Single-pass aggregate over `col`.
    pub fn aggregate(&self, col: &str, op: AggOp) -> Result<f64> {
        let column = self.get_column(col)?;
        Ok(reduce(column, op))
    }

    /// Bucket rows by `floor(ts / bucket_nanos)` on `ts_col` (assumed
    /// non-decreasing) and aggregate `ops` per bucket. Buckets are
    /// closed-open `[t0, t0 + bucket_nanos)`.
    pub fn sample_by(
        &self,
        ts_col: &str,
        bucket_nanos: i64,
        ops: &[SampleSpec<'_>],
    ) -> Result<Vec<SampleBucket>> {
        let ts = self
            .get_column(ts_col)?
            .as_i64()
            .ok_or_else(|| TableError::SchemaMismatch(format!("{ts_col} is not int64")))?;

        let mut value_cols = Vec::with_capacity(ops.len());
        for spec in ops {
            value_cols.push(self.get_column(spec.column)?);
        }

        let mut out = Vec::new();
        if ts.is_empty() {
            return Ok(out);
        }

        let mut bucket_start_idx = 0usize;
        let mut current_bucket = ts[0].div_euclid(bucket_nanos);

        for i in 1..=ts.len() {
            let bucket = if i < ts.len() {
                Some(ts[i].div_euclid(bucket_nanos))
            } else {
                None
            };
            if bucket != Some(current_bucket) {
                let values = value_cols
                    .iter()
                    .zip(ops)
                    .map(|(col, spec)| reduce_range(col, bucket_start_idx, i, spec.op))
                    .collect();
                out.push(SampleBucket {
                    bucket_start: current_bucket * bucket_nanos,
                    values,
                });
                bucket_start_idx = i;
                if let Some(b) = bucket {
                    current_bucket = b;
                }
            }
        }

        Ok(out)
    }

    /// Write a single-chunk file using the raw codec for every column.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let header = Header::new(self.schema.clone());
        let mut header = header;
        header.total_rows = self.row_count as u64;
        header.chunk_count = 1;

        let payloads: Vec<Vec<u8>> = self.columns.iter().map(Column::to_raw_bytes).collect();
        let chunk = ChunkFrame::new(self.row_count as u32, payloads);

        let mut bytes = header.to_bytes()?;
        bytes.extend(chunk.encode());
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Read every chunk of `path` into a fresh table, decoding each column
    /// per the header's declared codec.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        let (header, mut offset) = Header::from_bytes(&bytes)?;
        let mut table = ColumnarTable::new(header.columns.clone());

        while offset < bytes.len() {
            let (frame, consumed) = ChunkFrame::decode(&bytes[offset..], header.columns.len(), offset as u64)?;
            for (i, schema_col) in header.columns.iter().enumerate() {
                let codec = CodecKind::from_str_lossy(header.codec_name(&schema_col.name));
                let decoded = crate::codec_dispatch::decode(
                    schema_col.col_type,
                    codec,
                    &frame.payloads[i],
                    frame.row_count,
                )?;
                append_decoded(&mut table.columns[i], decoded);
            }
            table.row_count += frame.row_count as usize;
            offset += consumed;
        }

        Ok(table)
    }
}

fn append_decoded(dst: &mut Column, src: Column) {
    match (dst, src) {
        (Column::Int16(d), Column::Int16(s)) => d.extend(s),
        (Column::Int32(d), Column::Int32(s)) => d.extend(s),
        (Column::Int64(d), Column::Int64(s)) => d.extend(s),
        (Column::Float64(d), Column::Float64(s)) => d.extend(s),
        _ => unreachable!("decode dispatch always matches the destination column's type"),
    }
}

fn reserve_for(col: &mut Column, additional: usize) {
    match col {
        Column::Int16(v) => v.reserve(additional),
        Column::Int32(v) => v.reserve(additional),
        Column::Int64(v) => v.reserve(additional),
        Column::Float64(v) => v.reserve(additional),
    }
}

fn zero_value(col_type: ndts_format::ColumnType) -> Value {
    match col_type {
        ndts_format::ColumnType::Int16 => Value::Int16(0),
        ndts_format::ColumnType::Int32 => Value::Int32(0),
        ndts_format::ColumnType::Int64 => Value::Int64(0),
        ndts_format::ColumnType::Float64 => Value::Float64(0.0),
    }
}

fn reduce(column: &Column, op: AggOp) -> f64 {
    reduce_range(column, 0, column.len(), op)
}

fn reduce_range(column: &Column, start: usize, end: usize, op: AggOp) -> f64 {
    let len = end - start;
    match op {
        AggOp::Count => len as f64,
        AggOp::First => {
            if len == 0 {
                0.0
            } else {
                column.get_f64(start)
            }
        }
        AggOp::Last => {
            if len == 0 {
                0.0
            } else {
                column.get_f64(end - 1)
            }
        }
        AggOp::Sum | AggOp::Avg => {
            let mut sum = 0.0;
            for i in start..end {
                sum += column.get_f64(i);
            }
            if op == AggOp::Avg {
                if len == 0 {
                    0.0
                } else {
                    sum / len as f64
                }
            } else {
                sum
            }
        }
        AggOp::Min => {
            let mut min = f64::INFINITY;
            for i in start..end {
                min = min.min(column.get_f64(i));
            }
            if len == 0 {
                0.0
            } else {
                min
            }
        }
        AggOp::Max => {
            let mut max = f64::NEG_INFINITY;
            for i in start..end {
                max = max.max(column.get_f64(i));
            }
            if len == 0 {
                0.0
            } else {
                max
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndts_format::ColumnType;

    fn schema() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema {
                name: "ts".to_string(),
                col_type: ColumnType::Int64,
            },
            ColumnSchema {
                name: "price".to_string(),
                col_type: ColumnType::Float64,
            },
        ]
    }

    #[test]
    fn append_defaults_missing_fields_and_ignores_unknown() {
        let mut table = ColumnarTable::new(schema());
        table.append(&[("price", Value::Float64(1.5)), ("bogus", Value::Int32(9))]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.get_column("ts").unwrap().get_f64(0), 0.0);
        assert_eq!(table.get_column("price").unwrap().get_f64(0), 1.5);
    }

    #[test]
    fn append_batch_leaves_row_count_unchanged_on_empty_input() {
        let mut table = ColumnarTable::new(schema());
        table.append_batch(&[]);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn filter_and_aggregate() {
        let mut table = ColumnarTable::new(schema());
        for p in [1.0, 5.0, 3.0, 9.0] {
            table.append(&[("price", Value::Float64(p))]);
        }
        let idx = table.filter("price", Comparator::Gt(3.0)).unwrap();
        assert_eq!(idx, vec![1, 3]);
        assert_eq!(table.aggregate("price", AggOp::Sum).unwrap(), 18.0);
        assert_eq!(table.aggregate("price", AggOp::Max).unwrap(), 9.0);
        assert_eq!(table.aggregate("price", AggOp::Count).unwrap(), 4.0);
    }

    #[test]
    fn sample_by_buckets_half_open_ranges() {
        let mut table = ColumnarTable::new(schema());
        for (ts, price) in [(0i64, 1.0), (5, 2.0), (10, 3.0), (15, 4.0), (25, 5.0)] {
            table.append(&[("ts", Value::Int64(ts)), ("price", Value::Float64(price))]);
        }
        let buckets = table
            .sample_by("ts", 10, &[SampleSpec { column: "price", op: AggOp::Sum }])
            .unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].bucket_start, 0);
        assert_eq!(buckets[0].values, vec![3.0]);
        assert_eq!(buckets[1].bucket_start, 10);
        assert_eq!(buckets[1].values, vec![7.0]);
        assert_eq!(buckets[2].bucket_start, 20);
        assert_eq!(buckets[2].values, vec![5.0]);
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.ndts");

        let mut table = ColumnarTable::new(schema());
        for i in 0..1000i64 {
            table.append(&[("ts", Value::Int64(i)), ("price", Value::Float64(i as f64))]);
        }
        table.save_to_file(&path).unwrap();

        let loaded = ColumnarTable::load_from_file(&path).unwrap();
        assert_eq!(loaded.row_count(), 1000);
        assert_eq!(
            loaded.get_column("price").unwrap().as_f64().unwrap(),
            table.get_column("price").unwrap().as_f64().unwrap()
        );
    }

    #[test]
    fn load_from_file_on_header_only_file_returns_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.ndts");
        let table = ColumnarTable::new(schema());
        table.save_to_file(&path).unwrap();
        let loaded = ColumnarTable::load_from_file(&path).unwrap();
        assert_eq!(loaded.row_count(), 0);
    }
}
