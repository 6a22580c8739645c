//! Routes row batches to per-partition files by hash or time bucket, keeps
//! a directory of per-partition key ranges for range pruning, and answers
//! queries by pruning then delegating to [`ndts_io::AppendReader`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndts_format::{ColumnSchema, ColumnType};
use ndts_io::{AppendReader, AppendWriter, ColumnData, WriterOptions};

use crate::directory::{PartitionDirectory, PartitionStats, SIDECAR_FILE_NAME};
use crate::error::{PartitionError, Result};
use crate::scheme::PartitionScheme;

fn column_value_as_i64(column: &ColumnData, index: usize) -> i64 {
    match column {
        ColumnData::Int16(v) => v[index] as i64,
        ColumnData::Int32(v) => v[index] as i64,
        ColumnData::Int64(v) => v[index],
        ColumnData::Float64(v) => v[index] as i64,
    }
}

fn gather(column: &ColumnData, indices: &[usize]) -> ColumnData {
    match column {
        ColumnData::Int16(v) => ColumnData::Int16(indices.iter().map(|&i| v[i]).collect()),
        ColumnData::Int32(v) => ColumnData::Int32(indices.iter().map(|&i| v[i]).collect()),
        ColumnData::Int64(v) => ColumnData::Int64(indices.iter().map(|&i| v[i]).collect()),
        ColumnData::Float64(v) => ColumnData::Float64(indices.iter().map(|&i| v[i]).collect()),
    }
}

fn push_one(dst: &mut ColumnData, src: &ColumnData, i: usize) {
    match (dst, src) {
        (ColumnData::Int16(d), ColumnData::Int16(s)) => d.push(s[i]),
        (ColumnData::Int32(d), ColumnData::Int32(s)) => d.push(s[i]),
        (ColumnData::Int64(d), ColumnData::Int64(s)) => d.push(s[i]),
        (ColumnData::Float64(d), ColumnData::Float64(s)) => d.push(s[i]),
        _ => unreachable!("column type fixed by schema"),
    }
}

fn min_max_i64(column: &ColumnData) -> (i64, i64) {
    let len = column.len();
    if len == 0 {
        return (0, 0);
    }
    let mut min = column_value_as_i64(column, 0);
    let mut max = min;
    for i in 1..len {
        let v = column_value_as_i64(column, i);
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}

/// A partition file that was missing, unreadable, or whose decode stopped
/// early due to corruption. Rows beyond the stopping point are treated as
/// absent for the current query; the partition is dropped from the
/// directory so pruning never cites a bound that couldn't be verified.
#[derive(Debug, Clone)]
pub struct PartitionWarning {
    pub partition: String,
    pub message: String,
}

pub struct QueryResult {
    pub columns: HashMap<String, ColumnData>,
    pub warnings: Vec<PartitionWarning>,
    pub partitions_total: usize,
    pub partitions_scanned: usize,
    pub partitions_pruned: usize,
}

pub struct PartitionManager {
    dir: PathBuf,
    schema: Vec<ColumnSchema>,
    key_index: usize,
    scheme: PartitionScheme,
    directory: PartitionDirectory,
    writers: HashMap<String, AppendWriter>,
    dirty: bool,
}

impl PartitionManager {
    /// Opens (creating if absent) the partition directory at `dir`. The
    /// in-memory directory is reconstructed from a filesystem scan: a fresh
    /// `.ndts-directory.json` sidecar entry (byte size still matches the
    /// file) is trusted as-is; anything else is rebuilt by decoding that one
    /// partition from scratch.
    pub fn open<P: AsRef<Path>>(dir: P, schema: Vec<ColumnSchema>, scheme: PartitionScheme) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let key_index = schema
            .iter()
            .position(|c| c.name == scheme.key_column())
            .ok_or_else(|| PartitionError::KeyColumnNotFound(scheme.key_column().to_string()))?;
        if schema[key_index].col_type == ColumnType::Float64 {
            return Err(PartitionError::KeyColumnNotInteger(scheme.key_column().to_string()));
        }

        let cached = PartitionDirectory::load_sidecar(&dir).unwrap_or_default();
        let mut directory = PartitionDirectory::default();
        let key_column_name = scheme.key_column().to_string();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = partition_name(&path) else { continue };
            let file_len = entry.metadata()?.len();

            if cached.is_fresh(&name, file_len) {
                directory.partitions.insert(name.clone(), cached.partitions[&name].clone());
                continue;
            }
            if let Ok(stats) = Self::stats_from_disk(&path, &key_column_name, file_len) {
                directory.partitions.insert(name, stats);
            }
        }

        Ok(PartitionManager { dir, schema, key_index, scheme, directory, writers: HashMap::new(), dirty: false })
    }

    fn stats_from_disk(path: &Path, key_column: &str, byte_size: u64) -> Result<PartitionStats> {
        // A decode failure here (bad header, or corruption before the first
        // chunk) simply leaves this partition out of the directory; `query`
        // rediscovers it from the filesystem listing and reports it as a
        // warning on its own next attempt to read it.
        let (header, columns, rows, _partial_decode_error) = AppendReader::read_all(path)?;
        let key_col = columns.get(key_column).ok_or_else(|| PartitionError::KeyColumnNotFound(key_column.to_string()))?;
        let (min_key, max_key) = min_max_i64(key_col);
        Ok(PartitionStats { row_count: rows.max(header.total_rows), byte_size, min_key, max_key })
    }

    fn partition_path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}.ndts"))
    }

    fn writer_for(&mut self, label: &str) -> Result<&mut AppendWriter> {
        if !self.writers.contains_key(label) {
            let path = self.partition_path(label);
            let writer = AppendWriter::open(&path, self.schema.clone(), WriterOptions::default())?;
            self.writers.insert(label.to_string(), writer);
        }
        Ok(self.writers.get_mut(label).unwrap())
    }

    /// Splits one column-oriented batch by partition label and routes each
    /// group to its partition's writer. Per-partition buffering and the
    /// flush-at-threshold policy are `AppendWriter`'s own.
    pub fn append(&mut self, columns: Vec<ColumnData>) -> Result<()> {
        let rows = columns.first().map(ColumnData::len).unwrap_or(0);
        if columns.iter().any(|c| c.len() != rows) {
            return Err(PartitionError::RowLengthMismatch);
        }
        if rows == 0 {
            return Ok(());
        }

        let key_column = &columns[self.key_index];
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for i in 0..rows {
            let key = column_value_as_i64(key_column, i);
            let label = self.scheme.label_for(key)?;
            groups.entry(label).or_default().push(i);
        }

        for (label, indices) in groups {
            let batch: Vec<ColumnData> = columns.iter().map(|c| gather(c, &indices)).collect();
            let (min_key, max_key) = indices
                .iter()
                .map(|&i| column_value_as_i64(key_column, i))
                .fold((i64::MAX, i64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let added = indices.len() as u64;

            self.writer_for(&label)?.append(batch)?;
            let byte_size = fs::metadata(self.partition_path(&label))?.len();

            let stats = self
                .directory
                .partitions
                .entry(label)
                .or_insert(PartitionStats { row_count: 0, byte_size: 0, min_key, max_key });
            stats.row_count += added;
            stats.byte_size = byte_size;
            stats.min_key = stats.min_key.min(min_key);
            stats.max_key = stats.max_key.max(max_key);
            self.dirty = true;
        }
        Ok(())
    }

    /// Flushes every open partition writer, then refreshes each touched
    /// partition's cached byte size against the post-flush file length
    /// (`append` only knows the pre-flush, buffered-rows length) and, if
    /// anything changed, rewrites the directory sidecar.
    pub fn flush_all(&mut self) -> Result<()> {
        for (label, writer) in self.writers.iter_mut() {
            writer.flush()?;
            let byte_size = fs::metadata(self.dir.join(format!("{label}.ndts")))?.len();
            if let Some(stats) = self.directory.partitions.get_mut(label) {
                if stats.byte_size != byte_size {
                    stats.byte_size = byte_size;
                    self.dirty = true;
                }
            }
        }
        if self.dirty {
            self.directory.save_sidecar(&self.dir)?;
            self.dirty = false;
        }
        Ok(())
    }

    fn list_partition_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = partition_name(&entry.path()) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Prunes partitions outside `range` (when given) using the directory's
    /// `[min_key, max_key]`, then decodes surviving partitions and applies
    /// `predicate` row by row. Always flushes open writers first so a query
    /// in the same process sees rows appended earlier in that process.
    pub fn query<F>(&mut self, range: Option<(i64, i64)>, predicate: F) -> Result<QueryResult>
    where
        F: Fn(&HashMap<String, ColumnData>, usize) -> bool,
    {
        self.flush_all()?;

        let mut columns: HashMap<String, ColumnData> =
            self.schema.iter().map(|c| (c.name.clone(), ColumnData::new(c.col_type))).collect();
        let mut warnings = Vec::new();
        let names = self.list_partition_files()?;
        let partitions_total = names.len();
        let mut partitions_scanned = 0usize;
        let mut partitions_pruned = 0usize;

        for name in names {
            if let (Some((range_min, range_max)), Some(stats)) = (range, self.directory.partitions.get(&name)) {
                if stats.max_key < range_min || stats.min_key > range_max {
                    partitions_pruned += 1;
                    continue;
                }
            }
            partitions_scanned += 1;

            let path = self.partition_path(&name);
            match AppendReader::read_all(&path) {
                Ok((_, decoded, rows, err)) => {
                    if let Some(e) = err {
                        warnings.push(PartitionWarning { partition: name.clone(), message: e.to_string() });
                        self.directory.partitions.remove(&name);
                        self.dirty = true;
                    }
                    for i in 0..rows as usize {
                        if predicate(&decoded, i) {
                            for schema_col in &self.schema {
                                let dst = columns.get_mut(&schema_col.name).unwrap();
                                let src = decoded.get(&schema_col.name).unwrap();
                                push_one(dst, src, i);
                            }
                        }
                    }
                }
                Err(e) => {
                    warnings.push(PartitionWarning { partition: name.clone(), message: e.to_string() });
                    self.directory.partitions.remove(&name);
                    self.dirty = true;
                }
            }
        }

        Ok(QueryResult { columns, warnings, partitions_total, partitions_scanned, partitions_pruned })
    }

    pub fn directory(&self) -> &PartitionDirectory {
        &self.directory
    }
}

fn partition_name(path: &Path) -> Option<String> {
    if path.file_name().and_then(|n| n.to_str()) == Some(SIDECAR_FILE_NAME) {
        return None;
    }
    if path.extension().and_then(|e| e.to_str()) != Some("ndts") {
        return None;
    }
    path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string())
}
