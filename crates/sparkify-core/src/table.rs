//! Table-level Parquet I/O: overwrite + Hive-partitioned writes, and reads
//! that restore partition values from directory names.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch, StringArray, UInt32Array};
use arrow::compute::{cast, take};
use arrow::datatypes::{DataType, Schema, SchemaRef};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::ZstdLevel;

use crate::partition::{PartitionKey, parse_partition_path, partition_dir};
use crate::sink::ParquetSink;

/// Marker written once every file of a table is in place.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Data file name inside each (partition) directory.
const PART_FILE: &str = "part-00000.parquet";

/// Rows and files produced by one table write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableSummary {
    pub rows: usize,
    pub files: usize,
}

/// Writer for one table directory.
///
/// Creating it deletes whatever was at the directory before (overwrite
/// semantics). Partition columns are dropped from the data files and
/// encoded in the directory path instead.
///
/// Slices are buffered per partition and written out by `finish`, one file
/// at a time, so a table with thousands of partitions never holds more than
/// a single open file.
pub struct TableWriter {
    dir: PathBuf,
    schema: SchemaRef,
    file_schema: SchemaRef,
    partition_cols: Vec<String>,
    partition_idx: Vec<usize>,
    data_idx: Vec<usize>,
    pending: BTreeMap<PartitionKey, Vec<RecordBatch>>,
    zstd_level: i32,
}

impl std::fmt::Debug for TableWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableWriter")
            .field("dir", &self.dir)
            .field("partition_cols", &self.partition_cols)
            .field("partitions", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl TableWriter {
    pub fn create(
        dir: &Path,
        schema: SchemaRef,
        partition_by: &[&str],
        zstd_level: i32,
    ) -> io::Result<Self> {
        let mut partition_idx = Vec::with_capacity(partition_by.len());
        for col in partition_by {
            let idx = schema.index_of(col).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("partition column '{col}' not in schema"),
                )
            })?;
            partition_idx.push(idx);
        }
        ZstdLevel::try_new(zstd_level)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let data_idx: Vec<usize> = (0..schema.fields().len())
            .filter(|i| !partition_idx.contains(i))
            .collect();
        let file_schema = Arc::new(file_schema(&schema, partition_by));

        if dir.exists() {
            log::debug!("Overwriting {}", dir.display());
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;

        let mut pending = BTreeMap::new();
        // Unpartitioned tables always get a file, even when no rows arrive
        if partition_by.is_empty() {
            pending.insert(Vec::new(), Vec::new());
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            schema,
            file_schema,
            partition_cols: partition_by.iter().map(|c| c.to_string()).collect(),
            partition_idx,
            data_idx,
            pending,
            zstd_level,
        })
    }

    /// Split `batch` by partition values and queue each slice for its file.
    pub fn write_batch(&mut self, batch: &RecordBatch) -> io::Result<()> {
        if batch.num_columns() != self.schema.fields().len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "batch has {} columns, table expects {}",
                    batch.num_columns(),
                    self.schema.fields().len()
                ),
            ));
        }
        if batch.num_rows() == 0 {
            return Ok(());
        }

        if self.partition_cols.is_empty() {
            let columns: Vec<ArrayRef> = self
                .data_idx
                .iter()
                .map(|&i| batch.column(i).clone())
                .collect();
            let data = RecordBatch::try_new(self.file_schema.clone(), columns)
                .map_err(io::Error::other)?;
            self.pending.entry(Vec::new()).or_default().push(data);
            return Ok(());
        }

        for (key, rows) in group_rows(batch, &self.partition_idx)? {
            let indices = UInt32Array::from(rows);
            let columns = self
                .data_idx
                .iter()
                .map(|&i| take(batch.column(i).as_ref(), &indices, None))
                .collect::<Result<Vec<_>, _>>()
                .map_err(io::Error::other)?;
            let data = RecordBatch::try_new(self.file_schema.clone(), columns)
                .map_err(io::Error::other)?;
            self.pending.entry(key).or_default().push(data);
        }
        Ok(())
    }

    /// Write every partition file in key order, then drop the `_SUCCESS`
    /// marker. Each file is closed before the next one is opened.
    pub fn finish(self) -> io::Result<TableSummary> {
        let mut summary = TableSummary::default();
        for (key, batches) in self.pending {
            let dir = self.dir.join(partition_dir(&self.partition_cols, &key));
            fs::create_dir_all(&dir)?;
            let mut sink =
                ParquetSink::create(&dir.join(PART_FILE), self.file_schema.clone(), self.zstd_level)?;
            for batch in &batches {
                sink.write_batch(batch)?;
            }
            summary.rows += sink.finalize()?;
            summary.files += 1;
        }
        File::create(self.dir.join(SUCCESS_MARKER))?;
        log::debug!(
            "Wrote {} rows in {} files to {}",
            summary.rows,
            summary.files,
            self.dir.display()
        );
        Ok(summary)
    }
}

/// Row indices per partition key, keys in sorted order.
fn group_rows(batch: &RecordBatch, partition_idx: &[usize]) -> io::Result<BTreeMap<PartitionKey, Vec<u32>>> {
    let as_text = partition_idx
        .iter()
        .map(|&i| cast(batch.column(i).as_ref(), &DataType::Utf8))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io::Error::other)?;
    let as_text: Vec<&StringArray> = as_text
        .iter()
        .map(|a| {
            a.as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| io::Error::other("partition column did not cast to Utf8"))
        })
        .collect::<io::Result<_>>()?;

    let mut groups: BTreeMap<PartitionKey, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let key: PartitionKey = as_text
            .iter()
            .map(|col| (!col.is_null(row)).then(|| col.value(row).to_string()))
            .collect();
        groups.entry(key).or_default().push(row as u32);
    }
    Ok(groups)
}

/// One data file read back, with the partition values from its path.
#[derive(Debug)]
pub struct PartitionedBatch {
    pub partition: Vec<(String, Option<String>)>,
    pub batch: RecordBatch,
}

impl PartitionedBatch {
    /// Partition value for `column`; `None` for null or absent.
    pub fn partition_value(&self, column: &str) -> Option<&str> {
        self.partition
            .iter()
            .find(|(col, _)| col == column)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// Read every Parquet file under a table directory, in sorted path order.
pub fn read_table(dir: &Path) -> io::Result<Vec<PartitionedBatch>> {
    let pattern = dir.join("**").join("*.parquet");
    let pattern = pattern.to_string_lossy();
    let files = glob::glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io::Error::other)?;

    let mut out = Vec::new();
    for path in files {
        let relative = path.strip_prefix(dir).unwrap_or(&path);
        let partition = parse_partition_path(relative);
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)
            .map_err(io::Error::other)?
            .build()
            .map_err(io::Error::other)?;
        for batch in reader {
            out.push(PartitionedBatch {
                partition: partition.clone(),
                batch: batch.map_err(io::Error::other)?,
            });
        }
    }
    Ok(out)
}

/// Schema of the data files of a table written with `partition_by`.
pub fn file_schema(schema: &Schema, partition_by: &[&str]) -> Schema {
    let fields: Vec<_> = schema
        .fields()
        .iter()
        .filter(|f| !partition_by.contains(&f.name().as_str()))
        .cloned()
        .collect();
    Schema::new(fields)
}
