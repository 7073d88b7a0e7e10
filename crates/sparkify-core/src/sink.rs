//! Single-file Parquet writer with atomic tmp→rename

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

/// Buffered Parquet writer. The file only appears under its final name once
/// `finalize` has written the footer.
pub struct ParquetSink {
    writer: ArrowWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    row_count: usize,
}

impl std::fmt::Debug for ParquetSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetSink")
            .field("final_path", &self.final_path)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl ParquetSink {
    /// Open `<final_path>.tmp` for writing.
    pub fn create(
        final_path: &Path,
        schema: SchemaRef,
        zstd_level: i32,
    ) -> Result<Self, std::io::Error> {
        let mut tmp_name = final_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let file = File::create(&tmp_path)?;
        let level = ZstdLevel::try_new(zstd_level)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .set_max_row_group_size(1024 * 1024)
            .build();

        let writer = ArrowWriter::try_new(file, schema, Some(props)).map_err(std::io::Error::other)?;

        Ok(Self {
            writer,
            tmp_path,
            final_path: final_path.to_path_buf(),
            row_count: 0,
        })
    }

    pub fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), std::io::Error> {
        self.row_count += batch.num_rows();
        self.writer.write(batch).map_err(std::io::Error::other)
    }

    /// Flush the footer and rename tmp → final. Returns rows written.
    pub fn finalize(self) -> Result<usize, std::io::Error> {
        let row_count = self.row_count;
        self.writer.close().map_err(std::io::Error::other)?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    fn ids_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2, 3]))]).unwrap()
    }

    #[test]
    fn finalize_renames_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("part-00000.parquet");
        let batch = ids_batch();

        let mut sink = ParquetSink::create(&path, batch.schema(), 3).unwrap();
        assert!(dir.path().join("part-00000.parquet.tmp").exists());
        sink.write_batch(&batch).unwrap();
        assert_eq!(sink.finalize().unwrap(), 3);

        assert!(path.exists());
        assert!(!dir.path().join("part-00000.parquet.tmp").exists());

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 3);
    }

    #[test]
    fn stale_tmp_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("part-00000.parquet");
        std::fs::write(dir.path().join("part-00000.parquet.tmp"), b"stale").unwrap();

        let batch = ids_batch();
        let sink = ParquetSink::create(&path, batch.schema(), 3).unwrap();
        assert_eq!(sink.finalize().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn invalid_zstd_level_rejected() {
        let dir = TempDir::new().unwrap();
        let batch = ids_batch();
        let err = ParquetSink::create(&dir.path().join("x.parquet"), batch.schema(), 99).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
