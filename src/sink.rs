// src/sink.rs

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::info;

/// Append `batch` to the table stored under `dir` by writing it as a new
/// part file `trips_<utc timestamp>.parquet`. Existing parts are never touched.
///
/// Returns `None` without writing anything when the batch has no columns.
pub fn append_parquet(dir: impl AsRef<Path>, batch: &RecordBatch) -> Result<Option<PathBuf>> {
    if batch.num_columns() == 0 {
        info!("empty result; nothing to append");
        return Ok(None);
    }

    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {:?}", dir))?;

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%6f");
    let path = dir.join(format!("trips_{}.parquet", stamp));
    let file = File::create(&path).with_context(|| format!("creating {:?}", path))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(batch).context("writing trips batch")?;
    writer.close().context("closing trips writer")?;

    info!(path = %path.display(), rows = batch.num_rows(), "appended part file");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::empty_table;
    use arrow::array::{ArrayRef, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn appends_new_part_files() -> Result<()> {
        let tmp = tempdir()?;
        let out_dir = tmp.path().join("trips");
        let batch = RecordBatch::try_from_iter(vec![(
            "taxi_type",
            Arc::new(StringArray::from(vec!["yellow", "green"])) as ArrayRef,
        )])?;

        let first = append_parquet(&out_dir, &batch)?.expect("part written");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = append_parquet(&out_dir, &batch)?.expect("part written");
        assert_ne!(first, second);
        assert_eq!(fs::read_dir(&out_dir)?.count(), 2);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&first)?)?.build()?;
        let rows: usize = reader.map(|b| b.map(|b| b.num_rows())).sum::<Result<usize, _>>()?;
        assert_eq!(rows, 2);
        Ok(())
    }

    #[test]
    fn empty_result_writes_nothing() -> Result<()> {
        let tmp = tempdir()?;
        assert!(append_parquet(tmp.path(), &empty_table())?.is_none());
        assert_eq!(fs::read_dir(tmp.path())?.count(), 0);
        Ok(())
    }
}
