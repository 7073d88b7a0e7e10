//! The two stages: song catalog and activity

pub mod activity;
pub mod catalog;

use anyhow::Context;
use arrow::datatypes::SchemaRef;
use sparkify_core::{Accumulator, Storage, TableSummary, fmt_num, log_preview, write_rows};

pub use activity::{ActivityOutput, LOG_DATA_GLOB, run_activity};
pub use catalog::{CatalogOutput, SONG_DATA_GLOB, SongsTable, run_song_catalog};

/// Overwrite table `name` with `rows`, previewing the first batch at debug
/// level.
fn write_table<A: Accumulator>(
    storage: &Storage,
    name: &str,
    schema: SchemaRef,
    partition_by: &[&str],
    zstd_level: i32,
    mut acc: A,
    rows: impl IntoIterator<Item = A::Row>,
) -> anyhow::Result<TableSummary> {
    let mut writer = storage
        .create_table(name, schema, partition_by, zstd_level)
        .with_context(|| format!("Failed to create {name}"))?;

    let mut previewed = false;
    write_rows(&mut acc, rows, |batch| {
        if !previewed {
            log_preview(name, batch);
            previewed = true;
        }
        writer.write_batch(batch)
    })
    .with_context(|| format!("Failed to write {name}"))?;

    let summary = writer
        .finish()
        .with_context(|| format!("Failed to finalize {name}"))?;
    log::info!(
        "{name}: {} rows in {} files",
        fmt_num(summary.rows),
        summary.files
    );
    Ok(summary)
}
