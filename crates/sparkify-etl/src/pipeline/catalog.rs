//! Song catalog stage: song metadata to the Songs and Artists tables.

use std::path::PathBuf;

use anyhow::Context;
use sparkify_core::{
    LoadStats, ProgressContext, Storage, StorageError, TableSummary, dedup_exact, fmt_num,
    load_records, table,
};

use super::write_table;
use crate::config::EtlConfig;
use crate::schema;
use crate::transform::song::songs_from_batches;
use crate::transform::{ArtistRow, ArtistsAccumulator, SongRecord, SongRow, SongsAccumulator};

/// Song files, relative to the input root.
pub const SONG_DATA_GLOB: &str = "song_data/*/*/*/*.json";

/// A completely written Songs table. The activity stage needs one to join
/// against, so holding it means the catalog stage has run.
#[derive(Debug, Clone)]
pub struct SongsTable {
    dir: PathBuf,
}

impl SongsTable {
    /// Use a Songs table left by an earlier run. Fails unless the table
    /// directory and its `_SUCCESS` marker exist.
    pub fn open(storage: &Storage) -> Result<Self, StorageError> {
        if !storage.has_table(schema::SONGS_TABLE) {
            return Err(StorageError::MissingTable {
                path: storage.table_dir(schema::SONGS_TABLE),
            });
        }
        Ok(Self {
            dir: storage.table_dir(schema::SONGS_TABLE),
        })
    }

    /// Read the table back from disk, partition columns restored, exact
    /// duplicates removed.
    pub fn read(&self) -> anyhow::Result<Vec<SongRow>> {
        let parts = table::read_table(&self.dir)
            .with_context(|| format!("Failed to read {}", self.dir.display()))?;
        let rows = songs_from_batches(&parts).context("Songs table has an unexpected layout")?;
        let (rows, duplicates) = dedup_exact(rows)?;
        if duplicates > 0 {
            log::debug!("Dropped {duplicates} duplicate songs on read-back");
        }
        Ok(rows)
    }
}

/// What the catalog stage produced.
#[derive(Debug)]
pub struct CatalogOutput {
    pub load: LoadStats,
    pub duplicates: usize,
    pub songs: TableSummary,
    pub artists: TableSummary,
    pub songs_table: SongsTable,
}

/// Load, deduplicate, and write the Songs and Artists tables.
pub fn run_song_catalog(
    config: &EtlConfig,
    storage: &Storage,
    progress: &ProgressContext,
) -> anyhow::Result<CatalogOutput> {
    let line = progress.stage_line("song-catalog");

    let files = storage
        .glob_input(SONG_DATA_GLOB)
        .context("Failed to list song files")?;
    if files.is_empty() {
        log::warn!(
            "No song files match {}",
            storage.input_root().join(SONG_DATA_GLOB).display()
        );
    }
    log::info!("Loading {} song files", fmt_num(files.len()));

    line.set_message("loading");
    let pb = progress.file_bar("song files", files.len() as u64);
    let (records, load) = load_records::<SongRecord>(&files, config.parse_mode, &pb)?;
    pb.finish_and_clear();

    let (records, duplicates) = dedup_exact(records)?;
    log::info!(
        "Songs: {} records, {} duplicates removed, {} malformed dropped",
        fmt_num(load.records),
        fmt_num(duplicates),
        fmt_num(load.malformed)
    );

    line.set_message("writing songs");
    let songs = write_table(
        storage,
        schema::SONGS_TABLE,
        schema::SONGS.clone(),
        schema::SONGS_PARTITION,
        config.zstd_level,
        SongsAccumulator::new(),
        records.iter().map(SongRow::from),
    )?;

    line.set_message("writing artists");
    let artists = write_table(
        storage,
        schema::ARTISTS_TABLE,
        schema::ARTISTS.clone(),
        &[],
        config.zstd_level,
        ArtistsAccumulator::new(),
        records.iter().map(ArtistRow::from),
    )?;

    line.finish_with_message(format!("{} songs", fmt_num(songs.rows)));

    Ok(CatalogOutput {
        load,
        duplicates,
        songs,
        artists,
        songs_table: SongsTable::open(storage)?,
    })
}
