//! Activity stage: log events to the Users, Time and Songplays tables.

use anyhow::Context;
use sparkify_core::{
    LoadStats, ProgressContext, Storage, TableSummary, dedup_exact, fmt_num, load_records,
};

use super::catalog::SongsTable;
use super::write_table;
use crate::config::EtlConfig;
use crate::schema;
use crate::transform::{
    ActivityRecord, JoinStats, SongPlayEvent, SongplaysAccumulator, TimeAccumulator, UserRow,
    UsersAccumulator, join_songplays,
};

/// Log files, relative to the input root.
pub const LOG_DATA_GLOB: &str = "log_data/*/*/*.json";

/// What the activity stage produced.
#[derive(Debug)]
pub struct ActivityOutput {
    pub load: LoadStats,
    pub duplicates: usize,
    /// Events dropped because their page is not `NextSong`.
    pub filtered: usize,
    pub users: TableSummary,
    pub time: TableSummary,
    pub songplays: TableSummary,
    pub join: JoinStats,
}

pub fn run_activity(
    config: &EtlConfig,
    storage: &Storage,
    songs: &SongsTable,
    progress: &ProgressContext,
) -> anyhow::Result<ActivityOutput> {
    let line = progress.stage_line("activity");

    let files = storage
        .glob_input(LOG_DATA_GLOB)
        .context("Failed to list log files")?;
    if files.is_empty() {
        log::warn!(
            "No log files match {}",
            storage.input_root().join(LOG_DATA_GLOB).display()
        );
    }
    log::info!("Loading {} log files", fmt_num(files.len()));

    line.set_message("loading");
    let pb = progress.file_bar("log files", files.len() as u64);
    let (records, load) = load_records::<ActivityRecord>(&files, config.parse_mode, &pb)?;
    pb.finish_and_clear();

    let (records, duplicates) = dedup_exact(records)?;
    let total = records.len();
    let plays: Vec<&ActivityRecord> = records.iter().filter(|r| r.is_song_play()).collect();
    let filtered = total - plays.len();
    log::info!(
        "Events: {} records, {} duplicates removed, {} non-NextSong filtered, {} malformed dropped",
        fmt_num(load.records),
        fmt_num(duplicates),
        fmt_num(filtered),
        fmt_num(load.malformed)
    );

    line.set_message("writing users");
    let users = write_table(
        storage,
        schema::USERS_TABLE,
        schema::USERS.clone(),
        &[],
        config.zstd_level,
        UsersAccumulator::new(),
        plays.iter().map(|r| UserRow::from(*r)),
    )?;

    let events: Vec<SongPlayEvent<'_>> = plays
        .iter()
        .map(|&record| SongPlayEvent {
            record,
            time: record.ts.and_then(|ts| config.timezone.time_parts(ts)),
        })
        .collect();
    let unusable_ts = events.iter().filter(|e| e.time.is_none()).count();
    if unusable_ts > 0 {
        log::warn!("{unusable_ts} events have no usable ts; their time fields are null");
    }
    if let Some(first) = plays.first().and_then(|r| r.ts) {
        log::debug!(
            "First event at {} ({})",
            config.timezone.render(first).unwrap_or_else(|| first.to_string()),
            config.timezone
        );
    }

    line.set_message("writing time");
    let time = write_table(
        storage,
        schema::TIME_TABLE,
        schema::TIME.clone(),
        schema::TIME_PARTITION,
        config.zstd_level,
        TimeAccumulator::new(),
        events.iter().map(|e| e.time),
    )?;

    line.set_message("joining songs");
    let song_rows = songs.read().context("Failed to load songs for the join")?;
    let (rows, join) = join_songplays(&events, &song_rows);
    log::info!(
        "Join: {} of {} events matched ({} unmatched), {} rows over {} artist keys",
        fmt_num(join.matched_events),
        fmt_num(join.events),
        fmt_num(join.unmatched_events),
        fmt_num(join.rows),
        fmt_num(join.artist_keys)
    );

    line.set_message("writing songplays");
    let songplays = write_table(
        storage,
        schema::SONGPLAYS_TABLE,
        schema::SONGPLAYS.clone(),
        schema::SONGPLAYS_PARTITION,
        config.zstd_level,
        SongplaysAccumulator::new(),
        rows,
    )?;

    line.finish_with_message(format!("{} songplays", fmt_num(songplays.rows)));

    Ok(ActivityOutput {
        load,
        duplicates,
        filtered,
        users,
        time,
        songplays,
        join,
    })
}
