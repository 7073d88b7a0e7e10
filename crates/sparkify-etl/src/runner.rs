//! Stage orchestration

use std::time::{Duration, Instant};

use anyhow::Context;
use sparkify_core::{LoadStats, ProgressContext, Storage, TableSummary, fmt_num};

use crate::config::EtlConfig;
use crate::pipeline::{ActivityOutput, CatalogOutput, SongsTable, run_activity, run_song_catalog};
use crate::schema;
use crate::stage::{self, StageName};

/// Run `stages` (all when empty) with hidden progress bars.
pub fn run(config: &EtlConfig, storage: &Storage, stages: &[StageName]) -> anyhow::Result<Summary> {
    run_with_progress(config, storage, stages, &ProgressContext::hidden())
}

/// Run `stages` in dependency order on a pool of `config.workers` threads.
pub fn run_with_progress(
    config: &EtlConfig,
    storage: &Storage,
    stages: &[StageName],
    progress: &ProgressContext,
) -> anyhow::Result<Summary> {
    let start = Instant::now();
    let plan = stage::plan(stages);
    for (stage, upstream) in &plan.external_inputs {
        log::info!("{stage} reads the existing {upstream} output");
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .thread_name(|i| format!("sparkify-{i}"))
        .build()
        .context("Failed to build worker pool")?;
    log::info!(
        "Running {} with {} workers ({} zone, {} parsing)",
        plan.stages
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.workers.max(1),
        config.timezone,
        config.parse_mode
    );

    let mut summary = pool.install(|| -> anyhow::Result<Summary> {
        let mut summary = Summary::default();
        let mut songs_table: Option<SongsTable> = None;

        for stage in &plan.stages {
            match stage {
                StageName::SongCatalog => {
                    let out = run_song_catalog(config, storage, progress)
                        .context("song-catalog stage failed")?;
                    songs_table = Some(out.songs_table.clone());
                    summary.catalog = Some(out);
                }
                StageName::Activity => {
                    let songs = match songs_table.take() {
                        Some(table) => table,
                        None => SongsTable::open(storage).context(
                            "activity stage needs a songs table; run song-catalog first",
                        )?,
                    };
                    let out = run_activity(config, storage, &songs, progress)
                        .context("activity stage failed")?;
                    summary.activity = Some(out);
                }
            }
        }
        Ok(summary)
    })?;

    summary.elapsed = start.elapsed();
    summary.log();
    Ok(summary)
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct Summary {
    pub catalog: Option<CatalogOutput>,
    pub activity: Option<ActivityOutput>,
    pub elapsed: Duration,
}

impl Summary {
    /// Written tables with their row and file counts, in write order.
    pub fn tables(&self) -> Vec<(&'static str, TableSummary)> {
        let mut out = Vec::new();
        if let Some(c) = &self.catalog {
            out.push((schema::SONGS_TABLE, c.songs));
            out.push((schema::ARTISTS_TABLE, c.artists));
        }
        if let Some(a) = &self.activity {
            out.push((schema::USERS_TABLE, a.users));
            out.push((schema::TIME_TABLE, a.time));
            out.push((schema::SONGPLAYS_TABLE, a.songplays));
        }
        out
    }

    pub fn total_rows(&self) -> usize {
        self.tables().iter().map(|(_, t)| t.rows).sum()
    }

    pub fn log(&self) {
        log::info!("=== Pipeline Summary ===");
        if let Some(c) = &self.catalog {
            log_load("song-catalog", &c.load, c.duplicates);
        }
        if let Some(a) = &self.activity {
            log_load("activity", &a.load, a.duplicates);
            log::info!("activity: {} non-NextSong events filtered", fmt_num(a.filtered));
            log::info!(
                "join: {}/{} events matched, {} rows",
                fmt_num(a.join.matched_events),
                fmt_num(a.join.events),
                fmt_num(a.join.rows)
            );
        }
        for (name, table) in self.tables() {
            log::info!("{name}: {} rows, {} files", fmt_num(table.rows), table.files);
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

fn log_load(stage: &str, load: &LoadStats, duplicates: usize) {
    log::info!(
        "{stage}: {} files, {} records, {} duplicates, {} malformed",
        fmt_num(load.files),
        fmt_num(load.records),
        fmt_num(duplicates),
        fmt_num(load.malformed)
    );
}
