//! `sparkify run` - execute the ETL stages

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use sparkify_core::{ParseMode, SharedProgress, Storage, StorageConfig, fmt_num};
use sparkify_etl::{EtlConfig, StageName, Summary, TimeZoneMode};

use crate::config::Config;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Input root holding song_data/ and log_data/
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output root for the five tables
    #[arg(short, long)]
    pub output: Option<String>,

    /// Stage to run (repeatable; default: all)
    #[arg(long = "stage", value_name = "song-catalog|activity")]
    pub stages: Vec<StageName>,

    /// Zone for derived time fields: utc, local, or an offset like +09:00
    #[arg(long, allow_hyphen_values = true)]
    pub timezone: Option<TimeZoneMode>,

    /// What to do with records that do not match their schema
    #[arg(long, value_name = "fail_fast|drop_malformed")]
    pub parse_mode: Option<ParseMode>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Merge CLI flags over the config file.
fn settings(args: &RunArgs, config: &Config) -> (StorageConfig, EtlConfig) {
    let storage = StorageConfig {
        input_root: args.input.clone().unwrap_or_else(|| config.input.root.clone()),
        output_root: args.output.clone().unwrap_or_else(|| config.output.root.clone()),
        credentials: config.credentials(),
    };
    let etl = EtlConfig {
        zstd_level: config.output.compression_level,
        timezone: args.timezone.unwrap_or(config.transform.timezone),
        parse_mode: args.parse_mode.unwrap_or(config.transform.parse_mode),
        workers: args.workers.unwrap_or(config.transform.workers).max(1),
    };
    (storage, etl)
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let (storage_config, etl) = settings(&args, config);
    let storage = Storage::new(&storage_config).context("Failed to open storage")?;

    log::info!(
        "Input {} -> output {}",
        storage.input_root().display(),
        storage.output_root().display()
    );

    let summary = sparkify_etl::run_with_progress(&etl, &storage, &args.stages, progress)?;
    eprintln!("\n{}", summary_table(&summary));
    Ok(())
}

fn summary_table(summary: &Summary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Table").fg(Color::Cyan),
            Cell::new("Rows").fg(Color::Cyan),
            Cell::new("Files").fg(Color::Cyan),
        ]);

    for (name, t) in summary.tables() {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(fmt_num(t.rows)).set_alignment(CellAlignment::Right),
            Cell::new(t.files).set_alignment(CellAlignment::Right),
        ]);
    }

    if let Some(a) = &summary.activity {
        table.add_row(vec![
            Cell::new("join matched").fg(Color::DarkGrey),
            Cell::new(format!(
                "{}/{}",
                fmt_num(a.join.matched_events),
                fmt_num(a.join.events)
            ))
            .set_alignment(CellAlignment::Right),
            Cell::new(""),
        ]);
    }
    table.add_row(vec![
        Cell::new("elapsed").fg(Color::DarkGrey),
        Cell::new(format!("{:.1}s", summary.elapsed.as_secs_f64())).set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        Wrapper::try_parse_from(std::iter::once("sparkify").chain(args.iter().copied()))
            .unwrap()
            .run
    }

    #[test]
    fn defaults_come_from_config() {
        let config = Config::default();
        let (storage, etl) = settings(&RunArgs::default(), &config);
        assert_eq!(storage.input_root, "./data/input");
        assert_eq!(storage.output_root, "./data/output");
        assert_eq!(etl.zstd_level, 3);
        assert_eq!(etl.timezone, TimeZoneMode::Utc);
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&[
            "--input", "/in", "--output", "/out", "--timezone", "-05:00", "--workers", "2",
            "--parse-mode", "drop_malformed",
        ]);
        let (storage, etl) = settings(&args, &Config::default());
        assert_eq!(storage.input_root, "/in");
        assert_eq!(storage.output_root, "/out");
        assert_eq!(etl.timezone, "-05:00".parse::<TimeZoneMode>().unwrap());
        assert_eq!(etl.workers, 2);
        assert_eq!(etl.parse_mode, ParseMode::DropMalformed);
    }

    #[test]
    fn repeated_stage_flags() {
        let args = parse(&["--stage", "activity", "--stage", "song-catalog"]);
        assert_eq!(args.stages, [StageName::Activity, StageName::SongCatalog]);
        assert!(Wrapper::try_parse_from(["sparkify", "--stage", "songs"]).is_err());
    }

    #[test]
    fn summary_table_lists_tables() {
        let rendered = summary_table(&Summary::default()).to_string();
        assert!(rendered.contains("elapsed"));
        assert!(!rendered.contains("join matched"));
    }

    #[test]
    fn run_against_empty_input() {
        let tmp = tempfile::TempDir::new().unwrap();
        let args = RunArgs {
            input: Some(tmp.path().join("in").to_string_lossy().into_owned()),
            output: Some(tmp.path().join("out").to_string_lossy().into_owned()),
            workers: Some(1),
            ..RunArgs::default()
        };
        let progress = std::sync::Arc::new(sparkify_core::ProgressContext::hidden());
        run(args, &Config::default(), &progress).unwrap();
        assert!(tmp.path().join("out/songplays_table/_SUCCESS").exists());
    }
}
