//! sparkify - song play data lake ETL
//!
//! Turns song metadata and user activity logs into five Parquet tables:
//! songs, artists, users, time and songplays.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "sparkify")]
#[command(about = "Song play data lake ETL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Enable debug logging (schema and row previews per table)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./sparkify.toml or ~/.config/sparkify/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ETL stages (the default when no command is given)
    Run(cmd::run::RunArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(sparkify_core::ProgressContext::new());
    let multi = progress.is_tty().then(|| progress.multi());
    sparkify_core::init_logging(cli.debug, multi)?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command.unwrap_or_else(|| Command::Run(Default::default())) {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Input root", &config.input.root]);
            table.add_row(vec!["Output root", &config.output.root]);
            table.add_row(vec![
                "Compression level",
                &config.output.compression_level.to_string(),
            ]);
            table.add_row(vec![
                "Credentials",
                if config.credentials().is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec!["Time zone", &config.transform.timezone.to_string()]);
            table.add_row(vec!["Parse mode", &config.transform.parse_mode.to_string()]);
            table.add_row(vec!["Workers", &config.transform.workers.to_string()]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
