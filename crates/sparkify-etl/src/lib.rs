//! Sparkify ETL - song and activity JSON into a star schema of Parquet tables
//!
//! Two stages run in order:
//!
//! - `song-catalog`: song metadata into `songs_table` (partitioned by year
//!   and artist_id) and `artists_table`.
//! - `activity`: `NextSong` log events into `users_table`, `time_table` and
//!   `songplays_table`, the last joined against the written songs table on
//!   artist name.
//!
//! # Example
//!
//! ```no_run
//! use sparkify_core::{Storage, StorageConfig};
//! use sparkify_etl::{EtlConfig, run};
//!
//! let storage = Storage::new(&StorageConfig {
//!     input_root: "data/input".into(),
//!     output_root: "data/output".into(),
//!     credentials: None,
//! })?;
//! let summary = run(&EtlConfig::default(), &storage, &[])?;
//! println!("Wrote {} rows", summary.total_rows());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod pipeline;
pub mod runner;
pub mod schema;
pub mod stage;
pub mod transform;

// Re-exports for convenience
pub use config::{EtlConfig, TimeZoneMode};
pub use pipeline::SongsTable;
pub use runner::{Summary, run, run_with_progress};
pub use stage::{Plan, StageName, plan};
pub use transform::JoinStats;
