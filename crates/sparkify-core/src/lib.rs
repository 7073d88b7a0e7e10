//! Sparkify Core - shared infrastructure for the data lake ETL
//!
//! Storage access, typed JSON loading, exact deduplication, and
//! Hive-partitioned Parquet tables, plus logging and progress plumbing.

pub mod accumulator;
pub mod dedup;
pub mod error;
pub mod loader;
pub mod logging;
pub mod partition;
pub mod preview;
pub mod progress;
pub mod sink;
pub mod storage;
pub mod table;

// Re-exports for convenience
pub use accumulator::{Accumulator, RECORD_BATCH_SIZE, write_rows};
pub use dedup::dedup_exact;
pub use error::{LoadError, StorageError};
pub use loader::{LoadStats, ParseMode, load_records};
pub use logging::init_logging;
pub use preview::log_preview;
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use sink::ParquetSink;
pub use storage::{Credentials, Storage, StorageConfig};
pub use table::{PartitionedBatch, SUCCESS_MARKER, TableSummary, TableWriter};
