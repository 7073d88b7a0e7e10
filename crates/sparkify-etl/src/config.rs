//! ETL runtime configuration

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Deserializer};
use sparkify_core::ParseMode;

use crate::transform::time::{TimeParts, time_parts_in};

/// Zone used to turn event timestamps into calendar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneMode {
    #[default]
    Utc,
    /// Zone of the running process. Results differ between hosts.
    Local,
    Fixed(FixedOffset),
}

impl TimeZoneMode {
    /// Calendar fields of `ts_ms` (epoch milliseconds) in this zone.
    pub fn time_parts(&self, ts_ms: i64) -> Option<TimeParts> {
        match self {
            Self::Utc => time_parts_in(ts_ms, &Utc),
            Self::Local => time_parts_in(ts_ms, &Local),
            Self::Fixed(offset) => time_parts_in(ts_ms, offset),
        }
    }

    /// Wall-clock rendering of `ts_ms`, for log lines.
    pub fn render(&self, ts_ms: i64) -> Option<String> {
        let utc = DateTime::<Utc>::from_timestamp_millis(ts_ms)?;
        Some(match self {
            Self::Utc => utc.to_rfc3339(),
            Self::Local => utc.with_timezone(&Local).to_rfc3339(),
            Self::Fixed(offset) => utc.with_timezone(offset).to_rfc3339(),
        })
    }
}

impl FromStr for TimeZoneMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "utc" | "UTC" | "Z" => Ok(Self::Utc),
            "local" | "LOCAL" => Ok(Self::Local),
            other => other.parse::<FixedOffset>().map(Self::Fixed).map_err(|_| {
                format!("invalid timezone '{other}' (expected utc, local, or an offset like +09:00)")
            }),
        }
    }
}

impl fmt::Display for TimeZoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("utc"),
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl<'de> Deserialize<'de> for TimeZoneMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Runtime configuration for both stages
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// Zstd compression level for parquet output
    pub zstd_level: i32,
    pub timezone: TimeZoneMode,
    pub parse_mode: ParseMode,
    /// Threads used to parse input files
    pub workers: usize,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            zstd_level: 3,
            timezone: TimeZoneMode::Utc,
            parse_mode: ParseMode::FailFast,
            workers: std::thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(4),
        }
    }
}
