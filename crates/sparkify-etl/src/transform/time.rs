//! Calendar fields derived from event timestamps, and the Time table.

use std::sync::Arc;

use arrow::array::*;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use chrono::{Datelike, TimeZone, Timelike, Weekday};
use sparkify_core::{Accumulator, RECORD_BATCH_SIZE};

use crate::schema;

/// Fields derived from one epoch-millisecond timestamp in a given zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    pub start_time_ms: i64,
    pub hour: i32,
    pub day: i32,
    /// ISO-8601 week number.
    pub week: i32,
    pub month: i32,
    /// Calendar year, not the ISO week-year.
    pub year: i32,
    pub weekday: &'static str,
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// `None` when `ts_ms` is outside chrono's representable range.
pub fn time_parts_in<Tz: TimeZone>(ts_ms: i64, tz: &Tz) -> Option<TimeParts> {
    let local = tz.timestamp_millis_opt(ts_ms).single()?;
    Some(TimeParts {
        start_time_ms: ts_ms,
        hour: local.hour() as i32,
        day: local.day() as i32,
        week: local.iso_week().week() as i32,
        month: local.month() as i32,
        year: local.year(),
        weekday: weekday_name(local.weekday()),
    })
}

/// Time table builder. A `None` row is an event without a usable `ts`:
/// every column is null for it.
pub struct TimeAccumulator {
    schema: SchemaRef,
    start_time: Vec<Option<i64>>,
    hour: Vec<Option<i32>>,
    day: Vec<Option<i32>>,
    week: Vec<Option<i32>>,
    month: Vec<Option<i32>>,
    year: Vec<Option<i32>>,
    weekday: Vec<Option<&'static str>>,
}

impl TimeAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::TIME.clone(),
            start_time: Vec::with_capacity(RECORD_BATCH_SIZE),
            hour: Vec::with_capacity(RECORD_BATCH_SIZE),
            day: Vec::with_capacity(RECORD_BATCH_SIZE),
            week: Vec::with_capacity(RECORD_BATCH_SIZE),
            month: Vec::with_capacity(RECORD_BATCH_SIZE),
            year: Vec::with_capacity(RECORD_BATCH_SIZE),
            weekday: Vec::with_capacity(RECORD_BATCH_SIZE),
        }
    }
}

impl Default for TimeAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for TimeAccumulator {
    type Row = Option<TimeParts>;

    fn push(&mut self, row: Option<TimeParts>) {
        self.start_time.push(row.map(|t| t.start_time_ms));
        self.hour.push(row.map(|t| t.hour));
        self.day.push(row.map(|t| t.day));
        self.week.push(row.map(|t| t.week));
        self.month.push(row.map(|t| t.month));
        self.year.push(row.map(|t| t.year));
        self.weekday.push(row.map(|t| t.weekday));
    }

    fn len(&self) -> usize {
        self.start_time.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let start_time =
            TimestampMillisecondArray::from(std::mem::take(&mut self.start_time)).with_timezone("UTC");
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(start_time),
            Arc::new(Int32Array::from(std::mem::take(&mut self.hour))),
            Arc::new(Int32Array::from(std::mem::take(&mut self.day))),
            Arc::new(Int32Array::from(std::mem::take(&mut self.week))),
            Arc::new(Int32Array::from(std::mem::take(&mut self.month))),
            Arc::new(Int32Array::from(std::mem::take(&mut self.year))),
            Arc::new(StringArray::from(std::mem::take(&mut self.weekday))),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    const TS: i64 = 1541207953796;

    #[test]
    fn utc_fields() {
        let parts = time_parts_in(TS, &Utc).unwrap();
        assert_eq!(parts.start_time_ms, TS);
        assert_eq!(parts.hour, 1);
        assert_eq!(parts.day, 3);
        assert_eq!(parts.week, 44);
        assert_eq!(parts.month, 11);
        assert_eq!(parts.year, 2018);
        assert_eq!(parts.weekday, "Saturday");
    }

    #[test]
    fn fixed_offset_shifts_hour() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let parts = time_parts_in(TS, &tokyo).unwrap();
        assert_eq!(parts.hour, 10);
        assert_eq!(parts.day, 3);
        assert_eq!(parts.weekday, "Saturday");
    }

    #[test]
    fn west_offset_crosses_midnight() {
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let parts = time_parts_in(TS, &new_york).unwrap();
        assert_eq!(parts.hour, 20);
        assert_eq!(parts.day, 2);
        assert_eq!(parts.weekday, "Friday");
    }

    #[test]
    fn iso_week_vs_calendar_year() {
        // 2018-12-31 12:00 UTC is a Monday in ISO week 1 of 2019
        let parts = time_parts_in(1546257600000, &Utc).unwrap();
        assert_eq!(parts.week, 1);
        assert_eq!(parts.year, 2018);
        assert_eq!(parts.month, 12);
        assert_eq!(parts.weekday, "Monday");
    }

    #[test]
    fn out_of_range_timestamp() {
        assert!(time_parts_in(i64::MAX, &Utc).is_none());
    }

    #[test]
    fn accumulator_nulls_for_missing_ts() {
        let mut acc = TimeAccumulator::new();
        acc.push(time_parts_in(TS, &Utc));
        acc.push(None);
        let batch = acc.take_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        for col in batch.columns() {
            assert!(!col.is_null(0));
            assert!(col.is_null(1));
        }
        let weekday = batch
            .column_by_name("weekday")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(weekday.value(0), "Saturday");
    }
}
