//! Songplays: song-play events joined to songs on artist name.

use std::sync::Arc;

use arrow::array::*;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use rustc_hash::FxHashMap;
use sparkify_core::{Accumulator, RECORD_BATCH_SIZE};

use super::activity::ActivityRecord;
use super::song::SongRow;
use super::time::TimeParts;
use crate::schema;

/// A `NextSong` event with its derived time fields.
#[derive(Debug, Clone)]
pub struct SongPlayEvent<'a> {
    pub record: &'a ActivityRecord,
    pub time: Option<TimeParts>,
}

/// Row of the Songplays table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SongplayRow {
    pub start_time: Option<i64>,
    pub user_id: Option<String>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    pub year: Option<i32>,
    pub month: Option<i32>,
}

/// Join counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub events: usize,
    pub matched_events: usize,
    pub unmatched_events: usize,
    /// Rows emitted; exceeds `matched_events` when an artist has several songs.
    pub rows: usize,
    /// Distinct non-null artist names on the songs side.
    pub artist_keys: usize,
}

/// Inner join of events and songs on `artist == artist_name`.
///
/// Names compare byte for byte. A null on either side never matches. Output
/// follows event order, then song order within one artist.
pub fn join_songplays(events: &[SongPlayEvent<'_>], songs: &[SongRow]) -> (Vec<SongplayRow>, JoinStats) {
    let mut by_artist: FxHashMap<&str, Vec<&SongRow>> = FxHashMap::default();
    for song in songs {
        if let Some(name) = song.artist_name.as_deref() {
            by_artist.entry(name).or_default().push(song);
        }
    }

    let mut stats = JoinStats {
        events: events.len(),
        artist_keys: by_artist.len(),
        ..JoinStats::default()
    };
    let mut rows = Vec::new();
    for event in events {
        let matches = event
            .record
            .artist
            .as_deref()
            .and_then(|artist| by_artist.get(artist));
        let Some(matches) = matches else {
            stats.unmatched_events += 1;
            continue;
        };
        stats.matched_events += 1;
        for song in matches {
            rows.push(SongplayRow {
                start_time: event.time.map(|t| t.start_time_ms),
                user_id: event.record.user_id.clone(),
                level: event.record.level.clone(),
                song_id: song.song_id.clone(),
                artist_id: song.artist_id.clone(),
                session_id: event.record.session_id,
                location: event.record.location.clone(),
                user_agent: event.record.user_agent.clone(),
                year: event.time.map(|t| t.year),
                month: event.time.map(|t| t.month),
            });
        }
    }
    stats.rows = rows.len();
    (rows, stats)
}

pub struct SongplaysAccumulator {
    schema: SchemaRef,
    start_time: Vec<Option<i64>>,
    user_id: Vec<Option<String>>,
    level: Vec<Option<String>>,
    song_id: Vec<Option<String>>,
    artist_id: Vec<Option<String>>,
    session_id: Vec<Option<i64>>,
    location: Vec<Option<String>>,
    user_agent: Vec<Option<String>>,
    year: Vec<Option<i32>>,
    month: Vec<Option<i32>>,
}

impl SongplaysAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::SONGPLAYS.clone(),
            start_time: Vec::with_capacity(RECORD_BATCH_SIZE),
            user_id: Vec::with_capacity(RECORD_BATCH_SIZE),
            level: Vec::with_capacity(RECORD_BATCH_SIZE),
            song_id: Vec::with_capacity(RECORD_BATCH_SIZE),
            artist_id: Vec::with_capacity(RECORD_BATCH_SIZE),
            session_id: Vec::with_capacity(RECORD_BATCH_SIZE),
            location: Vec::with_capacity(RECORD_BATCH_SIZE),
            user_agent: Vec::with_capacity(RECORD_BATCH_SIZE),
            year: Vec::with_capacity(RECORD_BATCH_SIZE),
            month: Vec::with_capacity(RECORD_BATCH_SIZE),
        }
    }
}

impl Default for SongplaysAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for SongplaysAccumulator {
    type Row = SongplayRow;

    fn push(&mut self, row: SongplayRow) {
        self.start_time.push(row.start_time);
        self.user_id.push(row.user_id);
        self.level.push(row.level);
        self.song_id.push(row.song_id);
        self.artist_id.push(row.artist_id);
        self.session_id.push(row.session_id);
        self.location.push(row.location);
        self.user_agent.push(row.user_agent);
        self.year.push(row.year);
        self.month.push(row.month);
    }

    fn len(&self) -> usize {
        self.start_time.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let start_time =
            TimestampMillisecondArray::from(std::mem::take(&mut self.start_time)).with_timezone("UTC");
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(start_time),
            Arc::new(StringArray::from(std::mem::take(&mut self.user_id))),
            Arc::new(StringArray::from(std::mem::take(&mut self.level))),
            Arc::new(StringArray::from(std::mem::take(&mut self.song_id))),
            Arc::new(StringArray::from(std::mem::take(&mut self.artist_id))),
            Arc::new(Int64Array::from(std::mem::take(&mut self.session_id))),
            Arc::new(StringArray::from(std::mem::take(&mut self.location))),
            Arc::new(StringArray::from(std::mem::take(&mut self.user_agent))),
            Arc::new(Int32Array::from(std::mem::take(&mut self.year))),
            Arc::new(Int32Array::from(std::mem::take(&mut self.month))),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::time::time_parts_in;
    use chrono::Utc;

    fn song(id: &str, artist: &str) -> SongRow {
        SongRow {
            song_id: Some(id.into()),
            artist_name: Some(artist.into()),
            artist_id: Some(format!("AR-{artist}")),
            ..Default::default()
        }
    }

    fn event(artist: Option<&str>) -> ActivityRecord {
        ActivityRecord {
            artist: artist.map(str::to_string),
            page: Some("NextSong".into()),
            user_id: Some("7".into()),
            level: Some("paid".into()),
            session_id: Some(42),
            ts: Some(1541207953796),
            ..Default::default()
        }
    }

    fn plays(records: &[ActivityRecord]) -> Vec<SongPlayEvent<'_>> {
        records
            .iter()
            .map(|record| SongPlayEvent {
                record,
                time: record.ts.and_then(|ts| time_parts_in(ts, &Utc)),
            })
            .collect()
    }

    #[test]
    fn join_is_case_sensitive() {
        let songs = vec![song("S1", "The Beatles")];
        let records = vec![event(Some("The Beatles")), event(Some("the beatles"))];
        let (rows, stats) = join_songplays(&plays(&records), &songs);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].song_id.as_deref(), Some("S1"));
        assert_eq!(rows[0].artist_id.as_deref(), Some("AR-The Beatles"));
        assert_eq!(stats.matched_events, 1);
        assert_eq!(stats.unmatched_events, 1);
    }

    #[test]
    fn join_fans_out_per_song() {
        let songs = vec![song("S1", "Muse"), song("S2", "Muse"), song("S3", "Blur")];
        let records = vec![event(Some("Muse"))];
        let (rows, stats) = join_songplays(&plays(&records), &songs);

        let ids: Vec<_> = rows.iter().map(|r| r.song_id.as_deref().unwrap()).collect();
        assert_eq!(ids, ["S1", "S2"]);
        assert_eq!(
            stats,
            JoinStats {
                events: 1,
                matched_events: 1,
                unmatched_events: 0,
                rows: 2,
                artist_keys: 2,
            }
        );
    }

    #[test]
    fn null_artist_never_matches() {
        let mut nameless = song("S1", "x");
        nameless.artist_name = None;
        let records = vec![event(None)];
        let (rows, stats) = join_songplays(&plays(&records), &[nameless]);
        assert!(rows.is_empty());
        assert_eq!(stats.unmatched_events, 1);
        assert_eq!(stats.artist_keys, 0);
    }

    #[test]
    fn event_fields_carried_over() {
        let songs = vec![song("S1", "Muse")];
        let records = vec![event(Some("Muse"))];
        let (rows, _) = join_songplays(&plays(&records), &songs);
        let row = &rows[0];
        assert_eq!(row.start_time, Some(1541207953796));
        assert_eq!(row.user_id.as_deref(), Some("7"));
        assert_eq!(row.session_id, Some(42));
        assert_eq!((row.year, row.month), (Some(2018), Some(11)));
    }

    #[test]
    fn missing_ts_gives_null_time_columns() {
        let songs = vec![song("S1", "Muse")];
        let mut rec = event(Some("Muse"));
        rec.ts = None;
        let records = vec![rec];
        let (rows, _) = join_songplays(&plays(&records), &songs);
        assert!(rows[0].start_time.is_none());
        assert!(rows[0].year.is_none());
    }

    #[test]
    fn accumulator_matches_schema() {
        let mut acc = SongplaysAccumulator::new();
        acc.push(SongplayRow {
            start_time: Some(1),
            session_id: Some(3),
            ..Default::default()
        });
        let batch = acc.take_batch().unwrap();
        assert_eq!(batch.num_columns(), 10);
        assert_eq!(batch.schema(), *schema::SONGPLAYS);
    }
}
