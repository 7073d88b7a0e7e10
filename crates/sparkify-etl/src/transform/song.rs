//! Song metadata: input record, Songs/Artists accumulators, and the Songs
//! table read back from storage.

use std::sync::Arc;

use arrow::array::*;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use serde::{Deserialize, Serialize};
use sparkify_core::{Accumulator, PartitionedBatch, RECORD_BATCH_SIZE};

use crate::schema;

// === Input record (declared song schema) ===

/// One song metadata object. Field types are enforced on parse: a value
/// that cannot be read as the declared type makes the record malformed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SongRecord {
    pub artist_id: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_location: Option<String>,
    pub artist_longitude: Option<f64>,
    pub artist_name: Option<String>,
    pub duration: Option<f64>,
    pub num_songs: Option<f64>,
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
}

// === Songs table ===

/// Row of the Songs table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SongRow {
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub artist_name: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i32>,
    pub duration: Option<f64>,
}

impl From<&SongRecord> for SongRow {
    fn from(r: &SongRecord) -> Self {
        Self {
            song_id: r.song_id.clone(),
            title: r.title.clone(),
            artist_name: r.artist_name.clone(),
            artist_id: r.artist_id.clone(),
            year: r.year,
            duration: r.duration,
        }
    }
}

pub struct SongsAccumulator {
    schema: SchemaRef,
    song_id: Vec<Option<String>>,
    title: Vec<Option<String>>,
    artist_name: Vec<Option<String>>,
    artist_id: Vec<Option<String>>,
    year: Vec<Option<i32>>,
    duration: Vec<Option<f64>>,
}

impl SongsAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::SONGS.clone(),
            song_id: Vec::with_capacity(RECORD_BATCH_SIZE),
            title: Vec::with_capacity(RECORD_BATCH_SIZE),
            artist_name: Vec::with_capacity(RECORD_BATCH_SIZE),
            artist_id: Vec::with_capacity(RECORD_BATCH_SIZE),
            year: Vec::with_capacity(RECORD_BATCH_SIZE),
            duration: Vec::with_capacity(RECORD_BATCH_SIZE),
        }
    }
}

impl Default for SongsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for SongsAccumulator {
    type Row = SongRow;

    fn push(&mut self, row: SongRow) {
        self.song_id.push(row.song_id);
        self.title.push(row.title);
        self.artist_name.push(row.artist_name);
        self.artist_id.push(row.artist_id);
        self.year.push(row.year);
        self.duration.push(row.duration);
    }

    fn len(&self) -> usize {
        self.song_id.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(std::mem::take(&mut self.song_id))),
            Arc::new(StringArray::from(std::mem::take(&mut self.title))),
            Arc::new(StringArray::from(std::mem::take(&mut self.artist_name))),
            Arc::new(StringArray::from(std::mem::take(&mut self.artist_id))),
            Arc::new(Int32Array::from(std::mem::take(&mut self.year))),
            Arc::new(Float64Array::from(std::mem::take(&mut self.duration))),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

// === Artists table ===

/// Row of the Artists table (renamed song columns).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArtistRow {
    pub artist_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<&SongRecord> for ArtistRow {
    fn from(r: &SongRecord) -> Self {
        Self {
            artist_id: r.artist_id.clone(),
            name: r.artist_name.clone(),
            location: r.artist_location.clone(),
            latitude: r.artist_latitude,
            longitude: r.artist_longitude,
        }
    }
}

pub struct ArtistsAccumulator {
    schema: SchemaRef,
    artist_id: Vec<Option<String>>,
    name: Vec<Option<String>>,
    location: Vec<Option<String>>,
    latitude: Vec<Option<f64>>,
    longitude: Vec<Option<f64>>,
}

impl ArtistsAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::ARTISTS.clone(),
            artist_id: Vec::with_capacity(RECORD_BATCH_SIZE),
            name: Vec::with_capacity(RECORD_BATCH_SIZE),
            location: Vec::with_capacity(RECORD_BATCH_SIZE),
            latitude: Vec::with_capacity(RECORD_BATCH_SIZE),
            longitude: Vec::with_capacity(RECORD_BATCH_SIZE),
        }
    }
}

impl Default for ArtistsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for ArtistsAccumulator {
    type Row = ArtistRow;

    fn push(&mut self, row: ArtistRow) {
        self.artist_id.push(row.artist_id);
        self.name.push(row.name);
        self.location.push(row.location);
        self.latitude.push(row.latitude);
        self.longitude.push(row.longitude);
    }

    fn len(&self) -> usize {
        self.artist_id.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(std::mem::take(&mut self.artist_id))),
            Arc::new(StringArray::from(std::mem::take(&mut self.name))),
            Arc::new(StringArray::from(std::mem::take(&mut self.location))),
            Arc::new(Float64Array::from(std::mem::take(&mut self.latitude))),
            Arc::new(Float64Array::from(std::mem::take(&mut self.longitude))),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

// === Songs table read back ===

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, ArrowError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| ArrowError::SchemaError(format!("songs file lacks Utf8 column '{name}'")))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, ArrowError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| ArrowError::SchemaError(format!("songs file lacks Float64 column '{name}'")))
}

fn opt_string(array: &StringArray, i: usize) -> Option<String> {
    (!array.is_null(i)).then(|| array.value(i).to_string())
}

/// Rebuild Songs rows from data files, taking `year` and `artist_id` from
/// the partition directories.
pub fn songs_from_batches(parts: &[PartitionedBatch]) -> Result<Vec<SongRow>, ArrowError> {
    let mut rows = Vec::with_capacity(parts.iter().map(|p| p.batch.num_rows()).sum());
    for part in parts {
        let year = part
            .partition_value("year")
            .map(|y| {
                y.parse::<i32>()
                    .map_err(|e| ArrowError::ParseError(format!("partition year={y}: {e}")))
            })
            .transpose()?;
        let artist_id = part.partition_value("artist_id").map(str::to_string);

        let batch = &part.batch;
        let song_id = string_column(batch, "song_id")?;
        let title = string_column(batch, "title")?;
        let artist_name = string_column(batch, "artist_name")?;
        let duration = float_column(batch, "duration")?;

        for i in 0..batch.num_rows() {
            rows.push(SongRow {
                song_id: opt_string(song_id, i),
                title: opt_string(title, i),
                artist_name: opt_string(artist_name, i),
                artist_id: artist_id.clone(),
                year,
                duration: (!duration.is_null(i)).then(|| duration.value(i)),
            });
        }
    }
    Ok(rows)
}
