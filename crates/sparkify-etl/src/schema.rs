//! Arrow schemas for the five output tables.
//!
//! Input schemas are the typed records in `transform::song` and
//! `transform::activity`. Column order here is the order of the logical
//! table; partition columns are moved into directory names on write.

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};

pub const SONGS_TABLE: &str = "songs_table";
pub const ARTISTS_TABLE: &str = "artists_table";
pub const USERS_TABLE: &str = "users_table";
pub const TIME_TABLE: &str = "time_table";
pub const SONGPLAYS_TABLE: &str = "songplays_table";

pub const SONGS_PARTITION: &[&str] = &["year", "artist_id"];
pub const TIME_PARTITION: &[&str] = &["year", "month"];
pub const SONGPLAYS_PARTITION: &[&str] = &["year", "month"];

fn utf8(name: &str) -> Field {
    Field::new(name, DataType::Utf8, true)
}

fn int32(name: &str) -> Field {
    Field::new(name, DataType::Int32, true)
}

fn float64(name: &str) -> Field {
    Field::new(name, DataType::Float64, true)
}

/// Event instant, millisecond precision, zone-independent.
pub fn start_time_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
}

pub static SONGS: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        utf8("song_id"),
        utf8("title"),
        utf8("artist_name"),
        utf8("artist_id"),
        int32("year"),
        float64("duration"),
    ]))
});

pub static ARTISTS: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        utf8("artist_id"),
        utf8("name"),
        utf8("location"),
        float64("latitude"),
        float64("longitude"),
    ]))
});

pub static USERS: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        utf8("user_id"),
        utf8("first_name"),
        utf8("last_name"),
        utf8("gender"),
        utf8("level"),
    ]))
});

pub static TIME: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("start_time", start_time_type(), true),
        int32("hour"),
        int32("day"),
        int32("week"),
        int32("month"),
        int32("year"),
        utf8("weekday"),
    ]))
});

pub static SONGPLAYS: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("start_time", start_time_type(), true),
        utf8("user_id"),
        utf8("level"),
        utf8("song_id"),
        utf8("artist_id"),
        Field::new("session_id", DataType::Int64, true),
        utf8("location"),
        utf8("user_agent"),
        int32("year"),
        int32("month"),
    ]))
});
