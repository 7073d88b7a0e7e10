//! Activity log events and the Users table.

use std::sync::Arc;

use arrow::array::*;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use serde::{Deserialize, Deserializer, Serialize};
use sparkify_core::{Accumulator, RECORD_BATCH_SIZE};

use crate::schema;

/// Page value of a song-play event.
pub const NEXT_SONG: &str = "NextSong";

/// One activity log event (declared activity schema).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub artist: Option<String>,
    pub auth: Option<String>,
    pub first_name: Option<String>,
    pub gender: Option<String>,
    pub item_in_session: Option<i64>,
    pub last_name: Option<String>,
    pub length: Option<f64>,
    pub level: Option<String>,
    pub location: Option<String>,
    pub method: Option<String>,
    pub page: Option<String>,
    pub registration: Option<f64>,
    pub session_id: Option<i64>,
    pub song: Option<String>,
    pub status: Option<i64>,
    pub ts: Option<i64>,
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
}

impl ActivityRecord {
    pub fn is_song_play(&self) -> bool {
        self.page.as_deref() == Some(NEXT_SONG)
    }
}

/// Log files carry `userId` as a string; integer ids are read as their
/// decimal text.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    }))
}

/// Row of the Users table. One per song-play event; users are not
/// collapsed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserRow {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

impl From<&ActivityRecord> for UserRow {
    fn from(r: &ActivityRecord) -> Self {
        Self {
            user_id: r.user_id.clone(),
            first_name: r.first_name.clone(),
            last_name: r.last_name.clone(),
            gender: r.gender.clone(),
            level: r.level.clone(),
        }
    }
}

pub struct UsersAccumulator {
    schema: SchemaRef,
    user_id: Vec<Option<String>>,
    first_name: Vec<Option<String>>,
    last_name: Vec<Option<String>>,
    gender: Vec<Option<String>>,
    level: Vec<Option<String>>,
}

impl UsersAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::USERS.clone(),
            user_id: Vec::with_capacity(RECORD_BATCH_SIZE),
            first_name: Vec::with_capacity(RECORD_BATCH_SIZE),
            last_name: Vec::with_capacity(RECORD_BATCH_SIZE),
            gender: Vec::with_capacity(RECORD_BATCH_SIZE),
            level: Vec::with_capacity(RECORD_BATCH_SIZE),
        }
    }
}

impl Default for UsersAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for UsersAccumulator {
    type Row = UserRow;

    fn push(&mut self, row: UserRow) {
        self.user_id.push(row.user_id);
        self.first_name.push(row.first_name);
        self.last_name.push(row.last_name);
        self.gender.push(row.gender);
        self.level.push(row.level);
    }

    fn len(&self) -> usize {
        self.user_id.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(std::mem::take(&mut self.user_id))),
            Arc::new(StringArray::from(std::mem::take(&mut self.first_name))),
            Arc::new(StringArray::from(std::mem::take(&mut self.last_name))),
            Arc::new(StringArray::from(std::mem::take(&mut self.gender))),
            Arc::new(StringArray::from(std::mem::take(&mut self.level))),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_EVENT: &str = r#"{
        "artist": "Pavement",
        "auth": "Logged In",
        "firstName": "Sylvie",
        "gender": "F",
        "itemInSession": 0,
        "lastName": "Cruz",
        "length": 99.16036,
        "level": "free",
        "location": "Washington-Arlington-Alexandria, DC-VA-MD-WV",
        "method": "PUT",
        "page": "NextSong",
        "registration": 1540266185796.0,
        "sessionId": 345,
        "song": "Mercy:The Laundromat",
        "status": 200,
        "ts": 1541990258796,
        "userAgent": "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_9_4)",
        "userId": "10"
    }"#;

    #[test]
    fn parse_event() {
        let rec: ActivityRecord = serde_json::from_str(SAMPLE_EVENT).unwrap();
        assert_eq!(rec.first_name.as_deref(), Some("Sylvie"));
        assert_eq!(rec.session_id, Some(345));
        assert_eq!(rec.ts, Some(1541990258796));
        assert_eq!(rec.user_id.as_deref(), Some("10"));
        assert!(rec.is_song_play());
    }

    #[test]
    fn numeric_user_id() {
        let rec: ActivityRecord = serde_json::from_str(r#"{"userId": 26, "page": "Home"}"#).unwrap();
        assert_eq!(rec.user_id.as_deref(), Some("26"));
        assert!(!rec.is_song_play());
    }

    #[test]
    fn missing_and_null_user_id() {
        let rec: ActivityRecord = serde_json::from_str(r#"{"page": "NextSong"}"#).unwrap();
        assert!(rec.user_id.is_none());
        let rec: ActivityRecord = serde_json::from_str(r#"{"userId": null}"#).unwrap();
        assert!(rec.user_id.is_none());
        let rec: ActivityRecord = serde_json::from_str(r#"{"userId": ""}"#).unwrap();
        assert_eq!(rec.user_id.as_deref(), Some(""));
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(serde_json::from_str::<ActivityRecord>(r#"{"ts": "yesterday"}"#).is_err());
        assert!(serde_json::from_str::<ActivityRecord>(r#"{"userId": [1]}"#).is_err());
    }

    #[test]
    fn page_match_is_exact() {
        let rec = ActivityRecord {
            page: Some("nextsong".into()),
            ..Default::default()
        };
        assert!(!rec.is_song_play());
    }

    #[test]
    fn users_accumulator_batch() {
        let rec: ActivityRecord = serde_json::from_str(SAMPLE_EVENT).unwrap();
        let mut acc = UsersAccumulator::new();
        acc.push(UserRow::from(&rec));
        acc.push(UserRow::from(&rec));
        let batch = acc.take_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        let names = batch
            .column_by_name("first_name")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(1), "Sylvie");
    }
}
