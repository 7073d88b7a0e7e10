//! Typed JSON record loading from input files.
//!
//! A file may hold one JSON object, a JSON array of objects, or a stream of
//! objects separated by whitespace (JSON lines). Each object is deserialized
//! into the caller's record type, which acts as the schema: undeclared
//! fields are ignored, missing `Option` fields become `None`, and a field
//! of the wrong type makes the record malformed.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::LoadError;

/// What to do with a record that does not match its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Abort the load on the first malformed record.
    #[default]
    FailFast,
    /// Skip malformed records with a warning.
    DropMalformed,
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_fast" | "fail-fast" => Ok(Self::FailFast),
            "drop_malformed" | "drop-malformed" => Ok(Self::DropMalformed),
            other => Err(format!(
                "unknown parse mode '{other}' (expected fail_fast or drop_malformed)"
            )),
        }
    }
}

impl std::fmt::Display for ParseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FailFast => "fail_fast",
            Self::DropMalformed => "drop_malformed",
        })
    }
}

/// Counters from one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub files: usize,
    /// Records that parsed against the schema.
    pub records: usize,
    /// Records dropped under [`ParseMode::DropMalformed`].
    pub malformed: usize,
}

/// Records of one file plus the number dropped as malformed.
struct FileRecords<T> {
    records: Vec<T>,
    malformed: usize,
}

fn read_file<T: DeserializeOwned>(path: &Path, mode: ParseMode) -> Result<FileRecords<T>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut out = FileRecords {
        records: Vec::new(),
        malformed: 0,
    };
    let mut index = 0usize;

    for value in serde_json::Deserializer::from_str(&text).into_iter::<serde_json::Value>() {
        let value = value.map_err(|source| LoadError::Syntax {
            path: path.to_path_buf(),
            source,
        })?;
        let values = match value {
            serde_json::Value::Array(items) => items,
            single => vec![single],
        };
        for value in values {
            match serde_json::from_value::<T>(value) {
                Ok(record) => out.records.push(record),
                Err(source) => match mode {
                    ParseMode::FailFast => {
                        return Err(LoadError::Malformed {
                            path: path.to_path_buf(),
                            record: index,
                            source,
                        });
                    }
                    ParseMode::DropMalformed => {
                        log::warn!(
                            "Dropping record {index} of {}: {source}",
                            path.display()
                        );
                        out.malformed += 1;
                    }
                },
            }
            index += 1;
        }
    }
    Ok(out)
}

/// Parse all `files` in parallel. Records come back in file order, then in
/// order within each file.
pub fn load_records<T>(
    files: &[PathBuf],
    mode: ParseMode,
    pb: &ProgressBar,
) -> Result<(Vec<T>, LoadStats), LoadError>
where
    T: DeserializeOwned + Send,
{
    let per_file = files
        .par_iter()
        .map(|path| {
            let result = read_file::<T>(path, mode);
            pb.inc(1);
            result
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut stats = LoadStats {
        files: files.len(),
        ..LoadStats::default()
    };
    let mut records = Vec::with_capacity(per_file.iter().map(|f| f.records.len()).sum());
    for file in per_file {
        stats.records += file.records.len();
        stats.malformed += file.malformed;
        records.extend(file.records);
    }
    Ok((records, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Rec {
        id: Option<String>,
        score: Option<f64>,
        year: Option<i32>,
    }

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn single_object_file() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "a.json", r#"{"id": "x", "score": 1, "year": 2001, "extra": true}"#);
        let (recs, stats) = load_records::<Rec>(&[f], ParseMode::FailFast, &ProgressBar::hidden()).unwrap();
        assert_eq!(
            recs,
            vec![Rec {
                id: Some("x".into()),
                score: Some(1.0),
                year: Some(2001)
            }]
        );
        assert_eq!(stats, LoadStats { files: 1, records: 1, malformed: 0 });
    }

    #[test]
    fn json_lines_file() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "log.json", "{\"id\": \"a\"}\n{\"id\": \"b\"}\n\n{\"id\": \"c\"}\n");
        let (recs, _) = load_records::<Rec>(&[f], ParseMode::FailFast, &ProgressBar::hidden()).unwrap();
        let ids: Vec<_> = recs.iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(recs[0].year.is_none());
    }

    #[test]
    fn array_file() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "arr.json", r#"[{"id": "a"}, {"id": "b"}]"#);
        let (recs, _) = load_records::<Rec>(&[f], ParseMode::FailFast, &ProgressBar::hidden()).unwrap();
        assert_eq!(recs.len(), 2);
    }

    #[test]
    fn malformed_fails_fast() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "bad.json", "{\"id\": \"a\"}\n{\"year\": \"nineteen\"}\n");
        let err = load_records::<Rec>(&[f], ParseMode::FailFast, &ProgressBar::hidden()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { record: 1, .. }));
    }

    #[test]
    fn malformed_dropped_when_lenient() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "bad.json", "{\"id\": \"a\"}\n{\"year\": \"nineteen\"}\n{\"id\": \"c\"}\n");
        let (recs, stats) =
            load_records::<Rec>(&[f], ParseMode::DropMalformed, &ProgressBar::hidden()).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.records, 2);
    }

    #[test]
    fn syntax_error_always_fatal() {
        let dir = TempDir::new().unwrap();
        let f = write(&dir, "broken.json", "{\"id\": ");
        let err = load_records::<Rec>(&[f], ParseMode::DropMalformed, &ProgressBar::hidden()).unwrap_err();
        assert!(matches!(err, LoadError::Syntax { .. }));
    }

    #[test]
    fn file_order_preserved() {
        let dir = TempDir::new().unwrap();
        let files: Vec<_> = (0..16)
            .map(|i| write(&dir, &format!("{i:02}.json"), &format!("{{\"id\": \"{i}\"}}")))
            .collect();
        let (recs, stats) = load_records::<Rec>(&files, ParseMode::FailFast, &ProgressBar::hidden()).unwrap();
        assert_eq!(stats.files, 16);
        for (i, rec) in recs.iter().enumerate() {
            assert_eq!(rec.id.as_deref(), Some(i.to_string().as_str()));
        }
    }

    #[test]
    fn parse_mode_from_str() {
        assert_eq!("fail_fast".parse::<ParseMode>().unwrap(), ParseMode::FailFast);
        assert_eq!("drop-malformed".parse::<ParseMode>().unwrap(), ParseMode::DropMalformed);
        assert!("permissive".parse::<ParseMode>().is_err());
    }
}
