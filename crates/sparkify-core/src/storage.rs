//! Storage client: input discovery and output tables under two roots.
//!
//! Credentials are handed to the constructor; nothing is read from or
//! written to the process environment here.

use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;

use crate::error::StorageError;
use crate::table::{self, PartitionedBatch, SUCCESS_MARKER, TableWriter};

/// Access key pair for an object store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub input_root: String,
    pub output_root: String,
    pub credentials: Option<Credentials>,
}

const OBJECT_STORE_SCHEMES: &[&str] = &["s3", "s3a", "s3n"];

/// Scheme of a `scheme://...` root, if any.
fn scheme_of(root: &str) -> Option<&str> {
    root.split_once("://").map(|(scheme, _)| scheme)
}

fn resolve_root(root: &str, credentials: Option<&Credentials>) -> Result<PathBuf, StorageError> {
    match scheme_of(root) {
        None => Ok(PathBuf::from(root)),
        Some("file") => Ok(PathBuf::from(&root["file://".len()..])),
        Some(scheme) if OBJECT_STORE_SCHEMES.contains(&scheme) => {
            if credentials.is_none() {
                return Err(StorageError::MissingCredentials {
                    root: root.to_string(),
                });
            }
            Err(StorageError::UnsupportedScheme {
                scheme: scheme.to_string(),
                root: root.to_string(),
            })
        }
        Some(scheme) => Err(StorageError::UnsupportedScheme {
            scheme: scheme.to_string(),
            root: root.to_string(),
        }),
    }
}

/// Filesystem-backed storage client.
#[derive(Debug, Clone)]
pub struct Storage {
    input_root: PathBuf,
    output_root: PathBuf,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let creds = config.credentials.as_ref();
        let input_root = resolve_root(&config.input_root, creds)?;
        let output_root = resolve_root(&config.output_root, creds)?;
        if creds.is_some() {
            log::debug!("Credentials configured but not needed for local roots");
        }
        Ok(Self {
            input_root,
            output_root,
        })
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Files under the input root matching `pattern`, sorted by path.
    pub fn glob_input(&self, pattern: &str) -> Result<Vec<PathBuf>, StorageError> {
        let full = self.input_root.join(pattern);
        let mut files = glob::glob(&full.to_string_lossy())?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Io(e.into_error()))?;
        files.retain(|p| p.is_file());
        files.sort();
        Ok(files)
    }

    pub fn table_dir(&self, name: &str) -> PathBuf {
        self.output_root.join(name)
    }

    /// A completely written table exists (directory plus `_SUCCESS`).
    pub fn has_table(&self, name: &str) -> bool {
        self.table_dir(name).join(SUCCESS_MARKER).is_file()
    }

    /// Start (over)writing a table.
    pub fn create_table(
        &self,
        name: &str,
        schema: SchemaRef,
        partition_by: &[&str],
        zstd_level: i32,
    ) -> Result<TableWriter, StorageError> {
        Ok(TableWriter::create(
            &self.table_dir(name),
            schema,
            partition_by,
            zstd_level,
        )?)
    }

    /// Read a completed table back.
    pub fn read_table(&self, name: &str) -> Result<Vec<PartitionedBatch>, StorageError> {
        if !self.has_table(name) {
            return Err(StorageError::MissingTable {
                path: self.table_dir(name),
            });
        }
        Ok(table::read_table(&self.table_dir(name))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn creds() -> Credentials {
        Credentials {
            access_key_id: "AKIA".into(),
            secret_access_key: "secret".into(),
        }
    }

    fn local(tmp: &TempDir) -> Storage {
        Storage::new(&StorageConfig {
            input_root: tmp.path().join("in").to_string_lossy().into_owned(),
            output_root: tmp.path().join("out").to_string_lossy().into_owned(),
            credentials: None,
        })
        .unwrap()
    }

    #[test]
    fn object_store_without_credentials() {
        let err = Storage::new(&StorageConfig {
            input_root: "s3a://udacity-dend/".into(),
            output_root: "/tmp/out".into(),
            credentials: None,
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::MissingCredentials { .. }));
    }

    #[test]
    fn object_store_with_credentials_unsupported() {
        let err = Storage::new(&StorageConfig {
            input_root: "/tmp/in".into(),
            output_root: "s3://bucket/out".into(),
            credentials: Some(creds()),
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedScheme { ref scheme, .. } if scheme == "s3"));
    }

    #[test]
    fn file_scheme_is_local() {
        let storage = Storage::new(&StorageConfig {
            input_root: "file:///data/in".into(),
            output_root: "./out".into(),
            credentials: None,
        })
        .unwrap();
        assert_eq!(storage.input_root(), Path::new("/data/in"));
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let shown = format!("{:?}", creds());
        assert!(shown.contains("AKIA"));
        assert!(!shown.contains("\"secret\""));
    }

    #[test]
    fn glob_input_respects_nesting() {
        let tmp = TempDir::new().unwrap();
        let storage = local(&tmp);
        let deep = tmp.path().join("in/song_data/A/B/C");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("TRB.json"), "{}").unwrap();
        std::fs::write(deep.join("TRA.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("in/song_data/A/B/shallow.json"), "{}").unwrap();

        let files = storage.glob_input("song_data/*/*/*/*.json").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("TRA.json"));
        assert!(files[1].ends_with("TRB.json"));
    }

    #[test]
    fn missing_table_is_error() {
        let tmp = TempDir::new().unwrap();
        let storage = local(&tmp);
        assert!(!storage.has_table("songs_table"));
        assert!(matches!(
            storage.read_table("songs_table").unwrap_err(),
            StorageError::MissingTable { .. }
        ));
    }
}
