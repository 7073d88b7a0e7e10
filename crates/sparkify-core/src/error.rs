//! Error types for storage access and record loading

use std::fmt;
use std::path::PathBuf;

/// Error from the storage client (root resolution, listing, table I/O).
#[derive(Debug)]
pub enum StorageError {
    /// Object-store root configured without access credentials.
    MissingCredentials { root: String },
    /// Root uses a scheme with no built-in backend.
    UnsupportedScheme { scheme: String, root: String },
    /// Table directory or its `_SUCCESS` marker is absent.
    MissingTable { path: PathBuf },
    Pattern(glob::PatternError),
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials { root } => {
                write!(f, "no access credentials configured for {root}")
            }
            Self::UnsupportedScheme { scheme, root } => {
                write!(f, "unsupported storage scheme '{scheme}' in {root}")
            }
            Self::MissingTable { path } => {
                write!(f, "table not found (or incomplete): {}", path.display())
            }
            Self::Pattern(e) => write!(f, "invalid glob pattern: {e}"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pattern(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<glob::PatternError> for StorageError {
    fn from(e: glob::PatternError) -> Self {
        Self::Pattern(e)
    }
}

/// Error from loading JSON records out of input files.
#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// File is not valid JSON (always fatal).
    Syntax {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Record is valid JSON but a declared field has the wrong type.
    Malformed {
        path: PathBuf,
        record: usize,
        source: serde_json::Error,
    },
}

impl LoadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::Syntax { path, .. } | Self::Malformed { path, .. } => {
                path
            }
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "IO: {}: {source}", path.display()),
            Self::Syntax { path, source } => {
                write!(f, "invalid JSON in {}: {source}", path.display())
            }
            Self::Malformed {
                path,
                record,
                source,
            } => write!(
                f,
                "record {record} in {} does not match schema: {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Syntax { source, .. } | Self::Malformed { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn storage_error_display_io() {
        let err = StorageError::from(std::io::Error::new(ErrorKind::NotFound, "not found"));
        assert!(format!("{err}").contains("IO:"));
    }

    #[test]
    fn storage_error_display_scheme() {
        let err = StorageError::UnsupportedScheme {
            scheme: "s3a".into(),
            root: "s3a://bucket/".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("s3a"));
        assert!(msg.contains("s3a://bucket/"));
    }

    #[test]
    fn load_error_malformed_names_record() {
        let source = serde_json::from_str::<i32>("\"x\"").unwrap_err();
        let err = LoadError::Malformed {
            path: PathBuf::from("song_data/A/B/C/x.json"),
            record: 3,
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("record 3"));
        assert!(msg.contains("x.json"));
        assert_eq!(err.path(), std::path::Path::new("song_data/A/B/C/x.json"));
    }
}
