//! Hive-style partition paths: `col=value/col=value/`

use std::path::{Component, Path, PathBuf};

/// Directory value used for a null partition value.
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Partition values of one directory, in partition-column order.
pub type PartitionKey = Vec<Option<String>>;

fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '"' | '#' | '%' | '\'' | '*' | '/' | ':' | '=' | '?' | '\\' | '\x7f' | '{' | '[' | ']' | '^'
    ) || ('\x01'..='\x1f').contains(&c)
}

/// Escape a partition value for use as a path segment.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse of [`escape_value`]. Malformed `%` sequences are kept verbatim.
pub fn unescape_value(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let hex: String = chars.clone().take(2).collect();
        if hex.len() != 2 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
            out.push('%');
            continue;
        }
        match u8::from_str_radix(&hex, 16) {
            Ok(byte) => {
                out.push(byte as char);
                chars.next();
                chars.next();
            }
            _ => out.push('%'),
        }
    }
    out
}

/// Relative directory for one partition, e.g. `year=2018/month=11`.
pub fn partition_dir(columns: &[String], key: &[Option<String>]) -> PathBuf {
    let mut dir = PathBuf::new();
    for (col, value) in columns.iter().zip(key) {
        let value = match value {
            Some(v) if !v.is_empty() => escape_value(v),
            _ => DEFAULT_PARTITION.to_string(),
        };
        dir.push(format!("{}={value}", escape_value(col)));
    }
    dir
}

/// Parse the `col=value` directories between a table root and one of its
/// files. Segments without `=` are skipped.
pub fn parse_partition_path(relative_file: &Path) -> Vec<(String, Option<String>)> {
    let parent = relative_file.parent().unwrap_or(Path::new(""));
    parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .filter_map(|segment| segment.split_once('='))
        .map(|(col, value)| {
            let value = if value == DEFAULT_PARTITION {
                None
            } else {
                Some(unescape_value(value))
            };
            (unescape_value(col), value)
        })
        .collect()
}
