//! Exact-duplicate removal for typed records

use rustc_hash::FxHashSet;
use serde::Serialize;

/// Fingerprint of a record: blake3 over its canonical JSON encoding.
///
/// Struct fields serialize in declaration order, so two records fingerprint
/// equal exactly when every field is equal.
pub fn fingerprint<T: Serialize>(record: &T) -> Result<[u8; 32], serde_json::Error> {
    let bytes = serde_json::to_vec(record)?;
    Ok(*blake3::hash(&bytes).as_bytes())
}

/// Drop records identical to an earlier one, keeping first occurrences in
/// their original order. Returns the survivors and the number removed.
pub fn dedup_exact<T: Serialize>(records: Vec<T>) -> Result<(Vec<T>, usize), serde_json::Error> {
    let mut seen: FxHashSet<[u8; 32]> = FxHashSet::default();
    seen.reserve(records.len());
    let total = records.len();
    let mut kept = Vec::with_capacity(total);
    for record in records {
        if seen.insert(fingerprint(&record)?) {
            kept.push(record);
        }
    }
    let removed = total - kept.len();
    Ok((kept, removed))
}
