//! Folding patch records into documents
//!
//! Every fold starts from the empty object and applies each record's
//! operations in order. There is no cached state: the same records always
//! fold to the same document.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::patch::{apply_patch_in_place, PatchApplyError};
use crate::store::{PatchRecord, RecordId};

/// A stored record that would not apply.
///
/// Stored history is supposed to fold cleanly, so this always means the
/// history is inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("record {record_id} (#{record_index} in fold order) failed to apply: {source}")]
pub struct FoldError {
    pub record_index: usize,
    pub record_id: RecordId,
    #[source]
    pub source: PatchApplyError,
}

/// The starting point of every fold.
pub fn empty_document() -> Value {
    Value::Object(Map::new())
}

/// A folded document and the record it ends on.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    pub document: Value,
    /// Number of records folded
    pub version: u64,
    pub last: Option<PatchRecord>,
}

/// Folds `records` in the given order.
pub fn materialize(records: &[PatchRecord]) -> Result<Value, FoldError> {
    let mut document = empty_document();
    for (record_index, record) in records.iter().enumerate() {
        apply_patch_in_place(&mut document, &record.operations).map_err(|source| FoldError {
            record_index,
            record_id: record.id,
            source,
        })?;
    }
    Ok(document)
}

/// The document after each prefix of `records`: element `i` is version `i + 1`.
///
/// One pass; equal to calling [`materialize`] on every prefix.
pub fn materialize_prefixes(records: &[PatchRecord]) -> Result<Vec<Materialized>, FoldError> {
    let mut document = empty_document();
    let mut out = Vec::with_capacity(records.len());
    for (record_index, record) in records.iter().enumerate() {
        apply_patch_in_place(&mut document, &record.operations).map_err(|source| FoldError {
            record_index,
            record_id: record.id,
            source,
        })?;
        out.push(Materialized {
            document: document.clone(),
            version: record_index as u64 + 1,
            last: Some(record.clone()),
        });
    }
    Ok(out)
}
