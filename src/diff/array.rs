//! Array diffing by longest common subsequence
//!
//! Common prefixes and suffixes are trimmed first; the remaining window is
//! aligned with an LCS table. Windows larger than `MAX_LCS_CELLS` skip the
//! table and are diffed position by position.

use serde_json::Value;

use crate::patch::{JsonPointer, Operation};

use super::engine::diff_values;

const MAX_LCS_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Keep,
    Delete(usize),
    Insert(usize),
}

pub(super) fn diff_arrays(path: &JsonPointer, before: &[Value], after: &[Value], ops: &mut Vec<Operation>) {
    let prefix = before
        .iter()
        .zip(after)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = before.len().min(after.len()) - prefix;
    let suffix = before
        .iter()
        .rev()
        .zip(after.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old = &before[prefix..before.len() - suffix];
    let new = &after[prefix..after.len() - suffix];

    // `pos` tracks the index of the next unprocessed element in the array
    // as it looks after every operation emitted so far.
    let mut pos = prefix;
    let mut deletes: Vec<&Value> = Vec::new();
    let mut inserts: Vec<&Value> = Vec::new();

    for edit in edit_script(old, new) {
        match edit {
            Edit::Keep => {
                flush(path, &mut pos, &mut deletes, &mut inserts, ops);
                pos += 1;
            }
            Edit::Delete(i) => deletes.push(&old[i]),
            Edit::Insert(j) => inserts.push(&new[j]),
        }
    }
    flush(path, &mut pos, &mut deletes, &mut inserts, ops);
}

/// Emits the operations for one run of unmatched elements.
///
/// The run's deleted elements sit contiguously at `pos`. Pairs are diffed in
/// place, surplus deletions are removed, surplus insertions are added.
fn flush<'a>(
    path: &JsonPointer,
    pos: &mut usize,
    deletes: &mut Vec<&'a Value>,
    inserts: &mut Vec<&'a Value>,
    ops: &mut Vec<Operation>,
) {
    let paired = deletes.len().min(inserts.len());

    for (old, new) in deletes.iter().zip(inserts.iter()) {
        diff_values(&path.index(*pos), old, new, ops);
        *pos += 1;
    }
    for _ in paired..deletes.len() {
        ops.push(Operation::remove(path.index(*pos)));
    }
    for value in &inserts[paired..] {
        ops.push(Operation::add(path.index(*pos), (*value).clone()));
        *pos += 1;
    }

    deletes.clear();
    inserts.clear();
}

fn edit_script(old: &[Value], new: &[Value]) -> Vec<Edit> {
    let (n, m) = (old.len(), new.len());

    if n.saturating_mul(m) > MAX_LCS_CELLS {
        let mut script: Vec<Edit> = (0..n).map(Edit::Delete).collect();
        script.extend((0..m).map(Edit::Insert));
        return script;
    }

    // lcs[i][j] = length of the LCS of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut script = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old[i] == new[j] {
            script.push(Edit::Keep);
            i += 1;
            j += 1;
        } else if j < m && (i == n || lcs[i][j + 1] >= lcs[i + 1][j]) {
            script.push(Edit::Insert(j));
            j += 1;
        } else {
            script.push(Edit::Delete(i));
            i += 1;
        }
    }
    script
}
