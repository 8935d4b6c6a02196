//! Value and object diffing

use serde_json::{Map, Value};

use crate::patch::{JsonPointer, Operation, Patch};

use super::array::diff_arrays;

/// Computes the patch that transforms `before` into `after`.
pub fn diff(before: &Value, after: &Value) -> Patch {
    let mut ops = Vec::new();
    diff_values(&JsonPointer::root(), before, after, &mut ops);
    Patch::from(ops)
}

pub(super) fn diff_values(path: &JsonPointer, before: &Value, after: &Value, ops: &mut Vec<Operation>) {
    if before == after {
        return;
    }
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => diff_objects(path, old, new, ops),
        (Value::Array(old), Value::Array(new)) => diff_arrays(path, old, new, ops),
        _ => ops.push(Operation::replace(path.clone(), after.clone())),
    }
}

fn diff_objects(
    path: &JsonPointer,
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    ops: &mut Vec<Operation>,
) {
    let removed: Vec<(&String, &Value)> = before
        .iter()
        .filter(|(key, _)| !after.contains_key(*key))
        .collect();
    let mut consumed = vec![false; removed.len()];

    // A value that left one key and arrived under another is a move.
    let mut added = Vec::new();
    for (key, value) in after.iter().filter(|(key, _)| !before.contains_key(*key)) {
        let source = removed
            .iter()
            .enumerate()
            .position(|(i, (_, old))| !consumed[i] && *old == value);
        match source {
            Some(i) => {
                consumed[i] = true;
                ops.push(Operation::move_value(path.key(removed[i].0.as_str()), path.key(key.as_str())));
            }
            None => added.push((key, value)),
        }
    }

    for (i, (key, _)) in removed.iter().enumerate() {
        if !consumed[i] {
            ops.push(Operation::remove(path.key(key.as_str())));
        }
    }

    for (key, new) in after {
        if let Some(old) = before.get(key) {
            diff_values(&path.key(key.as_str()), old, new, ops);
        }
    }

    for (key, value) in added {
        ops.push(Operation::add(path.key(key.as_str()), value.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::apply_patch;
    use serde_json::json;

    fn assert_round_trip(before: Value, after: Value) -> Patch {
        let patch = diff(&before, &after);
        assert_eq!(apply_patch(&before, &patch).unwrap(), after, "patch: {:?}", patch);
        patch
    }

    #[test]
    fn test_equal_documents_yield_empty_patch() {
        let doc = json!({"a": [1, {"b": null}], "c": "x"});
        assert!(diff(&doc, &doc.clone()).is_empty());
    }

    #[test]
    fn test_added_member_is_single_add() {
        let patch = assert_round_trip(
            json!({"firstName": "Ann"}),
            json!({"firstName": "Ann", "lastName": "Lee"}),
        );
        assert_eq!(
            patch.to_value(),
            json!([{"op": "add", "path": "/lastName", "value": "Lee"}])
        );
    }

    #[test]
    fn test_removed_member_is_single_remove() {
        let patch = assert_round_trip(json!({"a": 1, "b": 2}), json!({"a": 1}));
        assert_eq!(patch.to_value(), json!([{"op": "remove", "path": "/b"}]));
    }

    #[test]
    fn test_changed_scalar_is_replace() {
        let patch = assert_round_trip(json!({"age": 40}), json!({"age": 41}));
        assert_eq!(
            patch.to_value(),
            json!([{"op": "replace", "path": "/age", "value": 41}])
        );
    }

    #[test]
    fn test_renamed_member_is_move() {
        let patch = assert_round_trip(
            json!({"firstName": "Ann"}),
            json!({"firstname": "Ann", "lastName": "Lee"}),
        );
        assert_eq!(
            patch.to_value(),
            json!([
                {"op": "move", "from": "/firstName", "path": "/firstname"},
                {"op": "add", "path": "/lastName", "value": "Lee"}
            ])
        );
    }

    #[test]
    fn test_nested_change_recurses() {
        let patch = assert_round_trip(
            json!({"address": {"city": "Oslo", "zip": "0150"}}),
            json!({"address": {"city": "Bergen", "zip": "0150"}}),
        );
        assert_eq!(
            patch.to_value(),
            json!([{"op": "replace", "path": "/address/city", "value": "Bergen"}])
        );
    }

    #[test]
    fn test_type_change_is_replace() {
        assert_round_trip(json!({"a": [1, 2]}), json!({"a": {"0": 1}}));
        assert_round_trip(json!({}), json!([1, 2, 3]));
        assert_round_trip(json!("x"), json!(null));
    }

    #[test]
    fn test_escaped_keys_round_trip() {
        assert_round_trip(json!({"a/b": 1, "c~d": 2}), json!({"a/b": 3, "e": 2}));
    }
}
