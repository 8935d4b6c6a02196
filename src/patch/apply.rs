//! Patch application with standard RFC 6902 semantics

use serde_json::Value;

use super::errors::{PatchApplyError, PatchFailure};
use super::operation::{Operation, Patch};
use super::pointer::{array_index, JsonPointer};

/// Applies `patch` to a copy of `doc`.
///
/// All-or-nothing: on failure `doc` is untouched and the error names the
/// index of the first failing operation.
pub fn apply_patch(doc: &Value, patch: &Patch) -> Result<Value, PatchApplyError> {
    let mut working = doc.clone();
    apply_patch_in_place(&mut working, patch)?;
    Ok(working)
}

/// Applies `patch` to `doc` directly.
///
/// On failure `doc` holds the effects of every operation before the failing
/// one. Use [`apply_patch`] when the caller needs the original back.
pub fn apply_patch_in_place(doc: &mut Value, patch: &Patch) -> Result<(), PatchApplyError> {
    for (index, op) in patch.iter().enumerate() {
        apply_operation(doc, op).map_err(|reason| PatchApplyError::new(reason, index))?;
    }
    Ok(())
}

fn apply_operation(doc: &mut Value, op: &Operation) -> Result<(), PatchFailure> {
    match op {
        Operation::Add { path, value } => add(doc, path, value.clone()),
        Operation::Remove { path } => remove(doc, path).map(|_| ()),
        Operation::Replace { path, value } => {
            let slot = path
                .resolve_mut(doc)
                .ok_or_else(|| PatchFailure::PathNotFound(path.to_string()))?;
            *slot = value.clone();
            Ok(())
        }
        Operation::Move { from, path } => {
            if from == path {
                return from
                    .resolve(doc)
                    .map(|_| ())
                    .ok_or_else(|| PatchFailure::PathNotFound(from.to_string()));
            }
            if from.is_proper_prefix_of(path) {
                return Err(PatchFailure::MoveIntoChild {
                    from: from.to_string(),
                    path: path.to_string(),
                });
            }
            let value = remove(doc, from)?;
            add(doc, path, value)
        }
        Operation::Copy { from, path } => {
            let value = from
                .resolve(doc)
                .cloned()
                .ok_or_else(|| PatchFailure::PathNotFound(from.to_string()))?;
            add(doc, path, value)
        }
        Operation::Test { path, value } => {
            let actual = path
                .resolve(doc)
                .ok_or_else(|| PatchFailure::PathNotFound(path.to_string()))?;
            if values_equal(actual, value) {
                Ok(())
            } else {
                Err(PatchFailure::TestFailed(path.to_string()))
            }
        }
    }
}

/// JSON equality for `test`: numbers compare by value, so `1` equals `1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).map_or(false, |y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn add(doc: &mut Value, path: &JsonPointer, value: Value) -> Result<(), PatchFailure> {
    let Some((parent, last)) = path.split_last() else {
        *doc = value;
        return Ok(());
    };

    let container = parent
        .resolve_mut(doc)
        .ok_or_else(|| PatchFailure::PathNotFound(parent.to_string()))?;

    match container {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(last, items.len(), true).ok_or_else(|| {
                PatchFailure::InvalidIndex {
                    path: path.to_string(),
                    index: last.to_string(),
                }
            })?;
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchFailure::ParentNotContainer(path.to_string())),
    }
}

fn remove(doc: &mut Value, path: &JsonPointer) -> Result<Value, PatchFailure> {
    let Some((parent, last)) = path.split_last() else {
        return Err(PatchFailure::Malformed(
            "cannot remove the document root".to_string(),
        ));
    };

    let missing = || PatchFailure::PathNotFound(path.to_string());
    match parent.resolve_mut(doc).ok_or_else(missing)? {
        Value::Object(map) => map.remove(last).ok_or_else(missing),
        Value::Array(items) => {
            let index = array_index(last, items.len(), false).ok_or_else(missing)?;
            Ok(items.remove(index))
        }
        _ => Err(missing()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(raw: Value) -> Patch {
        Patch::from_value(raw).unwrap()
    }

    #[test]
    fn test_add_member_and_array_element() {
        let doc = json!({"meds": ["a", "c"]});
        let out = apply_patch(
            &doc,
            &patch(json!([
                {"op": "add", "path": "/name", "value": "Ann"},
                {"op": "add", "path": "/meds/1", "value": "b"},
                {"op": "add", "path": "/meds/-", "value": "d"}
            ])),
        )
        .unwrap();
        assert_eq!(out, json!({"name": "Ann", "meds": ["a", "b", "c", "d"]}));
    }

    #[test]
    fn test_add_at_root_replaces_document() {
        let out = apply_patch(&json!({"a": 1}), &patch(json!([{"op": "add", "path": "", "value": {"b": 2}}])))
            .unwrap();
        assert_eq!(out, json!({"b": 2}));
    }

    #[test]
    fn test_remove_missing_path_fails() {
        let err = apply_patch(&json!({}), &patch(json!([{"op": "remove", "path": "/gone"}]))).unwrap_err();
        assert_eq!(err.op_index, 0);
        assert_eq!(err.reason, PatchFailure::PathNotFound("/gone".to_string()));
    }

    #[test]
    fn test_replace_missing_path_fails() {
        let err = apply_patch(
            &json!({"a": 1}),
            &patch(json!([
                {"op": "replace", "path": "/a", "value": 2},
                {"op": "replace", "path": "/b", "value": 3}
            ])),
        )
        .unwrap_err();
        assert_eq!(err.op_index, 1);
    }

    #[test]
    fn test_failed_apply_leaves_input_untouched() {
        let doc = json!({"a": 1});
        let result = apply_patch(
            &doc,
            &patch(json!([
                {"op": "add", "path": "/b", "value": 2},
                {"op": "test", "path": "/a", "value": 99}
            ])),
        );
        assert!(matches!(
            result,
            Err(PatchApplyError { reason: PatchFailure::TestFailed(_), op_index: 1 })
        ));
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn test_compares_numbers_by_value() {
        let doc = json!({"arr": [1, {"x": 2.0}], "big": 18446744073709551615u64});
        let out = apply_patch(
            &doc,
            &patch(json!([
                {"op": "test", "path": "/arr/0", "value": 1.0},
                {"op": "test", "path": "/arr", "value": [1.0, {"x": 2}]},
                {"op": "test", "path": "/big", "value": 18446744073709551615u64}
            ])),
        );
        assert_eq!(out.unwrap(), doc);

        let err = apply_patch(&doc, &patch(json!([{"op": "test", "path": "/arr/0", "value": 1.5}])))
            .unwrap_err();
        assert!(matches!(err.reason, PatchFailure::TestFailed(_)));
        let err = apply_patch(&doc, &patch(json!([{"op": "test", "path": "/arr/0", "value": "1"}])))
            .unwrap_err();
        assert!(matches!(err.reason, PatchFailure::TestFailed(_)));
    }

    #[test]
    fn test_move_and_copy() {
        let doc = json!({"first": "Ann", "list": [1, 2, 3]});
        let out = apply_patch(
            &doc,
            &patch(json!([
                {"op": "move", "from": "/first", "path": "/firstName"},
                {"op": "copy", "from": "/list/0", "path": "/list/-"},
                {"op": "move", "from": "/list/0", "path": "/list/2"}
            ])),
        )
        .unwrap();
        assert_eq!(out, json!({"firstName": "Ann", "list": [2, 3, 1, 1]}));
    }

    #[test]
    fn test_move_into_own_child_fails() {
        let err = apply_patch(
            &json!({"a": {"b": 1}}),
            &patch(json!([{"op": "move", "from": "/a", "path": "/a/b/c"}])),
        )
        .unwrap_err();
        assert!(matches!(err.reason, PatchFailure::MoveIntoChild { .. }));
    }

    #[test]
    fn test_add_into_scalar_parent_fails() {
        let err = apply_patch(
            &json!({"a": 1}),
            &patch(json!([{"op": "add", "path": "/a/b", "value": 1}])),
        )
        .unwrap_err();
        assert_eq!(err.reason, PatchFailure::ParentNotContainer("/a/b".to_string()));
    }

    #[test]
    fn test_add_out_of_bounds_index_fails() {
        let err = apply_patch(
            &json!({"a": [1]}),
            &patch(json!([{"op": "add", "path": "/a/5", "value": 1}])),
        )
        .unwrap_err();
        assert!(matches!(err.reason, PatchFailure::InvalidIndex { .. }));
    }

    #[test]
    fn test_remove_root_is_malformed() {
        let err = apply_patch(&json!({}), &patch(json!([{"op": "remove", "path": ""}]))).unwrap_err();
        assert!(matches!(err.reason, PatchFailure::Malformed(_)));
    }
}
