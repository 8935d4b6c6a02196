//! Diff and fold agree
//!
//! Appending `diff(current, target)` to any history and folding again
//! yields `target`. Folding the same records twice yields the same bytes.

use palimpsest::diff::diff;
use palimpsest::materializer::{empty_document, materialize};
use palimpsest::patch::apply_patch;
use palimpsest::service::DocumentService;
use serde_json::{json, Value};

fn documents() -> Vec<Value> {
    vec![
        json!({}),
        json!({"firstName": "Ann"}),
        json!({"firstname": "Ann", "lastName": "Lee"}),
        json!({"name": {"first": "Ann", "last": "Lee"}, "tags": ["x", "y"]}),
        json!({"name": {"first": "Ann"}, "tags": ["y", "x", "z"], "active": true}),
        json!({"meds": [{"name": "a", "dose": 1}, {"name": "b", "dose": 2}]}),
        json!({"meds": [{"name": "b", "dose": 2}], "notes": null}),
        json!({"a/b": {"c~d": [1, [2, 3], {"e": 4}]}}),
        json!({"renamed": {"deep": [1, 2, 3]}}),
        json!({"nested": [[], [[]], {"k": []}], "n": 1.5, "s": ""}),
    ]
}

#[test]
fn test_diff_applies_between_every_pair() {
    let docs = documents();
    for before in &docs {
        for after in &docs {
            let patch = diff(before, after);
            assert_eq!(
                &apply_patch(before, &patch).unwrap(),
                after,
                "diff {} -> {} gave {}",
                before,
                after,
                patch.to_value()
            );
            if before == after {
                assert!(patch.is_empty());
            }
        }
    }
}

#[test]
fn test_updates_through_the_store_fold_to_each_target() {
    let service = DocumentService::in_memory().unwrap();
    let docs = documents();
    let id = service.create_entity(docs[0].clone()).unwrap().entity_id;

    for target in docs.iter().skip(1) {
        let outcome = service.update_entity(id, target.clone()).unwrap();
        assert_eq!(&outcome.document, target);
        assert_eq!(&service.get_entity(id, None).unwrap().document, target);
    }

    for (index, expected) in docs.iter().enumerate() {
        let read = service.get_entity_at_version(id, index as i64 + 1).unwrap();
        assert_eq!(&read.document, expected);
    }
}

#[test]
fn test_folding_twice_gives_identical_bytes() {
    let service = DocumentService::in_memory().unwrap();
    let docs = documents();
    let id = service.create_entity(docs[3].clone()).unwrap().entity_id;
    for target in &docs[4..] {
        service.update_entity(id, target.clone()).unwrap();
    }

    let page = service
        .list_patch_history(id, palimpsest::store::PageRequest::new(0, 100), None)
        .unwrap();
    let mut records = page.items;
    records.reverse();

    let first = serde_json::to_vec(&materialize(&records).unwrap()).unwrap();
    let second = serde_json::to_vec(&materialize(&records).unwrap()).unwrap();
    assert_eq!(first, second);
    assert_eq!(materialize(&[]).unwrap(), empty_document());
}

#[test]
fn test_member_rename_is_a_move() {
    let before = json!({"firstname": "Ann", "age": 30});
    let after = json!({"firstName": "Ann", "age": 30});
    assert_eq!(
        diff(&before, &after).to_value(),
        json!([{"op": "move", "from": "/firstname", "path": "/firstName"}])
    );
}

#[test]
fn test_diff_entities_across_entities() {
    let service = DocumentService::in_memory().unwrap();
    let a = service.create_entity(json!({"x": 1, "y": [1, 2]})).unwrap().entity_id;
    let b = service.create_entity(json!({"x": 1, "y": [1, 2, 3]})).unwrap().entity_id;

    let patch = service.diff_entities(a, b, None).unwrap();
    assert_eq!(
        patch.to_value(),
        json!([{"op": "add", "path": "/y/2", "value": 3}])
    );
}
