//! Durable journals
//!
//! Reopening a data directory replays both journals and answers every read
//! exactly as before. Any damage to a journal stops the open.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use palimpsest::branch::BRANCH_JOURNAL_FILE;
use palimpsest::clock::ManualClock;
use palimpsest::config::Config;
use palimpsest::service::DocumentService;
use palimpsest::store::{PageRequest, PATCH_JOURNAL_FILE};
use serde_json::json;
use tempfile::TempDir;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 11, 20)
        .unwrap()
        .and_hms_opt(14, 30, 0)
        .unwrap()
}

fn open(dir: &Path, clock: &Arc<ManualClock>) -> DocumentService {
    let mut config = Config::durable(dir);
    config.fsync = false;
    DocumentService::open(&config, clock.clone()).unwrap()
}

#[test]
fn test_reopen_answers_reads_identically() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));

    let (id, kept, branch, cutoff) = {
        let service = open(temp.path(), &clock);
        let id = service.create_entity(json!({"name": "Ann"})).unwrap().entity_id;
        let cutoff = clock.advance(Duration::seconds(10));
        service.update_entity(id, json!({"name": "Ann", "tags": ["a"]})).unwrap();

        clock.advance(Duration::seconds(10));
        let branch = service.create_branch(None).unwrap();
        clock.advance(Duration::seconds(10));
        service
            .update_entity_in_branch(id, branch.id, json!({"name": "Bea", "tags": ["a"]}))
            .unwrap();

        let doomed = service.create_entity(json!({"temp": true})).unwrap().entity_id;
        let kept = service.create_entity(json!({"keep": true})).unwrap().entity_id;
        service.delete_entity(doomed).unwrap();
        (id, kept, branch, cutoff)
    };

    let reopened = open(temp.path(), &clock);
    assert_eq!(reopened.record_count(), 4);

    let current = reopened.get_entity(id, None).unwrap();
    assert_eq!(current.document, json!({"name": "Ann", "tags": ["a"]}));
    assert_eq!(current.version, 2);
    assert_eq!(
        reopened.get_entity(id, Some(cutoff - Duration::seconds(1))).unwrap().document,
        json!({"name": "Ann"})
    );

    assert_eq!(reopened.get_branch(branch.id).unwrap(), branch);
    let on_branch = reopened.get_entity_in_branch(id, branch.id, None).unwrap();
    assert_eq!(on_branch.document, json!({"name": "Bea", "tags": ["a"]}));

    let page = reopened.list_entities(PageRequest::new(0, 10), None, &[]).unwrap();
    let ids: Vec<_> = page.items.iter().map(|v| v.entity_id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&id) && ids.contains(&kept));
}

#[test]
fn test_appends_after_reopen_sort_last() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));

    let id = {
        let service = open(temp.path(), &clock);
        let id = service.create_entity(json!({"n": 1})).unwrap().entity_id;
        clock.advance(Duration::seconds(5));
        service.update_entity(id, json!({"n": 2})).unwrap();
        id
    };

    // The clock runs backwards across the restart.
    clock.set(t0() - Duration::hours(1));
    let service = open(temp.path(), &clock);
    let outcome = service.update_entity(id, json!({"n": 3})).unwrap();
    assert_eq!(outcome.version, 3);
    assert_eq!(service.get_entity(id, None).unwrap().document, json!({"n": 3}));
}

#[test]
fn test_deleted_branch_stays_deleted() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));

    let (id, branch) = {
        let service = open(temp.path(), &clock);
        let id = service.create_entity(json!({"v": 1})).unwrap().entity_id;
        clock.advance(Duration::seconds(1));
        let branch = service.create_branch(None).unwrap();
        service.update_entity_in_branch(id, branch.id, json!({"v": 2})).unwrap();
        service.delete_branch(branch.id).unwrap();
        (id, branch.id)
    };

    let service = open(temp.path(), &clock);
    assert!(service.get_branch(branch).unwrap_err().is_not_found());
    assert_eq!(service.record_count(), 1);
    assert_eq!(service.get_entity(id, None).unwrap().document, json!({"v": 1}));
}

#[test]
fn test_crash_between_record_purge_and_branch_removal_leaves_empty_branch() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    let branch_log = temp.path().join(BRANCH_JOURNAL_FILE);

    let (id, branch) = {
        let service = open(temp.path(), &clock);
        let id = service.create_entity(json!({"v": 1})).unwrap().entity_id;
        clock.advance(Duration::seconds(1));
        let branch = service.create_branch(None).unwrap();
        service.update_entity_in_branch(id, branch.id, json!({"v": 2})).unwrap();

        let before = fs::read(&branch_log).unwrap();
        assert_eq!(service.delete_branch(branch.id).unwrap(), 1);
        // Lose the branch journal entry the delete wrote last.
        fs::write(&branch_log, before).unwrap();
        (id, branch.id)
    };

    let service = open(temp.path(), &clock);
    assert!(service.get_branch(branch).is_ok());
    assert_eq!(service.record_count(), 1);
    let on_branch = service.get_entity_in_branch(id, branch, None).unwrap();
    assert_eq!(on_branch.document, json!({"v": 1}));
    assert_eq!(on_branch.version, 1);

    assert_eq!(service.delete_branch(branch).unwrap(), 0);
    assert!(service.get_branch(branch).unwrap_err().is_not_found());
}

fn flip_byte(path: &Path) {
    let mut bytes = fs::read(path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x5a;
    fs::write(path, bytes).unwrap();
}

#[test]
fn test_flipped_byte_in_patch_journal_is_fatal() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    {
        let service = open(temp.path(), &clock);
        for n in 0..3 {
            service.create_entity(json!({"n": n})).unwrap();
        }
    }

    flip_byte(&temp.path().join(PATCH_JOURNAL_FILE));

    let mut config = Config::durable(temp.path());
    config.fsync = false;
    let Err(err) = DocumentService::open(&config, clock.clone()) else {
        panic!("corrupt journal must not open");
    };
    assert!(err.is_fatal());
    assert_eq!(err.code(), "PALIMPSEST_JOURNAL_CORRUPTION");
}

#[test]
fn test_flipped_byte_in_branch_journal_is_fatal() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    {
        let service = open(temp.path(), &clock);
        service.create_branch(None).unwrap();
        service.create_branch(None).unwrap();
    }

    flip_byte(&temp.path().join(BRANCH_JOURNAL_FILE));

    let mut config = Config::durable(temp.path());
    config.fsync = false;
    let Err(err) = DocumentService::open(&config, clock.clone()) else {
        panic!("corrupt journal must not open");
    };
    assert!(err.is_fatal());
}
