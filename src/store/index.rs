//! In-memory record index shared by every store implementation

use std::collections::HashMap;

use chrono::NaiveDateTime;

use super::backend::EntitySelection;
use super::ids::{BranchId, EntityId, RecordId};
use super::page::{Page, PageRequest};
use super::record::{EntityHistory, PatchDraft, PatchRecord};
use super::visibility::Visibility;

#[derive(Debug, Default)]
pub(crate) struct PatchIndex {
    entities: HashMap<EntityId, Vec<PatchRecord>>,
    last_created_at: Option<NaiveDateTime>,
    last_sequence: u64,
    records: usize,
}

impl PatchIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Turns a draft into a record ordered after everything seen so far.
    ///
    /// A clock that steps backwards is clamped to the last stamp.
    pub(crate) fn stamp(&self, draft: PatchDraft, now: NaiveDateTime) -> PatchRecord {
        let created_at = match self.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        };
        PatchRecord {
            id: RecordId::new(),
            entity_id: draft.entity_id,
            branch_id: draft.branch_id,
            operations: draft.operations,
            created_at,
            sequence: self.last_sequence + 1,
        }
    }

    pub(crate) fn insert(&mut self, record: PatchRecord) {
        if self.last_created_at.map_or(true, |last| record.created_at > last) {
            self.last_created_at = Some(record.created_at);
        }
        self.last_sequence = self.last_sequence.max(record.sequence);

        let history = self.entities.entry(record.entity_id).or_default();
        let key = record.order_key();
        let at = history.partition_point(|r| r.order_key() <= key);
        history.insert(at, record);
        self.records += 1;
    }

    pub(crate) fn query(&self, entity: EntityId, visibility: &Visibility) -> Vec<PatchRecord> {
        self.entities
            .get(&entity)
            .map(|history| {
                history
                    .iter()
                    .filter(|r| visibility.admits(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count_visible(&self, entity: EntityId, visibility: &Visibility) -> u64 {
        self.entities.get(&entity).map_or(0, |history| {
            history.iter().filter(|r| visibility.admits(r)).count() as u64
        })
    }

    pub(crate) fn query_many(
        &self,
        selection: &EntitySelection,
        visibility: &Visibility,
        page: Option<PageRequest>,
    ) -> Page<EntityHistory> {
        let ids: Vec<EntityId> = match selection {
            EntitySelection::All => self.entities.keys().copied().collect(),
            EntitySelection::Only(ids) => {
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
        };

        let mut ranked: Vec<EntityHistory> = ids
            .into_iter()
            .filter_map(|entity_id| {
                let records = self.query(entity_id, visibility);
                (!records.is_empty()).then_some(EntityHistory { entity_id, records })
            })
            .collect();

        // sequence is store-wide, so the key never ties across entities
        ranked.sort_by(|a, b| {
            let ka = a.latest().map(PatchRecord::order_key);
            let kb = b.latest().map(PatchRecord::order_key);
            kb.cmp(&ka)
        });

        Page::slice(ranked, page)
    }

    pub(crate) fn contains_entity(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    pub(crate) fn purge_entity(&mut self, entity: EntityId) -> usize {
        let removed = self.entities.remove(&entity).map_or(0, |h| h.len());
        self.records -= removed;
        removed
    }

    pub(crate) fn purge_where(&mut self, mut doomed: impl FnMut(&PatchRecord) -> bool) -> usize {
        let mut removed = 0;
        self.entities.retain(|_, history| {
            let before = history.len();
            history.retain(|r| !doomed(r));
            removed += before - history.len();
            !history.is_empty()
        });
        self.records -= removed;
        removed
    }

    pub(crate) fn purge_branch(&mut self, branch: BranchId) -> usize {
        self.purge_where(|r| r.branch_id == Some(branch))
    }

    pub(crate) fn purge_all_branches(&mut self) -> usize {
        self.purge_where(|r| r.branch_id.is_some())
    }

    /// Drops every record. Stamping state is kept so timestamps never repeat.
    pub(crate) fn purge_all(&mut self) -> usize {
        let removed = self.records;
        self.entities.clear();
        self.records = 0;
        removed
    }

    pub(crate) fn record_count(&self) -> usize {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;
    use chrono::NaiveDate;

    fn at(sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, sec)
            .unwrap()
    }

    fn append(index: &mut PatchIndex, entity: EntityId, branch: Option<BranchId>, sec: u32) -> PatchRecord {
        let record = index.stamp(PatchDraft::new(entity, branch, Patch::new()), at(sec));
        index.insert(record.clone());
        record
    }

    #[test]
    fn test_stamp_is_monotonic_under_clock_skew() {
        let mut index = PatchIndex::new();
        let e = EntityId::new();
        let first = append(&mut index, e, None, 30);
        let second = append(&mut index, e, None, 10);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.sequence > first.sequence);
        assert_eq!(index.query(e, &Visibility::main(None)), vec![first, second]);
    }

    #[test]
    fn test_query_many_ranks_by_latest_visible_record() {
        let mut index = PatchIndex::new();
        let (a, b, c) = (EntityId::new(), EntityId::new(), EntityId::new());
        append(&mut index, a, None, 1);
        append(&mut index, b, None, 2);
        append(&mut index, a, None, 3);
        append(&mut index, c, None, 9);

        let all = index.query_many(&EntitySelection::All, &Visibility::main(None), None);
        let order: Vec<_> = all.items.iter().map(|h| h.entity_id).collect();
        assert_eq!(order, vec![c, a, b]);

        let bounded = index.query_many(&EntitySelection::All, &Visibility::main(Some(at(2))), None);
        let order: Vec<_> = bounded.items.iter().map(|h| h.entity_id).collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(bounded.items[1].records.len(), 1);
    }

    #[test]
    fn test_purge_branch_keeps_main_records() {
        let mut index = PatchIndex::new();
        let e = EntityId::new();
        let branch = BranchId::new();
        append(&mut index, e, None, 1);
        append(&mut index, e, Some(branch), 2);
        append(&mut index, EntityId::new(), Some(branch), 3);

        assert_eq!(index.purge_branch(branch), 2);
        assert_eq!(index.record_count(), 1);
        assert!(index.contains_entity(e));
    }

    #[test]
    fn test_purge_all_keeps_stamping_monotonic() {
        let mut index = PatchIndex::new();
        let last = append(&mut index, EntityId::new(), None, 40);
        assert_eq!(index.purge_all(), 1);
        let next = append(&mut index, EntityId::new(), None, 5);
        assert_eq!(next.created_at, last.created_at);
        assert_eq!(next.sequence, last.sequence + 1);
    }
}
