//! Per-chassis history buckets with copy-on-write snapshots.
//!
//! Buckets are shared as `Arc<LedgerBucket>`. A mutation clones the bucket if
//! anyone still holds the previous snapshot, so a snapshot handed out earlier
//! never changes underneath its reader. Operations against a chassis without a
//! bucket are ignored; callers run [`LedgerStore::ensure_bucket`] first.

use std::collections::BTreeMap;
use std::sync::Arc;

use chassis_types::{InspectionEvent, InspectionKind, LedgerBucket, NewCitation, NewRepair};
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::ports::Env;

#[derive(Debug, Clone)]
pub struct LedgerStore {
    buckets: BTreeMap<String, Arc<LedgerBucket>>,
    env: Env,
}

impl LedgerStore {
    pub fn new(env: Env) -> Self {
        Self {
            buckets: BTreeMap::new(),
            env,
        }
    }

    /// Build from stored buckets, repairing any dangling repair links
    pub fn from_buckets(
        buckets: impl IntoIterator<Item = (String, LedgerBucket)>,
        env: Env,
    ) -> Self {
        let mut store = Self::new(env);
        for (chassis_id, bucket) in buckets {
            store.replace_bucket(&chassis_id, bucket);
        }
        store
    }

    /// Create an empty bucket for the chassis if it has none. Idempotent.
    pub fn ensure_bucket(&mut self, chassis_id: &str) -> Arc<LedgerBucket> {
        Arc::clone(
            self.buckets
                .entry(chassis_id.to_string())
                .or_insert_with(|| {
                    debug!(chassis_id, "Created ledger bucket");
                    Arc::new(LedgerBucket::default())
                }),
        )
    }

    pub fn bucket(&self, chassis_id: &str) -> Option<Arc<LedgerBucket>> {
        self.buckets.get(chassis_id).cloned()
    }

    pub fn contains(&self, chassis_id: &str) -> bool {
        self.buckets.contains_key(chassis_id)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&str, &Arc<LedgerBucket>)> {
        self.buckets.iter().map(|(id, bucket)| (id.as_str(), bucket))
    }

    /// Record a completed inspection, newest first.
    ///
    /// Re-recording the done date already at the head of that kind's history
    /// is a no-op and returns the unchanged snapshot.
    pub fn record_inspection(
        &mut self,
        chassis_id: &str,
        kind: InspectionKind,
        done_date: NaiveDate,
    ) -> Option<Arc<LedgerBucket>> {
        let current = self.existing(chassis_id, "record_inspection")?;
        let repeat = current
            .inspections
            .of(kind)
            .first()
            .is_some_and(|latest| latest.done_date == done_date);
        if repeat {
            debug!(chassis_id, %kind, %done_date, "Inspection already recorded");
            return Some(current);
        }

        let Some(due_date) = kind.due_after(done_date) else {
            warn!(chassis_id, %kind, %done_date, "Inspection due date out of range; ignored");
            return Some(current);
        };

        drop(current);
        let event = InspectionEvent {
            id: self.env.next_id(),
            done_date,
            due_date,
            entered_at: self.env.now(),
        };
        debug!(chassis_id, %kind, %done_date, %due_date, "Recorded inspection");
        self.mutate(chassis_id, |bucket| {
            bucket.inspections.of_mut(kind).insert(0, event);
        })
    }

    /// Prepend a citation. A `token` already used for a citation in this
    /// bucket marks a repeated submission and the call is a no-op.
    pub fn add_citation(
        &mut self,
        chassis_id: &str,
        entry: NewCitation,
        token: Option<&str>,
    ) -> Option<Arc<LedgerBucket>> {
        let current = self.existing(chassis_id, "add_citation")?;
        if let Some(token) = token {
            if current.citation_tokens.contains(token) {
                debug!(chassis_id, token, "Duplicate citation submission ignored");
                return Some(current);
            }
        }

        drop(current);
        let event = entry.into_event(self.env.next_id());
        debug!(chassis_id, citation_id = %event.id, "Added citation");
        self.mutate(chassis_id, |bucket| {
            if let Some(token) = token {
                bucket.citation_tokens.insert(token.to_string());
            }
            bucket.citations.insert(0, event);
        })
    }

    /// Prepend a repair. A link to a citation missing from this bucket is
    /// dropped rather than stored dangling.
    pub fn add_repair(
        &mut self,
        chassis_id: &str,
        entry: NewRepair,
        token: Option<&str>,
    ) -> Option<Arc<LedgerBucket>> {
        let current = self.existing(chassis_id, "add_repair")?;
        if let Some(token) = token {
            if current.repair_tokens.contains(token) {
                debug!(chassis_id, token, "Duplicate repair submission ignored");
                return Some(current);
            }
        }

        let mut event = entry.into_event(self.env.next_id());
        if let Some(citation_id) = event.citation_id.as_deref() {
            if !current.has_citation(citation_id) {
                warn!(
                    chassis_id,
                    citation_id, "Repair linked to unknown citation; link dropped"
                );
                event.citation_id = None;
            }
        }
        drop(current);
        debug!(chassis_id, repair_id = %event.id, "Added repair");
        self.mutate(chassis_id, |bucket| {
            if let Some(token) = token {
                bucket.repair_tokens.insert(token.to_string());
            }
            bucket.repairs.insert(0, event);
        })
    }

    /// Remove a citation and clear every repair link to it in one step
    pub fn delete_citation(
        &mut self,
        chassis_id: &str,
        citation_id: &str,
    ) -> Option<Arc<LedgerBucket>> {
        self.existing(chassis_id, "delete_citation")?;
        self.mutate(chassis_id, |bucket| {
            bucket.citations.retain(|c| c.id != citation_id);
            let mut unlinked = 0usize;
            for repair in &mut bucket.repairs {
                if repair.citation_id.as_deref() == Some(citation_id) {
                    repair.citation_id = None;
                    unlinked += 1;
                }
            }
            debug!(chassis_id, citation_id, unlinked, "Deleted citation");
        })
    }

    pub fn delete_repair(
        &mut self,
        chassis_id: &str,
        repair_id: &str,
    ) -> Option<Arc<LedgerBucket>> {
        self.existing(chassis_id, "delete_repair")?;
        self.mutate(chassis_id, |bucket| {
            bucket.repairs.retain(|r| r.id != repair_id);
        })
    }

    pub fn delete_inspection(
        &mut self,
        chassis_id: &str,
        kind: InspectionKind,
        entry_id: &str,
    ) -> Option<Arc<LedgerBucket>> {
        self.existing(chassis_id, "delete_inspection")?;
        self.mutate(chassis_id, |bucket| {
            bucket.inspections.of_mut(kind).retain(|e| e.id != entry_id);
        })
    }

    /// Install a whole bucket (e.g. from a remote change), clearing any repair
    /// link that names a citation the bucket does not contain.
    pub fn replace_bucket(
        &mut self,
        chassis_id: &str,
        mut bucket: LedgerBucket,
    ) -> Arc<LedgerBucket> {
        let cleared = bucket.clear_dangling_links();
        if cleared > 0 {
            warn!(chassis_id, cleared, "Cleared dangling citation links");
        }
        let bucket = Arc::new(bucket);
        self.buckets.insert(chassis_id.to_string(), Arc::clone(&bucket));
        bucket
    }

    pub fn remove_bucket(&mut self, chassis_id: &str) -> Option<Arc<LedgerBucket>> {
        self.buckets.remove(chassis_id)
    }

    fn existing(&self, chassis_id: &str, operation: &'static str) -> Option<Arc<LedgerBucket>> {
        let bucket = self.bucket(chassis_id);
        if bucket.is_none() {
            warn!(chassis_id, operation, "No ledger bucket for chassis; ignored");
        }
        bucket
    }

    fn mutate(
        &mut self,
        chassis_id: &str,
        apply: impl FnOnce(&mut LedgerBucket),
    ) -> Option<Arc<LedgerBucket>> {
        let bucket = self.buckets.get_mut(chassis_id)?;
        apply(Arc::make_mut(bucket));
        Some(Arc::clone(bucket))
    }
}

/// Completion date to prefill from an existing due date
pub fn last_done_from_due(kind: InspectionKind, due: Option<NaiveDate>) -> Option<NaiveDate> {
    due.and_then(|due| kind.done_before(due))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chassis_types::RepairEvent;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> LedgerStore {
        let mut store = LedgerStore::new(Env::fixed(date(2024, 6, 1)));
        store.ensure_bucket("c1");
        store
    }

    fn citation(number: &str) -> NewCitation {
        NewCitation {
            date: Some(date(2024, 3, 2)),
            number: number.to_string(),
            location: "Port of Oakland".to_string(),
            notes: String::new(),
        }
    }

    fn repair(work: &str, citation_id: Option<&str>) -> NewRepair {
        NewRepair {
            date: Some(date(2024, 3, 9)),
            vendor: "Bay Chassis".to_string(),
            work: work.to_string(),
            notes: String::new(),
            citation_id: citation_id.map(str::to_string),
        }
    }

    fn links(repairs: &[RepairEvent]) -> Vec<Option<&str>> {
        repairs.iter().map(|r| r.citation_id.as_deref()).collect()
    }

    #[test]
    fn test_ensure_bucket_is_idempotent() {
        let mut store = store();
        store.add_citation("c1", citation("A1"), None);
        let bucket = store.ensure_bucket("c1");
        assert_eq!(bucket.citations.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_repeated_inspection_is_recorded_once() {
        let mut store = store();
        store.record_inspection("c1", InspectionKind::Annual, date(2024, 1, 10));
        let bucket = store
            .record_inspection("c1", InspectionKind::Annual, date(2024, 1, 10))
            .unwrap();

        assert_eq!(bucket.inspections.annual.len(), 1);
        assert_eq!(bucket.inspections.annual[0].due_date, date(2025, 1, 10));
    }

    #[test]
    fn test_inspections_are_newest_first() {
        let mut store = store();
        store.record_inspection("c1", InspectionKind::Annual, date(2024, 1, 10));
        let bucket = store
            .record_inspection("c1", InspectionKind::Annual, date(2024, 6, 1))
            .unwrap();

        let annual = &bucket.inspections.annual;
        assert_eq!(annual.len(), 2);
        assert_eq!(annual[0].done_date, date(2024, 6, 1));
        assert_eq!(annual[1].done_date, date(2024, 1, 10));
        assert!(bucket.inspections.bit.is_empty());
    }

    #[test]
    fn test_bit_inspection_due_in_ninety_days() {
        let mut store = store();
        let bucket = store
            .record_inspection("c1", InspectionKind::Bit, date(2024, 6, 1))
            .unwrap();
        assert_eq!(bucket.inspections.bit[0].due_date, date(2024, 8, 30));
    }

    #[test]
    fn test_only_head_entry_blocks_a_repeat() {
        let mut store = store();
        store.record_inspection("c1", InspectionKind::Bit, date(2024, 1, 1));
        store.record_inspection("c1", InspectionKind::Bit, date(2024, 4, 1));
        let bucket = store
            .record_inspection("c1", InspectionKind::Bit, date(2024, 1, 1))
            .unwrap();
        assert_eq!(bucket.inspections.bit.len(), 3);
    }

    #[test]
    fn test_token_blocks_double_submission() {
        let mut store = store();
        store.add_citation("c1", citation("A1"), Some("tok-1"));
        store.add_citation("c1", citation("A1"), Some("tok-1"));
        let bucket = store.add_citation("c1", citation("A1"), None).unwrap();
        // the untokened one is legitimate duplicate data
        assert_eq!(bucket.citations.len(), 2);

        // tokens are scoped per sub-collection
        let bucket = store.add_repair("c1", repair("lights", None), Some("tok-1")).unwrap();
        assert_eq!(bucket.repairs.len(), 1);
    }

    #[test]
    fn test_delete_citation_unlinks_repairs() {
        let mut store = store();
        store.add_citation("c1", citation("A1"), None);
        store.add_citation("c1", citation("B2"), None);
        let bucket = store.bucket("c1").unwrap();
        let b2 = bucket.citations[0].id.clone();
        let a1 = bucket.citations[1].id.clone();

        store.add_repair("c1", repair("r1", Some(&a1)), None);
        store.add_repair("c1", repair("r2", Some(&a1)), None);
        store.add_repair("c1", repair("r3", Some(&b2)), None);
        store.add_repair("c1", repair("r4", None), None);

        let bucket = store.delete_citation("c1", &a1).unwrap();
        assert!(!bucket.has_citation(&a1));
        assert_eq!(bucket.citations.len(), 1);
        // newest first: r4, r3, r2, r1
        assert_eq!(links(&bucket.repairs), vec![None, Some(b2.as_str()), None, None]);
    }

    #[test]
    fn test_repair_with_unknown_citation_is_stored_unlinked() {
        let mut store = store();
        let bucket = store.add_repair("c1", repair("mudflap", Some("missing")), None).unwrap();
        assert_eq!(bucket.repairs[0].citation_id, None);
    }

    #[test]
    fn test_delete_repair_and_inspection() {
        let mut store = store();
        store.add_repair("c1", repair("r1", None), None);
        let bucket = store
            .record_inspection("c1", InspectionKind::Annual, date(2024, 2, 2))
            .unwrap();
        let repair_id = bucket.repairs[0].id.clone();
        let inspection_id = bucket.inspections.annual[0].id.clone();

        store.delete_repair("c1", &repair_id);
        let bucket = store
            .delete_inspection("c1", InspectionKind::Annual, &inspection_id)
            .unwrap();
        assert!(bucket.is_empty());
    }

    #[test]
    fn test_missing_bucket_is_a_noop() {
        let mut store = store();
        assert!(store.add_citation("nope", citation("A1"), None).is_none());
        assert!(store.delete_citation("nope", "x").is_none());
        assert!(store
            .record_inspection("nope", InspectionKind::Bit, date(2024, 1, 1))
            .is_none());
        assert!(!store.contains("nope"));
    }

    #[test]
    fn test_snapshots_are_not_mutated_in_place() {
        let mut store = store();
        let before = store.bucket("c1").unwrap();
        let after = store.add_citation("c1", citation("A1"), None).unwrap();
        assert!(before.citations.is_empty());
        assert_eq!(after.citations.len(), 1);
    }

    #[test]
    fn test_noop_returns_same_snapshot() {
        let mut store = store();
        let first = store
            .record_inspection("c1", InspectionKind::Bit, date(2024, 1, 1))
            .unwrap();
        let again = store
            .record_inspection("c1", InspectionKind::Bit, date(2024, 1, 1))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_replace_bucket_clears_dangling_links() {
        let mut store = store();
        let mut bucket = LedgerBucket::default();
        bucket.repairs.push(repair("r", Some("ghost")).into_event("r1".to_string()));
        let installed = store.replace_bucket("c1", bucket);
        assert_eq!(installed.repairs[0].citation_id, None);
    }

    #[test]
    fn test_last_done_prefill() {
        assert_eq!(
            last_done_from_due(InspectionKind::Annual, Some(date(2025, 1, 10))),
            Some(date(2024, 1, 10))
        );
        assert_eq!(
            last_done_from_due(InspectionKind::Bit, Some(date(2024, 8, 30))),
            Some(date(2024, 6, 1))
        );
        assert_eq!(last_done_from_due(InspectionKind::Bit, None), None);
    }
}
