//! The live fleet: chassis records plus their ledger buckets.
//!
//! `FleetRegistry` is cheap to clone. Records sit behind an `Arc<Vec<_>>` and
//! buckets behind `Arc<LedgerBucket>`, so a clone is a snapshot that later
//! mutations never disturb.

use std::sync::Arc;

use chassis_types::{
    ChangeEvent, ChangeKind, ChassisRecord, InspectionKind, LedgerBucket, LedgerRow,
};
use chrono::NaiveDate;
use compliance_engine::ComplianceEngine;
use tracing::debug;

use crate::error::{FleetError, ImportError};
use crate::import::{import_rows, ImportOutcome, RowMatrix};
use crate::ledger::{last_done_from_due, LedgerStore};
use crate::ports::Env;
use crate::view::{self, ViewQuery};

/// Last-done inspection dates entered alongside a record edit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectionEntry {
    pub last_annual: Option<NaiveDate>,
    pub last_bit: Option<NaiveDate>,
}

impl InspectionEntry {
    /// Prefill from a record's current due dates
    pub fn prefill(record: &ChassisRecord) -> Self {
        Self {
            last_annual: last_done_from_due(InspectionKind::Annual, record.annual_due),
            last_bit: last_done_from_due(InspectionKind::Bit, record.bit_due),
        }
    }

    pub fn get(&self, kind: InspectionKind) -> Option<NaiveDate> {
        match kind {
            InspectionKind::Annual => self.last_annual,
            InspectionKind::Bit => self.last_bit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FleetRegistry {
    records: Arc<Vec<ChassisRecord>>,
    ledger: LedgerStore,
    env: Env,
}

impl FleetRegistry {
    pub fn new(env: Env) -> Self {
        Self {
            records: Arc::new(Vec::new()),
            ledger: LedgerStore::new(env.clone()),
            env,
        }
    }

    /// Assemble from loaded state. Every record gets a bucket; stored buckets
    /// for chassis no longer in the fleet are kept as they are.
    pub fn from_parts(
        records: Vec<ChassisRecord>,
        buckets: impl IntoIterator<Item = (String, LedgerBucket)>,
        env: Env,
    ) -> Self {
        let mut registry = Self {
            records: Arc::new(records),
            ledger: LedgerStore::from_buckets(buckets, env.clone()),
            env,
        };
        registry.ensure_live_buckets();
        registry
    }

    pub fn records(&self) -> &[ChassisRecord] {
        &self.records
    }

    /// Shared handle to the current record list
    pub fn snapshot(&self) -> Arc<Vec<ChassisRecord>> {
        Arc::clone(&self.records)
    }

    pub fn get(&self, id: &str) -> Option<&ChassisRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut LedgerStore {
        &mut self.ledger
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// A blank record with a fresh id, not yet part of the fleet
    pub fn new_record(&self) -> ChassisRecord {
        ChassisRecord::new(self.env.next_id())
    }

    /// Replace the record with the same id in place, or prepend it if new.
    /// Returns `true` when the record was new.
    pub fn upsert(&mut self, record: ChassisRecord) -> bool {
        let id = record.id.clone();
        let records = Arc::make_mut(&mut self.records);
        let created = match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                *existing = record;
                false
            }
            None => {
                records.insert(0, record);
                true
            }
        };
        self.ledger.ensure_bucket(&id);
        debug!(chassis_id = %id, created, "Upserted chassis");
        created
    }

    /// Prepend new records, keeping their order
    pub fn prepend(&mut self, new_records: &[ChassisRecord]) {
        if new_records.is_empty() {
            return;
        }
        Arc::make_mut(&mut self.records).splice(0..0, new_records.iter().cloned());
        for record in new_records {
            self.ledger.ensure_bucket(&record.id);
        }
    }

    /// Remove a record. Its ledger bucket is left in place.
    pub fn remove(&mut self, id: &str) -> Option<ChassisRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        let removed = Arc::make_mut(&mut self.records).remove(index);
        debug!(chassis_id = id, "Removed chassis");
        Some(removed)
    }

    /// Save an edited or new record.
    ///
    /// A last-done date overrides the matching due date (done + renewal
    /// cycle) and is recorded in the chassis's inspection history.
    pub fn save_edit(
        &mut self,
        mut record: ChassisRecord,
        entry: InspectionEntry,
    ) -> Result<ChassisRecord, FleetError> {
        if record.unit.trim().is_empty() && record.plate.trim().is_empty() {
            return Err(FleetError::MissingIdentity);
        }

        for kind in InspectionKind::ALL {
            if let Some(done) = entry.get(kind) {
                if let Some(due) = kind.due_after(done) {
                    record.set_due_for(kind, Some(due));
                }
            }
        }

        let id = record.id.clone();
        self.upsert(record.clone());
        for kind in InspectionKind::ALL {
            if let Some(done) = entry.get(kind) {
                self.ledger.record_inspection(&id, kind, done);
            }
        }
        Ok(record)
    }

    /// Import rows and prepend the accepted records. Nothing changes on error.
    pub fn import(&mut self, rows: &RowMatrix) -> Result<ImportOutcome, ImportError> {
        let outcome = import_rows(rows, &self.records, self.env.ids.as_ref())?;
        self.prepend(&outcome.accepted);
        Ok(outcome)
    }

    /// Filtered and sorted records as of the injected clock's today
    pub fn view(&self, query: &ViewQuery, engine: &ComplianceEngine) -> Vec<ChassisRecord> {
        view::select(&self.records, query, engine, self.env.today())
    }

    /// Fold a remote fleet change: created/updated upsert the whole record by
    /// id, deleted removes it.
    pub fn apply_fleet_change(&mut self, event: ChangeEvent<ChassisRecord>) {
        match event.kind {
            ChangeKind::Created | ChangeKind::Updated => {
                self.upsert(event.record);
            }
            ChangeKind::Deleted => {
                self.remove(&event.record.id);
            }
        }
    }

    /// Fold a remote ledger change. A deleted bucket of a live chassis is
    /// replaced by an empty one.
    pub fn apply_ledger_change(&mut self, event: ChangeEvent<LedgerRow>) {
        let LedgerRow { chassis_id, bucket } = event.record;
        match event.kind {
            ChangeKind::Created | ChangeKind::Updated => {
                self.ledger.replace_bucket(&chassis_id, bucket);
            }
            ChangeKind::Deleted => {
                self.ledger.remove_bucket(&chassis_id);
            }
        }
        self.ensure_live_buckets();
    }

    fn ensure_live_buckets(&mut self) {
        for record in self.records.iter() {
            self.ledger.ensure_bucket(&record.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::rows_from;
    use chassis_types::{CitationEvent, NewCitation, RepairEvent};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn registry() -> FleetRegistry {
        FleetRegistry::new(Env::fixed(date(2024, 5, 10)))
    }

    fn record(id: &str, unit: &str) -> ChassisRecord {
        ChassisRecord {
            unit: unit.to_string(),
            ..ChassisRecord::new(id)
        }
    }

    fn units(registry: &FleetRegistry) -> Vec<&str> {
        registry.records().iter().map(|r| r.unit.as_str()).collect()
    }

    #[test]
    fn test_upsert_prepends_new_and_replaces_existing() {
        let mut registry = registry();
        assert!(registry.upsert(record("a", "CH-1")));
        assert!(registry.upsert(record("b", "CH-2")));
        assert!(!registry.upsert(record("a", "CH-1B")));

        assert_eq!(units(&registry), vec!["CH-2", "CH-1B"]);
        assert!(registry.ledger().contains("a"));
        assert!(registry.ledger().contains("b"));
    }

    #[test]
    fn test_remove_keeps_bucket() {
        let mut registry = registry();
        registry.upsert(record("a", "CH-1"));
        let removed = registry.remove("a").unwrap();
        assert_eq!(removed.unit, "CH-1");
        assert!(registry.is_empty());
        assert!(registry.ledger().contains("a"));
        assert!(registry.remove("a").is_none());
    }

    #[test]
    fn test_from_parts_ensures_buckets() {
        let registry = FleetRegistry::from_parts(
            vec![record("a", "CH-1")],
            [("orphan".to_string(), LedgerBucket::default())],
            Env::fixed(date(2024, 5, 10)),
        );
        assert!(registry.ledger().contains("a"));
        assert!(registry.ledger().contains("orphan"));
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_edits() {
        let mut registry = registry();
        registry.upsert(record("a", "CH-1"));
        let before = registry.snapshot();
        registry.upsert(record("a", "CH-9"));
        assert_eq!(before[0].unit, "CH-1");
        assert_eq!(registry.records()[0].unit, "CH-9");
    }

    #[test]
    fn test_save_edit_requires_unit_or_plate() {
        let mut registry = registry();
        let blank = registry.new_record();
        let err = registry
            .save_edit(blank, InspectionEntry::default())
            .unwrap_err();
        assert!(matches!(err, FleetError::MissingIdentity));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_save_edit_derives_due_dates_and_history() {
        let mut registry = registry();
        let mut edited = registry.new_record();
        edited.plate = "AAA111".to_string();
        let entry = InspectionEntry {
            last_annual: Some(date(2024, 1, 10)),
            last_bit: Some(date(2024, 6, 1)),
        };

        let saved = registry.save_edit(edited.clone(), entry).unwrap();
        assert_eq!(saved.annual_due, Some(date(2025, 1, 10)));
        assert_eq!(saved.bit_due, Some(date(2024, 8, 30)));

        // Resubmitting the same form does not repeat history
        registry.save_edit(saved.clone(), entry).unwrap();
        let bucket = registry.ledger().bucket(&saved.id).unwrap();
        assert_eq!(bucket.inspections.annual.len(), 1);
        assert_eq!(bucket.inspections.bit.len(), 1);
        assert_eq!(InspectionEntry::prefill(&saved), entry);
    }

    #[test]
    fn test_import_prepends_in_row_order() {
        let mut registry = registry();
        registry.upsert(record("a", "CH-0"));
        let rows = rows_from([["CH-1", "AAA111", "VIN1"], ["CH-2", "BBB222", "VIN2"]]);
        let outcome = registry.import(&rows).unwrap();
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(units(&registry), vec!["CH-1", "CH-2", "CH-0"]);
        assert!(registry.ledger().contains(&outcome.accepted[1].id));
    }

    #[test]
    fn test_failed_import_changes_nothing() {
        let mut registry = registry();
        let rows = rows_from([["Unit", "Tag"]]);
        assert_eq!(
            registry.import(&rows),
            Err(ImportError::MissingColumns(vec!["vin"]))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remote_fleet_changes() {
        let mut registry = registry();
        registry.apply_fleet_change(ChangeEvent::created(record("a", "CH-1")));
        registry.apply_fleet_change(ChangeEvent::updated(record("a", "CH-2")));
        assert_eq!(units(&registry), vec!["CH-2"]);

        registry.apply_fleet_change(ChangeEvent::deleted(record("a", "")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remote_ledger_change_clears_dangling_links() {
        let mut registry = registry();
        registry.upsert(record("a", "CH-1"));
        let mut bucket = LedgerBucket::default();
        bucket.repairs.push(RepairEvent {
            id: "r1".to_string(),
            date: None,
            vendor: String::new(),
            work: "Brake lines".to_string(),
            notes: String::new(),
            citation_id: Some("gone".to_string()),
        });
        registry.apply_ledger_change(ChangeEvent::updated(LedgerRow {
            chassis_id: "a".to_string(),
            bucket,
        }));
        let stored = registry.ledger().bucket("a").unwrap();
        assert_eq!(stored.repairs[0].citation_id, None);

        registry.apply_ledger_change(ChangeEvent::deleted(LedgerRow {
            chassis_id: "a".to_string(),
            bucket: LedgerBucket::default(),
        }));
        assert!(registry.ledger().bucket("a").unwrap().is_empty());
    }

    #[test]
    fn test_ledger_operations_through_registry() {
        let mut registry = registry();
        registry.upsert(record("a", "CH-1"));
        let bucket = registry
            .ledger_mut()
            .add_citation("a", NewCitation::default(), None)
            .unwrap();
        let citation: &CitationEvent = &bucket.citations[0];
        assert_eq!(citation.id, "id-1");
    }
}
