//! Registry plus persistence: every local mutation is saved through a
//! [`FleetStore`] before it is considered done.
//!
//! A store failure restores the registry to its state before the mutation
//! and surfaces as [`FleetError::Persistence`]. Nothing is retried.

use std::sync::Arc;

use chassis_types::{
    ChangeEvent, ChassisRecord, InspectionKind, LedgerBucket, LedgerRow, NewCitation, NewRepair,
};
use chrono::NaiveDate;
use compliance_engine::ComplianceEngine;
use tracing::{debug, error, info, warn};

use crate::demo::demo_fleet;
use crate::error::{FleetError, StoreError};
use crate::export::to_delimited;
use crate::import::{ImportOutcome, RowMatrix};
use crate::ledger::LedgerStore;
use crate::ports::{Env, FleetStore};
use crate::registry::{FleetRegistry, InspectionEntry};
use crate::view::ViewQuery;

#[derive(Debug)]
pub struct Tracker<S: FleetStore> {
    registry: FleetRegistry,
    store: S,
    engine: ComplianceEngine,
}

impl<S: FleetStore> Tracker<S> {
    /// Load the fleet and ledger from `store`
    pub fn load(store: S, env: Env, engine: ComplianceEngine) -> Result<Self, FleetError> {
        let records = store.load_fleet()?;
        let buckets = store.load_ledger()?;
        info!(
            chassis = records.len(),
            buckets = buckets.len(),
            "Loaded fleet"
        );
        Ok(Self {
            registry: FleetRegistry::from_parts(records, buckets, env),
            store,
            engine,
        })
    }

    pub fn registry(&self) -> &FleetRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &ComplianceEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn view(&self, query: &ViewQuery) -> Vec<ChassisRecord> {
        self.registry.view(query, &self.engine)
    }

    /// The filtered view as comma-separated text
    pub fn export(&self, query: &ViewQuery) -> String {
        to_delimited(&self.view(query))
    }

    /// Seed the sample chassis into an empty fleet. Returns how many were
    /// added.
    pub fn seed_demo(&mut self) -> Result<usize, FleetError> {
        if !self.registry.is_empty() {
            debug!("Fleet not empty; demo data skipped");
            return Ok(0);
        }
        let demo = demo_fleet(self.registry.env().today(), self.registry.env().ids.as_ref());
        self.commit(
            "seed demo fleet",
            |registry| {
                registry.prepend(&demo);
                Ok(demo.len())
            },
            |store, _, _| store.save_records(&demo),
        )
    }

    pub fn save_edit(
        &mut self,
        record: ChassisRecord,
        entry: InspectionEntry,
    ) -> Result<ChassisRecord, FleetError> {
        let before = self.registry.ledger().bucket(&record.id);
        let previous = self.registry.get(&record.id).cloned();
        self.commit(
            "save chassis",
            |registry| registry.save_edit(record, entry),
            |store, registry, saved| {
                store.save_records(std::slice::from_ref(saved))?;
                let ledger = registry.ledger();
                save_if_changed(store, ledger, &saved.id, before.as_ref()).inspect_err(|_| {
                    undo_record_save(store, &saved.id, previous.as_ref());
                })
            },
        )
    }

    /// Remove a chassis. Its ledger bucket is kept.
    pub fn remove(&mut self, id: &str) -> Result<ChassisRecord, FleetError> {
        self.commit(
            "remove chassis",
            |registry| {
                registry
                    .remove(id)
                    .ok_or_else(|| FleetError::UnknownChassis(id.to_string()))
            },
            |store, _, _| store.delete_record(id),
        )
    }

    pub fn import(&mut self, rows: &RowMatrix) -> Result<ImportOutcome, FleetError> {
        self.commit(
            "import chassis",
            |registry| Ok(registry.import(rows)?),
            |store, _, outcome| {
                if outcome.accepted.is_empty() {
                    return Ok(());
                }
                store.save_records(&outcome.accepted)
            },
        )
    }

    pub fn record_inspection(
        &mut self,
        chassis_id: &str,
        kind: InspectionKind,
        done_date: NaiveDate,
    ) -> Result<Arc<LedgerBucket>, FleetError> {
        self.ledger_change("record inspection", chassis_id, |ledger| {
            ledger.record_inspection(chassis_id, kind, done_date)
        })
    }

    pub fn add_citation(
        &mut self,
        chassis_id: &str,
        entry: NewCitation,
        token: Option<&str>,
    ) -> Result<Arc<LedgerBucket>, FleetError> {
        self.ledger_change("add citation", chassis_id, |ledger| {
            ledger.add_citation(chassis_id, entry, token)
        })
    }

    pub fn add_repair(
        &mut self,
        chassis_id: &str,
        entry: NewRepair,
        token: Option<&str>,
    ) -> Result<Arc<LedgerBucket>, FleetError> {
        self.ledger_change("add repair", chassis_id, |ledger| {
            ledger.add_repair(chassis_id, entry, token)
        })
    }

    pub fn delete_citation(
        &mut self,
        chassis_id: &str,
        citation_id: &str,
    ) -> Result<Arc<LedgerBucket>, FleetError> {
        self.ledger_change("delete citation", chassis_id, |ledger| {
            ledger.delete_citation(chassis_id, citation_id)
        })
    }

    pub fn delete_repair(
        &mut self,
        chassis_id: &str,
        repair_id: &str,
    ) -> Result<Arc<LedgerBucket>, FleetError> {
        self.ledger_change("delete repair", chassis_id, |ledger| {
            ledger.delete_repair(chassis_id, repair_id)
        })
    }

    pub fn delete_inspection(
        &mut self,
        chassis_id: &str,
        kind: InspectionKind,
        entry_id: &str,
    ) -> Result<Arc<LedgerBucket>, FleetError> {
        self.ledger_change("delete inspection", chassis_id, |ledger| {
            ledger.delete_inspection(chassis_id, kind, entry_id)
        })
    }

    /// Fold a change that already happened remotely; nothing is saved
    pub fn apply_fleet_change(&mut self, event: ChangeEvent<ChassisRecord>) {
        debug!(kind = ?event.kind, chassis_id = %event.record.id, "Remote fleet change");
        self.registry.apply_fleet_change(event);
    }

    pub fn apply_ledger_change(&mut self, event: ChangeEvent<LedgerRow>) {
        debug!(kind = ?event.kind, chassis_id = %event.record.chassis_id, "Remote ledger change");
        self.registry.apply_ledger_change(event);
    }

    /// Run a ledger operation against a chassis in the fleet and save the
    /// bucket if it changed
    fn ledger_change(
        &mut self,
        operation: &'static str,
        chassis_id: &str,
        change: impl FnOnce(&mut LedgerStore) -> Option<Arc<LedgerBucket>>,
    ) -> Result<Arc<LedgerBucket>, FleetError> {
        if self.registry.get(chassis_id).is_none() {
            return Err(FleetError::UnknownChassis(chassis_id.to_string()));
        }
        let before = self.registry.ledger().bucket(chassis_id);
        self.commit(
            operation,
            |registry| {
                let ledger = registry.ledger_mut();
                ledger.ensure_bucket(chassis_id);
                change(ledger).ok_or_else(|| FleetError::UnknownChassis(chassis_id.to_string()))
            },
            |store, registry, _| {
                save_if_changed(store, registry.ledger(), chassis_id, before.as_ref())
            },
        )
    }

    fn commit<T>(
        &mut self,
        operation: &'static str,
        change: impl FnOnce(&mut FleetRegistry) -> Result<T, FleetError>,
        persist: impl FnOnce(&mut S, &FleetRegistry, &T) -> Result<(), StoreError>,
    ) -> Result<T, FleetError> {
        let previous = self.registry.clone();
        let value = change(&mut self.registry)?;
        if let Err(err) = persist(&mut self.store, &self.registry, &value) {
            error!(operation, error = %err, "Persisting change failed; rolled back");
            self.registry = previous;
            return Err(FleetError::Persistence(err));
        }
        debug!(operation, "Change persisted");
        Ok(value)
    }
}

fn save_if_changed<S: FleetStore>(
    store: &mut S,
    ledger: &LedgerStore,
    chassis_id: &str,
    before: Option<&Arc<LedgerBucket>>,
) -> Result<(), StoreError> {
    match ledger.bucket(chassis_id) {
        Some(after) if before.is_some_and(|before| Arc::ptr_eq(before, &after)) => Ok(()),
        Some(after) => store.save_bucket(chassis_id, &after),
        None => Ok(()),
    }
}

/// Put the stored record back the way it was before a half-finished save
fn undo_record_save<S: FleetStore>(store: &mut S, id: &str, previous: Option<&ChassisRecord>) {
    let undone = match previous {
        Some(previous) => store.save_records(std::slice::from_ref(previous)),
        None => store.delete_record(id),
    };
    if let Err(err) = undone {
        warn!(chassis_id = id, error = %err, "Could not undo saved chassis record");
    }
}
