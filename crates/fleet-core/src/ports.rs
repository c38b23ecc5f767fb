//! Seams to the collaborators the core depends on: time, identity and storage.
//!
//! Everything here can be swapped for an in-memory fake in tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chassis_types::{ChassisRecord, LedgerBucket};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::StoreError;

/// Source of the current date and time
pub trait Clock: Send + Sync + fmt::Debug {
    /// Today's calendar date in local time
    fn today(&self) -> NaiveDate;

    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { today, now }
    }

    /// Noon UTC on the given day
    pub fn on(today: NaiveDate) -> Self {
        let noon = today.and_time(NaiveTime::MIN + Duration::hours(12));
        Self::new(today, Utc.from_utc_datetime(&noon))
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Generator of collision-resistant opaque ids
pub trait IdSource: Send + Sync + fmt::Debug {
    fn next_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Predictable ids (`prefix-1`, `prefix-2`, ...)
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Injected time and identity collaborators
#[derive(Debug, Clone)]
pub struct Env {
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdSource>,
}

impl Env {
    pub fn new(clock: impl Clock + 'static, ids: impl IdSource + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
            ids: Arc::new(ids),
        }
    }

    /// Wall clock and random UUIDs
    pub fn system() -> Self {
        Self::new(SystemClock, UuidIds)
    }

    /// Fixed date and sequential ids
    pub fn fixed(today: NaiveDate) -> Self {
        Self::new(FixedClock::on(today), SequentialIds::new("id"))
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn next_id(&self) -> String {
        self.ids.next_id()
    }
}

/// Persistence collaborator for the fleet and ledger tables
pub trait FleetStore {
    fn load_fleet(&self) -> Result<Vec<ChassisRecord>, StoreError>;

    fn load_ledger(&self) -> Result<BTreeMap<String, LedgerBucket>, StoreError>;

    /// Replace records by id in place; records with a new id go to the front,
    /// in batch order
    fn save_records(&mut self, records: &[ChassisRecord]) -> Result<(), StoreError>;

    fn delete_record(&mut self, id: &str) -> Result<(), StoreError>;

    /// Insert or replace the whole bucket for a chassis
    fn save_bucket(&mut self, chassis_id: &str, bucket: &LedgerBucket) -> Result<(), StoreError>;
}

/// `FleetStore` held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ChassisRecord>,
    ledger: BTreeMap<String, LedgerBucket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ChassisRecord>) -> Self {
        Self {
            records,
            ledger: BTreeMap::new(),
        }
    }

    pub fn records(&self) -> &[ChassisRecord] {
        &self.records
    }

    pub fn bucket(&self, chassis_id: &str) -> Option<&LedgerBucket> {
        self.ledger.get(chassis_id)
    }
}

impl FleetStore for MemoryStore {
    fn load_fleet(&self) -> Result<Vec<ChassisRecord>, StoreError> {
        Ok(self.records.clone())
    }

    fn load_ledger(&self) -> Result<BTreeMap<String, LedgerBucket>, StoreError> {
        Ok(self.ledger.clone())
    }

    fn save_records(&mut self, records: &[ChassisRecord]) -> Result<(), StoreError> {
        upsert_front(&mut self.records, records);
        Ok(())
    }

    fn delete_record(&mut self, id: &str) -> Result<(), StoreError> {
        self.records.retain(|r| r.id != id);
        Ok(())
    }

    fn save_bucket(&mut self, chassis_id: &str, bucket: &LedgerBucket) -> Result<(), StoreError> {
        self.ledger.insert(chassis_id.to_string(), bucket.clone());
        Ok(())
    }
}

/// Replace matching ids in place and prepend the rest, keeping their order
pub fn upsert_front(table: &mut Vec<ChassisRecord>, records: &[ChassisRecord]) {
    let mut fresh = Vec::new();
    for record in records {
        match table.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => fresh.push(record.clone()),
        }
    }
    table.splice(0..0, fresh);
}
