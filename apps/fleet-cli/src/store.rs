//! JSON-file persistence for the fleet and ledger tables
//!
//! The whole table is rewritten on every save. Files are written to a
//! temporary sibling first and renamed into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chassis_types::{ChassisRecord, LedgerBucket};
use fleet_core::{upsert_front, FleetStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub const FLEET_FILE: &str = "fleet.json";
pub const LEDGER_FILE: &str = "ledger.json";

#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    records: Vec<ChassisRecord>,
    ledger: BTreeMap<String, LedgerBucket>,
}

impl JsonFileStore {
    /// Open (creating if needed) the data directory and read both tables.
    /// Missing files load as empty tables.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::new("create data directory", e))?;
        let records = read_table(&dir.join(FLEET_FILE))?.unwrap_or_default();
        let ledger = read_table(&dir.join(LEDGER_FILE))?.unwrap_or_default();
        Ok(Self {
            dir,
            records,
            ledger,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn flush_fleet(&self) -> Result<(), StoreError> {
        write_table(&self.dir.join(FLEET_FILE), &self.records)
    }

    fn flush_ledger(&self) -> Result<(), StoreError> {
        write_table(&self.dir.join(LEDGER_FILE), &self.ledger)
    }
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| StoreError::new("read data file", e))?;
    let table = serde_json::from_str(&content).map_err(|e| StoreError::new("parse data file", e))?;
    debug!(path = %path.display(), "Loaded table");
    Ok(Some(table))
}

fn write_table<T: Serialize>(path: &Path, table: &T) -> Result<(), StoreError> {
    let json =
        serde_json::to_string_pretty(table).map_err(|e| StoreError::new("encode data file", e))?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json).map_err(|e| StoreError::new("write data file", e))?;
    fs::rename(&staging, path).map_err(|e| StoreError::new("replace data file", e))?;
    debug!(path = %path.display(), "Saved table");
    Ok(())
}

impl FleetStore for JsonFileStore {
    fn load_fleet(&self) -> Result<Vec<ChassisRecord>, StoreError> {
        Ok(self.records.clone())
    }

    fn load_ledger(&self) -> Result<BTreeMap<String, LedgerBucket>, StoreError> {
        Ok(self.ledger.clone())
    }

    fn save_records(&mut self, records: &[ChassisRecord]) -> Result<(), StoreError> {
        let previous = self.records.clone();
        upsert_front(&mut self.records, records);
        self.flush_fleet().inspect_err(|_| self.records = previous)
    }

    fn delete_record(&mut self, id: &str) -> Result<(), StoreError> {
        let previous = self.records.clone();
        self.records.retain(|r| r.id != id);
        self.flush_fleet().inspect_err(|_| self.records = previous)
    }

    fn save_bucket(&mut self, chassis_id: &str, bucket: &LedgerBucket) -> Result<(), StoreError> {
        let previous = self.ledger.insert(chassis_id.to_string(), bucket.clone());
        self.flush_ledger().inspect_err(|_| match previous {
            Some(previous) => {
                self.ledger.insert(chassis_id.to_string(), previous);
            }
            None => {
                self.ledger.remove(chassis_id);
            }
        })
    }
}
