//! Change notifications delivered by the persistence collaborator

use serde::{Deserialize, Serialize};

use crate::ledger::LedgerBucket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    #[serde(alias = "INSERT")]
    Created,
    #[serde(alias = "UPDATE")]
    Updated,
    #[serde(alias = "DELETE")]
    Deleted,
}

/// A whole-record change to a fleet or ledger table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent<T> {
    pub kind: ChangeKind,
    pub record: T,
}

impl<T> ChangeEvent<T> {
    pub fn created(record: T) -> Self {
        Self {
            kind: ChangeKind::Created,
            record,
        }
    }

    pub fn updated(record: T) -> Self {
        Self {
            kind: ChangeKind::Updated,
            record,
        }
    }

    pub fn deleted(record: T) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            record,
        }
    }
}

/// One row of the ledger table: a chassis id and its whole bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub chassis_id: String,
    #[serde(flatten)]
    pub bucket: LedgerBucket,
}
