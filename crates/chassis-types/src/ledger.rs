//! Per-chassis compliance history: inspections, citations and repairs

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::iso_date;
use crate::types::InspectionKind;

/// A completed inspection and the due date it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionEvent {
    pub id: String,
    pub done_date: NaiveDate,
    pub due_date: NaiveDate,
    pub entered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationEvent {
    pub id: String,
    #[serde(default, with = "iso_date::optional")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
}

/// A repair, optionally linked to the citation it resolves.
///
/// `citation_id` is a weak link: it names a citation in the same bucket or is
/// `None`. Deleting the citation clears every link to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairEvent {
    pub id: String,
    #[serde(default, with = "iso_date::optional")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub work: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, with = "iso_date::blank_as_none")]
    pub citation_id: Option<String>,
}

/// Citation fields as entered, before an id is assigned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCitation {
    pub date: Option<NaiveDate>,
    pub number: String,
    pub location: String,
    pub notes: String,
}

impl NewCitation {
    pub fn into_event(self, id: String) -> CitationEvent {
        CitationEvent {
            id,
            date: self.date,
            number: self.number,
            location: self.location,
            notes: self.notes,
        }
    }
}

/// Repair fields as entered, before an id is assigned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRepair {
    pub date: Option<NaiveDate>,
    pub vendor: String,
    pub work: String,
    pub notes: String,
    pub citation_id: Option<String>,
}

impl NewRepair {
    pub fn into_event(self, id: String) -> RepairEvent {
        RepairEvent {
            id,
            date: self.date,
            vendor: self.vendor,
            work: self.work,
            notes: self.notes,
            citation_id: self.citation_id,
        }
    }
}

/// Inspection history per kind, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionHistory {
    #[serde(default)]
    pub annual: Vec<InspectionEvent>,
    #[serde(default)]
    pub bit: Vec<InspectionEvent>,
}

impl InspectionHistory {
    pub fn of(&self, kind: InspectionKind) -> &[InspectionEvent] {
        match kind {
            InspectionKind::Annual => &self.annual,
            InspectionKind::Bit => &self.bit,
        }
    }

    pub fn of_mut(&mut self, kind: InspectionKind) -> &mut Vec<InspectionEvent> {
        match kind {
            InspectionKind::Annual => &mut self.annual,
            InspectionKind::Bit => &mut self.bit,
        }
    }
}

/// All history for one chassis.
///
/// Every sub-collection defaults to empty, so a partially stored bucket still
/// loads with all four present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerBucket {
    #[serde(default)]
    pub citations: Vec<CitationEvent>,
    #[serde(default)]
    pub repairs: Vec<RepairEvent>,
    #[serde(default)]
    pub inspections: InspectionHistory,
    /// Submission tokens already applied to `citations`
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub citation_tokens: BTreeSet<String>,
    /// Submission tokens already applied to `repairs`
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub repair_tokens: BTreeSet<String>,
}

impl LedgerBucket {
    pub fn has_citation(&self, citation_id: &str) -> bool {
        self.citations.iter().any(|c| c.id == citation_id)
    }

    /// Repairs currently linked to the given citation
    pub fn repairs_for<'a>(
        &'a self,
        citation_id: &'a str,
    ) -> impl Iterator<Item = &'a RepairEvent> + 'a {
        self.repairs
            .iter()
            .filter(move |r| r.citation_id.as_deref() == Some(citation_id))
    }

    /// Clear every repair link that names a citation not in this bucket.
    /// Returns how many links were cleared.
    pub fn clear_dangling_links(&mut self) -> usize {
        let known: BTreeSet<String> = self.citations.iter().map(|c| c.id.clone()).collect();
        let mut cleared = 0;
        for repair in &mut self.repairs {
            let dangling = matches!(&repair.citation_id, Some(id) if !known.contains(id));
            if dangling {
                repair.citation_id = None;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
            && self.repairs.is_empty()
            && self.inspections.annual.is_empty()
            && self.inspections.bit.is_empty()
    }
}
