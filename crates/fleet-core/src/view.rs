//! Filtered, sorted projection of the fleet for display and export

use std::cmp::Ordering;
use std::str::FromStr;

use chassis_types::ChassisRecord;
use chrono::NaiveDate;
use compliance_engine::{ComplianceEngine, StatusFilter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Earliest of the three due dates
    #[default]
    NextDue,
    Unit,
    Plate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sort key: {0} (expected next-due, unit or plate)")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next-due" | "nextdue" | "due" => Ok(SortKey::NextDue),
            "unit" => Ok(SortKey::Unit),
            "plate" => Ok(SortKey::Plate),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Search text, status filter and ordering for the fleet list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub text: String,
    pub filter: StatusFilter,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl ViewQuery {
    /// Case-insensitive substring match over unit, plate, VIN and notes
    pub fn matches_text(&self, record: &ChassisRecord) -> bool {
        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&record.unit, &record.plate, &record.vin, &record.notes]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Compare nearest due dates; a record with no due date goes last whichever
/// way the list is sorted.
fn compare_next_due(
    a: Option<NaiveDate>,
    b: Option<NaiveDate>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Apply `query` to `records`. The sort is stable, so equal keys keep fleet
/// order.
pub fn select(
    records: &[ChassisRecord],
    query: &ViewQuery,
    engine: &ComplianceEngine,
    today: NaiveDate,
) -> Vec<ChassisRecord> {
    let mut selected: Vec<ChassisRecord> = records
        .iter()
        .filter(|record| query.matches_text(record))
        .filter(|record| engine.matches_filter(record, query.filter, today))
        .cloned()
        .collect();

    match query.sort {
        SortKey::NextDue => selected.sort_by(|a, b| {
            compare_next_due(a.nearest_due(), b.nearest_due(), query.direction)
        }),
        SortKey::Unit => selected.sort_by(|a, b| query.direction.apply(a.unit.cmp(&b.unit))),
        SortKey::Plate => selected.sort_by(|a, b| query.direction.apply(a.plate.cmp(&b.plate))),
    }
    selected
}
