//! Candidate extraction and de-duplication against the existing fleet

use std::collections::HashSet;

use chassis_types::ChassisRecord;

use super::cells::{Cell, Row};
use super::layout::FieldMapping;
use crate::ports::IdSource;

/// Result of reconciling an import batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// New records in their original row order
    pub accepted: Vec<ChassisRecord>,
    /// Rows matching an existing chassis or an earlier row of the batch
    pub skipped_duplicates: usize,
}

impl ImportOutcome {
    /// User-facing summary, e.g. `Imported 3 chassis (skipped 1 duplicates).`
    pub fn summary(&self) -> String {
        let mut message = format!("Imported {} chassis", self.accepted.len());
        if self.skipped_duplicates > 0 {
            message.push_str(&format!(
                " (skipped {} duplicates)",
                self.skipped_duplicates
            ));
        }
        message.push('.');
        message
    }
}

fn cell_text(row: &Row, index: usize) -> String {
    row.get(index)
        .map(Cell::to_text)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Turn data rows into blank candidate records, dropping rows whose unit,
/// plate and VIN are all empty.
pub fn extract_candidates(
    rows: &[Row],
    mapping: FieldMapping,
    ids: &dyn IdSource,
) -> Vec<ChassisRecord> {
    rows.iter()
        .filter_map(|row| {
            let unit = cell_text(row, mapping.unit);
            let plate = cell_text(row, mapping.plate);
            let vin = cell_text(row, mapping.vin);
            if unit.is_empty() && plate.is_empty() && vin.is_empty() {
                return None;
            }
            Some(ChassisRecord {
                unit,
                plate,
                vin,
                ..ChassisRecord::new(ids.next_id())
            })
        })
        .collect()
}

fn vin_key(record: &ChassisRecord) -> String {
    record.vin.to_uppercase()
}

fn unit_plate_key(record: &ChassisRecord) -> String {
    format!(
        "{}|{}",
        record.unit.to_uppercase(),
        record.plate.to_uppercase()
    )
}

/// Keep candidates that match neither an existing record nor an earlier
/// accepted candidate, by non-empty VIN or by `unit|plate` (case-insensitive).
pub fn reconcile(existing: &[ChassisRecord], candidates: Vec<ChassisRecord>) -> ImportOutcome {
    let mut seen_vins: HashSet<String> = existing.iter().map(vin_key).collect();
    let mut seen_keys: HashSet<String> = existing.iter().map(unit_plate_key).collect();

    let mut outcome = ImportOutcome::default();
    for candidate in candidates {
        let vin = vin_key(&candidate);
        let key = unit_plate_key(&candidate);
        if (!vin.is_empty() && seen_vins.contains(&vin)) || seen_keys.contains(&key) {
            outcome.skipped_duplicates += 1;
            continue;
        }
        seen_vins.insert(vin);
        seen_keys.insert(key);
        outcome.accepted.push(candidate);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::cells::rows_from;
    use crate::ports::SequentialIds;
    use pretty_assertions::assert_eq;

    fn record(unit: &str, plate: &str, vin: &str) -> ChassisRecord {
        ChassisRecord {
            unit: unit.to_string(),
            plate: plate.to_string(),
            vin: vin.to_string(),
            ..ChassisRecord::new(format!("existing-{}", unit))
        }
    }

    fn units(records: &[ChassisRecord]) -> Vec<&str> {
        records.iter().map(|r| r.unit.as_str()).collect()
    }

    #[test]
    fn test_extract_trims_and_skips_blank_rows() {
        let ids = SequentialIds::new("new");
        let rows = rows_from([
            vec![" CH-1 ", "AAA111", "VIN1"],
            vec!["", " ", ""],
            vec!["CH-2"],
        ]);
        let candidates = extract_candidates(&rows, FieldMapping::HEADERLESS, &ids);

        assert_eq!(units(&candidates), vec!["CH-1", "CH-2"]);
        assert_eq!(candidates[0].id, "new-1");
        assert_eq!(candidates[1].plate, "");
        assert_eq!(candidates[1].vin, "");
        assert_eq!(candidates[0].annual_due, None);
    }

    #[test]
    fn test_vin_match_alone_is_duplicate() {
        let existing = vec![record("CH-9", "ZZZ999", "1G1YY26U775123456")];
        let candidates = vec![record("CH-1", "AAA111", "1g1yy26u775123456")];
        let outcome = reconcile(&existing, candidates);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.skipped_duplicates, 1);
    }

    #[test]
    fn test_unit_plate_match_with_empty_vin_is_duplicate() {
        let existing = vec![record("CH-1", "AAA111", "VIN-A")];
        let candidates = vec![record("ch-1", "aaa111", "")];
        let outcome = reconcile(&existing, candidates);
        assert_eq!(outcome.skipped_duplicates, 1);
    }

    #[test]
    fn test_empty_vins_do_not_collide() {
        let existing = vec![record("CH-1", "AAA111", "")];
        let candidates = vec![record("CH-2", "BBB222", "")];
        let outcome = reconcile(&existing, candidates);
        assert_eq!(units(&outcome.accepted), vec!["CH-2"]);
    }

    #[test]
    fn test_within_batch_first_occurrence_wins() {
        let candidates = vec![
            record("CH-1", "AAA111", "VIN1"),
            record("CH-2", "BBB222", "VIN2"),
            record("CH-3", "CCC333", "VIN1"),
        ];
        let outcome = reconcile(&[], candidates);
        assert_eq!(units(&outcome.accepted), vec!["CH-1", "CH-2"]);
        assert_eq!(outcome.skipped_duplicates, 1);
    }

    #[test]
    fn test_summary_wording() {
        let mut outcome = ImportOutcome {
            accepted: vec![record("CH-1", "", "")],
            skipped_duplicates: 0,
        };
        assert_eq!(outcome.summary(), "Imported 1 chassis.");
        outcome.skipped_duplicates = 2;
        assert_eq!(outcome.summary(), "Imported 1 chassis (skipped 2 duplicates).");
    }
}
