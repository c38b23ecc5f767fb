//! Bulk import of chassis from tabular input.
//!
//! The pipeline runs `RowMatrix -> HeaderLayout/FieldMapping -> candidates ->
//! reconciled outcome`. Structural problems abort with an [`ImportError`];
//! blank rows are dropped silently.

pub mod cells;
pub mod layout;
pub mod reconcile;

use chassis_types::ChassisRecord;
use tracing::{debug, info};

pub use cells::{parse_delimited, rows_from, Cell, Row, RowMatrix};
pub use layout::{detect_layout, FieldMapping, HeaderLayout, TargetField};
pub use reconcile::{extract_candidates, reconcile, ImportOutcome};

use crate::error::ImportError;
use crate::ports::IdSource;

/// Run the whole import pipeline against the current fleet.
///
/// Nothing is applied here; the caller prepends `accepted` to its fleet.
pub fn import_rows(
    rows: &RowMatrix,
    existing: &[ChassisRecord],
    ids: &dyn IdSource,
) -> Result<ImportOutcome, ImportError> {
    let layout = detect_layout(rows)?;
    debug!(?layout, rows = rows.len(), "Detected import layout");

    let data = rows.get(layout.data_start()..).unwrap_or_default();
    let candidates = extract_candidates(data, layout.mapping(), ids);
    if candidates.is_empty() {
        return Err(ImportError::NoUsableRows);
    }

    let outcome = reconcile(existing, candidates);
    info!(
        accepted = outcome.accepted.len(),
        skipped = outcome.skipped_duplicates,
        "Reconciled import batch"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SequentialIds;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_duplicate_rows_collapse() {
        let ids = SequentialIds::new("id");
        let rows = rows_from([
            ["Unit", "Plate", "VIN"],
            ["CH-1", "AAA111", "VIN1"],
            ["CH-1", "AAA111", "VIN1"],
        ]);
        let outcome = import_rows(&rows, &[], &ids).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.skipped_duplicates, 1);
    }

    #[test]
    fn test_headerless_first_row_is_data() {
        let ids = SequentialIds::new("id");
        let rows = rows_from([["CH-1", "AAA111", "VIN1"], ["CH-2", "BBB222", "VIN2"]]);
        let outcome = import_rows(&rows, &[], &ids).unwrap();
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.accepted[0].unit, "CH-1");
    }

    #[test]
    fn test_header_only_has_no_usable_rows() {
        let ids = SequentialIds::new("id");
        let rows = rows_from([["Unit", "Plate", "VIN"]]);
        assert_eq!(import_rows(&rows, &[], &ids), Err(ImportError::NoUsableRows));

        let rows = rows_from([vec!["Unit", "Plate", "VIN"], vec!["", "", ""]]);
        assert_eq!(import_rows(&rows, &[], &ids), Err(ImportError::NoUsableRows));
    }

    #[test]
    fn test_spreadsheet_cells() {
        let ids = SequentialIds::new("id");
        let rows = vec![
            vec![Cell::from("Unit #"), Cell::from("Tag"), Cell::from("VIN")],
            vec![Cell::Number(1042.0), Cell::from("7XYZ001"), Cell::Empty],
        ];
        let outcome = import_rows(&rows, &[], &ids).unwrap();
        assert_eq!(outcome.accepted[0].unit, "1042");
        assert_eq!(outcome.accepted[0].vin, "");
    }
}
