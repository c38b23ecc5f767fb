//! Header detection and column mapping

use super::cells::{Cell, RowMatrix};
use crate::error::ImportError;

const UNIT_HEADERS: &[&str] = &[
    "unit",
    "unit#",
    "unitnumber",
    "chassis",
    "chassis#",
    "chassisnumber",
];

const PLATE_HEADERS: &[&str] = &["plate", "plate#", "license", "licenseplate", "tag"];

const VIN_HEADERS: &[&str] = &["vin"];

/// Columns the importer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    Unit,
    Plate,
    Vin,
}

impl TargetField {
    pub const ALL: [TargetField; 3] = [TargetField::Unit, TargetField::Plate, TargetField::Vin];

    pub fn name(&self) -> &'static str {
        match self {
            TargetField::Unit => "unit",
            TargetField::Plate => "plate",
            TargetField::Vin => "vin",
        }
    }

    fn synonyms(&self) -> &'static [&'static str] {
        match self {
            TargetField::Unit => UNIT_HEADERS,
            TargetField::Plate => PLATE_HEADERS,
            TargetField::Vin => VIN_HEADERS,
        }
    }
}

/// Lowercase the header text and drop all whitespace
pub fn normalize_header(cell: &Cell) -> String {
    cell.to_text()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Which target field, if any, a header cell names
pub fn header_field(cell: &Cell) -> Option<TargetField> {
    let normalized = normalize_header(cell);
    TargetField::ALL
        .into_iter()
        .find(|field| field.synonyms().contains(&normalized.as_str()))
}

/// Column index of each target field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub unit: usize,
    pub plate: usize,
    pub vin: usize,
}

impl FieldMapping {
    /// Fixed order assumed when the input has no header row
    pub const HEADERLESS: FieldMapping = FieldMapping {
        unit: 0,
        plate: 1,
        vin: 2,
    };

    /// Map fields from a header row. When a field's header appears more than
    /// once, the rightmost column wins.
    pub fn from_header(header: &[Cell]) -> Result<Self, ImportError> {
        let (mut unit, mut plate, mut vin) = (None, None, None);
        for (index, cell) in header.iter().enumerate() {
            match header_field(cell) {
                Some(TargetField::Unit) => unit = Some(index),
                Some(TargetField::Plate) => plate = Some(index),
                Some(TargetField::Vin) => vin = Some(index),
                None => {}
            }
        }

        match (unit, plate, vin) {
            (Some(unit), Some(plate), Some(vin)) => Ok(Self { unit, plate, vin }),
            _ => {
                let found = [
                    (TargetField::Unit, unit),
                    (TargetField::Plate, plate),
                    (TargetField::Vin, vin),
                ];
                let missing = found
                    .into_iter()
                    .filter(|(_, index)| index.is_none())
                    .map(|(field, _)| field.name())
                    .collect();
                Err(ImportError::MissingColumns(missing))
            }
        }
    }

    pub fn index_of(&self, field: TargetField) -> usize {
        match field {
            TargetField::Unit => self.unit,
            TargetField::Plate => self.plate,
            TargetField::Vin => self.vin,
        }
    }
}

/// Whether the first row is a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    Headered(FieldMapping),
    Headerless,
}

impl HeaderLayout {
    pub fn mapping(&self) -> FieldMapping {
        match self {
            HeaderLayout::Headered(mapping) => *mapping,
            HeaderLayout::Headerless => FieldMapping::HEADERLESS,
        }
    }

    /// Index of the first data row
    pub fn data_start(&self) -> usize {
        match self {
            HeaderLayout::Headered(_) => 1,
            HeaderLayout::Headerless => 0,
        }
    }
}

/// Inspect row 0: any recognized header makes it a header row; otherwise a
/// row of at least three cells is taken as data in `unit, plate, vin` order.
pub fn detect_layout(rows: &RowMatrix) -> Result<HeaderLayout, ImportError> {
    let first = rows.first().ok_or(ImportError::EmptyInput)?;

    if first.iter().any(|cell| header_field(cell).is_some()) {
        return FieldMapping::from_header(first).map(HeaderLayout::Headered);
    }

    if first.len() >= 3 {
        Ok(HeaderLayout::Headerless)
    } else {
        Err(ImportError::HeadersNotDetected)
    }
}
