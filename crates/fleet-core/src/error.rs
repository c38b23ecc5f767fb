use thiserror::Error;

/// Structural problems that abort an import before anything is applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("File is empty.")]
    EmptyInput,

    #[error("Could not detect headers. Expected columns: unit/plate/VIN.")]
    HeadersNotDetected,

    #[error("Missing required columns. Need: unit, plate, vin (not found: {}).", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("No usable rows found.")]
    NoUsableRows,
}

/// A persistence collaborator rejected a load, save or delete
#[derive(Error, Debug)]
#[error("{operation} failed: {source}")]
pub struct StoreError {
    pub operation: &'static str,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    pub fn new(
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FleetError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Failed to persist changes: {0}")]
    Persistence(#[from] StoreError),

    #[error("Enter at least a Unit or Plate number.")]
    MissingIdentity,

    #[error("Unknown chassis: {0}")]
    UnknownChassis(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_missing_columns_message_names_fields() {
        let err = ImportError::MissingColumns(vec!["plate", "vin"]);
        assert_eq!(
            err.to_string(),
            "Missing required columns. Need: unit, plate, vin (not found: plate, vin)."
        );
    }

    #[test]
    fn test_persistence_error_keeps_cause() {
        let err: FleetError = StoreError::new("save records", "disk full").into();
        assert!(err.to_string().contains("disk full"));
        let source = err.source().and_then(|s| s.source());
        assert_eq!(source.map(|s| s.to_string()).as_deref(), Some("disk full"));
    }
}
