//! Fleet Core - chassis fleet state, compliance ledger and bulk import
//!
//! This crate provides:
//! - `FleetRegistry`: the live fleet and its filter/sort view
//! - `LedgerStore`: per-chassis inspection, citation and repair history
//! - `import`: header detection and de-duplication of tabular input
//! - `export`: delimited-text rendering of a fleet view
//! - `Tracker`: the registry wired to a `FleetStore` persistence collaborator

pub mod demo;
pub mod error;
pub mod export;
pub mod import;
pub mod ledger;
pub mod ports;
pub mod registry;
pub mod tracker;
pub mod view;

// Re-export commonly used types
pub use demo::demo_fleet;
pub use error::{FleetError, ImportError, StoreError};
pub use export::{export_file_name, to_delimited, EXPORT_COLUMNS};
pub use import::{import_rows, parse_delimited, rows_from, Cell, ImportOutcome, RowMatrix};
pub use ledger::{last_done_from_due, LedgerStore};
pub use ports::{
    upsert_front, Clock, Env, FixedClock, FleetStore, IdSource, MemoryStore, SequentialIds,
    SystemClock, UuidIds,
};
pub use registry::{FleetRegistry, InspectionEntry};
pub use tracker::Tracker;
pub use view::{SortDirection, SortKey, ViewQuery};
