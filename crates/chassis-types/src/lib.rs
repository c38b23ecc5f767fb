pub mod change;
pub mod iso_date;
pub mod ledger;
pub mod types;

pub use change::{ChangeEvent, ChangeKind, LedgerRow};
pub use ledger::{
    CitationEvent, InspectionEvent, InspectionHistory, LedgerBucket, NewCitation, NewRepair,
    RepairEvent,
};
pub use types::{ChassisRecord, InspectionKind};
