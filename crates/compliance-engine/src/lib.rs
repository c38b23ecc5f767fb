//! Compliance status for chassis due dates
//!
//! - `calendar`: date arithmetic and the canonical ISO form
//! - `status`: per-date risk tiers and the per-chassis overall status

pub mod calendar;
pub mod status;

use chassis_types::ChassisRecord;
use chrono::NaiveDate;

pub use calendar::Countdown;
pub use status::{Status, StatusFilter, StatusTier, DEFAULT_SOON_THRESHOLD_DAYS};

/// Status of each tracked date on a chassis, plus the overall status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStatus {
    pub registration: Status,
    pub annual: Status,
    pub bit: Status,
    pub overall: Status,
}

impl RecordStatus {
    pub fn fields(&self) -> [&Status; 3] {
        [&self.registration, &self.annual, &self.bit]
    }
}

/// ComplianceEngine entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplianceEngine {
    soon_threshold_days: i64,
}

impl ComplianceEngine {
    pub fn new() -> Self {
        Self {
            soon_threshold_days: DEFAULT_SOON_THRESHOLD_DAYS,
        }
    }

    pub fn with_soon_threshold(soon_threshold_days: i64) -> Self {
        Self {
            soon_threshold_days,
        }
    }

    pub fn soon_threshold_days(&self) -> i64 {
        self.soon_threshold_days
    }

    pub fn classify(&self, date: Option<NaiveDate>, today: NaiveDate) -> Status {
        status::classify(date, today, self.soon_threshold_days)
    }

    pub fn aggregate(
        &self,
        registration_due: Option<NaiveDate>,
        annual_due: Option<NaiveDate>,
        bit_due: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Status {
        status::aggregate(
            [registration_due, annual_due, bit_due],
            today,
            self.soon_threshold_days,
        )
    }

    /// Overall status of a chassis
    pub fn status_of(&self, record: &ChassisRecord, today: NaiveDate) -> Status {
        status::aggregate(record.due_dates(), today, self.soon_threshold_days)
    }

    pub fn check_record(&self, record: &ChassisRecord, today: NaiveDate) -> RecordStatus {
        RecordStatus {
            registration: self.classify(record.registration_due, today),
            annual: self.classify(record.annual_due, today),
            bit: self.classify(record.bit_due, today),
            overall: self.status_of(record, today),
        }
    }

    pub fn matches_filter(
        &self,
        record: &ChassisRecord,
        filter: StatusFilter,
        today: NaiveDate,
    ) -> bool {
        if filter == StatusFilter::All {
            return true;
        }
        let statuses = record.due_dates().map(|date| self.classify(date, today));
        filter.matches(&statuses)
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new()
    }
}
