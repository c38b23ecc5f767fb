use chrono::{Days, Months, NaiveDate};

use crate::iso_date;

/// A trailer chassis tracked for registration and inspection compliance.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChassisRecord {
    pub id: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub plate: String,
    #[serde(default)]
    pub vin: String,
    #[serde(default, with = "iso_date::optional")]
    pub registration_due: Option<NaiveDate>,
    #[serde(default, with = "iso_date::optional")]
    pub annual_due: Option<NaiveDate>,
    #[serde(default, with = "iso_date::optional")]
    pub bit_due: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl ChassisRecord {
    /// A blank record with only its identity set
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Registration, annual and BIT due dates, in that order
    pub fn due_dates(&self) -> [Option<NaiveDate>; 3] {
        [self.registration_due, self.annual_due, self.bit_due]
    }

    /// Earliest of the three due dates, if any is set
    pub fn nearest_due(&self) -> Option<NaiveDate> {
        self.due_dates().into_iter().flatten().min()
    }

    pub fn due_for(&self, kind: InspectionKind) -> Option<NaiveDate> {
        match kind {
            InspectionKind::Annual => self.annual_due,
            InspectionKind::Bit => self.bit_due,
        }
    }

    pub fn set_due_for(&mut self, kind: InspectionKind, due: Option<NaiveDate>) {
        match kind {
            InspectionKind::Annual => self.annual_due = due,
            InspectionKind::Bit => self.bit_due = due,
        }
    }
}

/// Inspection programs with a fixed renewal cycle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum InspectionKind {
    Annual,
    Bit,
}

impl InspectionKind {
    pub const ALL: [InspectionKind; 2] = [InspectionKind::Annual, InspectionKind::Bit];

    /// Nominal length of the renewal cycle in days
    pub fn cycle_days(&self) -> u64 {
        match self {
            InspectionKind::Annual => 365,
            InspectionKind::Bit => 90,
        }
    }

    /// Due date produced by an inspection completed on `done`.
    ///
    /// Annual inspections fall due on the same calendar date a year later
    /// (Feb 29 clamps to Feb 28); BIT falls due 90 days later.
    pub fn due_after(&self, done: NaiveDate) -> Option<NaiveDate> {
        match self {
            InspectionKind::Annual => done.checked_add_months(Months::new(12)),
            InspectionKind::Bit => done.checked_add_days(Days::new(self.cycle_days())),
        }
    }

    /// Completion date implied by a due date; the inverse of [`Self::due_after`]
    pub fn done_before(&self, due: NaiveDate) -> Option<NaiveDate> {
        match self {
            InspectionKind::Annual => due.checked_sub_months(Months::new(12)),
            InspectionKind::Bit => due.checked_sub_days(Days::new(self.cycle_days())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InspectionKind::Annual => "Annual",
            InspectionKind::Bit => "BIT",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "annual" => Some(InspectionKind::Annual),
            "bit" => Some(InspectionKind::Bit),
            _ => None,
        }
    }
}

impl std::fmt::Display for InspectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
