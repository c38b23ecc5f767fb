//! Risk classification of due dates

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{days_until, Countdown};

/// Window, in days, within which a due date counts as coming up soon
pub const DEFAULT_SOON_THRESHOLD_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTier {
    None,
    Overdue,
    Soon,
    Ok,
}

impl StatusTier {
    /// Ranking used to compare tiers: higher needs attention sooner
    pub fn urgency(&self) -> u8 {
        match self {
            StatusTier::Overdue => 3,
            StatusTier::Soon => 2,
            StatusTier::Ok => 1,
            StatusTier::None => 0,
        }
    }

    /// Display color family
    pub fn tone(&self) -> &'static str {
        match self {
            StatusTier::None => "slate",
            StatusTier::Overdue => "red",
            StatusTier::Soon => "amber",
            StatusTier::Ok => "emerald",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub tier: StatusTier,
    pub label: String,
    pub days: Countdown,
}

/// Classify an already computed day count
pub fn classify_countdown(days: Countdown, soon_threshold_days: i64) -> Status {
    let (tier, label) = match days {
        Countdown::Unscheduled => (StatusTier::None, "—".to_string()),
        Countdown::Days(d) if d < 0 => (
            StatusTier::Overdue,
            format!("Overdue {}d", d.unsigned_abs()),
        ),
        Countdown::Days(d) if d <= soon_threshold_days => {
            (StatusTier::Soon, format!("Due in {}d", d))
        }
        Countdown::Days(d) => (StatusTier::Ok, format!("OK ({}d)", d)),
    };
    Status { tier, label, days }
}

/// Classify a single due date relative to `today`
pub fn classify(date: Option<NaiveDate>, today: NaiveDate, soon_threshold_days: i64) -> Status {
    classify_countdown(days_until(date, today), soon_threshold_days)
}

/// Overall status of several due dates: the classification of the nearest one.
///
/// Absent dates never win over a real one, so only an all-absent input
/// aggregates to `StatusTier::None`. Equal day counts keep the first.
pub fn aggregate(
    dates: impl IntoIterator<Item = Option<NaiveDate>>,
    today: NaiveDate,
    soon_threshold_days: i64,
) -> Status {
    dates
        .into_iter()
        .map(|date| classify(date, today, soon_threshold_days))
        .min_by_key(|status| status.days)
        .unwrap_or_else(|| classify_countdown(Countdown::Unscheduled, soon_threshold_days))
}

/// Fleet list filter over a record's due dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    /// At least one date has passed
    Overdue,
    /// Nothing overdue, at least one date inside the soon window
    Soon,
    /// Nothing overdue or soon (including records with no dates at all)
    Ok,
}

impl StatusFilter {
    pub fn matches(&self, statuses: &[Status]) -> bool {
        let overdue = statuses.iter().any(|s| s.tier == StatusTier::Overdue);
        let soon = statuses.iter().any(|s| s.tier == StatusTier::Soon);
        match self {
            StatusFilter::All => true,
            StatusFilter::Overdue => overdue,
            StatusFilter::Soon => !overdue && soon,
            StatusFilter::Ok => !overdue && !soon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status filter: {0} (expected all, overdue, soon or ok)")]
pub struct UnknownFilter(pub String);

impl FromStr for StatusFilter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "overdue" => Ok(StatusFilter::Overdue),
            "soon" => Ok(StatusFilter::Soon),
            "ok" => Ok(StatusFilter::Ok),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 5, 10)
    }

    #[test]
    fn test_tiers_and_labels() {
        let t = today();
        let none = classify(None, t, 30);
        assert_eq!(none.tier, StatusTier::None);
        assert_eq!(none.label, "—");

        let overdue = classify(Some(date(2024, 5, 7)), t, 30);
        assert_eq!(overdue.tier, StatusTier::Overdue);
        assert_eq!(overdue.label, "Overdue 3d");

        let due_today = classify(Some(t), t, 30);
        assert_eq!(due_today.tier, StatusTier::Soon);
        assert_eq!(due_today.label, "Due in 0d");

        let edge = classify(Some(date(2024, 6, 9)), t, 30);
        assert_eq!(edge.tier, StatusTier::Soon);

        let ok = classify(Some(date(2024, 6, 10)), t, 30);
        assert_eq!(ok.tier, StatusTier::Ok);
        assert_eq!(ok.label, "OK (31d)");
    }

    #[test]
    fn test_threshold_is_configurable() {
        let status = classify(Some(date(2024, 5, 20)), today(), 7);
        assert_eq!(status.tier, StatusTier::Ok);
    }

    #[test]
    fn test_aggregate_picks_nearest_date() {
        let status = aggregate(
            [Some(date(2020, 1, 1)), Some(date(2024, 5, 20)), None],
            today(),
            30,
        );
        assert_eq!(status.tier, StatusTier::Overdue);
    }

    #[test]
    fn test_aggregate_all_absent_is_none() {
        let status = aggregate([None, None, None], today(), 30);
        assert_eq!(status.tier, StatusTier::None);
        assert_eq!(status.days, Countdown::Unscheduled);
    }

    #[test]
    fn test_filter_predicates() {
        let t = today();
        let overdue = [
            classify(Some(date(2024, 1, 1)), t, 30),
            classify(None, t, 30),
        ];
        let soon = [
            classify(Some(date(2024, 5, 11)), t, 30),
            classify(Some(date(2025, 1, 1)), t, 30),
        ];
        let ok = [classify(Some(date(2025, 1, 1)), t, 30)];
        let blank = [classify(None, t, 30)];

        assert!(StatusFilter::Overdue.matches(&overdue));
        assert!(!StatusFilter::Soon.matches(&overdue));
        assert!(StatusFilter::Soon.matches(&soon));
        assert!(!StatusFilter::Ok.matches(&soon));
        assert!(StatusFilter::Ok.matches(&ok));
        assert!(StatusFilter::Ok.matches(&blank));
        assert!(StatusFilter::All.matches(&overdue));
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("Overdue".parse::<StatusFilter>(), Ok(StatusFilter::Overdue));
        assert!("later".parse::<StatusFilter>().is_err());
    }
}
