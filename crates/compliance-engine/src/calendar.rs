use chrono::{Days, NaiveDate};

pub use chassis_types::iso_date::{format_iso, parse_iso};

/// Signed day count until a due date.
///
/// `Unscheduled` stands for "no date set" and orders after every `Days` value,
/// so taking a minimum naturally prefers real dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Countdown {
    Days(i64),
    Unscheduled,
}

impl Countdown {
    pub fn days(&self) -> Option<i64> {
        match self {
            Countdown::Days(days) => Some(*days),
            Countdown::Unscheduled => None,
        }
    }
}

/// Shift a date forward by `days` (backward when negative).
///
/// Returns `None` when no date is given or the result leaves chrono's range.
pub fn add_days(date: Option<NaiveDate>, days: i64) -> Option<NaiveDate> {
    let date = date?;
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Shift a date backward by `days` (forward when negative)
pub fn subtract_days(date: Option<NaiveDate>, days: i64) -> Option<NaiveDate> {
    let date = date?;
    if days >= 0 {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    }
}

/// String form of [`add_days`]: empty string for blank or unparsable input
pub fn add_days_iso(date: &str, days: i64) -> String {
    add_days(parse_iso(date), days)
        .map(format_iso)
        .unwrap_or_default()
}

/// String form of [`subtract_days`]: empty string for blank or unparsable input
pub fn subtract_days_iso(date: &str, days: i64) -> String {
    subtract_days(parse_iso(date), days)
        .map(format_iso)
        .unwrap_or_default()
}

/// Whole days from `today` to `date`; negative once the date has passed
pub fn days_until(date: Option<NaiveDate>, today: NaiveDate) -> Countdown {
    match date {
        Some(date) => Countdown::Days(date.signed_duration_since(today).num_days()),
        None => Countdown::Unscheduled,
    }
}

/// Short display form, e.g. `Jan 05, 2025`
pub fn format_human(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_date() -> impl Strategy<Value = NaiveDate> {
        // 1900-01-01 plus up to ~300 years
        (0u64..110_000).prop_map(|offset| {
            NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + Days::new(offset)
        })
    }

    proptest! {
        /// Property: subtracting then adding the same offset is the identity
        #[test]
        fn subtract_then_add_roundtrip(d in any_date(), n in -50_000i64..50_000) {
            prop_assert_eq!(add_days(subtract_days(Some(d), n), n), Some(d));
        }

        /// Property: the day count agrees with the shift that produced the date
        #[test]
        fn days_until_inverts_add_days(today in any_date(), n in -50_000i64..50_000) {
            let target = add_days(Some(today), n);
            prop_assert_eq!(days_until(target, today), Countdown::Days(n));
        }
    }
}
