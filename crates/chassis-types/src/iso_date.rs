//! Canonical `YYYY-MM-DD` handling for stored dates.
//!
//! Persisted rows carry dates as ISO strings, with the empty string standing in
//! for "not set". `NaiveDate` orders chronologically, which is the same order
//! the canonical string form sorts in.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serializer};

pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// Parse a calendar date from its ISO form.
///
/// Accepts a bare `YYYY-MM-DD` or the date part of an RFC 3339 timestamp.
/// Returns `None` for empty or unparsable input.
pub fn parse_iso(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let date_part = match trimmed.get(10..11) {
        Some("T") | Some(" ") => trimmed.get(..10)?,
        _ => trimmed,
    };

    NaiveDate::parse_from_str(date_part, ISO_FORMAT).ok()
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Serde adapter for `Option<NaiveDate>` fields stored as `""` when absent.
pub mod optional {
    use super::*;

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&format_iso(*date)),
            None => serializer.serialize_str(""),
        }
    }

    /// Unparsable strings load as `None` rather than failing the whole row.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_iso))
    }
}

/// Serde adapter for `Option<String>` links stored as `""` when absent.
pub mod blank_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_date() {
        assert_eq!(
            parse_iso("2024-01-10"),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
    }

    #[test]
    fn test_parses_timestamp_prefix() {
        assert_eq!(
            parse_iso("2024-06-01T13:45:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
    }

    #[test]
    fn test_rejects_blank_and_garbage() {
        assert_eq!(parse_iso(""), None);
        assert_eq!(parse_iso("   "), None);
        assert_eq!(parse_iso("next tuesday"), None);
        assert_eq!(parse_iso("2024-13-40"), None);
    }

    #[test]
    fn test_format_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(format_iso(date), "2025-03-07");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: the canonical string sorts the same way the dates do
        #[test]
        fn canonical_order_matches_chronology(a in 0i32..3_000_000, b in 0i32..3_000_000) {
            let base = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
            let da = base + chrono::Duration::days(a as i64);
            let db = base + chrono::Duration::days(b as i64);
            prop_assert_eq!(da.cmp(&db), format_iso(da).cmp(&format_iso(db)));
        }

        /// Property: formatting then parsing returns the same date
        #[test]
        fn format_then_parse(days in 0i64..3_000_000) {
            let date = NaiveDate::from_ymd_opt(1, 1, 1).unwrap() + chrono::Duration::days(days);
            prop_assert_eq!(parse_iso(&format_iso(date)), Some(date));
        }
    }
}
