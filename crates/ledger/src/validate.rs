//! Field-level input checks shared by the ledger drafts and patches.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;

pub use fintrack_core::validate::is_valid_email;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const REMARKS_MAX_CHARS: usize = 500;
/// Largest amount, cash or bank value accepted from input.
pub const AMOUNT_MAX_UNITS: i64 = 1_000_000_000_000;

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-\s()]*$").expect("phone pattern compiles"));

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

/// Person names are measured in characters after trimming.
pub fn is_valid_name(name: &str) -> bool {
    let len = name.trim().chars().count();
    (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len)
}

/// Upper bound on any single monetary input. Keeps every sum the dashboard
/// folds far away from `Decimal::MAX`.
pub fn is_within_amount_limit(amount: Decimal) -> bool {
    amount <= Decimal::from(AMOUNT_MAX_UNITS)
}

pub fn amount_limit_message(field: &str) -> String {
    format!("{field} must not exceed {AMOUNT_MAX_UNITS}")
}

pub fn is_valid_remarks(remarks: &str) -> bool {
    remarks.trim().chars().count() <= REMARKS_MAX_CHARS
}

/// Parse an ISO-8601 date or date-time.
///
/// Accepts RFC 3339 timestamps, naive timestamps (taken as UTC) and bare
/// calendar dates (midnight UTC).
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn phone_allows_digits_and_punctuation_only() {
        assert!(is_valid_phone("+1 (555) 010-2030"));
        assert!(is_valid_phone(""));
        assert!(!is_valid_phone("call me"));
    }

    #[test]
    fn name_length_counts_trimmed_characters() {
        assert!(!is_valid_name(" A "));
        assert!(is_valid_name("Al"));
        assert!(is_valid_name(&"é".repeat(100)));
        assert!(!is_valid_name(&"x".repeat(101)));
    }

    #[test]
    fn parses_dates_in_several_iso_forms() {
        let full = parse_date("2024-03-05T10:30:00+02:00").unwrap();
        assert_eq!(full.hour(), 8);

        let naive = parse_date("2024-03-05T10:30:00.250").unwrap();
        assert_eq!(naive.hour(), 10);

        let day = parse_date("2024-03-05").unwrap();
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 3, 5, 0));

        assert!(parse_date("05/03/2024").is_none());
    }

    #[test]
    fn amount_limit_is_inclusive() {
        assert!(is_within_amount_limit(Decimal::from(AMOUNT_MAX_UNITS)));
        assert!(!is_within_amount_limit(Decimal::from(AMOUNT_MAX_UNITS) + Decimal::ONE));
        assert!(!is_within_amount_limit(Decimal::MAX));
    }
}
