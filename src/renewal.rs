//! Subscription-expiry arithmetic.

use chrono::{Months, NaiveDate};

/// Computes the expiry that a renewal paid on `today` grants.
///
/// A subscription that is still valid (expiring today or later) is extended
/// by one year from its current expiry, so unused time is kept. A lapsed or
/// missing subscription restarts from `today`.
pub fn renew(existing: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    let base = match existing {
        Some(expiry) if expiry >= today => expiry,
        _ => today,
    };
    plus_one_year(base)
}

/// Feb 29 maps to Feb 28 of the following year.
fn plus_one_year(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX)
}

pub fn is_active(expiry: Option<NaiveDate>, today: NaiveDate) -> bool {
    matches!(expiry, Some(expiry) if expiry >= today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn future_expiry_is_extended() {
        assert_eq!(renew(Some(date(2099, 1, 1)), date(2024, 6, 1)), date(2100, 1, 1));
    }

    #[test]
    fn lapsed_expiry_restarts_from_today() {
        assert_eq!(renew(Some(date(2020, 1, 1)), date(2024, 6, 1)), date(2025, 6, 1));
    }

    #[test]
    fn missing_expiry_restarts_from_today() {
        assert_eq!(renew(None, date(2024, 6, 1)), date(2025, 6, 1));
    }

    #[test]
    fn expiry_today_counts_as_active() {
        assert_eq!(renew(Some(date(2024, 6, 1)), date(2024, 6, 1)), date(2025, 6, 1));
        assert!(is_active(Some(date(2024, 6, 1)), date(2024, 6, 1)));
    }

    #[test]
    fn expired_yesterday_resets() {
        assert_eq!(renew(Some(date(2024, 5, 31)), date(2024, 6, 1)), date(2025, 6, 1));
        assert!(!is_active(Some(date(2024, 5, 31)), date(2024, 6, 1)));
    }

    #[test]
    fn leap_day_clamps_to_end_of_february() {
        assert_eq!(renew(Some(date(2024, 2, 29)), date(2024, 1, 10)), date(2025, 2, 28));
    }

    /// Same month and day one year on, with Feb 29 landing on Feb 28.
    fn next_year(date: NaiveDate) -> NaiveDate {
        date.with_year(date.year() + 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(date.year() + 1, 2, 28).unwrap())
    }

    #[test]
    fn renew_matches_calendar_over_a_range() {
        let today = date(2024, 6, 1);
        for offset in -800i64..1500 {
            let existing = today + chrono::Duration::days(offset);
            let expected = if existing >= today {
                next_year(existing)
            } else {
                date(2025, 6, 1)
            };
            assert_eq!(renew(Some(existing), today), expected, "existing = {}", existing);
        }
    }

    #[test]
    fn missing_expiry_is_inactive() {
        assert!(!is_active(None, date(2024, 6, 1)));
    }
}
