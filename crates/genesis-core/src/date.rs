//! Calendar helpers.
//!
//! The backend partitions daily data by UTC calendar date (`YYYY-MM-DD`), so
//! "today" is always the UTC date.

use chrono::{Datelike, Duration, NaiveDate, Utc};

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn yesterday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(1)
}

/// ISO day of week (1 = Monday, 7 = Sunday).
pub fn iso_day_of_week(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// The Monday of `date`'s week.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_day_of_week() {
        // 2024-01-01 was a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(iso_day_of_week(monday), 1);
        assert_eq!(iso_day_of_week(monday + Duration::days(6)), 7);
    }

    #[test]
    fn test_week_start_is_monday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(week_start(week_start(sunday)), week_start(sunday));
    }

    #[test]
    fn test_yesterday_crosses_month() {
        let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(yesterday_of(first), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
