//! Day-granularity date helpers.
//!
//! Every period comparison in the engine happens on `NaiveDate`, so the
//! time-of-day and timezone of the source data never shift an entry into a
//! neighbouring period.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Build a window; reversed bounds are swapped rather than rejected.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// First `weekday` falling on or after `date`.
pub fn next_weekday_on_or_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let from = date.weekday().num_days_from_monday() as i64;
    let to = weekday.num_days_from_monday() as i64;
    let ahead = (to - from).rem_euclid(7);
    add_days(date, ahead)
}

/// Forecast delivery date for an iteration ending on `iteration_end`:
/// shift by `offset_days`, then roll forward to `weekday`.
///
/// With the defaults (5 days, Friday) this lands on the Friday of the week
/// after the iteration ends, whatever weekday the iteration ends on.
pub fn forecast_delivery_date(iteration_end: NaiveDate, offset_days: i64, weekday: Weekday) -> NaiveDate {
    next_weekday_on_or_after(add_days(iteration_end, offset_days), weekday)
}

/// `date + days`, clamped to the representable calendar instead of
/// overflowing.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Signed number of days from `today` to `date`.
pub fn days_between(today: NaiveDate, date: NaiveDate) -> i64 {
    (date - today).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 14));
        assert!(window.contains(d(2024, 1, 1)));
        assert!(window.contains(d(2024, 1, 14)));
        assert!(!window.contains(d(2023, 12, 31)));
        assert!(!window.contains(d(2024, 1, 15)));
        assert_eq!(window.days(), 14);
    }

    #[test]
    fn reversed_window_is_normalized() {
        let window = DateWindow::new(d(2024, 1, 14), d(2024, 1, 1));
        assert_eq!(window.start, d(2024, 1, 1));
    }

    #[test]
    fn forecast_lands_on_friday_of_following_week() {
        // Friday 2024-01-12 -> Friday 2024-01-19
        assert_eq!(forecast_delivery_date(d(2024, 1, 12), 5, Weekday::Fri), d(2024, 1, 19));
        // Sunday 2024-01-14 -> Friday 2024-01-19
        assert_eq!(forecast_delivery_date(d(2024, 1, 14), 5, Weekday::Fri), d(2024, 1, 19));
        // Monday 2024-01-08 -> Friday 2024-01-19
        assert_eq!(forecast_delivery_date(d(2024, 1, 8), 5, Weekday::Fri), d(2024, 1, 19));
    }

    #[test]
    fn add_days_saturates_at_calendar_bounds() {
        assert_eq!(add_days(d(2024, 1, 1), 31), d(2024, 2, 1));
        assert_eq!(add_days(d(2024, 1, 1), 9_000_000_000_000), NaiveDate::MAX);
        assert_eq!(add_days(d(2024, 1, 1), i64::MIN), NaiveDate::MIN);
        assert_eq!(forecast_delivery_date(NaiveDate::MAX, 5, Weekday::Fri), NaiveDate::MAX);
    }

    #[test]
    fn next_weekday_keeps_matching_day() {
        assert_eq!(next_weekday_on_or_after(d(2024, 1, 19), Weekday::Fri), d(2024, 1, 19));
        assert_eq!(next_weekday_on_or_after(d(2024, 1, 20), Weekday::Fri), d(2024, 1, 26));
    }
}
