//! Actual/360 and Actual/365 Fixed.

use super::DayCount;
use crate::types::Date;

/// Actual/360: actual days over a 360-day year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Act360;

impl DayCount for Act360 {
    fn name(&self) -> &'static str {
        "ACT/360"
    }

    fn year_fraction(&self, start: Date, end: Date) -> f64 {
        self.day_count(start, end) as f64 / 360.0
    }

    fn day_count(&self, start: Date, end: Date) -> i64 {
        start.days_between(&end)
    }
}

/// Actual/365 Fixed: actual days over a 365-day year, ignoring leap years.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Act365Fixed;

impl DayCount for Act365Fixed {
    fn name(&self) -> &'static str {
        "ACT/365F"
    }

    fn year_fraction(&self, start: Date, end: Date) -> f64 {
        self.day_count(start, end) as f64 / 365.0
    }

    fn day_count(&self, start: Date, end: Date) -> i64 {
        start.days_between(&end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_act360_quarter() {
        let start = Date::from_ymd(2025, 1, 1).unwrap();
        let end = Date::from_ymd(2025, 4, 1).unwrap();
        assert_eq!(Act360.day_count(start, end), 90);
        assert_relative_eq!(Act360.year_fraction(start, end), 0.25);
    }

    #[test]
    fn test_act365_leap_year_exceeds_one() {
        let start = Date::from_ymd(2024, 1, 1).unwrap();
        let end = Date::from_ymd(2025, 1, 1).unwrap();
        assert_relative_eq!(Act365Fixed.year_fraction(start, end), 366.0 / 365.0);
    }

    #[test]
    fn test_negative_when_reversed() {
        let start = Date::from_ymd(2025, 4, 1).unwrap();
        let end = Date::from_ymd(2025, 1, 1).unwrap();
        assert!(Act360.year_fraction(start, end) < 0.0);
    }
}
