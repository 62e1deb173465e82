//! Business day calendars and conventions.
//!
//! This module provides:
//! - The [`Calendar`] trait with period advancing under a roll convention
//! - A weekend-only calendar and a weekend-plus-holiday-list calendar
//! - An explicit [`CalendarRegistry`] that resolves calendar names used in
//!   conventions (`USGS`, `NYC`, `TARGET`, ...) to instances

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

mod conventions;

pub use conventions::{adjust, BusinessDayConvention};

use crate::error::{CoreError, CoreResult};
use crate::types::{Date, Tenor, TenorUnit};

/// Trait for business day calendars.
pub trait Calendar: Send + Sync {
    /// Returns the name of the calendar.
    fn name(&self) -> &str;

    /// Returns true if the date is a business day.
    fn is_business_day(&self, date: Date) -> bool;

    /// Returns true if the date is a holiday.
    fn is_holiday(&self, date: Date) -> bool {
        !self.is_business_day(date)
    }

    /// Adjusts a date according to the given business day convention.
    fn adjust(&self, date: Date, convention: BusinessDayConvention) -> Date {
        conventions::adjust(date, convention, self)
    }

    /// Advances a date by a number of business days.
    ///
    /// Zero days rolls a holiday forward to the next business day.
    fn add_business_days(&self, date: Date, days: i32) -> Date {
        if days == 0 {
            return self.adjust(date, BusinessDayConvention::Following);
        }
        let mut result = date;
        let mut remaining = days.abs();
        let direction: i64 = if days >= 0 { 1 } else { -1 };

        while remaining > 0 {
            result = result.add_days(direction);
            if self.is_business_day(result) {
                remaining -= 1;
            }
        }

        result
    }

    /// Advances a date by a tenor and rolls the result.
    ///
    /// Business-day tenors count business days and ignore the convention.
    /// With `end_of_month`, a month-end start maps to the month-end of the
    /// target month for month and year tenors.
    fn advance(
        &self,
        date: Date,
        tenor: Tenor,
        convention: BusinessDayConvention,
        end_of_month: bool,
    ) -> CoreResult<Date> {
        let raw = match tenor.unit() {
            TenorUnit::BusinessDays => return Ok(self.add_business_days(date, tenor.count())),
            TenorUnit::Days => date.add_days(i64::from(tenor.count())),
            TenorUnit::Weeks => date.add_days(7 * i64::from(tenor.count())),
            TenorUnit::Months | TenorUnit::Years => {
                let months = if tenor.unit() == TenorUnit::Years {
                    tenor.count() * 12
                } else {
                    tenor.count()
                };
                let shifted = date.add_months(months)?;
                if end_of_month && date.is_end_of_month() {
                    shifted.end_of_month()
                } else {
                    shifted
                }
            }
        };
        Ok(self.adjust(raw, convention))
    }
}

/// A simple weekend-only calendar (no holidays).
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekendCalendar;

impl Calendar for WeekendCalendar {
    fn name(&self) -> &str {
        "WEEKEND"
    }

    fn is_business_day(&self, date: Date) -> bool {
        !date.is_weekend()
    }
}

/// Weekends plus an explicit set of holiday dates.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    name: String,
    holidays: BTreeSet<Date>,
}

impl HolidayCalendar {
    /// Creates a calendar from a list of holidays.
    pub fn new(name: impl Into<String>, holidays: impl IntoIterator<Item = Date>) -> Self {
        Self {
            name: name.into(),
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Adds one holiday.
    pub fn add_holiday(&mut self, date: Date) {
        self.holidays.insert(date);
    }

    /// Number of explicit holidays.
    #[must_use]
    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }
}

impl Calendar for HolidayCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_business_day(&self, date: Date) -> bool {
        !date.is_weekend() && !self.holidays.contains(&date)
    }
}

/// Calendar that is a business day only when every member calendar is.
pub struct JointCalendar {
    calendars: Vec<Arc<dyn Calendar>>,
    name: String,
}

impl JointCalendar {
    /// Creates a joint calendar.
    pub fn new(calendars: Vec<Arc<dyn Calendar>>) -> Self {
        let name = calendars
            .iter()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>()
            .join("+");
        Self { calendars, name }
    }
}

impl Calendar for JointCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_business_day(&self, date: Date) -> bool {
        self.calendars.iter().all(|cal| cal.is_business_day(date))
    }
}

/// Name-to-calendar lookup shared by conventions and indices.
///
/// Names are matched case-insensitively. `NONE` and `WEEKEND` always
/// resolve to the weekend-only calendar. Joint calendars are written
/// `A+B`.
#[derive(Clone, Default)]
pub struct CalendarRegistry {
    calendars: HashMap<String, Arc<dyn Calendar>>,
}

impl CalendarRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a calendar under a name.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::CalendarError` if the name is already taken.
    pub fn register(&mut self, name: &str, calendar: Arc<dyn Calendar>) -> CoreResult<()> {
        let key = name.trim().to_uppercase();
        if self.calendars.contains_key(&key) {
            return Err(CoreError::calendar(format!(
                "calendar '{key}' is already registered"
            )));
        }
        self.calendars.insert(key, calendar);
        Ok(())
    }

    /// Resolves a calendar name.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownConvention` for unregistered names.
    pub fn get(&self, name: &str) -> CoreResult<Arc<dyn Calendar>> {
        let key = name.trim().to_uppercase();
        if key.is_empty() || key == "NONE" || key == "WEEKEND" {
            return Ok(Arc::new(WeekendCalendar));
        }
        if let Some(calendar) = self.calendars.get(&key) {
            return Ok(Arc::clone(calendar));
        }
        if key.contains('+') {
            let members = key
                .split('+')
                .map(|part| self.get(part))
                .collect::<CoreResult<Vec<_>>>()?;
            return Ok(Arc::new(JointCalendar::new(members)));
        }
        Err(CoreError::unknown("calendar", name))
    }
}

impl std::fmt::Debug for CalendarRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.calendars.keys().collect();
        names.sort();
        f.debug_struct("CalendarRegistry").field("calendars", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    #[test]
    fn test_weekend_calendar() {
        let cal = WeekendCalendar;
        assert!(cal.is_business_day(d(2025, 1, 6)));
        assert!(!cal.is_business_day(d(2025, 1, 4)));
        assert!(!cal.is_business_day(d(2025, 1, 5)));
    }

    #[test]
    fn test_add_business_days() {
        let cal = WeekendCalendar;
        assert_eq!(cal.add_business_days(d(2025, 1, 3), 1), d(2025, 1, 6));
        assert_eq!(cal.add_business_days(d(2025, 1, 6), -1), d(2025, 1, 3));
        assert_eq!(cal.add_business_days(d(2025, 1, 4), 0), d(2025, 1, 6));
    }

    #[test]
    fn test_holiday_calendar_skips_holidays() {
        let cal = HolidayCalendar::new("USGS", [d(2025, 1, 20)]);
        assert!(!cal.is_business_day(d(2025, 1, 20)));
        assert_eq!(cal.add_business_days(d(2025, 1, 17), 1), d(2025, 1, 21));
    }

    #[test]
    fn test_advance_months_with_roll() {
        let cal = WeekendCalendar;
        // 2025-03-31 + 2M = 2025-05-31 (Saturday) -> MF back to Friday
        let rolled = cal
            .advance(d(2025, 3, 31), Tenor::months(2), BusinessDayConvention::ModifiedFollowing, false)
            .unwrap();
        assert_eq!(rolled, d(2025, 5, 30));
    }

    #[test]
    fn test_advance_end_of_month() {
        let cal = WeekendCalendar;
        let rolled = cal
            .advance(d(2025, 2, 28), Tenor::months(1), BusinessDayConvention::Unadjusted, true)
            .unwrap();
        assert_eq!(rolled, d(2025, 3, 31));
    }

    #[test]
    fn test_registry_resolves_joint_names() {
        let mut registry = CalendarRegistry::new();
        registry
            .register("USGS", Arc::new(HolidayCalendar::new("USGS", [d(2025, 1, 20)])))
            .unwrap();
        registry
            .register("LON", Arc::new(HolidayCalendar::new("LON", [d(2025, 1, 21)])))
            .unwrap();
        let joint = registry.get("usgs+lon").unwrap();
        assert!(!joint.is_business_day(d(2025, 1, 20)));
        assert!(!joint.is_business_day(d(2025, 1, 21)));
        assert!(joint.is_business_day(d(2025, 1, 22)));
        assert!(registry.get("NONE").unwrap().is_business_day(d(2025, 1, 20)));
        assert!(registry.get("MARS").is_err());
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = CalendarRegistry::new();
        registry.register("USGS", Arc::new(WeekendCalendar)).unwrap();
        assert!(registry.register("usgs", Arc::new(WeekendCalendar)).is_err());
    }
}
