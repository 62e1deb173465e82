//! Static reference data shared by models and engines.

use std::sync::Arc;

use tenor_core::calendars::{Calendar, CalendarRegistry, HolidayCalendar};

use crate::error::ModelResult;
use crate::market::{DataConventionRegistry, FixingStore, IndexDefinition, IndexRegistry};
use crate::valuation::EngineRegistry;

/// Calendars, indices, conventions, fixings and the engine table.
///
/// Built once per process or test fixture and shared behind an `Arc`;
/// nothing in here changes during calibration or pricing.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Business-day calendars by name.
    pub calendars: CalendarRegistry,
    /// Index definitions.
    pub indices: IndexRegistry,
    /// Data conventions for calibration baskets.
    pub conventions: DataConventionRegistry,
    /// Published fixings.
    pub fixings: FixingStore,
    /// Valuation engine dispatch table.
    pub engines: EngineRegistry,
}

impl Environment {
    /// An environment with the default indices and engines, weekend-only
    /// market calendars, no conventions and no fixings.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut calendars = CalendarRegistry::new();
        for name in ["USNY", "TARGET", "GBLO"] {
            let registered =
                calendars.register(name, Arc::new(HolidayCalendar::new(name, Vec::new())));
            debug_assert!(registered.is_ok(), "default calendar names are distinct");
        }
        Self {
            calendars,
            indices: IndexRegistry::with_defaults(),
            conventions: DataConventionRegistry::new(),
            fixings: FixingStore::new(),
            engines: EngineRegistry::with_defaults(),
        }
    }

    /// Replaces the convention registry.
    #[must_use]
    pub fn with_conventions(mut self, conventions: DataConventionRegistry) -> Self {
        self.conventions = conventions;
        self
    }

    /// Replaces the fixing store.
    #[must_use]
    pub fn with_fixings(mut self, fixings: FixingStore) -> Self {
        self.fixings = fixings;
        self
    }

    /// Replaces the calendar registry.
    #[must_use]
    pub fn with_calendars(mut self, calendars: CalendarRegistry) -> Self {
        self.calendars = calendars;
        self
    }

    /// Looks up an index definition.
    pub fn index(&self, name: &str) -> ModelResult<&IndexDefinition> {
        self.indices.get(name)
    }

    /// Resolves a calendar by name.
    pub fn calendar(&self, name: &str) -> ModelResult<Arc<dyn Calendar>> {
        Ok(self.calendars.get(name)?)
    }

    /// The calendar of an index.
    pub fn index_calendar(&self, name: &str) -> ModelResult<Arc<dyn Calendar>> {
        let index = self.index(name)?;
        self.calendar(&index.calendar)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenor_core::Date;

    #[test]
    fn test_default_calendars_resolve() {
        let env = Environment::with_defaults();
        let cal = env.index_calendar("USD-LIBOR-BBA-3M").unwrap();
        assert!(!cal.is_business_day(Date::from_ymd(2025, 1, 4).unwrap()));
        assert!(env.calendar("XXXX").is_err());
    }

    #[test]
    fn test_every_default_index_has_a_calendar() {
        let env = Environment::with_defaults();
        for name in ["USNY", "TARGET", "GBLO"] {
            assert!(env.calendar(name).is_ok(), "{name}");
        }
        for index in [
            "SOFR-1B",
            "ESTR-1B",
            "SONIA-1B",
            "USD-LIBOR-BBA-3M",
            "USD-LIBOR-BBA-6M",
            "GBP-LIBOR-BBA-6M",
        ] {
            assert!(env.index_calendar(index).is_ok(), "{index}");
        }
    }
}
