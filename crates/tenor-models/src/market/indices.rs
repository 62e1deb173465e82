//! Interest-rate index definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tenor_core::calendars::BusinessDayConvention;
use tenor_core::daycounts::DayCountConvention;
use tenor_core::{Currency, Tenor};

use crate::error::{ModelError, ModelResult};

/// Static definition of a floating-rate index.
///
/// Overnight indices carry the `1B` tenor; term indices carry their
/// fixing tenor, e.g. `3M` for `USD-LIBOR-BBA-3M`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name, e.g. `SOFR-1B`.
    pub name: String,
    /// Currency of the index.
    pub currency: Currency,
    /// Fixing tenor.
    pub tenor: Tenor,
    /// Accrual day count of the forward rate.
    pub day_count: DayCountConvention,
    /// Calendar name, resolved through the calendar registry.
    pub calendar: String,
    /// Roll convention for the period end.
    pub convention: BusinessDayConvention,
    /// Month-end rolling of the period end.
    #[serde(default)]
    pub end_of_month: bool,
    /// Spot lag between fixing and accrual start.
    pub spot_lag: Tenor,
}

impl IndexDefinition {
    /// True for overnight (compounding) indices.
    pub fn is_overnight(&self) -> bool {
        self.tenor.is_overnight()
    }
}

/// Explicit registry of index definitions.
#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    indices: HashMap<String, IndexDefinition>,
}

impl IndexRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an index.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` if the name is taken.
    pub fn insert(&mut self, index: IndexDefinition) -> ModelResult<()> {
        let key = index.name.trim().to_uppercase();
        if self.indices.contains_key(&key) {
            return Err(ModelError::configuration(format!(
                "index '{key}' is already registered"
            )));
        }
        self.indices.insert(key, index);
        Ok(())
    }

    /// Looks up an index by name.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` for unknown names.
    pub fn get(&self, name: &str) -> ModelResult<&IndexDefinition> {
        self.indices
            .get(&name.trim().to_uppercase())
            .ok_or_else(|| ModelError::configuration(format!("unknown index '{name}'")))
    }

    /// Number of registered indices.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Registry with the common overnight and term indices.
    #[must_use]
    pub fn with_defaults() -> Self {
        use BusinessDayConvention::ModifiedFollowing;
        use DayCountConvention::{Act360, Act365Fixed};

        let on = |name: &str, currency, day_count, calendar: &str| IndexDefinition {
            name: name.to_string(),
            currency,
            tenor: Tenor::business_days(1),
            day_count,
            calendar: calendar.to_string(),
            convention: BusinessDayConvention::Following,
            end_of_month: false,
            spot_lag: Tenor::business_days(0),
        };
        let term = |name: &str, currency, months, day_count, calendar: &str| IndexDefinition {
            name: name.to_string(),
            currency,
            tenor: Tenor::months(months),
            day_count,
            calendar: calendar.to_string(),
            convention: ModifiedFollowing,
            end_of_month: true,
            spot_lag: Tenor::business_days(2),
        };

        let mut registry = Self::new();
        for index in [
            on("SOFR-1B", Currency::USD, Act360, "USNY"),
            on("ESTR-1B", Currency::EUR, Act360, "TARGET"),
            on("SONIA-1B", Currency::GBP, Act365Fixed, "GBLO"),
            term("USD-LIBOR-BBA-3M", Currency::USD, 3, Act360, "USNY+GBLO"),
            term("USD-LIBOR-BBA-6M", Currency::USD, 6, Act360, "USNY+GBLO"),
            term("GBP-LIBOR-BBA-6M", Currency::GBP, 6, Act365Fixed, "GBLO"),
        ] {
            let inserted = registry.insert(index);
            debug_assert!(inserted.is_ok(), "default index names are distinct");
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = IndexRegistry::with_defaults();
        assert_eq!(registry.len(), 6);
        assert!(registry.get("sofr-1b").unwrap().is_overnight());
        let libor = registry.get("USD-LIBOR-BBA-3M").unwrap();
        assert!(!libor.is_overnight());
        assert_eq!(libor.tenor, Tenor::months(3));
    }

    #[test]
    fn test_unknown_and_duplicate() {
        let mut registry = IndexRegistry::with_defaults();
        assert!(matches!(
            registry.get("EURIBOR-3M"),
            Err(ModelError::Configuration { .. })
        ));
        let dup = registry.get("SOFR-1B").unwrap().clone();
        assert!(registry.insert(dup).is_err());
    }

    #[test]
    fn test_serde_definition() {
        let json = r#"{
            "name": "EURIBOR-6M", "currency": "EUR", "tenor": "6M",
            "day_count": "ACT/360", "calendar": "TARGET",
            "convention": "MF", "spot_lag": "2B"
        }"#;
        let index: IndexDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(index.tenor, Tenor::months(6));
        assert!(!index.end_of_month);
    }
}
