//! Data conventions: how a quoted axis point becomes an instrument.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tenor_core::calendars::BusinessDayConvention;
use tenor_core::daycounts::DayCountConvention;
use tenor_core::Tenor;

use crate::error::{ModelError, ModelResult};
use crate::instruments::OvernightCompounding;

/// Instrument family a convention produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConventionKind {
    /// Overnight-index swap quoted as a par rate.
    #[serde(rename = "RFR SWAP")]
    RfrSwap,
    /// Overnight-index future quoted as a price.
    #[serde(rename = "RFR FUTURE")]
    RfrFuture,
    /// Term-index swap quoted as a par rate.
    #[serde(rename = "IBOR SWAP")]
    IborSwap,
    /// Term-index future quoted as a price.
    #[serde(rename = "IBOR FUTURE")]
    IborFuture,
}

impl ConventionKind {
    /// True for the two future kinds, whose axis labels are date pairs.
    pub fn is_future(self) -> bool {
        matches!(self, ConventionKind::RfrFuture | ConventionKind::IborFuture)
    }
}

fn default_compounding() -> OvernightCompounding {
    OvernightCompounding::Compound
}

/// A named market convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConvention {
    /// Convention name; filled from the registry key when loaded.
    #[serde(default, rename = "NAME")]
    pub name: String,
    /// Instrument family.
    #[serde(rename = "KIND")]
    pub kind: ConventionKind,
    /// Floating index.
    #[serde(rename = "INDEX")]
    pub index: String,
    /// Fixed-leg day count.
    #[serde(rename = "ACCRUAL BASIS")]
    pub accrual_basis: DayCountConvention,
    /// Fixed-leg period.
    #[serde(rename = "ACCRUAL PERIOD")]
    pub accrual_period: Tenor,
    /// Lag from value date to spot, and from period end to payment.
    #[serde(rename = "PAYMENT OFFSET")]
    pub payment_offset: Tenor,
    /// Roll convention of schedule dates.
    #[serde(rename = "PAYMENT BIZ DAY CONV")]
    pub payment_biz_day_conv: BusinessDayConvention,
    /// Calendar of schedule dates.
    #[serde(rename = "PAYMENT HOL CONV")]
    pub payment_hol_conv: String,
    /// Overnight averaging method.
    #[serde(rename = "OIS COMPOUNDING", default = "default_compounding")]
    pub ois_compounding: OvernightCompounding,
}

/// Explicit registry of data conventions.
#[derive(Debug, Clone, Default)]
pub struct DataConventionRegistry {
    conventions: HashMap<String, DataConvention>,
}

impl DataConventionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a convention.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` if the name is already registered.
    pub fn insert(&mut self, convention: DataConvention) -> ModelResult<()> {
        let key = convention.name.trim().to_uppercase();
        if key.is_empty() {
            return Err(ModelError::configuration("data convention without a name"));
        }
        if self.conventions.contains_key(&key) {
            return Err(ModelError::configuration(format!(
                "data convention '{key}' is already registered"
            )));
        }
        self.conventions.insert(key, convention);
        Ok(())
    }

    /// Looks up a convention.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` for unknown names.
    pub fn get(&self, name: &str) -> ModelResult<&DataConvention> {
        self.conventions
            .get(&name.trim().to_uppercase())
            .ok_or_else(|| ModelError::configuration(format!("unknown data convention '{name}'")))
    }

    /// Number of conventions.
    pub fn len(&self) -> usize {
        self.conventions.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.conventions.is_empty()
    }

    /// Loads a JSON object mapping convention names to their fields.
    ///
    /// Names are compared case-insensitively, so `"usd-sofr-ois"` and
    /// `"USD-SOFR-OIS"` in one document collide.
    ///
    /// # Errors
    ///
    /// `ModelError::Configuration` for malformed JSON or duplicate names.
    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| ModelError::configuration(format!("invalid convention JSON: {e}")))?;

        let mut registry = Self::new();
        for (name, payload) in raw {
            let mut convention: DataConvention = serde_json::from_value(payload).map_err(|e| {
                ModelError::configuration(format!("invalid data convention '{name}': {e}"))
            })?;
            convention.name = name;
            registry.insert(convention)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "USD-SOFR-OIS": {
            "KIND": "RFR SWAP",
            "INDEX": "SOFR-1B",
            "ACCRUAL BASIS": "ACT/360",
            "ACCRUAL PERIOD": "1Y",
            "PAYMENT OFFSET": "2B",
            "PAYMENT BIZ DAY CONV": "MF",
            "PAYMENT HOL CONV": "USNY"
        },
        "USD-LIBOR-FUT": {
            "KIND": "IBOR FUTURE",
            "INDEX": "USD-LIBOR-BBA-3M",
            "ACCRUAL BASIS": "ACT/360",
            "ACCRUAL PERIOD": "3M",
            "PAYMENT OFFSET": "0B",
            "PAYMENT BIZ DAY CONV": "MF",
            "PAYMENT HOL CONV": "NONE"
        }
    }"#;

    #[test]
    fn test_load_registry() {
        let registry = DataConventionRegistry::from_json_str(JSON).unwrap();
        assert_eq!(registry.len(), 2);
        let ois = registry.get("usd-sofr-ois").unwrap();
        assert_eq!(ois.kind, ConventionKind::RfrSwap);
        assert_eq!(ois.ois_compounding, OvernightCompounding::Compound);
        assert_eq!(ois.payment_offset, Tenor::business_days(2));
        assert!(registry.get("USD-LIBOR-FUT").unwrap().kind.is_future());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let json = JSON.replace("USD-LIBOR-FUT", "usd-sofr-ois");
        assert!(matches!(
            DataConventionRegistry::from_json_str(&json),
            Err(ModelError::Configuration { .. })
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = JSON.replace("IBOR FUTURE", "BOND");
        assert!(DataConventionRegistry::from_json_str(&json).is_err());
    }
}
