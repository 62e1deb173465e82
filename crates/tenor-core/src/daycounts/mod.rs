//! Day count conventions.
//!
//! Year fractions are plain `f64`: they feed exponentials and accrual
//! products directly, so there is no benefit in a decimal representation.
//!
//! - [`Act360`]: Actual/360, money market and overnight index legs
//! - [`Act365Fixed`]: Actual/365 Fixed, the curve time measure
//! - [`Thirty360US`]: 30/360 bond basis, USD fixed legs
//! - [`Thirty360E`]: 30E/360 Eurobond basis, EUR fixed legs
//!
//! ```rust
//! use tenor_core::daycounts::{DayCount, Act360};
//! use tenor_core::types::Date;
//!
//! let start = Date::from_ymd(2025, 1, 1).unwrap();
//! let end = Date::from_ymd(2025, 4, 1).unwrap();
//! assert_eq!(Act360.year_fraction(start, end), 0.25);
//! ```

mod act;
mod thirty360;

pub use act::{Act360, Act365Fixed};
pub use thirty360::{Thirty360E, Thirty360US};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::types::Date;

/// Trait for day count conventions.
pub trait DayCount: Send + Sync {
    /// Market name of the convention, e.g. "ACT/360".
    fn name(&self) -> &'static str;

    /// Year fraction between two dates; negative when `end < start`.
    fn year_fraction(&self, start: Date, end: Date) -> f64;

    /// Day count between two dates under the convention's month rules.
    fn day_count(&self, start: Date, end: Date) -> i64;
}

/// Runtime-selectable day count convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DayCountConvention {
    /// Actual/360
    Act360,
    /// Actual/365 Fixed
    #[default]
    Act365Fixed,
    /// 30/360 US bond basis
    Thirty360US,
    /// 30E/360 Eurobond basis
    Thirty360E,
}

impl DayCountConvention {
    /// Returns the convention as a trait object.
    #[must_use]
    pub fn as_day_count(&self) -> &'static dyn DayCount {
        match self {
            DayCountConvention::Act360 => &Act360,
            DayCountConvention::Act365Fixed => &Act365Fixed,
            DayCountConvention::Thirty360US => &Thirty360US,
            DayCountConvention::Thirty360E => &Thirty360E,
        }
    }

    /// Market name of the convention.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.as_day_count().name()
    }

    /// Year fraction between two dates.
    #[must_use]
    pub fn year_fraction(&self, start: Date, end: Date) -> f64 {
        self.as_day_count().year_fraction(start, end)
    }
}

impl std::fmt::Display for DayCountConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DayCountConvention {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        match normalized.as_str() {
            "ACT/360" | "ACTUAL/360" | "ACT360" => Ok(DayCountConvention::Act360),
            "ACT/365" | "ACT/365F" | "ACT/365 FIXED" | "ACTUAL/365" | "ACT365" | "NONE" => {
                Ok(DayCountConvention::Act365Fixed)
            }
            "30/360" | "30/360 US" | "30U/360" | "BOND" => Ok(DayCountConvention::Thirty360US),
            "30E/360" | "EUROBOND" => Ok(DayCountConvention::Thirty360E),
            _ => Err(CoreError::unknown("day count", s)),
        }
    }
}

impl Serialize for DayCountConvention {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DayCountConvention {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("act/360".parse::<DayCountConvention>().unwrap(), DayCountConvention::Act360);
        assert_eq!("NONE".parse::<DayCountConvention>().unwrap(), DayCountConvention::Act365Fixed);
        assert_eq!("30/360".parse::<DayCountConvention>().unwrap(), DayCountConvention::Thirty360US);
        assert!("ACT/999".parse::<DayCountConvention>().is_err());
    }

    #[test]
    fn test_round_trip_through_name() {
        for dc in [
            DayCountConvention::Act360,
            DayCountConvention::Act365Fixed,
            DayCountConvention::Thirty360US,
            DayCountConvention::Thirty360E,
        ] {
            assert_eq!(dc.name().parse::<DayCountConvention>().unwrap(), dc);
        }
    }
}
