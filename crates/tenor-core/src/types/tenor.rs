//! Tenors such as `3M`, `10Y` or `2B`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Unit of a [`Tenor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenorUnit {
    /// Calendar days.
    Days,
    /// Business days on the relevant calendar.
    BusinessDays,
    /// Weeks.
    Weeks,
    /// Months.
    Months,
    /// Years.
    Years,
}

impl TenorUnit {
    fn suffix(self) -> char {
        match self {
            TenorUnit::Days => 'D',
            TenorUnit::BusinessDays => 'B',
            TenorUnit::Weeks => 'W',
            TenorUnit::Months => 'M',
            TenorUnit::Years => 'Y',
        }
    }
}

/// A signed period: a count of a [`TenorUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tenor {
    count: i32,
    unit: TenorUnit,
}

impl Tenor {
    /// Creates a tenor.
    #[must_use]
    pub const fn new(count: i32, unit: TenorUnit) -> Self {
        Self { count, unit }
    }

    /// Shorthand for a number of months.
    #[must_use]
    pub const fn months(count: i32) -> Self {
        Self::new(count, TenorUnit::Months)
    }

    /// Shorthand for a number of years.
    #[must_use]
    pub const fn years(count: i32) -> Self {
        Self::new(count, TenorUnit::Years)
    }

    /// Shorthand for a number of business days.
    #[must_use]
    pub const fn business_days(count: i32) -> Self {
        Self::new(count, TenorUnit::BusinessDays)
    }

    /// Number of units.
    #[must_use]
    pub const fn count(&self) -> i32 {
        self.count
    }

    /// The unit.
    #[must_use]
    pub const fn unit(&self) -> TenorUnit {
        self.unit
    }

    /// Returns the same tenor scaled by `factor`.
    #[must_use]
    pub const fn times(&self, factor: i32) -> Self {
        Self::new(self.count * factor, self.unit)
    }

    /// True for the one-business-day tenor that tags overnight indices.
    #[must_use]
    pub fn is_overnight(&self) -> bool {
        self.count == 1 && self.unit == TenorUnit::BusinessDays
    }

    /// Rough length in years, used only for sizing and sanity checks.
    #[must_use]
    pub fn approx_years(&self) -> f64 {
        let count = f64::from(self.count);
        match self.unit {
            TenorUnit::Days => count / 365.0,
            TenorUnit::BusinessDays => count / 252.0,
            TenorUnit::Weeks => count * 7.0 / 365.0,
            TenorUnit::Months => count / 12.0,
            TenorUnit::Years => count,
        }
    }

    /// Parses strings like `3M`, `10y`, `2B`, `-1D`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTenor` for empty input, a missing count or
    /// an unknown unit letter.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let s = input.trim().to_ascii_uppercase();
        let Some(unit_char) = s.chars().last() else {
            return Err(CoreError::invalid_tenor(input, "empty"));
        };
        let unit = match unit_char {
            'D' => TenorUnit::Days,
            'B' => TenorUnit::BusinessDays,
            'W' => TenorUnit::Weeks,
            'M' => TenorUnit::Months,
            'Y' => TenorUnit::Years,
            other => {
                return Err(CoreError::invalid_tenor(
                    input,
                    format!("unknown unit '{other}'"),
                ))
            }
        };
        let digits = &s[..s.len() - 1];
        let count = if digits.is_empty() || digits == "+" {
            0
        } else {
            digits
                .parse::<i32>()
                .map_err(|_| CoreError::invalid_tenor(input, "count is not an integer"))?
        };
        Ok(Self::new(count, unit))
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

impl FromStr for Tenor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tenor::parse(s)
    }
}

impl Serialize for Tenor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tenor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Tenor::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(Tenor::parse("3M").unwrap(), Tenor::months(3));
        assert_eq!(Tenor::parse("10y").unwrap(), Tenor::years(10));
        assert_eq!(Tenor::parse(" 2B ").unwrap(), Tenor::business_days(2));
        assert_eq!(Tenor::parse("-1D").unwrap(), Tenor::new(-1, TenorUnit::Days));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Tenor::parse("").is_err());
        assert!(Tenor::parse("3Q").is_err());
        assert!(Tenor::parse("xM").is_err());
    }

    #[test]
    fn test_overnight_flag() {
        assert!(Tenor::parse("1B").unwrap().is_overnight());
        assert!(!Tenor::parse("1D").unwrap().is_overnight());
    }

    #[test]
    fn test_serde_as_string() {
        let tenor: Tenor = serde_json::from_str("\"6M\"").unwrap();
        assert_eq!(tenor, Tenor::months(6));
        assert_eq!(serde_json::to_string(&tenor).unwrap(), "\"6M\"");
    }
}
