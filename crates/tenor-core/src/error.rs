//! Error types for date, calendar and convention handling.

use thiserror::Error;

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the date and convention layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Error in date calculations or invalid date.
    #[error("Invalid date: {message}")]
    InvalidDate {
        /// Description of the date error.
        message: String,
    },

    /// A tenor or period string could not be parsed.
    #[error("Invalid tenor '{input}': {reason}")]
    InvalidTenor {
        /// The offending input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A convention name (day count, business-day rule, currency) is unknown.
    #[error("Unknown {kind} '{name}'")]
    UnknownConvention {
        /// Convention family, e.g. "day count".
        kind: &'static str,
        /// The name that failed to resolve.
        name: String,
    },

    /// Calendar or business day error.
    #[error("Calendar error: {reason}")]
    CalendarError {
        /// Description of the error.
        reason: String,
    },

    /// Schedule generation failed.
    #[error("Schedule error: {reason}")]
    ScheduleError {
        /// Description of the error.
        reason: String,
    },
}

impl CoreError {
    /// Creates an invalid date error.
    #[must_use]
    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDate {
            message: message.into(),
        }
    }

    /// Creates an invalid tenor error.
    #[must_use]
    pub fn invalid_tenor(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTenor {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown convention error.
    #[must_use]
    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownConvention {
            kind,
            name: name.into(),
        }
    }

    /// Creates a calendar error.
    #[must_use]
    pub fn calendar(reason: impl Into<String>) -> Self {
        Self::CalendarError {
            reason: reason.into(),
        }
    }

    /// Creates a schedule error.
    #[must_use]
    pub fn schedule(reason: impl Into<String>) -> Self {
        Self::ScheduleError {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_date("2024-02-30 is not a valid date");
        assert!(err.to_string().contains("Invalid date"));
    }

    #[test]
    fn test_unknown_convention_display() {
        let err = CoreError::unknown("day count", "ACT/999");
        assert_eq!(err.to_string(), "Unknown day count 'ACT/999'");
    }
}
