//! # Tenor Core
//!
//! Calendar service for the Tenor rates library: the date arithmetic every
//! curve, instrument and valuation engine relies on.
//!
//! - **Types**: [`Date`], [`Tenor`], [`Currency`]
//! - **Day Count Conventions**: year fractions for accrual and curve time
//! - **Business Day Calendars**: weekend and holiday-list calendars, roll
//!   conventions and an explicit name registry
//! - **Schedules**: accrual period generation with fixing and payment lags
//!
//! ## Example
//!
//! ```rust
//! use tenor_core::prelude::*;
//!
//! let cal = WeekendCalendar;
//! let spot = cal.add_business_days(Date::from_ymd(2025, 1, 3).unwrap(), 2);
//! let maturity = cal
//!     .advance(spot, Tenor::years(1), BusinessDayConvention::ModifiedFollowing, false)
//!     .unwrap();
//! assert!(maturity > spot);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]

pub mod calendars;
pub mod daycounts;
pub mod error;
pub mod schedule;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calendars::{
        BusinessDayConvention, Calendar, CalendarRegistry, HolidayCalendar, WeekendCalendar,
    };
    pub use crate::daycounts::{DayCount, DayCountConvention};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::schedule::{DateGeneration, SchedulePeriod, ScheduleSpec};
    pub use crate::types::{Currency, Date, Tenor, TenorUnit};
}

pub use error::{CoreError, CoreResult};
pub use types::{Currency, Date, Tenor};
