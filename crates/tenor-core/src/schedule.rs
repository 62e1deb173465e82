//! Accrual schedule generation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::calendars::{BusinessDayConvention, Calendar};
use crate::daycounts::DayCountConvention;
use crate::error::{CoreError, CoreResult};
use crate::types::{Date, Tenor};

/// Direction in which regular dates are rolled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DateGeneration {
    /// Roll back from the end date; any stub sits at the front.
    #[default]
    Backward,
    /// Roll forward from the start date; any stub sits at the back.
    Forward,
}

/// One accrual period of a generated schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulePeriod {
    /// Adjusted accrual start.
    pub start: Date,
    /// Adjusted accrual end.
    pub end: Date,
    /// Fixing date (the start date unless a fixing lag is set).
    pub fixing: Date,
    /// Payment date (the end date unless a payment lag is set).
    pub payment: Date,
    /// Accrual year fraction under the schedule day count.
    pub accrual: f64,
}

/// Parameters for a schedule.
#[derive(Clone)]
pub struct ScheduleSpec {
    /// Unadjusted effective date.
    pub start: Date,
    /// Unadjusted termination date.
    pub end: Date,
    /// Regular period length.
    pub frequency: Tenor,
    /// Calendar used for adjustments and lags.
    pub calendar: Arc<dyn Calendar>,
    /// Roll convention for accrual dates.
    pub convention: BusinessDayConvention,
    /// Accrual day count.
    pub day_count: DayCountConvention,
    /// Generation rule.
    pub rule: DateGeneration,
    /// Month-end rolling.
    pub end_of_month: bool,
    /// Lag applied to the accrual start to get the fixing date.
    pub fixing_lag: Option<Tenor>,
    /// Lag applied to the accrual end to get the payment date.
    pub payment_lag: Option<Tenor>,
}

impl ScheduleSpec {
    /// Creates a backward-generated schedule spec with no lags.
    pub fn new(
        start: Date,
        end: Date,
        frequency: Tenor,
        calendar: Arc<dyn Calendar>,
        convention: BusinessDayConvention,
        day_count: DayCountConvention,
    ) -> Self {
        Self {
            start,
            end,
            frequency,
            calendar,
            convention,
            day_count,
            rule: DateGeneration::Backward,
            end_of_month: false,
            fixing_lag: None,
            payment_lag: None,
        }
    }

    /// Sets the generation rule.
    #[must_use]
    pub fn with_rule(mut self, rule: DateGeneration) -> Self {
        self.rule = rule;
        self
    }

    /// Sets the payment lag.
    #[must_use]
    pub fn with_payment_lag(mut self, lag: Tenor) -> Self {
        self.payment_lag = Some(lag);
        self
    }

    /// Sets the fixing lag.
    #[must_use]
    pub fn with_fixing_lag(mut self, lag: Tenor) -> Self {
        self.fixing_lag = Some(lag);
        self
    }

    /// Generates the periods.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ScheduleError` when `end <= start` or the
    /// frequency is not a positive period.
    pub fn generate(&self) -> CoreResult<Vec<SchedulePeriod>> {
        if self.end <= self.start {
            return Err(CoreError::schedule(format!(
                "termination {} is not after effective {}",
                self.end, self.start
            )));
        }
        if self.frequency.count() <= 0 {
            return Err(CoreError::schedule(format!(
                "frequency {} must be positive",
                self.frequency
            )));
        }

        let unadjusted = self.unadjusted_dates()?;
        let cal = self.calendar.as_ref();
        let adjusted: Vec<Date> = unadjusted
            .iter()
            .map(|d| cal.adjust(*d, self.convention))
            .collect();

        let mut periods = Vec::with_capacity(adjusted.len().saturating_sub(1));
        for pair in adjusted.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if end <= start {
                continue;
            }
            let fixing = match self.fixing_lag {
                Some(lag) => cal.advance(start, lag, BusinessDayConvention::Preceding, false)?,
                None => start,
            };
            let payment = match self.payment_lag {
                Some(lag) => cal.advance(end, lag, BusinessDayConvention::Following, false)?,
                None => end,
            };
            periods.push(SchedulePeriod {
                start,
                end,
                fixing,
                payment,
                accrual: self.day_count.year_fraction(start, end),
            });
        }
        log::trace!(
            "generated {} periods {}..{} every {}",
            periods.len(),
            self.start,
            self.end,
            self.frequency
        );
        Ok(periods)
    }

    fn unadjusted_dates(&self) -> CoreResult<Vec<Date>> {
        let mut dates = Vec::new();
        match self.rule {
            DateGeneration::Backward => {
                dates.push(self.end);
                let mut k = 1;
                loop {
                    let next = self.step(self.end, -k)?;
                    if next <= self.start {
                        break;
                    }
                    dates.push(next);
                    k += 1;
                }
                dates.push(self.start);
                dates.reverse();
            }
            DateGeneration::Forward => {
                dates.push(self.start);
                let mut k = 1;
                loop {
                    let next = self.step(self.start, k)?;
                    if next >= self.end {
                        break;
                    }
                    dates.push(next);
                    k += 1;
                }
                dates.push(self.end);
            }
        }
        Ok(dates)
    }

    fn step(&self, anchor: Date, k: i32) -> CoreResult<Date> {
        let tenor = self.frequency.times(k);
        self.calendar
            .advance(anchor, tenor, BusinessDayConvention::Unadjusted, self.end_of_month)
    }
}

/// Every business day in `[start, end)` on the calendar.
pub fn business_days(start: Date, end: Date, calendar: &dyn Calendar) -> Vec<Date> {
    let mut days = Vec::new();
    let mut current = start;
    while current < end {
        if calendar.is_business_day(current) {
            days.push(current);
        }
        current = current.add_days(1);
    }
    days
}
