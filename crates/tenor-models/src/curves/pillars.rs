//! Pillar construction from a calibration basket.

use std::sync::Arc;

use tenor_core::daycounts::DayCountConvention;
use tenor_core::Date;

use super::basket::CalibItem;
use crate::error::{ModelError, ModelResult};
use crate::instruments::Instrument;

/// One calibration anchor of a curve component.
#[derive(Debug, Clone, PartialEq)]
pub struct PillarNode {
    /// `"{data_type} {data_convention} {axis}"`.
    pub node_id: String,
    /// Position in the component state.
    pub pillar_index: usize,
    /// Year fraction from the value date to the anchor.
    pub pillar_time: f64,
    /// Anchor date: the instrument's last cashflow or maturity.
    pub pillar_date: Date,
    /// Reference period start, futures only.
    pub start_date: Option<Date>,
    /// Reference period end, futures only.
    pub end_date: Option<Date>,
    /// The calibration instrument.
    pub instrument: Arc<Instrument>,
    /// Its market quote.
    pub quote: f64,
    /// Dataset type.
    pub data_type: String,
    /// Dataset convention.
    pub data_convention: String,
    /// Current forward on the pillar's bucket.
    pub state_value: f64,
}

/// Sorts the basket by anchor and checks strict ordering.
///
/// Anchors are ordered by `(time, date serial)`. Each must be strictly later
/// than the previous one, and the first strictly after the value date, so
/// that pillar `k` only sees state `0..=k`.
///
/// # Errors
///
/// - `ModelError::Data` for an empty basket or an instrument with no dates
/// - `ModelError::Ordering` for equal or non-increasing anchors; no pillars
///   are returned in that case
pub fn build_pillars(
    target: &str,
    basket: Vec<CalibItem>,
    value_date: Date,
    time_measure: DayCountConvention,
    initial_state: f64,
) -> ModelResult<Vec<PillarNode>> {
    if basket.is_empty() {
        return Err(ModelError::data(format!(
            "empty calibration basket for '{target}'"
        )));
    }

    let mut anchored = basket
        .into_iter()
        .map(|item| {
            let date = item.instrument.last_date().ok_or_else(|| {
                ModelError::data(format!(
                    "{} {} {} has no anchor date",
                    item.data_type, item.data_convention, item.axis
                ))
            })?;
            Ok((time_measure.year_fraction(value_date, date), date, item))
        })
        .collect::<ModelResult<Vec<_>>>()?;

    anchored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut last_time = 0.0;
    let mut last_serial = value_date.serial();
    let mut pillars = Vec::with_capacity(anchored.len());
    for (k, (time, date, item)) in anchored.into_iter().enumerate() {
        if time <= last_time || date.serial() <= last_serial {
            return Err(ModelError::ordering(
                target,
                k,
                format!(
                    "anchor {date} of {} {} {} does not follow the previous anchor",
                    item.data_type, item.data_convention, item.axis
                ),
            ));
        }
        last_time = time;
        last_serial = date.serial();

        let (start_date, end_date) = match item.instrument.as_ref() {
            Instrument::IborFuture(f) => (Some(f.start), Some(f.end)),
            Instrument::RfrFuture(f) => (Some(f.start), Some(f.end)),
            _ => (None, None),
        };
        pillars.push(PillarNode {
            node_id: format!("{} {} {}", item.data_type, item.data_convention, item.axis),
            pillar_index: k,
            pillar_time: time,
            pillar_date: date,
            start_date,
            end_date,
            instrument: item.instrument,
            quote: item.quote,
            data_type: item.data_type,
            data_convention: item.data_convention,
            state_value: initial_state,
        });
    }
    Ok(pillars)
}
