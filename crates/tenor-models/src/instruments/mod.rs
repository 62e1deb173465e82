//! Interest-rate instruments.
//!
//! [`Instrument`] is a closed set; [`InstrumentKind`] is its tag and the
//! second half of every valuation-engine dispatch key. Legs and baskets are
//! themselves instruments, so engines compose recursively.

mod builders;

pub use builders::{
    build_cap_floor, build_ibor_future, build_rfr_future, build_swap, build_swaption,
    CapFloorTerms, SwapTerms,
};

use std::fmt;

use serde::{Deserialize, Serialize};

use tenor_core::{Currency, Date};

/// Long receives the instrument's payoff; short pays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    /// Receive.
    #[default]
    Long,
    /// Pay.
    Short,
}

impl Position {
    /// `+1` for long, `-1` for short.
    pub fn sign(self) -> f64 {
        match self {
            Position::Long => 1.0,
            Position::Short => -1.0,
        }
    }

    /// The other side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Position::Long => Position::Short,
            Position::Short => Position::Long,
        }
    }
}

/// Caplet or floorlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    /// Call on the rate.
    Cap,
    /// Put on the rate.
    Floor,
}

/// Right to pay or receive fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwaptionType {
    /// Right to pay fixed; a call on the swap rate.
    Payer,
    /// Right to receive fixed.
    Receiver,
}

impl SwaptionType {
    /// The rate option this swaption is priced as.
    pub fn option_type(self) -> OptionType {
        match self {
            SwaptionType::Payer => OptionType::Cap,
            SwaptionType::Receiver => OptionType::Floor,
        }
    }
}

/// How overnight fixings combine over an accrual period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OvernightCompounding {
    /// Daily compounding.
    #[default]
    Compound,
    /// Simple arithmetic average.
    Average,
}

/// A fixed amount paid on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletCashflow {
    /// Payment currency.
    pub currency: Currency,
    /// Amount paid.
    pub notional: f64,
    /// Payment date.
    pub payment_date: Date,
    /// Direction.
    pub position: Position,
}

/// One term-index coupon fixing at the accrual start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IborCashflow {
    /// Payment currency.
    pub currency: Currency,
    /// Term index.
    pub index: String,
    /// Accrual start, also the start of the forward period.
    pub accrual_start: Date,
    /// Accrual end.
    pub accrual_end: Date,
    /// Payment date.
    pub payment_date: Date,
    /// Accrual year fraction.
    pub accrual: f64,
    /// Notional.
    pub notional: f64,
    /// Direction.
    pub position: Position,
}

/// One overnight-index coupon, compounded or averaged over its period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvernightCashflow {
    /// Payment currency.
    pub currency: Currency,
    /// Overnight index.
    pub index: String,
    /// Accrual start.
    pub accrual_start: Date,
    /// Accrual end.
    pub accrual_end: Date,
    /// Payment date.
    pub payment_date: Date,
    /// Accrual year fraction.
    pub accrual: f64,
    /// Notional.
    pub notional: f64,
    /// Direction.
    pub position: Position,
    /// Compounding method.
    pub compounding: OvernightCompounding,
}

/// A term-rate future; `strike` is the quoted price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IborFuture {
    /// Settlement currency.
    pub currency: Currency,
    /// Term index.
    pub index: String,
    /// Reference period start.
    pub start: Date,
    /// Reference period end.
    pub end: Date,
    /// Price traded at, `100 - rate%`.
    pub strike: f64,
    /// Contract size.
    pub notional: f64,
    /// Direction.
    pub position: Position,
    /// Unit long coupon whose undiscounted value over its accrual is the
    /// forward rate.
    pub underlying: IborCashflow,
}

/// An overnight-rate future over an explicit reference period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfrFuture {
    /// Settlement currency.
    pub currency: Currency,
    /// Overnight index.
    pub index: String,
    /// Reference period start.
    pub start: Date,
    /// Reference period end.
    pub end: Date,
    /// Price traded at.
    pub strike: f64,
    /// Contract size.
    pub notional: f64,
    /// Direction.
    pub position: Position,
    /// Unit long compounded coupon over the period.
    pub underlying: OvernightCashflow,
}

/// Weighted basket of instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Reporting currency.
    pub currency: Currency,
    /// `(instrument, weight)` pairs.
    pub elements: Vec<(Instrument, f64)>,
}

/// One fixed-leg period; the coupon is a bullet of `N·K·α`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCoupon {
    /// Accrual start.
    pub accrual_start: Date,
    /// Accrual end.
    pub accrual_end: Date,
    /// Accrual year fraction.
    pub accrual: f64,
    /// The coupon payment.
    pub cashflow: BulletCashflow,
}

/// Fixed-for-floating swap.
///
/// The long side receives fixed. The floating leg holds IBOR cashflows for
/// an [`Instrument::IborSwap`] and overnight cashflows for an
/// [`Instrument::OvernightSwap`], with the opposite position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRateSwap {
    /// Currency of both legs.
    pub currency: Currency,
    /// Floating index.
    pub index: String,
    /// Effective date.
    pub start: Date,
    /// Termination date.
    pub maturity: Date,
    /// Fixed rate.
    pub fixed_rate: f64,
    /// Notional.
    pub notional: f64,
    /// Fixed-leg direction.
    pub position: Position,
    /// Fixed coupons.
    pub fixed_leg: Vec<FixedCoupon>,
    /// Floating coupons.
    pub floating_leg: Vec<Instrument>,
}

impl InterestRateSwap {
    /// True when the holder pays fixed.
    pub fn pays_fixed(&self) -> bool {
        self.position == Position::Short
    }
}

/// A single caplet or floorlet on one accrual period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapFloorlet {
    /// Payment currency.
    pub currency: Currency,
    /// Underlying index.
    pub index: String,
    /// Accrual start.
    pub accrual_start: Date,
    /// Accrual end.
    pub accrual_end: Date,
    /// Payment date.
    pub payment_date: Date,
    /// Accrual year fraction.
    pub accrual: f64,
    /// Strike rate.
    pub strike: f64,
    /// Notional.
    pub notional: f64,
    /// Direction.
    pub position: Position,
    /// Cap or floor.
    pub option_type: OptionType,
}

/// A strip of caplets or floorlets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapFloor {
    /// Payment currency.
    pub currency: Currency,
    /// The optionlets, in period order.
    pub caplets: Vec<CapFloorlet>,
}

/// European option on a swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swaption {
    /// Payment currency.
    pub currency: Currency,
    /// Exercise date.
    pub expiry: Date,
    /// Strike rate; also the underlying's fixed rate.
    pub strike: f64,
    /// Notional.
    pub notional: f64,
    /// Direction.
    pub position: Position,
    /// Payer or receiver.
    pub swaption_type: SwaptionType,
    /// Underlying swap, receive-fixed at the strike.
    pub underlying: InterestRateSwap,
}

/// Every instrument the library can price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instrument {
    /// Fixed payment.
    BulletCashflow(BulletCashflow),
    /// Term-index coupon.
    IborCashflow(IborCashflow),
    /// Overnight-index coupon.
    OvernightCashflow(OvernightCashflow),
    /// Term-rate future.
    IborFuture(IborFuture),
    /// Overnight-rate future.
    RfrFuture(RfrFuture),
    /// Weighted basket.
    Portfolio(Portfolio),
    /// Fixed against a term index.
    IborSwap(InterestRateSwap),
    /// Fixed against an overnight index.
    OvernightSwap(InterestRateSwap),
    /// Term-index caplet or floorlet.
    IborCapFloorlet(CapFloorlet),
    /// Overnight-index caplet or floorlet.
    OvernightCapFloorlet(CapFloorlet),
    /// Term-index cap or floor.
    IborCapFloor(CapFloor),
    /// Overnight-index cap or floor.
    OvernightCapFloor(CapFloor),
    /// Option on a term-index swap.
    IborSwaption(Swaption),
    /// Option on an overnight-index swap.
    OvernightSwaption(Swaption),
}

/// Tag of an [`Instrument`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum InstrumentKind {
    BulletCashflow,
    IborCashflow,
    OvernightCashflow,
    IborFuture,
    RfrFuture,
    Portfolio,
    IborSwap,
    OvernightSwap,
    IborCapFloorlet,
    OvernightCapFloorlet,
    IborCapFloor,
    OvernightCapFloor,
    IborSwaption,
    OvernightSwaption,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Instrument {
    /// The dispatch tag.
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Instrument::BulletCashflow(_) => InstrumentKind::BulletCashflow,
            Instrument::IborCashflow(_) => InstrumentKind::IborCashflow,
            Instrument::OvernightCashflow(_) => InstrumentKind::OvernightCashflow,
            Instrument::IborFuture(_) => InstrumentKind::IborFuture,
            Instrument::RfrFuture(_) => InstrumentKind::RfrFuture,
            Instrument::Portfolio(_) => InstrumentKind::Portfolio,
            Instrument::IborSwap(_) => InstrumentKind::IborSwap,
            Instrument::OvernightSwap(_) => InstrumentKind::OvernightSwap,
            Instrument::IborCapFloorlet(_) => InstrumentKind::IborCapFloorlet,
            Instrument::OvernightCapFloorlet(_) => InstrumentKind::OvernightCapFloorlet,
            Instrument::IborCapFloor(_) => InstrumentKind::IborCapFloor,
            Instrument::OvernightCapFloor(_) => InstrumentKind::OvernightCapFloor,
            Instrument::IborSwaption(_) => InstrumentKind::IborSwaption,
            Instrument::OvernightSwaption(_) => InstrumentKind::OvernightSwaption,
        }
    }

    /// Currency the value is reported in.
    pub fn currency(&self) -> Currency {
        match self {
            Instrument::BulletCashflow(i) => i.currency,
            Instrument::IborCashflow(i) => i.currency,
            Instrument::OvernightCashflow(i) => i.currency,
            Instrument::IborFuture(i) => i.currency,
            Instrument::RfrFuture(i) => i.currency,
            Instrument::Portfolio(i) => i.currency,
            Instrument::IborSwap(i) | Instrument::OvernightSwap(i) => i.currency,
            Instrument::IborCapFloorlet(i) | Instrument::OvernightCapFloorlet(i) => i.currency,
            Instrument::IborCapFloor(i) | Instrument::OvernightCapFloor(i) => i.currency,
            Instrument::IborSwaption(i) | Instrument::OvernightSwaption(i) => i.currency,
        }
    }

    /// Earliest date the instrument depends on.
    pub fn first_date(&self) -> Option<Date> {
        match self {
            Instrument::BulletCashflow(i) => Some(i.payment_date),
            Instrument::IborCashflow(i) => Some(i.accrual_start),
            Instrument::OvernightCashflow(i) => Some(i.accrual_start),
            Instrument::IborFuture(i) => Some(i.start),
            Instrument::RfrFuture(i) => Some(i.start),
            Instrument::Portfolio(p) => p.elements.iter().filter_map(|(e, _)| e.first_date()).min(),
            Instrument::IborSwap(s) | Instrument::OvernightSwap(s) => Some(s.start),
            Instrument::IborCapFloorlet(c) | Instrument::OvernightCapFloorlet(c) => {
                Some(c.accrual_start)
            }
            Instrument::IborCapFloor(c) | Instrument::OvernightCapFloor(c) => {
                c.caplets.first().map(|c| c.accrual_start)
            }
            Instrument::IborSwaption(s) | Instrument::OvernightSwaption(s) => Some(s.expiry),
        }
    }

    /// Final cashflow or maturity date; the pillar anchor of a calibration
    /// instrument.
    pub fn last_date(&self) -> Option<Date> {
        match self {
            Instrument::BulletCashflow(i) => Some(i.payment_date),
            Instrument::IborCashflow(i) => Some(i.payment_date.max(i.accrual_end)),
            Instrument::OvernightCashflow(i) => Some(i.payment_date.max(i.accrual_end)),
            Instrument::IborFuture(i) => Some(i.end),
            Instrument::RfrFuture(i) => Some(i.end),
            Instrument::Portfolio(p) => p.elements.iter().filter_map(|(e, _)| e.last_date()).max(),
            Instrument::IborSwap(s) | Instrument::OvernightSwap(s) => swap_last_date(s),
            Instrument::IborCapFloorlet(c) | Instrument::OvernightCapFloorlet(c) => {
                Some(c.payment_date.max(c.accrual_end))
            }
            Instrument::IborCapFloor(c) | Instrument::OvernightCapFloor(c) => c
                .caplets
                .iter()
                .map(|c| c.payment_date.max(c.accrual_end))
                .max(),
            Instrument::IborSwaption(s) | Instrument::OvernightSwaption(s) => {
                swap_last_date(&s.underlying)
            }
        }
    }
}

fn swap_last_date(swap: &InterestRateSwap) -> Option<Date> {
    let fixed = swap.fixed_leg.iter().map(|c| c.cashflow.payment_date);
    let floating = swap.floating_leg.iter().filter_map(Instrument::last_date);
    fixed.chain(floating).max()
}
