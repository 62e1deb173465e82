//! Domain types shared by every crate in the workspace.
//!
//! - [`Date`]: calendar date with month arithmetic and serial numbers
//! - [`Tenor`]: period such as `3M` or `2B`
//! - [`Currency`]: ISO currency codes

mod currency;
mod date;
mod tenor;

pub use currency::Currency;
pub use date::Date;
pub use tenor::{Tenor, TenorUnit};
