pub mod cost;
pub mod energy;
pub mod rate;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Dimension-typed quantity.
///
/// The exponents track energy, time and currency, so that `kWh × p/kWh` only ever yields pence.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
)]
#[from(f64, OrderedFloat<f64>)]
#[must_use]
pub struct Quantity<const ENERGY: isize, const TIME: isize, const COST: isize>(
    pub OrderedFloat<f64>,
);

impl<const ENERGY: isize, const TIME: isize, const COST: isize> Quantity<ENERGY, TIME, COST> {
    pub const ZERO: Self = Self(OrderedFloat(0.0));

    /// Round half away from zero to the given number of decimal places.
    pub fn round_to(self, decimals: i32) -> Self {
        let scale = 10.0_f64.powi(decimals);
        Self(OrderedFloat((self.0.0 * scale).round() / scale))
    }
}
