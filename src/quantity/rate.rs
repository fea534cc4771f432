use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Pence per kilowatt-hour, VAT included.
pub type KilowattHourRate = Quantity<-1, 0, 1>;

impl Display for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} p/kWh", self.0.0)
    }
}

impl Debug for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}p/kWh", self.0.0)
    }
}
