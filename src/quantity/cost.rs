use std::fmt::{Debug, Display, Formatter};

use ordered_float::OrderedFloat;

use crate::quantity::Quantity;

/// Money in pence, the minor unit every Octopus price is quoted in.
pub type Cost = Quantity<0, 0, 1>;

impl Cost {
    pub const fn from_pence(pence: f64) -> Self {
        Self(OrderedFloat(pence))
    }

    pub const fn as_pence(self) -> f64 {
        self.0.0
    }
}

impl Display for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "£{:.2}", self.0.0 / 100.0)
    }
}

impl Debug for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}p", self.0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_in_pounds() {
        assert_eq!(Cost::from_pence(250.0).to_string(), "£2.50");
        assert_eq!(Cost::from_pence(1.234).to_string(), "£0.01");
    }
}
