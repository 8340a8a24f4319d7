use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

/// Danish kroner per kilowatt-hour.
pub type KilowattHourRate = Quantity<-1, 1>;

impl KilowattHourRate {
    pub const fn to_megawatt_hour_rate(self) -> MegawattHourRate {
        MegawattHourRate(self.0 * 1000.0)
    }
}

impl Display for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} DKK/kWh", self.0)
    }
}

impl Debug for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}DKK/kWh", self.0)
    }
}

/// Market quotation unit: kroner (or euro) per megawatt-hour.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    PartialEq,
    PartialOrd,
    Serialize,
    derive_more::From,
)]
#[must_use]
pub struct MegawattHourRate(pub f64);

impl MegawattHourRate {
    pub const fn to_kilowatt_hour_rate(self) -> KilowattHourRate {
        Quantity(self.0 / 1000.0)
    }
}

impl Display for MegawattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}/MWh", self.0)
    }
}

impl Debug for MegawattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}/MWh", self.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_to_kilowatt_hour_rate() {
        assert_abs_diff_eq!(MegawattHourRate(1000.0).to_kilowatt_hour_rate().0, 1.0);
        assert_abs_diff_eq!(MegawattHourRate(614.029).to_kilowatt_hour_rate().0, 0.614_029);
    }

    #[test]
    fn test_to_megawatt_hour_rate() {
        assert_abs_diff_eq!(KilowattHourRate::from(0.5).to_megawatt_hour_rate().0, 500.0);
    }
}
