pub mod eloverblik;
pub mod energi_data_service;
pub mod price_area;
#[cfg(test)]
pub mod stub;

use crate::{
    api::price_area::resolve_price_area,
    core::{
        consumption::HourlyConsumption,
        interval::Interval,
        spot_price::{PriceArea, SpotPriceRecord},
        tariff::Charges,
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Hourly day-ahead market prices.
pub trait SpotPriceSource {
    /// Records for the hours within the interval, ordered by hour.
    fn fetch_spot_prices(
        &self,
        interval: Interval,
        price_area: PriceArea,
    ) -> Result<Vec<SpotPriceRecord>>;
}

/// Metered consumption and grid charges of a metering point.
pub trait MeteringSource {
    fn fetch_consumption(
        &self,
        meter_id: &str,
        interval: Interval,
    ) -> Result<Vec<HourlyConsumption>>;

    fn fetch_charges(&self, meter_id: &str) -> Result<Charges>;
}

/// What the bill needs to know about a metering point besides its measurements.
#[derive(Clone, Debug)]
pub struct MeterPointDetails {
    pub grid_operator_name: Option<String>,

    /// Used for the aconto estimates.
    pub estimated_annual_volume: Option<KilowattHours>,
}

impl MeterPointDetails {
    pub fn price_area(&self) -> Result<PriceArea> {
        let name = self
            .grid_operator_name
            .as_deref()
            .context("either the price area or the grid operator name is required")?;
        Ok(resolve_price_area(name)?)
    }

    pub fn estimated_annual_volume(&self) -> Result<KilowattHours> {
        let volume = self
            .estimated_annual_volume
            .context("the estimated annual volume is required for an estimate")?;
        ensure!(volume > KilowattHours::ZERO, "the estimated annual volume must be positive");
        Ok(volume)
    }
}
