use crate::{
    api::SpotPriceSource,
    core::{
        interval::Interval,
        spot_price::{DKK_PER_EUR, PriceArea, SpotPriceRecord},
    },
    prelude::*,
    quantity::rate::MegawattHourRate,
};

/// In-memory market data.
#[derive(Default)]
pub struct StubSpotPrices(pub Vec<SpotPriceRecord>);

impl StubSpotPrices {
    /// One record per hour, the price in DKK/MWh is given by the hour index.
    pub fn hourly(interval: Interval, price_area: PriceArea, price: impl Fn(usize) -> f64) -> Self {
        Self(
            interval
                .hours()
                .enumerate()
                .map(|(index, hour)| {
                    let price = price(index);
                    SpotPriceRecord::new(
                        hour,
                        price_area,
                        MegawattHourRate(price),
                        MegawattHourRate(price / DKK_PER_EUR),
                    )
                })
                .collect(),
        )
    }
}

impl SpotPriceSource for StubSpotPrices {
    fn fetch_spot_prices(
        &self,
        interval: Interval,
        price_area: PriceArea,
    ) -> Result<Vec<SpotPriceRecord>> {
        Ok(self
            .0
            .iter()
            .filter(|record| record.price_area == price_area && interval.contains(record.hour_utc))
            .cloned()
            .collect())
    }
}

/// Market data source that is down.
pub struct FailingSpotPrices;

impl SpotPriceSource for FailingSpotPrices {
    fn fetch_spot_prices(&self, _: Interval, _: PriceArea) -> Result<Vec<SpotPriceRecord>> {
        bail!("connection refused")
    }
}
