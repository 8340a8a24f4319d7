use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    api::SpotPriceSource,
    core::{TIMEZONE, error::Error, interval::Interval},
    prelude::*,
    quantity::{
        Quantity,
        rate::{KilowattHourRate, MegawattHourRate},
    },
};

/// Rough exchange rate used for synthesized records.
pub const DKK_PER_EUR: f64 = 7.45;

/// Default flat spot price for estimated hours.
pub const DEFAULT_FIXED_SPOT_PRICE: KilowattHourRate = Quantity(0.614_029);

#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize, clap::ValueEnum, derive_more::Display,
)]
pub enum PriceArea {
    /// West of the Great Belt.
    #[display("DK1")]
    #[serde(rename = "DK1")]
    Dk1,

    /// East of the Great Belt.
    #[display("DK2")]
    #[serde(rename = "DK2")]
    Dk2,
}

/// Copenhagen wall-clock hour the way the market data spells it, for example `2023-06-01T14:00:00`.
///
/// Used as the join key between consumption and spot prices.
#[must_use]
pub fn local_hour_key(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&TIMEZONE).format("%Y-%m-%dT%H:00:00").to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpotPriceRecord {
    pub hour_utc: DateTime<Utc>,

    /// See [`local_hour_key`].
    pub hour_local: String,

    pub price_area: PriceArea,
    pub price_dkk: MegawattHourRate,
    pub price_eur: MegawattHourRate,
}

impl SpotPriceRecord {
    pub fn new(
        hour_utc: DateTime<Utc>,
        price_area: PriceArea,
        price_dkk: MegawattHourRate,
        price_eur: MegawattHourRate,
    ) -> Self {
        Self { hour_utc, hour_local: local_hour_key(hour_utc), price_area, price_dkk, price_eur }
    }

    pub const fn price(&self) -> KilowattHourRate {
        self.price_dkk.to_kilowatt_hour_rate()
    }
}

/// Mean price in DKK/kWh, zero for an empty series.
pub fn average_price(records: &[SpotPriceRecord]) -> KilowattHourRate {
    if records.is_empty() {
        return KilowattHourRate::ZERO;
    }
    #[allow(clippy::cast_precision_loss)]
    let n_records = records.len() as f64;
    records.iter().map(SpotPriceRecord::price).sum::<KilowattHourRate>() / n_records
}

/// One record per hour at a constant price.
pub fn estimate_fixed_spot_prices(
    interval: Interval,
    price_area: PriceArea,
    price: KilowattHourRate,
) -> Vec<SpotPriceRecord> {
    let price_dkk = price.to_megawatt_hour_rate();
    let price_eur = MegawattHourRate(price_dkk.0 / DKK_PER_EUR);
    interval.hours().map(|hour| SpotPriceRecord::new(hour, price_area, price_dkk, price_eur)).collect()
}

/// Replay last year's prices for the same wall-clock window.
///
/// Prices are taken positionally and re-stamped onto the requested hours.
/// When last year has fewer records, the result is shorter than the interval.
#[instrument(skip_all, fields(?interval, %price_area))]
pub fn estimate_historical_spot_prices(
    source: &dyn SpotPriceSource,
    interval: Interval,
    price_area: PriceArea,
) -> Result<Vec<SpotPriceRecord>> {
    let last_year = Interval::new(a_year_earlier(interval.start)?, a_year_earlier(interval.end)?);
    let historical = source
        .fetch_spot_prices(last_year, price_area)
        .context("failed to fetch last year's spot prices")?;
    let records: Vec<_> = interval
        .hours()
        .zip(&historical)
        .map(|(hour, record)| SpotPriceRecord::new(hour, price_area, record.price_dkk, record.price_eur))
        .collect();
    if records.is_empty() {
        return Err(Error::NoHistoricalSpotPrices.into());
    }
    if records.len() < interval.n_hours() {
        warn!(n_available = records.len(), n_requested = interval.n_hours(), "truncated");
    }
    Ok(records)
}

fn a_year_earlier(instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let shifted = instant
        .with_timezone(&TIMEZONE)
        .checked_sub_months(Months::new(12))
        .with_context(|| format!("{instant} has no counterpart a year earlier"))?;
    Ok(shifted.with_timezone(&Utc))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum EstimationMethod {
    #[display("fixed spot price estimate")]
    FixedSpotPrice,

    #[display("historical spot prices from the same period last year")]
    HistoricalSpotPrices,

    #[display("fixed spot price estimate (historical data unavailable)")]
    HistoricalFallback,
}

/// How to synthesize spot prices for hours without market data.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SpotPriceStrategy {
    Fixed(KilowattHourRate),

    /// Replay last year, falling back to the fixed price only when last year has no data.
    Historical { fallback: KilowattHourRate },
}

impl SpotPriceStrategy {
    pub fn estimate(
        self,
        source: &dyn SpotPriceSource,
        interval: Interval,
        price_area: PriceArea,
    ) -> Result<(Vec<SpotPriceRecord>, EstimationMethod)> {
        match self {
            Self::Fixed(price) => Ok((
                estimate_fixed_spot_prices(interval, price_area, price),
                EstimationMethod::FixedSpotPrice,
            )),
            Self::Historical { fallback } => {
                match estimate_historical_spot_prices(source, interval, price_area) {
                    Ok(records) => Ok((records, EstimationMethod::HistoricalSpotPrices)),
                    Err(error)
                        if matches!(
                            error.downcast_ref::<Error>(),
                            Some(Error::NoHistoricalSpotPrices)
                        ) =>
                    {
                        warn!(%fallback, "no historical spot prices, using the fixed price");
                        Ok((
                            estimate_fixed_spot_prices(interval, price_area, fallback),
                            EstimationMethod::HistoricalFallback,
                        ))
                    }
                    Err(error) => Err(error),
                }
            }
        }
    }
}
