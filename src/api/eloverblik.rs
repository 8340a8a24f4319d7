//! Charges and hourly time series downloaded from [Eloverblik](https://eloverblik.dk).

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use serde::{Deserialize, de::DeserializeOwned};
use serde_with::{DisplayFromStr, serde_as};

use crate::{
    api::MeteringSource,
    core::{
        consumption::{HourlyConsumption, Quality},
        interval::Interval,
        tariff::{Charges, Subscription, Tariff, TariffPrice, TariffResolution},
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate},
};

/// Responses of the `getcharges` and `gettimeseries` calls saved to disk.
pub struct ExportedMeteringData {
    charges_path: Option<PathBuf>,
    consumption_path: Option<PathBuf>,
}

impl ExportedMeteringData {
    pub const fn new(charges_path: Option<PathBuf>, consumption_path: Option<PathBuf>) -> Self {
        Self { charges_path, consumption_path }
    }
}

impl MeteringSource for ExportedMeteringData {
    #[instrument(skip_all, fields(%meter_id, ?interval))]
    fn fetch_consumption(
        &self,
        meter_id: &str,
        interval: Interval,
    ) -> Result<Vec<HourlyConsumption>> {
        let path = self
            .consumption_path
            .as_deref()
            .context("a consumption export is required for a historical bill")?;
        let consumption =
            read_json::<Response<TimeSeriesItem>>(path)?.into_consumption(meter_id, interval)?;
        info!(n_hours = consumption.len(), "loaded");
        Ok(consumption)
    }

    #[instrument(skip_all, fields(%meter_id))]
    fn fetch_charges(&self, meter_id: &str) -> Result<Charges> {
        let path = self.charges_path.as_deref().context("a charges export is required")?;
        let charges = read_json::<Response<ChargesItem>>(path)?.into_charges(meter_id)?;
        info!(
            n_tariffs = charges.tariffs.len(),
            n_subscriptions = charges.subscriptions.len(),
            "loaded",
        );
        Ok(charges)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to deserialize `{}`", path.display()))
}

#[derive(Deserialize)]
struct Response<T> {
    result: Vec<T>,
}

impl<T: Item> Response<T> {
    fn into_first(self) -> Result<T> {
        let item = self.result.into_iter().next().context("the response contains no results")?;
        let outcome = item.outcome();
        ensure!(
            outcome.success,
            "Eloverblik error {}: {}",
            outcome.error_code,
            outcome.error_text.as_deref().unwrap_or("unknown"),
        );
        Ok(item)
    }
}

impl Response<ChargesItem> {
    fn into_charges(self, meter_id: &str) -> Result<Charges> {
        let result = self.into_first()?.result.context("no charges in the response")?;
        ensure!(
            result.metering_point_id == meter_id,
            "the charges belong to metering point `{}`",
            result.metering_point_id,
        );
        Ok(Charges {
            tariffs: result.tariffs.into_iter().map(Tariff::from).collect(),
            subscriptions: result.subscriptions.into_iter().map(Subscription::from).collect(),
        })
    }
}

impl Response<TimeSeriesItem> {
    /// Measured hours within the interval.
    fn into_consumption(self, meter_id: &str, interval: Interval) -> Result<Vec<HourlyConsumption>> {
        let time_series = self
            .into_first()?
            .document
            .context("no market document in the response")?
            .time_series
            .into_iter()
            .next()
            .context("no time series in the response")?;
        let series_meter_id = &time_series.market_evaluation_point.mrid.name;
        ensure!(
            series_meter_id == meter_id,
            "the time series belongs to metering point `{series_meter_id}`",
        );

        let mut consumption = Vec::new();
        for period in time_series.periods {
            ensure!(period.resolution == "PT1H", "unsupported resolution `{}`", period.resolution);
            for point in period.points {
                ensure!(point.position >= 1, "invalid position `{}`", point.position);
                let instant =
                    period.time_interval.start + TimeDelta::hours(i64::from(point.position) - 1);
                if interval.contains(instant) {
                    consumption.push(HourlyConsumption::new(
                        instant,
                        KilowattHours::from(point.quantity),
                        Quality::Measured,
                    ));
                }
            }
        }
        consumption.sort_by_key(|hour| hour.instant);
        if let Some((hour, _)) =
            consumption.iter().tuple_windows().find(|(lhs, rhs)| lhs.instant == rhs.instant)
        {
            bail!("hour {} occurs more than once in the time series", hour.instant);
        }
        if consumption.len() != interval.n_hours() {
            warn!(
                n_hours = consumption.len(),
                n_expected = interval.n_hours(),
                "the time series does not cover the whole period",
            );
        }
        Ok(consumption)
    }
}

trait Item {
    fn outcome(&self) -> &Outcome;
}

#[derive(Deserialize)]
struct Outcome {
    success: bool,

    #[serde(rename = "errorCode")]
    error_code: i64,

    #[serde(rename = "errorText", default)]
    error_text: Option<String>,
}

#[derive(Deserialize)]
struct ChargesItem {
    #[serde(flatten)]
    outcome: Outcome,

    result: Option<ChargesResult>,
}

impl Item for ChargesItem {
    fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

#[derive(Deserialize)]
struct ChargesResult {
    #[serde(rename = "meteringPointId")]
    metering_point_id: String,

    #[serde(default)]
    subscriptions: Vec<SubscriptionEntry>,

    #[serde(default)]
    tariffs: Vec<TariffEntry>,
}

#[derive(Deserialize)]
struct SubscriptionEntry {
    name: String,
    price: f64,
    quantity: u32,
}

impl From<SubscriptionEntry> for Subscription {
    fn from(entry: SubscriptionEntry) -> Self {
        Self { name: entry.name, unit_price: Cost::from(entry.price), quantity: entry.quantity }
    }
}

#[derive(Deserialize)]
struct TariffEntry {
    name: String,
    owner: String,

    #[serde(default)]
    description: String,

    #[serde(rename = "periodType")]
    period_type: String,

    prices: Vec<TariffPriceEntry>,
}

impl From<TariffEntry> for Tariff {
    fn from(entry: TariffEntry) -> Self {
        Self {
            name: entry.name,
            owner: entry.owner,
            description: entry.description,
            resolution: TariffResolution::from(entry.period_type),
            prices: entry
                .prices
                .into_iter()
                .map(|price| TariffPrice {
                    position: price.position,
                    price: KilowattHourRate::from(price.price),
                })
                .collect(),
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
struct TariffPriceEntry {
    #[serde_as(as = "DisplayFromStr")]
    position: u32,

    price: f64,
}

#[derive(Deserialize)]
struct TimeSeriesItem {
    #[serde(flatten)]
    outcome: Outcome,

    #[serde(rename = "MyEnergyData_MarketDocument")]
    document: Option<MarketDocument>,
}

impl Item for TimeSeriesItem {
    fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

#[derive(Deserialize)]
struct MarketDocument {
    #[serde(rename = "TimeSeries", default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Deserialize)]
struct TimeSeries {
    #[serde(rename = "MarketEvaluationPoint")]
    market_evaluation_point: MarketEvaluationPoint,

    #[serde(rename = "Period", default)]
    periods: Vec<SeriesPeriod>,
}

#[derive(Deserialize)]
struct MarketEvaluationPoint {
    #[serde(rename = "mRID")]
    mrid: Mrid,
}

#[derive(Deserialize)]
struct Mrid {
    name: String,
}

#[derive(Deserialize)]
struct SeriesPeriod {
    resolution: String,

    #[serde(rename = "timeInterval")]
    time_interval: TimeInterval,

    #[serde(rename = "Point", default)]
    points: Vec<Point>,
}

#[derive(Deserialize)]
struct TimeInterval {
    start: DateTime<Utc>,
}

#[serde_as]
#[derive(Deserialize)]
struct Point {
    /// One-based hour offset from the period start.
    #[serde_as(as = "DisplayFromStr")]
    position: u32,

    #[serde(rename = "out_Quantity.quantity")]
    #[serde_as(as = "DisplayFromStr")]
    quantity: f64,
}
