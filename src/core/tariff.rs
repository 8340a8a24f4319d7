use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Timelike, Utc};

use crate::{
    core::{
        TIMEZONE,
        consumption::{HourlyConsumption, Quality},
        spot_price::{SpotPriceRecord, local_hour_key},
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate},
};

#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum TariffResolution {
    /// Same price all day.
    #[display("P1D")]
    Daily,

    /// One price per local hour.
    #[display("PT1H")]
    Hourly,

    #[display("{_0}")]
    Other(String),
}

impl From<String> for TariffResolution {
    fn from(resolution: String) -> Self {
        match resolution.as_str() {
            "P1D" => Self::Daily,
            "PT1H" => Self::Hourly,
            _ => Self::Other(resolution),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TariffPrice {
    /// Local hour plus one, `1..=24`.
    pub position: u32,

    pub price: KilowattHourRate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tariff {
    pub name: String,
    pub owner: String,
    pub description: String,
    pub resolution: TariffResolution,
    pub prices: Vec<TariffPrice>,
}

impl Tariff {
    /// Price applicable to the hour at the position.
    ///
    /// A full 24-slot hourly tariff is looked up by position. Any other tariff with a single
    /// price applies it to every hour. Otherwise, the position is matched and a miss costs nothing.
    pub fn price_at(&self, position: u32) -> KilowattHourRate {
        match (&self.resolution, self.prices.as_slice()) {
            (TariffResolution::Hourly, prices) if prices.len() == 24 => self.position_price(position),
            (_, [single]) => single.price,
            _ => self.position_price(position),
        }
    }

    fn position_price(&self, position: u32) -> KilowattHourRate {
        self.prices
            .iter()
            .find(|price| price.position == position)
            .map_or(KilowattHourRate::ZERO, |price| price.price)
    }
}

/// Fixed monthly fee.
#[derive(Clone, Debug, PartialEq)]
pub struct Subscription {
    pub name: String,
    pub unit_price: Cost,
    pub quantity: u32,
}

impl Subscription {
    pub fn cost(&self, n_months: u32) -> Cost {
        self.unit_price * f64::from(self.quantity) * f64::from(n_months)
    }
}

/// Everything the grid operator charges on a metering point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Charges {
    pub tariffs: Vec<Tariff>,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HourlyTariffCost {
    pub instant: DateTime<Utc>,
    pub consumption: KilowattHours,
    pub quality: Quality,

    /// Per tariff name, a later tariff with the same name replaces an earlier one.
    pub tariff_costs: BTreeMap<String, Cost>,

    pub supplier_cost: Cost,
    pub spot_price: KilowattHourRate,
    pub spot_cost: Cost,

    /// Tariffs, supplier and spot.
    pub total_cost: Cost,
}

/// Price every consumed hour with the tariffs, the supplier margin and the spot price.
///
/// A missing spot price is taken as zero.
#[instrument(skip_all, fields(n_hours = consumption.len(), n_tariffs = tariffs.len(), %supplier_rate))]
pub fn calculate_hourly_costs(
    consumption: &[HourlyConsumption],
    tariffs: &[Tariff],
    supplier_rate: KilowattHourRate,
    spot_prices: &[SpotPriceRecord],
) -> Vec<HourlyTariffCost> {
    let mut spot_price_index = HashMap::with_capacity(spot_prices.len());
    for record in spot_prices {
        spot_price_index.entry(record.hour_local.as_str()).or_insert(record);
    }

    let mut n_missing_spot_prices = 0_usize;
    let hourly_costs: Vec<_> = consumption
        .iter()
        .map(|hour| {
            let position = hour.instant.with_timezone(&TIMEZONE).hour() + 1;
            let key = local_hour_key(hour.instant);
            let spot_price = if let Some(record) = spot_price_index.get(key.as_str()) {
                record.price()
            } else {
                warn!(hour = %key, "no spot price, assuming zero");
                n_missing_spot_prices += 1;
                KilowattHourRate::ZERO
            };
            let tariff_costs: BTreeMap<_, _> = tariffs
                .iter()
                .map(|tariff| (tariff.name.clone(), hour.energy * tariff.price_at(position)))
                .collect();
            let supplier_cost = hour.energy * supplier_rate;
            let spot_cost = hour.energy * spot_price;
            HourlyTariffCost {
                instant: hour.instant,
                consumption: hour.energy,
                quality: hour.quality,
                total_cost: tariff_costs.values().copied().sum::<Cost>() + supplier_cost + spot_cost,
                tariff_costs,
                supplier_cost,
                spot_price,
                spot_cost,
            }
        })
        .collect();

    if n_missing_spot_prices != 0 {
        warn!(n_missing_spot_prices, "some hours are priced without the spot price");
    }
    hourly_costs
}
