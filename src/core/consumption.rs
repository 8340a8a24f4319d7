use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};
use itertools::Itertools;

use crate::{
    core::{TIMEZONE, error::Error, interval::Interval, period::Frequency},
    prelude::*,
    quantity::energy::KilowattHours,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum Quality {
    #[display("measured")]
    Measured,

    #[display("estimated")]
    Estimated,

    /// Estimated hour that has already passed.
    #[display("estimated (past)")]
    EstimatedPast,

    /// Estimated hour that is yet to come.
    #[display("estimated (future)")]
    EstimatedFuture,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HourlyConsumption {
    /// Start of the hour.
    pub instant: DateTime<Utc>,

    pub energy: KilowattHours,
    pub quality: Quality,
}

impl HourlyConsumption {
    pub const fn new(instant: DateTime<Utc>, energy: KilowattHours, quality: Quality) -> Self {
        Self { instant, energy, quality }
    }

    #[must_use]
    pub const fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

pub fn total_consumption(series: &[HourlyConsumption]) -> KilowattHours {
    series.iter().map(|hour| hour.energy).sum()
}

/// Total consumption per Copenhagen hour of day.
pub fn consumption_by_hour_of_day(series: &[HourlyConsumption]) -> BTreeMap<u32, KilowattHours> {
    series
        .iter()
        .into_grouping_map_by(|hour| hour.instant.with_timezone(&TIMEZONE).hour())
        .fold(KilowattHours::ZERO, |total, _, hour| total + hour.energy)
        .into_iter()
        .collect()
}

/// Spread the frequency's share of the annual volume evenly over every hour of the interval.
#[instrument(skip_all, fields(%annual_volume, ?interval, %frequency))]
pub fn estimate_consumption(
    annual_volume: KilowattHours,
    interval: Interval,
    frequency: Frequency,
) -> Result<Vec<HourlyConsumption>, Error> {
    let n_hours = interval.n_hours();
    if n_hours == 0 {
        return Err(Error::EmptyPeriod { start: interval.start, end: interval.end });
    }
    let period_volume = annual_volume * frequency.annual_share();

    #[allow(clippy::cast_precision_loss)]
    let hourly = period_volume / n_hours as f64;

    debug!(%period_volume, %hourly, n_hours, "estimated");
    Ok(interval
        .hours()
        .map(|instant| HourlyConsumption::new(instant, hourly, Quality::Estimated))
        .collect())
}
