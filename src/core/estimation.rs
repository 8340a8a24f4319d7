use bon::Builder;
use chrono::{DateTime, Days, TimeDelta, TimeZone, Utc};

use crate::{
    api::SpotPriceSource,
    core::{
        TIMEZONE,
        consumption::{HourlyConsumption, Quality, estimate_consumption, total_consumption},
        interval::truncate_to_hour,
        period::Period,
        spot_price::{
            EstimationMethod,
            PriceArea,
            SpotPriceRecord,
            SpotPriceStrategy,
            average_price,
            estimate_fixed_spot_prices,
        },
    },
    prelude::*,
    quantity::{energy::KilowattHours, rate::KilowattHourRate},
};

/// Market data for the last couple of days may not be published yet.
const SPOT_PRICE_LAG: Days = Days::new(2);

/// Step back by calendar days in Copenhagen, keeping the wall-clock hour.
///
/// An hour skipped by the spring change resolves to the hour after it.
fn days_earlier(instant: DateTime<Utc>, days: Days) -> Result<DateTime<Utc>> {
    let local = instant
        .with_timezone(&TIMEZONE)
        .naive_local()
        .checked_sub_days(days)
        .with_context(|| format!("{instant} is too far in the past"))?;
    let shifted = TIMEZONE
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| TIMEZONE.from_local_datetime(&(local + TimeDelta::hours(1))).earliest())
        .with_context(|| format!("{local} does not exist in Copenhagen"))?;
    Ok(shifted.with_timezone(&Utc))
}

/// Fully projected period: consumption from the annual volume, spot prices from the strategy.
#[derive(Clone, Debug)]
pub struct AcontoEstimation {
    pub consumption: Vec<HourlyConsumption>,
    pub spot_prices: Vec<SpotPriceRecord>,
    pub method: EstimationMethod,
    pub total_consumption: KilowattHours,
    pub average_hourly_consumption: KilowattHours,
    pub average_spot_price: KilowattHourRate,
    pub n_hours: usize,
}

impl AcontoEstimation {
    #[instrument(skip_all, fields(period = %period.label, %price_area))]
    pub fn try_new(
        annual_volume: KilowattHours,
        period: &Period,
        price_area: PriceArea,
        strategy: SpotPriceStrategy,
        source: &dyn SpotPriceSource,
    ) -> Result<Self> {
        let consumption = estimate_consumption(annual_volume, period.interval, period.frequency)?;
        let (spot_prices, method) = strategy.estimate(source, period.interval, price_area)?;
        let total_consumption = total_consumption(&consumption);
        let n_hours = consumption.len();

        #[allow(clippy::cast_precision_loss)]
        let average_hourly_consumption = total_consumption / n_hours as f64;

        let this = Self {
            average_spot_price: average_price(&spot_prices),
            consumption,
            spot_prices,
            method,
            total_consumption,
            average_hourly_consumption,
            n_hours,
        };
        info!(%this.total_consumption, %this.average_spot_price, this.n_hours, %this.method, "estimated");
        Ok(this)
    }
}

/// Splits a running period into actual spot prices up to a couple of days ago
/// and fixed prices for the rest.
#[derive(Builder)]
pub struct HybridSplitter<'a> {
    source: &'a dyn SpotPriceSource,
    period: &'a Period,
    annual_volume: KilowattHours,
    price_area: PriceArea,
    fixed_spot_price: KilowattHourRate,
    now: DateTime<Utc>,
}

impl HybridSplitter<'_> {
    #[instrument(skip_all, fields(period = %self.period.label, price_area = %self.price_area))]
    pub fn split(self) -> Result<HybridEstimation> {
        let interval = self.period.interval;
        let current_hour = truncate_to_hour(self.now)?;
        let spot_price_split = days_earlier(current_hour, SPOT_PRICE_LAG)?.min(interval.end);

        let consumption =
            estimate_consumption(self.annual_volume, interval, self.period.frequency)?;

        let actual_spot_prices = if spot_price_split > interval.start {
            self.source
                .fetch_spot_prices(interval.with_end(spot_price_split), self.price_area)
                .context("failed to fetch the actual spot prices")?
        } else {
            Vec::new()
        };
        let fixed_spot_prices = estimate_fixed_spot_prices(
            interval.with_start(spot_price_split.max(interval.start)),
            self.price_area,
            self.fixed_spot_price,
        );
        let n_actual_spot_prices = actual_spot_prices.len();
        let n_fixed_spot_prices = fixed_spot_prices.len();
        let spot_prices = [actual_spot_prices, fixed_spot_prices].concat();

        let (past, future): (Vec<_>, Vec<_>) =
            consumption.into_iter().partition(|hour| hour.instant < current_hour);
        let estimation = HybridEstimation {
            past_consumption: total_consumption(&past),
            future_consumption: total_consumption(&future),
            n_past_hours: past.len(),
            n_future_hours: future.len(),
            consumption: past
                .into_iter()
                .map(|hour| hour.with_quality(Quality::EstimatedPast))
                .chain(future.into_iter().map(|hour| hour.with_quality(Quality::EstimatedFuture)))
                .collect(),
            spot_prices,
            spot_price_split,
            n_actual_spot_prices,
            n_fixed_spot_prices,
            fixed_spot_price: self.fixed_spot_price,
        };
        info!(
            estimation.n_actual_spot_prices,
            estimation.n_fixed_spot_prices,
            estimation.n_past_hours,
            estimation.n_future_hours,
            "split",
        );
        Ok(estimation)
    }
}

/// Running period: actual-to-date blended with the projected remainder.
#[derive(Clone, Debug)]
pub struct HybridEstimation {
    /// Past hours first, then future hours.
    pub consumption: Vec<HourlyConsumption>,

    /// Actual prices first, then fixed ones.
    pub spot_prices: Vec<SpotPriceRecord>,

    /// First hour priced at the fixed rate.
    pub spot_price_split: DateTime<Utc>,

    pub n_actual_spot_prices: usize,
    pub n_fixed_spot_prices: usize,
    pub n_past_hours: usize,
    pub n_future_hours: usize,
    pub past_consumption: KilowattHours,
    pub future_consumption: KilowattHours,
    pub fixed_spot_price: KilowattHourRate,
}

impl HybridEstimation {
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "actual spot prices for {} hours, fixed {} for the remaining {} hours",
            self.n_actual_spot_prices, self.fixed_spot_price, self.n_fixed_spot_prices,
        )
    }

    pub fn total_consumption(&self) -> KilowattHours {
        self.past_consumption + self.future_consumption
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        api::stub::{FailingSpotPrices, StubSpotPrices},
        core::period::{CalculationType, Frequency},
    };

    fn august() -> Period {
        let start = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();
        Period::try_new(start, Frequency::Monthly, CalculationType::Aconto).unwrap()
    }

    #[test]
    fn test_aconto() -> Result {
        let period = august();
        let estimation = AcontoEstimation::try_new(
            KilowattHours::from(4000.0),
            &period,
            PriceArea::Dk1,
            SpotPriceStrategy::Fixed(KilowattHourRate::from(0.6)),
            &FailingSpotPrices,
        )?;
        assert_eq!(estimation.n_hours, 744);
        assert_eq!(estimation.spot_prices.len(), 744);
        assert_eq!(estimation.method, EstimationMethod::FixedSpotPrice);
        assert_abs_diff_eq!(estimation.total_consumption.0, 333.2, epsilon = 1e-9);
        assert_abs_diff_eq!(estimation.average_hourly_consumption.0, 333.2 / 744.0, epsilon = 1e-9);
        assert_abs_diff_eq!(estimation.average_spot_price.0, 0.6, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_hybrid_split() -> Result {
        let period = august();
        let source = StubSpotPrices::hourly(period.interval, PriceArea::Dk2, |_| 1000.0);
        let now = period.interval.start + TimeDelta::days(10) + TimeDelta::minutes(330);
        let estimation = HybridSplitter::builder()
            .source(&source)
            .period(&period)
            .annual_volume(KilowattHours::from(4000.0))
            .price_area(PriceArea::Dk2)
            .fixed_spot_price(KilowattHourRate::from(0.5))
            .now(now)
            .build()
            .split()?;

        let n_hours = period.interval.n_hours();
        assert_eq!(estimation.spot_price_split, period.interval.start + TimeDelta::hours(8 * 24 + 5));
        assert_eq!(estimation.n_actual_spot_prices, 8 * 24 + 5);
        assert_eq!(estimation.n_actual_spot_prices + estimation.n_fixed_spot_prices, n_hours);
        assert_eq!(estimation.spot_prices.len(), n_hours);
        assert_abs_diff_eq!(estimation.spot_prices[0].price().0, 1.0);
        assert_abs_diff_eq!(estimation.spot_prices[n_hours - 1].price().0, 0.5);

        assert_eq!(estimation.n_past_hours, 10 * 24 + 5);
        assert_eq!(estimation.n_past_hours + estimation.n_future_hours, n_hours);
        assert_eq!(estimation.consumption.len(), n_hours);
        assert_eq!(estimation.consumption[0].quality, Quality::EstimatedPast);
        assert_eq!(estimation.consumption[n_hours - 1].quality, Quality::EstimatedFuture);
        assert_abs_diff_eq!(estimation.total_consumption().0, 333.2, epsilon = 1e-9);
        assert_eq!(
            estimation.description(),
            "actual spot prices for 197 hours, fixed 0.500 DKK/kWh for the remaining 547 hours",
        );
        Ok(())
    }

    #[test]
    fn test_hybrid_split_after_autumn_change() -> Result {
        let start = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        let period = Period::try_new(start, Frequency::Monthly, CalculationType::Aconto)?;
        let source = StubSpotPrices::hourly(period.interval, PriceArea::Dk1, |_| 1000.0);
        let estimation = HybridSplitter::builder()
            .source(&source)
            .period(&period)
            .annual_volume(KilowattHours::from(4000.0))
            .price_area(PriceArea::Dk1)
            .fixed_spot_price(KilowattHourRate::from(0.5))
            .now(Utc.with_ymd_and_hms(2023, 10, 30, 9, 30, 0).unwrap())
            .build()
            .split()?;

        // 10:00 CET on Monday is 10:00 CEST on Saturday.
        assert_eq!(estimation.spot_price_split, Utc.with_ymd_and_hms(2023, 10, 28, 8, 0, 0).unwrap());
        assert_eq!(estimation.n_actual_spot_prices, 658);
        assert_eq!(
            estimation.n_actual_spot_prices + estimation.n_fixed_spot_prices,
            period.interval.n_hours(),
        );
        Ok(())
    }

    #[test]
    fn test_days_earlier_into_spring_gap() -> Result {
        // 02:00 on the 26th of March 2023 does not exist in Copenhagen.
        let instant = Utc.with_ymd_and_hms(2023, 3, 28, 0, 0, 0).unwrap();
        assert_eq!(
            days_earlier(instant, Days::new(2))?,
            Utc.with_ymd_and_hms(2023, 3, 26, 1, 0, 0).unwrap(),
        );
        Ok(())
    }

    #[test]
    fn test_hybrid_early_in_period_is_all_fixed() -> Result {
        let period = august();
        let now = period.interval.start + TimeDelta::hours(30);
        let estimation = HybridSplitter::builder()
            .source(&FailingSpotPrices)
            .period(&period)
            .annual_volume(KilowattHours::from(4000.0))
            .price_area(PriceArea::Dk1)
            .fixed_spot_price(KilowattHourRate::from(0.5))
            .now(now)
            .build()
            .split()?;
        assert_eq!(estimation.n_actual_spot_prices, 0);
        assert_eq!(estimation.n_fixed_spot_prices, period.interval.n_hours());
        assert_eq!(estimation.n_past_hours, 30);
        Ok(())
    }

    #[test]
    fn test_hybrid_propagates_source_errors() {
        let period = august();
        let result = HybridSplitter::builder()
            .source(&FailingSpotPrices)
            .period(&period)
            .annual_volume(KilowattHours::from(4000.0))
            .price_area(PriceArea::Dk1)
            .fixed_spot_price(KilowattHourRate::from(0.5))
            .now(period.interval.start + TimeDelta::days(5))
            .build()
            .split();
        assert!(result.is_err());
    }
}
