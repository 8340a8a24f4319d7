use std::collections::BTreeMap;

use bon::Builder;

use crate::{
    core::{
        consumption::{HourlyConsumption, total_consumption},
        error::Error,
        period::Period,
        spot_price::SpotPriceRecord,
        tariff::{Charges, HourlyTariffCost, calculate_hourly_costs},
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate},
};

/// Danish VAT («moms»).
pub const VAT_RATE: f64 = 0.25;

#[derive(Clone, Debug)]
pub struct Bill {
    pub hourly_costs: Vec<HourlyTariffCost>,
    pub total_consumption: KilowattHours,

    /// Usage-based charges per tariff name.
    pub tariff_costs: BTreeMap<String, Cost>,

    pub supplier_cost: Cost,
    pub spot_cost: Cost,

    /// Tariffs, supplier and spot.
    pub usage_cost: Cost,

    /// Fixed charges per subscription name, for the whole period.
    pub subscription_costs: BTreeMap<String, Cost>,

    pub subscription_cost: Cost,

    /// Excluding VAT.
    pub subtotal: Cost,

    pub vat: Cost,

    /// Including VAT.
    pub total: Cost,
}

impl Bill {
    /// Total including VAT per consumed kilowatt-hour.
    pub fn average_cost_per_kwh(&self) -> Result<KilowattHourRate, Error> {
        if self.total_consumption.is_zero() {
            Err(Error::ZeroConsumption)
        } else {
            Ok(self.total / self.total_consumption)
        }
    }
}

#[derive(Builder)]
pub struct BillCalculator<'a> {
    period: &'a Period,
    consumption: &'a [HourlyConsumption],
    charges: &'a Charges,
    spot_prices: &'a [SpotPriceRecord],

    /// Supplier's margin on top of the spot price.
    supplier_rate: KilowattHourRate,
}

impl BillCalculator<'_> {
    #[instrument(skip_all, fields(period = %self.period.label))]
    pub fn compute(self) -> Bill {
        let hourly_costs = calculate_hourly_costs(
            self.consumption,
            &self.charges.tariffs,
            self.supplier_rate,
            self.spot_prices,
        );

        let mut tariff_costs = BTreeMap::<String, Cost>::new();
        for hour in &hourly_costs {
            for (name, cost) in &hour.tariff_costs {
                *tariff_costs.entry(name.clone()).or_default() += *cost;
            }
        }
        let supplier_cost: Cost = hourly_costs.iter().map(|hour| hour.supplier_cost).sum();
        let spot_cost: Cost = hourly_costs.iter().map(|hour| hour.spot_cost).sum();
        let usage_cost: Cost = hourly_costs.iter().map(|hour| hour.total_cost).sum();

        let n_months = self.period.frequency.n_months();
        let mut subscription_costs = BTreeMap::<String, Cost>::new();
        for subscription in &self.charges.subscriptions {
            *subscription_costs.entry(subscription.name.clone()).or_default() +=
                subscription.cost(n_months);
        }
        let subscription_cost: Cost = subscription_costs.values().copied().sum();

        let subtotal = usage_cost + subscription_cost;
        let vat = subtotal * VAT_RATE;
        let bill = Bill {
            total_consumption: total_consumption(self.consumption),
            hourly_costs,
            tariff_costs,
            supplier_cost,
            spot_cost,
            usage_cost,
            subscription_costs,
            subscription_cost,
            subtotal,
            vat,
            total: subtotal + vat,
        };
        info!(%bill.total_consumption, %bill.subtotal, %bill.total, "computed");
        bill
    }
}

/// Price the period's consumption against the charges and spot prices.
pub fn compute_bill(
    period: &Period,
    consumption: &[HourlyConsumption],
    charges: &Charges,
    spot_prices: &[SpotPriceRecord],
    supplier_rate: KilowattHourRate,
) -> Bill {
    BillCalculator::builder()
        .period(period)
        .consumption(consumption)
        .charges(charges)
        .spot_prices(spot_prices)
        .supplier_rate(supplier_rate)
        .build()
        .compute()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::core::{
        consumption::{Quality, estimate_consumption},
        period::{CalculationType, Frequency},
        spot_price::{PriceArea, estimate_fixed_spot_prices},
        tariff::{Subscription, Tariff, TariffPrice, TariffResolution},
    };

    fn period(frequency: Frequency) -> Period {
        let start = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();
        Period::try_new(start, frequency, CalculationType::Historical).unwrap()
    }

    fn subscription(name: &str, unit_price: f64) -> Subscription {
        Subscription { name: name.to_owned(), unit_price: Cost::from(unit_price), quantity: 1 }
    }

    fn daily(name: &str, price: f64) -> Tariff {
        Tariff {
            name: name.to_owned(),
            owner: String::new(),
            description: String::new(),
            resolution: TariffResolution::Daily,
            prices: vec![TariffPrice { position: 1, price: KilowattHourRate::from(price) }],
        }
    }

    #[test]
    fn test_vat() {
        let period = period(Frequency::Monthly);
        let charges = Charges { tariffs: Vec::new(), subscriptions: vec![subscription("Net", 1000.0)] };
        let bill = compute_bill(&period, &[], &charges, &[], KilowattHourRate::ZERO);
        assert_abs_diff_eq!(bill.subtotal.0, 1000.0);
        assert_abs_diff_eq!(bill.vat.0, 250.0);
        assert_abs_diff_eq!(bill.total.0, 1250.0);
        assert!(matches!(bill.average_cost_per_kwh(), Err(Error::ZeroConsumption)));
    }

    #[test]
    fn test_quarterly_subscriptions() {
        let period = period(Frequency::Quarterly);
        let charges = Charges {
            tariffs: Vec::new(),
            subscriptions: vec![
                subscription("Netabonnement", 50.0),
                Subscription { quantity: 2, ..subscription("Måler", 10.0) },
            ],
        };
        let bill = compute_bill(&period, &[], &charges, &[], KilowattHourRate::ZERO);
        assert_abs_diff_eq!(bill.subscription_costs["Netabonnement"].0, 150.0);
        assert_abs_diff_eq!(bill.subscription_costs["Måler"].0, 60.0);
        assert_abs_diff_eq!(bill.subscription_cost.0, 210.0);
    }

    #[test]
    fn test_end_to_end() -> Result {
        let period = period(Frequency::Monthly);
        let consumption: Vec<_> =
            estimate_consumption(KilowattHours::from(7200.0 / 0.0833), period.interval, Frequency::Monthly)?
                .into_iter()
                .map(|hour| hour.with_quality(Quality::Measured))
                .collect();
        let spot_prices =
            estimate_fixed_spot_prices(period.interval, PriceArea::Dk1, KilowattHourRate::from(1.0));
        let charges = Charges {
            tariffs: vec![daily("Elafgift", 0.5), daily("Nettarif", 0.25)],
            subscriptions: vec![subscription("Netabonnement", 100.0)],
        };
        let bill = BillCalculator::builder()
            .period(&period)
            .consumption(&consumption)
            .charges(&charges)
            .spot_prices(&spot_prices)
            .supplier_rate(KilowattHourRate::from(0.02))
            .build()
            .compute();

        // April 2023 has 720 hours of 10 kWh each.
        assert_eq!(bill.hourly_costs.len(), 720);
        assert_abs_diff_eq!(bill.total_consumption.0, 7200.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bill.tariff_costs["Elafgift"].0, 3600.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bill.tariff_costs["Nettarif"].0, 1800.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bill.supplier_cost.0, 144.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bill.spot_cost.0, 7200.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bill.usage_cost.0, 12744.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bill.subtotal.0, 12844.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bill.total.0, 16055.0, epsilon = 1e-6);
        assert_abs_diff_eq!(bill.average_cost_per_kwh()?.0, 16055.0 / 7200.0, epsilon = 1e-9);
        Ok(())
    }
}
