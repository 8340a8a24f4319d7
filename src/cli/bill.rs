use std::path::PathBuf;

use clap::Parser;

use crate::{
    api::{
        MeterPointDetails,
        MeteringSource,
        SpotPriceSource,
        eloverblik::ExportedMeteringData,
        energi_data_service,
    },
    cli::PeriodArgs,
    core::{
        bill::compute_bill,
        consumption::consumption_by_hour_of_day,
        estimation::{AcontoEstimation, HybridSplitter},
        period::{DEFAULT_SUPPLIER_RATE, PeriodType, classify},
        spot_price::{DEFAULT_FIXED_SPOT_PRICE, PriceArea, SpotPriceStrategy},
    },
    prelude::*,
    quantity::{energy::KilowattHours, rate::KilowattHourRate},
    tables::{
        build_aconto_table,
        build_bill_table,
        build_charges_table,
        build_hourly_costs_table,
        build_hourly_profile_table,
        build_hybrid_table,
    },
};

#[derive(Copy, Clone, clap::ValueEnum)]
pub enum SpotPriceMode {
    /// Flat price for every estimated hour.
    Fixed,

    /// Same hours last year, or the flat price when those are not available.
    Historical,
}

#[derive(Parser)]
pub struct BillArgs {
    #[clap(flatten)]
    pub period: PeriodArgs,

    /// Number of the period in the `periods` listing, starting from 1.
    #[clap(long = "period", env = "PERIOD_NUMBER")]
    pub period_number: usize,

    /// Metering point ID («målepunkt-ID»).
    #[clap(long, env = "METER_ID")]
    pub meter_id: String,

    /// Grid operator name, used to look the price area up.
    #[clap(long, env = "GRID_OPERATOR")]
    pub grid_operator: Option<String>,

    /// Overrides the price area of the grid operator.
    #[clap(long, value_enum, ignore_case = true, env = "PRICE_AREA")]
    pub price_area: Option<PriceArea>,

    /// Estimated annual consumption in kilowatt-hours, required for the estimates.
    #[clap(long = "annual-volume-kwh", env = "ESTIMATED_ANNUAL_VOLUME_KWH")]
    pub annual_volume: Option<KilowattHours>,

    /// Saved `getcharges` response.
    #[clap(long = "charges", env = "CHARGES_PATH")]
    pub charges_path: PathBuf,

    /// Saved `gettimeseries` response, required for historical bills.
    #[clap(long = "consumption", env = "CONSUMPTION_PATH")]
    pub consumption_path: Option<PathBuf>,

    /// Spot prices for the estimated hours of an aconto bill.
    #[clap(long = "spot-prices", value_enum, default_value = "fixed", env = "SPOT_PRICES")]
    pub spot_prices: SpotPriceMode,

    /// Flat spot price for the estimated hours, defaults to 0.614029 DKK/kWh.
    #[clap(long = "fixed-spot-price-per-kwh", env = "FIXED_SPOT_PRICE_PER_KWH")]
    pub fixed_spot_price: Option<KilowattHourRate>,

    /// Supplier's margin on historical bills, defaults to 0.02 DKK/kWh.
    #[clap(long = "supplier-rate-per-kwh", env = "SUPPLIER_RATE_PER_KWH")]
    pub supplier_rate: Option<KilowattHourRate>,

    /// Also print the charges and the hourly breakdown.
    #[clap(long, env = "BILL_DETAILS")]
    pub details: bool,
}

impl BillArgs {
    fn meter_point_details(&self) -> MeterPointDetails {
        MeterPointDetails {
            grid_operator_name: self.grid_operator.clone(),
            estimated_annual_volume: self.annual_volume,
        }
    }

    fn fixed_spot_price(&self) -> KilowattHourRate {
        self.fixed_spot_price.unwrap_or(DEFAULT_FIXED_SPOT_PRICE)
    }

    fn spot_price_strategy(&self) -> SpotPriceStrategy {
        match self.spot_prices {
            SpotPriceMode::Fixed => SpotPriceStrategy::Fixed(self.fixed_spot_price()),
            SpotPriceMode::Historical => {
                SpotPriceStrategy::Historical { fallback: self.fixed_spot_price() }
            }
        }
    }
}

#[instrument(skip_all)]
pub fn bill(args: &BillArgs) -> Result {
    let now = args.period.now();
    let periods = args.period.generate(now)?;
    let period = args
        .period_number
        .checked_sub(1)
        .and_then(|index| periods.get(index))
        .with_context(|| {
            format!("there is no period #{} among {}", args.period_number, periods.len())
        })?;
    let period_type = classify(period, args.period.calculation_type, now);
    info!(period = %period.label, %period_type, "selected");

    let meter_point = args.meter_point_details();
    let price_area = match args.price_area {
        Some(price_area) => price_area,
        None => meter_point.price_area()?,
    };
    info!(%price_area, "resolved");

    let spot_price_source = energi_data_service::Api::new();
    let metering =
        ExportedMeteringData::new(Some(args.charges_path.clone()), args.consumption_path.clone());

    let (consumption, spot_prices) = match period_type {
        PeriodType::Historical => (
            metering.fetch_consumption(&args.meter_id, period.interval)?,
            spot_price_source.fetch_spot_prices(period.interval, price_area)?,
        ),
        PeriodType::Aconto => {
            let estimation = AcontoEstimation::try_new(
                meter_point.estimated_annual_volume()?,
                period,
                price_area,
                args.spot_price_strategy(),
                &spot_price_source,
            )?;
            println!("{}", build_aconto_table(&estimation));
            (estimation.consumption, estimation.spot_prices)
        }
        PeriodType::Hybrid => {
            let estimation = HybridSplitter::builder()
                .source(&spot_price_source)
                .period(period)
                .annual_volume(meter_point.estimated_annual_volume()?)
                .price_area(price_area)
                .fixed_spot_price(args.fixed_spot_price())
                .now(now)
                .build()
                .split()?;
            println!("{}", build_hybrid_table(&estimation));
            (estimation.consumption, estimation.spot_prices)
        }
    };
    println!("{}", build_hourly_profile_table(&consumption_by_hour_of_day(&consumption)));

    let charges = metering.fetch_charges(&args.meter_id)?;
    let supplier_rate =
        period_type.supplier_rate(args.supplier_rate.unwrap_or(DEFAULT_SUPPLIER_RATE));
    let bill = compute_bill(period, &consumption, &charges, &spot_prices, supplier_rate);
    if args.details {
        println!("{}", build_charges_table(&charges));
        println!("{}", build_hourly_costs_table(&bill.hourly_costs));
    }
    println!("{}", build_bill_table(period, period_type, &bill));

    match bill.average_cost_per_kwh() {
        Ok(average) => println!("Average cost per kWh including VAT: {average}"),
        Err(error) => warn!("{error}"),
    }
    if period_type.is_estimate() {
        println!();
        println!("The bill includes estimates based on the flat monthly or quarterly share.");
        println!("Actual consumption and spot prices may vary significantly.");
        println!("Use the estimate for budgeting purposes only.");
    }
    Ok(())
}
