use chrono::{DateTime, Utc};
use clap::Parser;

use crate::{
    core::period::{CalculationType, Frequency, Period, generate_periods},
    prelude::*,
    tables::build_periods_table,
};

#[derive(Parser)]
pub struct PeriodArgs {
    /// When the consumer took over the metering point, for example `2023-05-15T00:00:00Z`.
    #[clap(long, env = "CONSUMER_START")]
    pub consumer_start: DateTime<Utc>,

    /// Billing frequency: `monthly` or `quarterly`.
    #[clap(long, default_value = "monthly", env = "BILLING_FREQUENCY")]
    pub frequency: Frequency,

    #[clap(
        long = "calculation",
        value_enum,
        default_value = "historical",
        env = "CALCULATION_TYPE"
    )]
    pub calculation_type: CalculationType,

    /// Pretend that it is this instant, for example `2023-08-10T12:00:00Z`.
    #[clap(long, env = "NOW")]
    pub now: Option<DateTime<Utc>>,
}

impl PeriodArgs {
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    pub fn generate(&self, now: DateTime<Utc>) -> Result<Vec<Period>> {
        generate_periods(self.consumer_start, self.frequency, self.calculation_type, now)
    }
}

#[instrument(skip_all)]
pub fn periods(args: &PeriodArgs) -> Result {
    let now = args.now();
    let periods = args.generate(now)?;
    if periods.is_empty() {
        warn!(%args.consumer_start, "no billing period has completed yet");
    } else {
        println!("{}", build_periods_table(&periods, args.calculation_type, now));
    }
    Ok(())
}
