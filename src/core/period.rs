use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::{
    core::{TIMEZONE, error::Error, interval::Interval},
    prelude::*,
    quantity::{Quantity, rate::KilowattHourRate},
};

/// Number of upcoming periods offered for an aconto estimate.
pub const N_ACONTO_PERIODS: usize = 6;

/// Supplier's margin when none is configured: 2 øre per kilowatt-hour.
pub const DEFAULT_SUPPLIER_RATE: KilowattHourRate = Quantity(0.02);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum Frequency {
    #[display("monthly")]
    Monthly,

    #[display("quarterly")]
    Quarterly,
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            _ => Err(Error::InvalidFrequency(s.to_owned())),
        }
    }
}

impl Frequency {
    #[must_use]
    pub const fn n_months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
        }
    }

    /// Share of the annual volume billed per period.
    ///
    /// Suppliers divide flat, regardless of the number of days in the period.
    #[must_use]
    pub const fn annual_share(self) -> f64 {
        match self {
            Self::Monthly => 0.0833,
            Self::Quarterly => 0.25,
        }
    }

    /// First day of the month or quarter containing the date.
    fn align(self, date: NaiveDate) -> Result<NaiveDate> {
        let month0 = match self {
            Self::Monthly => date.month0(),
            Self::Quarterly => date.month0() / 3 * 3,
        };
        NaiveDate::from_ymd_opt(date.year(), month0 + 1, 1)
            .with_context(|| format!("failed to align {date} to a {self} boundary"))
    }

    fn next(self, start: NaiveDate) -> Result<NaiveDate> {
        start
            .checked_add_months(Months::new(self.n_months()))
            .with_context(|| format!("{start} is too far in the future"))
    }

    fn previous(self, start: NaiveDate) -> Result<NaiveDate> {
        start
            .checked_sub_months(Months::new(self.n_months()))
            .with_context(|| format!("{start} is too far in the past"))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum, derive_more::Display)]
pub enum CalculationType {
    /// Bill a completed period from metered consumption.
    Historical,

    /// Estimate an upcoming or running period from the annual volume.
    Aconto,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum PeriodType {
    Historical,
    Aconto,
    Hybrid,
}

impl PeriodType {
    /// Supplier's own margin applies to historical bills only.
    pub const fn supplier_rate(self, historical_rate: KilowattHourRate) -> KilowattHourRate {
        match self {
            Self::Historical => historical_rate,
            Self::Aconto | Self::Hybrid => KilowattHourRate::ZERO,
        }
    }

    #[must_use]
    pub const fn is_estimate(self) -> bool {
        matches!(self, Self::Aconto | Self::Hybrid)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub struct Period {
    /// Local midnights converted to UTC.
    pub interval: Interval,

    pub label: String,
    pub frequency: Frequency,
    pub calculation_type: CalculationType,
}

impl Period {
    pub fn try_new(
        start: NaiveDate,
        frequency: Frequency,
        calculation_type: CalculationType,
    ) -> Result<Self> {
        let end = frequency.next(start)?;
        let mut label = match frequency {
            Frequency::Monthly => start.format("%B %Y").to_string(),
            Frequency::Quarterly => format!("Q{} {}", start.month0() / 3 + 1, start.year()),
        };
        if calculation_type == CalculationType::Aconto {
            label.push_str(" (Aconto)");
        }
        Ok(Self {
            interval: Interval::new(local_midnight(start)?, local_midnight(end)?),
            label,
            frequency,
            calculation_type,
        })
    }

    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        local_date(self.interval.start)
    }

    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        local_date(self.interval.end) - Days::new(1)
    }
}

/// Civil date in Copenhagen.
#[must_use]
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&TIMEZONE).date_naive()
}

pub fn local_midnight(date: NaiveDate) -> Result<DateTime<Utc>> {
    let midnight = TIMEZONE
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .with_context(|| format!("{date} has no local midnight"))?;
    Ok(midnight.with_timezone(&Utc))
}

/// The first month or quarter that starts strictly after the consumer start.
pub fn first_complete_period_start(
    consumer_start: DateTime<Utc>,
    frequency: Frequency,
) -> Result<NaiveDate> {
    frequency.next(frequency.align(local_date(consumer_start))?)
}

/// The most recent month or quarter that has fully ended.
pub fn last_complete_period_start(frequency: Frequency, now: DateTime<Utc>) -> Result<NaiveDate> {
    frequency.previous(current_period_start(frequency, now)?)
}

/// The month or quarter that is running at the moment.
pub fn current_period_start(frequency: Frequency, now: DateTime<Utc>) -> Result<NaiveDate> {
    frequency.align(local_date(now))
}

/// Enumerate the periods the consumer can choose from.
///
/// Historical periods run from the first complete period after the consumer start
/// through the last completed one; the list is empty when none has completed yet.
/// Aconto periods are the running one followed by the upcoming ones.
#[instrument(skip_all, fields(%frequency, %calculation_type, %now))]
pub fn generate_periods(
    consumer_start: DateTime<Utc>,
    frequency: Frequency,
    calculation_type: CalculationType,
    now: DateTime<Utc>,
) -> Result<Vec<Period>> {
    let mut starts = Vec::new();
    match calculation_type {
        CalculationType::Historical => {
            let last = last_complete_period_start(frequency, now)?;
            let mut start = first_complete_period_start(consumer_start, frequency)?;
            while start <= last {
                starts.push(start);
                start = frequency.next(start)?;
            }
        }
        CalculationType::Aconto => {
            let mut start = current_period_start(frequency, now)?;
            for _ in 0..N_ACONTO_PERIODS {
                starts.push(start);
                start = frequency.next(start)?;
            }
        }
    }
    let periods = starts
        .into_iter()
        .map(|start| Period::try_new(start, frequency, calculation_type))
        .collect::<Result<Vec<_>>>()?;
    debug!(n_periods = periods.len(), "generated");
    Ok(periods)
}

/// Decide which data the bill for the period can be built from.
///
/// A fully elapsed period is always historical, even when an estimate was asked for.
#[must_use]
pub fn classify(
    period: &Period,
    calculation_type: CalculationType,
    now: DateTime<Utc>,
) -> PeriodType {
    if calculation_type == CalculationType::Historical {
        PeriodType::Historical
    } else if period.interval.start > now {
        PeriodType::Aconto
    } else if period.interval.end <= now {
        PeriodType::Historical
    } else {
        PeriodType::Hybrid
    }
}
