use chrono::{DateTime, Utc};
use thiserror::Error;

/// Billing failures that callers may want to tell apart.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid billing frequency: `{0}`")]
    InvalidFrequency(String),

    #[error("the period {start}..{end} has no hours")]
    EmptyPeriod { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error("no historical spot prices available")]
    NoHistoricalSpotPrices,

    #[error("total consumption is zero")]
    ZeroConsumption,

    #[error("grid operator `{0}` is not mapped to a price area")]
    UnknownGridOperator(String),
}
