use std::fmt::{Debug, Formatter};

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

use crate::prelude::*;

#[derive(Copy, Clone, Eq, PartialEq)]
#[must_use]
pub struct Interval {
    /// Inclusive.
    pub start: DateTime<Utc>,

    /// Exclusive.
    pub end: DateTime<Utc>,
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl Interval {
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub const fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub const fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = end;
        self
    }

    #[must_use]
    pub fn duration(self) -> TimeDelta {
        self.end - self.start
    }

    /// Number of whole clock hours.
    #[must_use]
    pub fn n_hours(self) -> usize {
        usize::try_from(self.duration().num_hours()).unwrap_or_default()
    }

    #[must_use]
    pub fn contains(self, other: DateTime<Utc>) -> bool {
        (self.start <= other) && (other < self.end)
    }

    /// Iterate over hour starts, `start` inclusive and `end` exclusive.
    pub fn hours(self) -> impl Iterator<Item = DateTime<Utc>> {
        std::iter::successors(Some(self.start), |hour| Some(*hour + TimeDelta::hours(1)))
            .take_while(move |hour| *hour < self.end)
    }
}

/// Drop minutes, seconds and sub-seconds.
///
/// Danish civil offsets are whole hours, so this is also the local hour start.
pub fn truncate_to_hour(instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
    Ok(instant.duration_trunc(TimeDelta::hours(1))?)
}
