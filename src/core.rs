pub mod bill;
pub mod consumption;
pub mod error;
pub mod estimation;
pub mod interval;
pub mod period;
pub mod spot_price;
pub mod tariff;

use chrono_tz::Tz;

/// Billing calendar and market hours are Danish civil time.
pub const TIMEZONE: Tz = chrono_tz::Europe::Copenhagen;
