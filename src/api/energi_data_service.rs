use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use ureq::Agent;

use crate::{
    api::SpotPriceSource,
    core::{
        TIMEZONE,
        interval::Interval,
        spot_price::{PriceArea, SpotPriceRecord},
    },
    prelude::*,
    quantity::rate::MegawattHourRate,
};

const URL: &str = "https://api.energidataservice.dk/dataset/Elspotprices";

/// [Energi Data Service](https://www.energidataservice.dk) public market data.
pub struct Api {
    client: Agent,
}

impl Api {
    pub fn new() -> Self {
        let client =
            Agent::config_builder().timeout_global(Some(Duration::from_secs(10))).build().into();
        Self { client }
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotPriceSource for Api {
    #[instrument(skip_all, fields(?interval, %price_area))]
    fn fetch_spot_prices(
        &self,
        interval: Interval,
        price_area: PriceArea,
    ) -> Result<Vec<SpotPriceRecord>> {
        info!("fetching…");
        let response = self
            .client
            .get(URL)
            .query("offset", "0")
            .query("limit", "0")
            .query("start", local_minute(interval.start))
            .query("end", local_minute(interval.end))
            .query("filter", format!(r#"{{"PriceArea":["{price_area}"]}}"#))
            .query("sort", "HourUTC ASC")
            .call()
            .context("failed to request the spot prices")?
            .body_mut()
            .read_json::<Response>()
            .context("failed to deserialize the spot prices")?;
        let records = response.into_records(interval, price_area);
        info!(n_records = records.len(), "fetched");
        Ok(records)
    }
}

/// The dataset filters by Danish wall-clock time.
fn local_minute(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&TIMEZONE).format("%Y-%m-%dT%H:%M").to_string()
}

#[derive(Deserialize)]
struct Response {
    records: Vec<Record>,
}

impl Response {
    fn into_records(self, interval: Interval, price_area: PriceArea) -> Vec<SpotPriceRecord> {
        let mut records: Vec<_> = self
            .records
            .into_iter()
            .filter(|record| record.price_area == price_area)
            .filter_map(|record| {
                let hour_utc = record.hour_utc.and_utc();
                let Some(price_dkk) = record.spot_price_dkk else {
                    warn!(%hour_utc, "no price in DKK, skipping");
                    return None;
                };
                Some(SpotPriceRecord::new(
                    hour_utc,
                    price_area,
                    MegawattHourRate(price_dkk),
                    MegawattHourRate(record.spot_price_eur.unwrap_or_default()),
                ))
            })
            .filter(|record| interval.contains(record.hour_utc))
            .collect();
        records.sort_by_key(|record| record.hour_utc);
        records
    }
}

#[derive(Deserialize)]
struct Record {
    #[serde(rename = "HourUTC")]
    hour_utc: NaiveDateTime,

    #[serde(rename = "PriceArea")]
    price_area: PriceArea,

    #[serde(rename = "SpotPriceDKK")]
    spot_price_dkk: Option<f64>,

    #[serde(rename = "SpotPriceEUR")]
    spot_price_eur: Option<f64>,
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;

    fn morning() -> Interval {
        Interval::new(
            Utc.with_ymd_and_hms(2023, 5, 31, 22, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 1, 1, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_local_minute() {
        assert_eq!(local_minute(morning().start), "2023-06-01T00:00");
    }

    #[test]
    fn test_into_records() -> Result {
        // language=json
        let body = r#"{
            "total": 5,
            "filters": "{\"PriceArea\":[\"DK1\"]}",
            "limit": 0,
            "dataset": "Elspotprices",
            "records": [
                {"HourUTC": "2023-05-31T23:00:00", "HourDK": "2023-06-01T01:00:00", "PriceArea": "DK1", "SpotPriceDKK": 745.100012, "SpotPriceEUR": 100.050003},
                {"HourUTC": "2023-05-31T22:00:00", "HourDK": "2023-06-01T00:00:00", "PriceArea": "DK1", "SpotPriceDKK": 800.0, "SpotPriceEUR": 107.4},
                {"HourUTC": "2023-05-31T22:00:00", "HourDK": "2023-06-01T00:00:00", "PriceArea": "DK2", "SpotPriceDKK": 900.0, "SpotPriceEUR": 120.8},
                {"HourUTC": "2023-06-01T00:00:00", "HourDK": "2023-06-01T02:00:00", "PriceArea": "DK1", "SpotPriceDKK": null, "SpotPriceEUR": 99.0},
                {"HourUTC": "2023-06-01T01:00:00", "HourDK": "2023-06-01T03:00:00", "PriceArea": "DK1", "SpotPriceDKK": 10.0, "SpotPriceEUR": 1.3}
            ]
        }"#;
        let records =
            serde_json::from_str::<Response>(body)?.into_records(morning(), PriceArea::Dk1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hour_local, "2023-06-01T00:00:00");
        assert_eq!(records[1].hour_local, "2023-06-01T01:00:00");
        assert_abs_diff_eq!(records[0].price().0, 0.8);
        assert_abs_diff_eq!(records[1].price_eur.0, 100.050_003);
        Ok(())
    }

    #[test]
    #[ignore = "makes the API request"]
    fn test_fetch_spot_prices_ok() -> Result {
        let interval = Interval::new(
            Utc.with_ymd_and_hms(2024, 1, 14, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 23, 0, 0).unwrap(),
        );
        let records = Api::new().fetch_spot_prices(interval, PriceArea::Dk2)?;
        assert_eq!(records.len(), 24);
        assert_eq!(records[0].hour_local, "2024-01-15T00:00:00");
        assert!(records.is_sorted_by_key(|record| record.hour_utc));
        Ok(())
    }
}
