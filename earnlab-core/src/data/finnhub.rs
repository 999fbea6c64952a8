//! Finnhub hour-code calendar.
//!
//! Finnhub's earnings calendar tags each announcement with `bmo`, `amc` or
//! `dmh`, but keeps only about a month of history, so it backs the recent
//! tiers of the timing waterfall only.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use super::http::{parse_date, JsonClient, DEFAULT_TIMEOUT};
use super::provider::{DataError, HourCalendar, HourEntry};

pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarResponse {
    #[serde(default)]
    earnings_calendar: Vec<CalendarRow>,
}

#[derive(Debug, Deserialize)]
struct CalendarRow {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    hour: Option<String>,
}

pub struct FinnhubClient {
    http: JsonClient,
}

impl FinnhubClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        Ok(Self {
            http: JsonClient::new(base_url, "token", api_key, timeout)?,
        })
    }

    fn parse_calendar(resp: CalendarResponse) -> Vec<HourEntry> {
        resp.earnings_calendar
            .into_iter()
            .filter(|row| !row.symbol.is_empty())
            .filter_map(|row| {
                let date = parse_date(&row.date)?;
                Some(HourEntry {
                    symbol: row.symbol,
                    date,
                    hour: row.hour.unwrap_or_default(),
                })
            })
            .collect()
    }
}

impl HourCalendar for FinnhubClient {
    fn calendar_with_hour(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HourEntry>, DataError> {
        let resp: CalendarResponse = self.http.get_json(
            "calendar/earnings",
            &[("from", from.to_string()), ("to", to.to_string())],
        )?;
        Ok(Self::parse_calendar(resp))
    }
}
