//! Financial Modeling Prep provider (`stable` API).
//!
//! Serves the earnings calendar, transcript dates and transcripts, the
//! market-cap screener, company profiles and daily bars. Response parsing is
//! split from transport so the row-level rules (skip rows with a missing
//! symbol or malformed date) can be tested on fixtures.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use super::http::{parse_date, JsonClient, DEFAULT_TIMEOUT};
use super::provider::{DataError, EarningsCalendar, PriceSource, Screener};
use crate::domain::{Bar, CompanyProfile, EarningsEvent, TranscriptDate};

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/stable";

/// Screener page size; the universe of US listings above a cap floor fits.
const SCREENER_LIMIT: u32 = 5000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarRow {
    symbol: Option<String>,
    date: Option<String>,
    eps_actual: Option<f64>,
    eps_estimated: Option<f64>,
    revenue_actual: Option<f64>,
    revenue_estimated: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ScreenerRow {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRow {
    company_name: Option<String>,
    market_cap: Option<f64>,
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// The EOD endpoint returns a bare list; the legacy shape wraps it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceResponse {
    List(Vec<PriceRow>),
    Wrapped {
        #[serde(default)]
        historical: Vec<PriceRow>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptDateRow {
    date: Option<String>,
    quarter: Option<u8>,
    fiscal_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct TranscriptRow {
    #[serde(default)]
    content: String,
}

/// FMP client implementing the calendar, screener and price contracts.
pub struct FmpClient {
    http: JsonClient,
}

impl FmpClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        Ok(Self {
            http: JsonClient::new(base_url, "apikey", api_key, timeout)?,
        })
    }

    fn parse_calendar(rows: Vec<CalendarRow>) -> Vec<EarningsEvent> {
        rows.into_iter()
            .filter_map(|row| {
                let symbol = row.symbol.filter(|s| !s.is_empty())?;
                let date = parse_date(row.date.as_deref()?)?;
                let mut event = EarningsEvent::new(symbol, date);
                event.eps_actual = row.eps_actual;
                event.eps_estimate = row.eps_estimated;
                event.revenue_actual = row.revenue_actual;
                event.revenue_estimate = row.revenue_estimated;
                Some(event)
            })
            .collect()
    }

    fn parse_profile(symbol: &str, rows: Vec<ProfileRow>) -> Option<CompanyProfile> {
        let row = rows.into_iter().next()?;
        Some(CompanyProfile {
            symbol: symbol.to_string(),
            company_name: row.company_name.unwrap_or_default(),
            market_cap: row.market_cap.unwrap_or(0.0),
            sector: row.sector,
            industry: row.industry,
        })
    }

    fn parse_prices(symbol: &str, resp: PriceResponse) -> Result<Vec<Bar>, DataError> {
        let rows = match resp {
            PriceResponse::List(rows) => rows,
            PriceResponse::Wrapped { historical } => historical,
        };
        rows.into_iter()
            .map(|row| {
                let date = parse_date(&row.date).ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!(
                        "invalid bar date for {symbol}: {}",
                        row.date
                    ))
                })?;
                Ok(Bar {
                    symbol: symbol.to_string(),
                    date,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume.max(0.0) as u64,
                })
            })
            .collect()
    }

    fn parse_transcript_dates(rows: Vec<TranscriptDateRow>) -> Vec<TranscriptDate> {
        rows.into_iter()
            .filter_map(|row| {
                let date = parse_date(row.date.as_deref()?)?;
                Some(TranscriptDate {
                    date,
                    quarter: row.quarter.filter(|q| (1..=4).contains(q)),
                    fiscal_year: row.fiscal_year,
                })
            })
            .collect()
    }
}

impl EarningsCalendar for FmpClient {
    fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EarningsEvent>, DataError> {
        let rows: Vec<CalendarRow> = self.http.get_json(
            "earnings-calendar",
            &[("from", from.to_string()), ("to", to.to_string())],
        )?;
        Ok(Self::parse_calendar(rows))
    }

    fn transcript_dates(&self, symbol: &str) -> Result<Vec<TranscriptDate>, DataError> {
        let rows: Vec<TranscriptDateRow> = self
            .http
            .get_json("earning-call-transcript-dates", &[("symbol", symbol.to_string())])?;
        Ok(Self::parse_transcript_dates(rows))
    }

    fn transcript(
        &self,
        symbol: &str,
        year: i32,
        quarter: u8,
    ) -> Result<Option<String>, DataError> {
        let rows: Vec<TranscriptRow> = self.http.get_json(
            "earning-call-transcript",
            &[
                ("symbol", symbol.to_string()),
                ("year", year.to_string()),
                ("quarter", quarter.to_string()),
            ],
        )?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.content)
            .filter(|c| !c.is_empty()))
    }
}

impl Screener for FmpClient {
    fn screen(&self, min_market_cap: f64) -> Result<Vec<String>, DataError> {
        let rows: Vec<ScreenerRow> = self.http.get_json(
            "stock-screener",
            &[
                ("marketCapMoreThan", format!("{}", min_market_cap as u64)),
                ("isActivelyTrading", "true".to_string()),
                ("exchange", "NYSE,NASDAQ,AMEX".to_string()),
                ("limit", SCREENER_LIMIT.to_string()),
            ],
        )?;
        Ok(rows.into_iter().filter_map(|r| r.symbol).collect())
    }

    fn profile(&self, symbol: &str) -> Result<Option<CompanyProfile>, DataError> {
        let rows: Vec<ProfileRow> = self
            .http
            .get_json("profile", &[("symbol", symbol.to_string())])?;
        Ok(Self::parse_profile(symbol, rows))
    }
}

impl PriceSource for FmpClient {
    fn daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let resp: PriceResponse = self.http.get_json(
            "historical-price-eod/full",
            &[
                ("symbol", symbol.to_string()),
                ("from", from.to_string()),
                ("to", to.to_string()),
            ],
        )?;
        Self::parse_prices(symbol, resp)
    }
}
