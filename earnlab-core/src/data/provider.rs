//! Provider traits and structured error types.
//!
//! Each trait abstracts one upstream concern (earnings calendar, screener,
//! daily prices, hour codes) so the engine can run against the HTTP clients
//! in production and against in-memory fakes in tests.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, CompanyProfile, EarningsEvent, TranscriptDate};

/// Calendar days fetched on either side of an announcement date.
pub const PRICE_WINDOW_DAYS: i64 = 7;

/// Structured error types for upstream data operations.
///
/// Every variant is recoverable at the scope of a single symbol or event.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("data error: {0}")]
    Other(String),
}

/// One row of the hour-code calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourEntry {
    pub symbol: String,
    pub date: NaiveDate,
    /// Raw provider code: "bmo", "amc", "dmh" or empty.
    pub hour: String,
}

/// Earnings calendar and transcript provider.
pub trait EarningsCalendar: Send + Sync {
    /// All announcements in `[from, to]`. May contain duplicates and
    /// non-primary listings; callers filter.
    fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EarningsEvent>, DataError>;

    /// Every date a call transcript exists for `symbol`.
    fn transcript_dates(&self, symbol: &str) -> Result<Vec<TranscriptDate>, DataError>;

    /// Transcript text for a fiscal quarter, `None` when none is published.
    fn transcript(
        &self,
        symbol: &str,
        year: i32,
        quarter: u8,
    ) -> Result<Option<String>, DataError>;
}

/// Market-cap screener and company profiles.
pub trait Screener: Send + Sync {
    /// Symbols whose market cap exceeds `min_market_cap`.
    fn screen(&self, min_market_cap: f64) -> Result<Vec<String>, DataError>;

    fn profile(&self, symbol: &str) -> Result<Option<CompanyProfile>, DataError>;
}

/// Daily price bars.
pub trait PriceSource: Send + Sync {
    fn daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;

    /// Date-ordered bars spanning `date ± 7` calendar days.
    fn prices_around(&self, symbol: &str, date: NaiveDate) -> Result<Vec<Bar>, DataError> {
        let span = Duration::days(PRICE_WINDOW_DAYS);
        let mut bars = self.daily_bars(symbol, date - span, date + span)?;
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

/// Calendar carrying the session hour code of each announcement.
///
/// Upstream only keeps roughly a month of history; callers restrict queries
/// to the trailing 30 days.
pub trait HourCalendar: Send + Sync {
    fn calendar_with_hour(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HourEntry>, DataError>;
}
