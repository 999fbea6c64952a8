//! Upstream data: provider contracts, HTTP clients and the ticker filter.

pub mod finnhub;
pub mod fmp;
pub mod http;
pub mod provider;
pub mod tickers;

pub use finnhub::FinnhubClient;
pub use fmp::FmpClient;
pub use provider::{
    DataError, EarningsCalendar, HourCalendar, HourEntry, PriceSource, Screener,
    PRICE_WINDOW_DAYS,
};
pub use tickers::is_primary_listing;
