//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single symbol.
///
/// Bars for one symbol form a sparse, date-ordered sequence: non-trading days
/// simply have no bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if the close is unusable (NaN, infinite or non-positive).
    ///
    /// Void bars are ignored by window resolution; a zero close would also make
    /// the percentage change undefined.
    pub fn is_void(&self) -> bool {
        !self.close.is_finite() || self.close <= 0.0
    }

    /// The (date, close) pair used for reaction comparisons.
    pub fn price_point(&self) -> PricePoint {
        PricePoint {
            date: self.date,
            close: self.close,
        }
    }
}

/// A closing price on a specific trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}
