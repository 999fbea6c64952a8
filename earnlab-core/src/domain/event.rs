//! Earnings announcements and their identity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A disclosed quarterly earnings announcement.
///
/// Only the announcement date is known; time of day comes from the timing
/// classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub symbol: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub fiscal_quarter: Option<String>,
    #[serde(default)]
    pub fiscal_year: Option<i32>,
    #[serde(default)]
    pub eps_estimate: Option<f64>,
    #[serde(default)]
    pub eps_actual: Option<f64>,
    #[serde(default)]
    pub revenue_estimate: Option<f64>,
    #[serde(default)]
    pub revenue_actual: Option<f64>,
}

impl EarningsEvent {
    /// Bare event with no fiscal labels or estimates.
    pub fn new(symbol: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            fiscal_quarter: None,
            fiscal_year: None,
            eps_estimate: None,
            eps_actual: None,
            revenue_estimate: None,
            revenue_actual: None,
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(&self.symbol, self.date)
    }
}

/// Identity of an earnings event: duplicates across sources collapse on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    pub symbol: String,
    pub date: NaiveDate,
}

impl EventKey {
    pub fn new(symbol: &str, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            date,
        }
    }
}

/// Renders as `SYMBOL_YYYY-MM-DD`, the key format of timing maps.
impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.symbol, self.date)
    }
}

/// A date on which a transcript exists for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDate {
    pub date: NaiveDate,
    pub quarter: Option<u8>,
    pub fiscal_year: Option<i32>,
}

impl TranscriptDate {
    /// Convert into an event for `symbol`, labelling the quarter as `Q{n}`.
    pub fn into_event(self, symbol: &str) -> EarningsEvent {
        let mut event = EarningsEvent::new(symbol, self.date);
        event.fiscal_quarter = self.quarter.map(|q| format!("Q{q}"));
        event.fiscal_year = self.fiscal_year;
        event
    }
}
