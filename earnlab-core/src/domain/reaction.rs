//! ReactionRecord: the price reaction to one earnings announcement.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::PricePoint;
use super::profile::CompanyProfile;
use super::timing::Timing;

/// Default significance threshold: a 10% move in either direction.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 0.10;

/// The chosen comparison pair for one announcement.
///
/// Invariant: `before.date < after.date`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceWindow {
    pub timing: Timing,
    pub before: PricePoint,
    pub after: PricePoint,
}

impl PriceWindow {
    /// Unrounded signed change from `before` to `after`.
    pub fn raw_change(&self) -> f64 {
        (self.after.close - self.before.close) / self.before.close
    }
}

/// Output record: one announcement, one price pair, one signed change.
///
/// Field names match the persisted JSON so history snapshots stay readable
/// without this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub symbol: String,
    pub company_name: String,
    pub market_cap: f64,
    pub earnings_date: NaiveDate,
    /// `None` when timing could not be determined.
    pub earnings_time: Option<Timing>,
    pub price_before: f64,
    pub price_after: f64,
    pub price_change_pct: f64,
    pub date_before: NaiveDate,
    pub date_after: NaiveDate,
}

impl ReactionRecord {
    pub fn from_window(
        profile: &CompanyProfile,
        symbol: &str,
        earnings_date: NaiveDate,
        window: &PriceWindow,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            company_name: profile.company_name.clone(),
            market_cap: profile.market_cap,
            earnings_date,
            earnings_time: window.timing.known(),
            price_before: window.before.close,
            price_after: window.after.close,
            price_change_pct: round4(window.raw_change()),
            date_before: window.before.date,
            date_after: window.after.date,
        }
    }

    pub fn abs_change(&self) -> f64 {
        self.price_change_pct.abs()
    }
}

/// Round to 4 decimal places, exact halves to even.
///
/// The tie test runs on the scaled value, so a change whose decimal form is
/// a half but whose binary form is not rounds to nearest.
pub fn round4(x: f64) -> f64 {
    let scaled = x * 10_000.0;
    let mut rounded = scaled.round();
    if (scaled - scaled.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded -= scaled.signum();
    }
    rounded / 10_000.0
}

/// Whether `x` already sits on the 4-decimal grid `round4` produces.
pub fn is_four_decimal(x: f64) -> bool {
    round4(x) == x
}

/// Whether a raw change clears the significance threshold (inclusive).
pub fn is_significant(raw_change: f64, threshold: f64) -> bool {
    raw_change.abs() >= threshold
}
