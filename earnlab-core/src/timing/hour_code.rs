//! Hour-code tiers: the provider's `bmo`/`amc` tags.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use super::{within_hour_code_history, TimingSource};
use crate::data::HourCalendar;
use crate::domain::Timing;

/// Map a provider hour code onto a timing verdict.
///
/// `dmh` (during market hours) and empty codes carry no usable signal.
pub fn map_hour_code(hour: &str) -> Timing {
    match hour.trim().to_ascii_lowercase().as_str() {
        "bmo" => Timing::BeforeOpen,
        "amc" => Timing::AfterClose,
        _ => Timing::Unknown,
    }
}

/// Single-pair lookup against the hour-code calendar.
///
/// Used when the bulk pre-warm had nothing for a recent event. Dates older
/// than the provider's history never reach upstream.
pub struct HourCodeLookup {
    calendar: Arc<dyn HourCalendar>,
    today: NaiveDate,
}

impl HourCodeLookup {
    pub fn new(calendar: Arc<dyn HourCalendar>, today: NaiveDate) -> Self {
        Self { calendar, today }
    }
}

impl TimingSource for HourCodeLookup {
    fn name(&self) -> &'static str {
        "hour_code_lookup"
    }

    fn lookup(&self, symbol: &str, date: NaiveDate) -> Timing {
        if !within_hour_code_history(date, self.today) {
            return Timing::Unknown;
        }

        let from = date - Duration::days(1);
        let to = date + Duration::days(1);
        match self.calendar.calendar_with_hour(from, to) {
            Ok(entries) => entries
                .iter()
                .find(|e| e.symbol == symbol && e.date == date)
                .map(|e| map_hour_code(&e.hour))
                .unwrap_or(Timing::Unknown),
            Err(e) => {
                debug!(symbol, %date, error = %e, "hour-code lookup failed");
                Timing::Unknown
            }
        }
    }
}
