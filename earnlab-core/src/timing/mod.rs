//! Announcement-timing classification.
//!
//! A [`TimingClassifier`] runs an ordered waterfall of [`TimingSource`]
//! tiers for each (symbol, date) and stops at the first known verdict.
//! The bulk hour-code calendar pre-warms the classifier's cache through
//! [`TimingClassifier::batch_classify`], so most events never reach the
//! per-pair tiers.
//!
//! A classifier is meant to live for a single request. Its cache holds
//! every verdict it has produced, including `Unknown`.

pub mod hour_code;
pub mod transcript;

pub use hour_code::{map_hour_code, HourCodeLookup};
pub use transcript::{candidate_quarters, classify_transcript, TranscriptHeuristic};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::data::{EarningsCalendar, HourCalendar};
use crate::domain::{EventKey, Timing};

/// How far back the hour-code provider keeps history.
pub const HOUR_CODE_HISTORY_DAYS: i64 = 30;

/// Earliest date the hour-code provider can answer for.
pub fn hour_code_window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(HOUR_CODE_HISTORY_DAYS)
}

/// True when `date` is recent enough for the hour-code provider.
/// Future dates count as recent.
pub fn within_hour_code_history(date: NaiveDate, today: NaiveDate) -> bool {
    date >= hour_code_window_start(today)
}

/// One tier of the waterfall. `Unknown` means "no opinion".
pub trait TimingSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn lookup(&self, symbol: &str, date: NaiveDate) -> Timing;
}

pub struct TimingClassifier {
    sources: Vec<Box<dyn TimingSource>>,
    hours: Option<Arc<dyn HourCalendar>>,
    cache: DashMap<EventKey, Timing>,
    today: NaiveDate,
}

impl TimingClassifier {
    /// An empty classifier: no tiers, no bulk calendar.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            sources: Vec::new(),
            hours: None,
            cache: DashMap::new(),
            today,
        }
    }

    /// The production waterfall: hour-code lookup (when an hour calendar is
    /// configured) followed by the transcript heuristic.
    pub fn standard(
        calendar: Arc<dyn EarningsCalendar>,
        hours: Option<Arc<dyn HourCalendar>>,
        today: NaiveDate,
    ) -> Self {
        let mut classifier = Self::new(today);
        if let Some(hours) = hours {
            classifier = classifier
                .with_source(Box::new(HourCodeLookup::new(Arc::clone(&hours), today)))
                .with_hour_calendar(hours);
        }
        classifier.with_source(Box::new(TranscriptHeuristic::new(calendar)))
    }

    /// Append a tier. Tiers run in insertion order.
    pub fn with_source(mut self, source: Box<dyn TimingSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Calendar used by [`batch_classify`](Self::batch_classify).
    pub fn with_hour_calendar(mut self, hours: Arc<dyn HourCalendar>) -> Self {
        self.hours = Some(hours);
        self
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Pre-warm the cache from the bulk hour-code calendar.
    ///
    /// Only the part of `[start, end]` the provider can answer for is
    /// queried. Returns the known verdicts keyed `SYMBOL_YYYY-MM-DD`; an
    /// empty intersection or an upstream failure yields an empty map.
    pub fn batch_classify(&self, start: NaiveDate, end: NaiveDate) -> HashMap<String, Timing> {
        let mut verdicts = HashMap::new();
        let Some(hours) = &self.hours else {
            return verdicts;
        };

        let from = start.max(hour_code_window_start(self.today));
        let to = end.min(self.today);
        if from > to {
            debug!(%start, %end, "range outside hour-code history, skipping bulk lookup");
            return verdicts;
        }

        let entries = match hours.calendar_with_hour(from, to) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(%from, %to, error = %e, "bulk hour-code lookup failed");
                return verdicts;
            }
        };

        for entry in entries {
            let Some(timing) = map_hour_code(&entry.hour).known() else {
                continue;
            };
            let key = EventKey::new(&entry.symbol, entry.date);
            verdicts.insert(key.to_string(), timing);
            self.cache.insert(key, timing);
        }

        debug!(%from, %to, known = verdicts.len(), "pre-warmed timing cache");
        verdicts
    }

    /// Classify one announcement. Never fails; `Unknown` is a valid answer.
    pub fn classify(&self, symbol: &str, date: NaiveDate) -> Timing {
        let key = EventKey::new(symbol, date);
        if let Some(hit) = self.cache.get(&key) {
            return *hit;
        }

        let mut verdict = Timing::Unknown;
        for source in &self.sources {
            let timing = source.lookup(symbol, date);
            if timing.is_known() {
                debug!(symbol, %date, source = source.name(), %timing, "classified");
                verdict = timing;
                break;
            }
        }

        self.cache.insert(key, verdict);
        verdict
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
