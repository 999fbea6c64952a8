//! Reaction engine: orchestrates calendar, filters, timing and windows.
//!
//! A request fetches events fresh, filters them down to primary listings of
//! large caps, then evaluates every event on a dedicated rayon pool. Events
//! that lack a profile, bars, a timing verdict or a resolvable window are
//! dropped individually; one bad symbol never fails the request.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use rayon::prelude::*;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use earnlab_core::data::{
    is_primary_listing, DataError, EarningsCalendar, FinnhubClient, FmpClient, HourCalendar,
    PriceSource, Screener,
};
use earnlab_core::domain::{is_significant, Bar, CompanyProfile, EarningsEvent, ReactionRecord};
use earnlab_core::market_cap::MarketCapFilter;
use earnlab_core::timing::TimingClassifier;
use earnlab_core::window::{resolve, resolve_assuming_after_close};

use crate::config::{AppConfig, EngineConfig};
use crate::history::HistoryStore;

/// Bounds for the look-back of [`ReactionEngine::recent`].
pub const MIN_RECENT_DAYS: i64 = 1;
pub const MAX_RECENT_DAYS: i64 = 30;

/// Errors from the single-stock path. Batch operations never fail; they
/// drop what they cannot evaluate.
#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("no reaction found for {symbol} around {date}")]
    NotFound { symbol: String, date: NaiveDate },
    #[error("upstream error: {0}")]
    Upstream(#[from] DataError),
}

/// The upstream collaborators an engine needs.
#[derive(Clone)]
pub struct Providers {
    pub calendar: Arc<dyn EarningsCalendar>,
    pub screener: Arc<dyn Screener>,
    pub prices: Arc<dyn PriceSource>,
    /// `None` disables the hour-code tiers.
    pub hours: Option<Arc<dyn HourCalendar>>,
}

impl Providers {
    /// HTTP clients built from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, DataError> {
        let p = &config.providers;
        let fmp = Arc::new(FmpClient::with_base_url(
            p.fmp_base_url.clone(),
            p.fmp_api_key.clone(),
            p.timeout(),
        )?);
        let hours: Option<Arc<dyn HourCalendar>> = if p.hour_codes_enabled() {
            Some(Arc::new(FinnhubClient::with_base_url(
                p.finnhub_base_url.clone(),
                p.finnhub_api_key.clone(),
                p.timeout(),
            )?))
        } else {
            None
        };
        Ok(Self {
            calendar: fmp.clone(),
            screener: fmp.clone(),
            prices: fmp,
            hours,
        })
    }
}

pub struct ReactionEngine {
    calendar: Arc<dyn EarningsCalendar>,
    prices: Arc<dyn PriceSource>,
    hours: Option<Arc<dyn HourCalendar>>,
    caps: MarketCapFilter,
    config: EngineConfig,
    history: Option<Arc<dyn HistoryStore>>,
    today: Option<NaiveDate>,
    cancel: Option<Arc<AtomicBool>>,
}

impl ReactionEngine {
    pub fn new(providers: Providers, config: EngineConfig) -> Self {
        Self {
            calendar: providers.calendar,
            prices: providers.prices,
            hours: providers.hours,
            caps: MarketCapFilter::with_concurrency(providers.screener, config.profile_concurrency),
            config,
            history: None,
            today: None,
            cancel: None,
        }
    }

    /// Attach a history store; stock searches are saved to it.
    pub fn with_history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Once the flag is set, remaining per-event work is skipped.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// A fresh classifier; verdicts are cached for one request only.
    fn classifier(&self) -> TimingClassifier {
        TimingClassifier::standard(Arc::clone(&self.calendar), self.hours.clone(), self.today())
    }

    // ── Backtest ─────────────────────────────────────────────────────

    /// Significant reactions for all large-cap announcements in `[start, end]`,
    /// largest absolute move first.
    pub fn run_backtest(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        min_market_cap: f64,
    ) -> Vec<ReactionRecord> {
        let events = match self.calendar.earnings_calendar(start, end) {
            Ok(events) => events,
            Err(e) => {
                warn!(%start, %end, error = %e, "earnings calendar unavailable");
                return Vec::new();
            }
        };
        let fetched = events.len();

        let mut events: Vec<EarningsEvent> = events
            .into_iter()
            .filter(|e| is_primary_listing(&e.symbol))
            .collect();

        let large_caps = self.caps.large_cap_symbols(min_market_cap);
        if large_caps.is_empty() {
            debug!("no large-cap set, keeping all symbols");
        } else {
            events.retain(|e| large_caps.contains(&e.symbol));
        }

        let events = dedup_events(events);
        if events.is_empty() {
            info!(%start, %end, fetched, "no events to evaluate");
            return Vec::new();
        }

        let symbols = distinct_symbols(&events);
        let profiles = self.caps.batch_profiles(&symbols);

        let classifier = self.classifier();
        classifier.batch_classify(start, end);
        debug!(
            tiers = ?classifier.source_names(),
            prewarmed = classifier.cached(),
            cap_floors = self.caps.cached_floors(),
            "timing classifier ready"
        );

        let threshold = self.config.price_change_threshold;
        let mut records: Vec<ReactionRecord> = self
            .on_event_pool(&events, |event: &EarningsEvent| {
                self.evaluate_event(event, &profiles, &classifier, min_market_cap, threshold)
            })
            .into_iter()
            .flatten()
            .collect();

        sort_by_magnitude(&mut records);
        info!(
            %start, %end, fetched,
            evaluated = events.len(),
            significant = records.len(),
            "backtest complete"
        );
        records
    }

    /// `run_backtest` over the last `days` days, clamped to 1..=30.
    pub fn recent(&self, days: i64, min_market_cap: f64) -> Vec<ReactionRecord> {
        let days = days.clamp(MIN_RECENT_DAYS, MAX_RECENT_DAYS);
        let end = self.today();
        let start = end - Duration::days(days);
        self.run_backtest(start, end, min_market_cap)
    }

    fn evaluate_event(
        &self,
        event: &EarningsEvent,
        profiles: &HashMap<String, CompanyProfile>,
        classifier: &TimingClassifier,
        min_market_cap: f64,
        threshold: f64,
    ) -> Option<ReactionRecord> {
        let symbol = event.symbol.as_str();
        let date = event.date;

        let Some(profile) = profiles.get(symbol) else {
            debug!(symbol, %date, "dropped: no profile");
            return None;
        };
        if !profile.meets_cap(min_market_cap) {
            debug!(
                symbol, %date, market_cap = profile.market_cap,
                "dropped: below market-cap floor"
            );
            return None;
        }

        let bars = self.fetch_bars(symbol, date)?;
        let timing = classifier.classify(symbol, date);
        let window = match resolve(date, &bars, timing) {
            Ok(window) => window,
            Err(reason) => {
                debug!(symbol, %date, %timing, %reason, "dropped: window unresolved");
                return None;
            }
        };

        if !is_significant(window.raw_change(), threshold) {
            return None;
        }
        Some(ReactionRecord::from_window(profile, symbol, date, &window))
    }

    fn fetch_bars(&self, symbol: &str, date: NaiveDate) -> Option<Vec<Bar>> {
        match self.prices.prices_around(symbol, date) {
            Ok(bars) if bars.len() >= 2 => Some(bars),
            Ok(bars) => {
                debug!(symbol, %date, bars = bars.len(), "dropped: too few bars");
                None
            }
            Err(e) => {
                debug!(symbol, %date, error = %e, "dropped: price fetch failed");
                None
            }
        }
    }

    /// Map `f` over `events` on a pool of `event_concurrency` threads,
    /// preserving input order. Cancelled events map to `None`.
    fn on_event_pool<T, F>(&self, events: &[EarningsEvent], f: F) -> Vec<Option<T>>
    where
        T: Send,
        F: Fn(&EarningsEvent) -> Option<T> + Send + Sync,
    {
        let run = |event: &EarningsEvent| {
            if self.is_cancelled() {
                None
            } else {
                f(event)
            }
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.event_concurrency.max(1))
            .build()
        {
            Ok(pool) => pool.install(|| events.par_iter().map(run).collect()),
            Err(e) => {
                warn!(error = %e, "event pool unavailable, evaluating sequentially");
                events.iter().map(run).collect()
            }
        }
    }

    // ── Single stock ─────────────────────────────────────────────────

    /// Reaction for one symbol and date without timing classification:
    /// the close at or just before `date` against the next trading day's.
    /// Both sides look at most 5 calendar days away.
    pub fn single_stock_reaction(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<ReactionRecord, ReactionError> {
        let symbol = normalize_symbol(symbol);
        let not_found = || ReactionError::NotFound {
            symbol: symbol.clone(),
            date,
        };

        let profile = self.caps.profile(&symbol)?.ok_or_else(not_found)?;
        let bars = self.prices.prices_around(&symbol, date)?;
        if bars.len() < 2 {
            return Err(not_found());
        }
        let window = resolve_assuming_after_close(date, &bars).map_err(|reason| {
            debug!(symbol = %symbol, %date, %reason, "single-stock window unresolved");
            not_found()
        })?;

        Ok(ReactionRecord::from_window(&profile, &symbol, date, &window))
    }

    // ── Stock history ────────────────────────────────────────────────

    /// Every announcement of `symbol` in `[start, end]`, newest first.
    ///
    /// No significance threshold. Events whose timing cannot be settled fall
    /// back to comparing the announcement day with the next trading day.
    pub fn search_stock_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<ReactionRecord> {
        let symbol = normalize_symbol(symbol);

        let profile = match self.caps.profile(&symbol) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                info!(symbol = %symbol, "no profile, nothing to search");
                return Vec::new();
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "profile lookup failed");
                return Vec::new();
            }
        };

        let dates = match self.calendar.transcript_dates(&symbol) {
            Ok(dates) => dates,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "transcript dates unavailable");
                return Vec::new();
            }
        };

        let events = dedup_events(
            dates
                .into_iter()
                .filter(|d| d.date >= start && d.date <= end)
                .map(|d| d.into_event(&symbol))
                .collect(),
        );
        if events.is_empty() {
            return Vec::new();
        }

        let classifier = self.classifier();
        classifier.batch_classify(start, end);
        debug!(
            symbol = %symbol,
            tiers = ?classifier.source_names(),
            prewarmed = classifier.cached(),
            "timing classifier ready"
        );

        let mut records: Vec<ReactionRecord> = self
            .on_event_pool(&events, |event: &EarningsEvent| -> Option<ReactionRecord> {
                let bars = self.fetch_bars(&event.symbol, event.date)?;
                let timing = classifier.classify(&event.symbol, event.date);
                let window = resolve(event.date, &bars, timing)
                    .or_else(|_| resolve_assuming_after_close(event.date, &bars))
                    .ok()?;
                Some(ReactionRecord::from_window(&profile, &event.symbol, event.date, &window))
            })
            .into_iter()
            .flatten()
            .collect();

        records.sort_by(|a, b| b.earnings_date.cmp(&a.earnings_date));
        info!(
            symbol = %symbol, %start, %end, found = records.len(),
            "stock history search complete"
        );

        if !records.is_empty() {
            self.record_history(
                "stock",
                &json!({
                    "symbol": symbol,
                    "start_date": start.to_string(),
                    "end_date": end.to_string(),
                }),
                &records,
            );
        }
        records
    }

    /// Save to the attached history store, if any. Failures are logged and
    /// swallowed. Stock searches save automatically; callers opt in for the
    /// other queries.
    pub fn record_history(
        &self,
        query_type: &str,
        params: &serde_json::Value,
        records: &[ReactionRecord],
    ) -> Option<String> {
        let store = self.history.as_ref()?;
        match store.save(query_type, params, records) {
            Ok(id) => {
                debug!(id = %id, "history saved");
                Some(id)
            }
            Err(e) => {
                warn!(query_type, error = %e, "history save failed");
                None
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Collapse duplicate (symbol, date) pairs, keeping the first occurrence.
pub fn dedup_events(events: Vec<EarningsEvent>) -> Vec<EarningsEvent> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|e| seen.insert(e.key()))
        .collect()
}

fn distinct_symbols(events: &[EarningsEvent]) -> Vec<String> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter(|e| seen.insert(e.symbol.as_str()))
        .map(|e| e.symbol.clone())
        .collect()
}

/// Stable sort by absolute change, largest first. Ties keep input order.
pub fn sort_by_magnitude(records: &mut [ReactionRecord]) {
    records.sort_by(|a, b| b.abs_change().total_cmp(&a.abs_change()));
}
