//! In-memory market used by the engine integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use earnlab_core::data::{
    DataError, EarningsCalendar, HourCalendar, HourEntry, PriceSource, Screener,
};
use earnlab_core::domain::{Bar, CompanyProfile, EarningsEvent, ReactionRecord, TranscriptDate};
use earnlab_runner::config::EngineConfig;
use earnlab_runner::engine::{Providers, ReactionEngine};
use earnlab_runner::history::{HistoryError, HistoryStore, HistorySnapshot, HistorySummary};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Scriptable upstream: calendar, screener, prices and hour codes in one.
#[derive(Default)]
pub struct FakeMarket {
    pub events: Vec<EarningsEvent>,
    pub calendar_down: bool,
    pub transcript_dates: HashMap<String, Vec<TranscriptDate>>,
    pub transcripts: HashMap<(String, i32, u8), String>,
    /// `None` makes the screener fail.
    pub large_caps: Option<Vec<String>>,
    pub profiles: HashMap<String, CompanyProfile>,
    pub failing_profiles: HashSet<String>,
    pub bars: HashMap<String, Vec<Bar>>,
    pub failing_prices: HashSet<String>,
    pub hours: Vec<HourEntry>,
    /// Rows returned per hour-code query, like a truncated bulk response.
    pub hour_row_limit: Option<usize>,

    pub calendar_ranges: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    pub hour_ranges: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    pub price_calls: AtomicUsize,
    pub screen_calls: AtomicUsize,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self {
            large_caps: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn event(mut self, symbol: &str, date: NaiveDate) -> Self {
        self.events.push(EarningsEvent::new(symbol, date));
        self
    }

    pub fn profile(mut self, symbol: &str, market_cap: f64) -> Self {
        self.profiles.insert(
            symbol.to_string(),
            CompanyProfile {
                symbol: symbol.to_string(),
                company_name: format!("{symbol} Inc."),
                market_cap,
                sector: None,
                industry: None,
            },
        );
        self
    }

    pub fn closes(mut self, symbol: &str, closes: &[(NaiveDate, f64)]) -> Self {
        let bars = self.bars.entry(symbol.to_string()).or_default();
        for &(date, close) in closes {
            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000_000,
            });
        }
        self
    }

    pub fn hour(mut self, symbol: &str, date: NaiveDate, code: &str) -> Self {
        self.hours.push(HourEntry {
            symbol: symbol.to_string(),
            date,
            hour: code.to_string(),
        });
        self
    }

    pub fn hour_row_limit(mut self, limit: usize) -> Self {
        self.hour_row_limit = Some(limit);
        self
    }

    pub fn transcript(mut self, symbol: &str, year: i32, quarter: u8, text: &str) -> Self {
        self.transcripts
            .insert((symbol.to_string(), year, quarter), text.to_string());
        self
    }

    pub fn transcript_date(mut self, symbol: &str, date: NaiveDate, quarter: u8) -> Self {
        self.transcript_dates
            .entry(symbol.to_string())
            .or_default()
            .push(TranscriptDate {
                date,
                quarter: Some(quarter),
                fiscal_year: Some(date.year()),
            });
        self
    }

    pub fn large_caps(mut self, symbols: &[&str]) -> Self {
        self.large_caps = Some(symbols.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn screener_down(mut self) -> Self {
        self.large_caps = None;
        self
    }

    pub fn hour_calls(&self) -> usize {
        self.hour_ranges.lock().unwrap().len()
    }
}

impl EarningsCalendar for FakeMarket {
    fn earnings_calendar(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EarningsEvent>, DataError> {
        self.calendar_ranges.lock().unwrap().push((from, to));
        if self.calendar_down {
            return Err(DataError::NetworkUnreachable("calendar down".into()));
        }
        Ok(self
            .events
            .iter()
            .filter(|e| e.date >= from && e.date <= to)
            .cloned()
            .collect())
    }

    fn transcript_dates(&self, symbol: &str) -> Result<Vec<TranscriptDate>, DataError> {
        Ok(self.transcript_dates.get(symbol).cloned().unwrap_or_default())
    }

    fn transcript(
        &self,
        symbol: &str,
        year: i32,
        quarter: u8,
    ) -> Result<Option<String>, DataError> {
        Ok(self
            .transcripts
            .get(&(symbol.to_string(), year, quarter))
            .cloned())
    }
}

impl Screener for FakeMarket {
    fn screen(&self, _min_market_cap: f64) -> Result<Vec<String>, DataError> {
        self.screen_calls.fetch_add(1, Ordering::SeqCst);
        self.large_caps
            .clone()
            .ok_or_else(|| DataError::NetworkUnreachable("screener down".into()))
    }

    fn profile(&self, symbol: &str) -> Result<Option<CompanyProfile>, DataError> {
        if self.failing_profiles.contains(symbol) {
            return Err(DataError::Http {
                status: 500,
                endpoint: "profile".into(),
            });
        }
        Ok(self.profiles.get(symbol).cloned())
    }
}

impl PriceSource for FakeMarket {
    fn daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_prices.contains(symbol) {
            return Err(DataError::NetworkUnreachable("prices down".into()));
        }
        // Reverse order so callers must sort.
        Ok(self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .rev()
                    .filter(|b| b.date >= from && b.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl HourCalendar for FakeMarket {
    fn calendar_with_hour(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HourEntry>, DataError> {
        self.hour_ranges.lock().unwrap().push((from, to));
        Ok(self
            .hours
            .iter()
            .filter(|h| h.date >= from && h.date <= to)
            .take(self.hour_row_limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

pub fn engine(market: &Arc<FakeMarket>, today: NaiveDate) -> ReactionEngine {
    let providers = Providers {
        calendar: market.clone(),
        screener: market.clone(),
        prices: market.clone(),
        hours: Some(market.clone()),
    };
    ReactionEngine::new(providers, EngineConfig::default()).with_today(today)
}

/// History store that records saves in memory, or fails every call.
#[derive(Default)]
pub struct RecordingHistory {
    pub fail: bool,
    pub saves: Mutex<Vec<(String, Value, usize)>>,
}

impl HistoryStore for RecordingHistory {
    fn save(
        &self,
        query_type: &str,
        params: &Value,
        records: &[ReactionRecord],
    ) -> Result<String, HistoryError> {
        if self.fail {
            return Err(HistoryError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )));
        }
        let mut saves = self.saves.lock().unwrap();
        saves.push((query_type.to_string(), params.clone(), records.len()));
        Ok(format!("{query_type}/{}", saves.len()))
    }

    fn list(
        &self,
        _prefix: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<HistorySummary>, HistoryError> {
        Ok(Vec::new())
    }

    fn get(&self, _id: &str) -> Result<Option<HistorySnapshot>, HistoryError> {
        Ok(None)
    }

    fn delete(&self, _id: &str) -> Result<bool, HistoryError> {
        Ok(false)
    }
}
