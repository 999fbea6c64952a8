//! Market-cap filter with process-lifetime caches.
//!
//! Two caches live on the filter: the screened symbol set per distinct
//! market-cap floor, and company profiles per symbol. Both are `DashMap`s so
//! concurrent lookups populate them without a global lock. Two threads
//! racing on the same key both call upstream and write identical values.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::data::{DataError, Screener};
use crate::domain::CompanyProfile;

/// Upstream rate limits allow about this many profile lookups in flight.
pub const DEFAULT_PROFILE_CONCURRENCY: usize = 10;

pub struct MarketCapFilter {
    screener: Arc<dyn Screener>,
    large_caps: DashMap<u64, Arc<HashSet<String>>>,
    profiles: DashMap<String, CompanyProfile>,
    concurrency: usize,
}

impl MarketCapFilter {
    pub fn new(screener: Arc<dyn Screener>) -> Self {
        Self::with_concurrency(screener, DEFAULT_PROFILE_CONCURRENCY)
    }

    pub fn with_concurrency(screener: Arc<dyn Screener>, concurrency: usize) -> Self {
        Self {
            screener,
            large_caps: DashMap::new(),
            profiles: DashMap::new(),
            concurrency: concurrency.max(1),
        }
    }

    /// Symbols above `min_cap`, memoized per distinct floor.
    ///
    /// An upstream failure yields an empty set and is not memoized. Callers
    /// must read empty as "unfiltered", not "nothing qualifies".
    pub fn large_cap_symbols(&self, min_cap: f64) -> Arc<HashSet<String>> {
        let key = min_cap.to_bits();
        if let Some(hit) = self.large_caps.get(&key) {
            return Arc::clone(hit.value());
        }

        match self.screener.screen(min_cap) {
            Ok(symbols) => {
                let set: Arc<HashSet<String>> = Arc::new(symbols.into_iter().collect());
                debug!(min_cap, count = set.len(), "screened large caps");
                self.large_caps.insert(key, Arc::clone(&set));
                set
            }
            Err(e) => {
                warn!(min_cap, error = %e, "screener unavailable, continuing unfiltered");
                Arc::new(HashSet::new())
            }
        }
    }

    /// Company profile for `symbol`, cached on success.
    pub fn profile(&self, symbol: &str) -> Result<Option<CompanyProfile>, DataError> {
        if let Some(hit) = self.profiles.get(symbol) {
            return Ok(Some(hit.value().clone()));
        }
        let fetched = self.screener.profile(symbol)?;
        if let Some(p) = &fetched {
            self.profiles.insert(symbol.to_string(), p.clone());
        }
        Ok(fetched)
    }

    /// Profiles for many symbols with at most `concurrency` lookups in flight.
    ///
    /// Symbols whose lookup fails or returns nothing are left out of the map.
    pub fn batch_profiles(&self, symbols: &[String]) -> HashMap<String, CompanyProfile> {
        let fetch_one = |symbol: &String| match self.profile(symbol) {
            Ok(Some(p)) => Some((symbol.clone(), p)),
            Ok(None) => {
                debug!(%symbol, "no profile");
                None
            }
            Err(e) => {
                debug!(%symbol, error = %e, "profile lookup failed");
                None
            }
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .build()
        {
            Ok(pool) => pool.install(|| symbols.par_iter().filter_map(fetch_one).collect()),
            Err(e) => {
                warn!(error = %e, "profile pool unavailable, fetching sequentially");
                symbols.iter().filter_map(fetch_one).collect()
            }
        }
    }

    /// Number of memoized market-cap floors.
    pub fn cached_floors(&self) -> usize {
        self.large_caps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingScreener {
        screens: AtomicUsize,
        profiles: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_screen: bool,
    }

    impl CountingScreener {
        fn new(fail_screen: bool) -> Self {
            Self {
                screens: AtomicUsize::new(0),
                profiles: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_screen,
            }
        }
    }

    impl Screener for CountingScreener {
        fn screen(&self, min_market_cap: f64) -> Result<Vec<String>, DataError> {
            self.screens.fetch_add(1, Ordering::SeqCst);
            if self.fail_screen {
                return Err(DataError::NetworkUnreachable("down".into()));
            }
            if min_market_cap > 1e12 {
                Ok(vec!["AAPL".into()])
            } else {
                Ok(vec!["AAPL".into(), "KEYS".into()])
            }
        }

        fn profile(&self, symbol: &str) -> Result<Option<CompanyProfile>, DataError> {
            self.profiles.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match symbol {
                "FAIL" => Err(DataError::Http {
                    status: 500,
                    endpoint: "profile".into(),
                }),
                "NONE" => Ok(None),
                _ => Ok(Some(CompanyProfile {
                    symbol: symbol.to_string(),
                    company_name: format!("{symbol} Corp"),
                    market_cap: 5e9,
                    sector: None,
                    industry: None,
                })),
            }
        }
    }

    #[test]
    fn large_caps_are_memoized_per_floor() {
        let screener = Arc::new(CountingScreener::new(false));
        let filter = MarketCapFilter::new(screener.clone());

        assert_eq!(filter.large_cap_symbols(1e9).len(), 2);
        assert_eq!(filter.large_cap_symbols(1e9).len(), 2);
        assert_eq!(screener.screens.load(Ordering::SeqCst), 1);

        assert_eq!(filter.large_cap_symbols(2e12).len(), 1);
        assert_eq!(screener.screens.load(Ordering::SeqCst), 2);
        assert_eq!(filter.cached_floors(), 2);
    }

    #[test]
    fn screener_failure_is_empty_and_not_memoized() {
        let screener = Arc::new(CountingScreener::new(true));
        let filter = MarketCapFilter::new(screener.clone());

        assert!(filter.large_cap_symbols(1e9).is_empty());
        assert!(filter.large_cap_symbols(1e9).is_empty());
        assert_eq!(screener.screens.load(Ordering::SeqCst), 2);
        assert_eq!(filter.cached_floors(), 0);
    }

    #[test]
    fn batch_profiles_drops_failures_and_missing() {
        let screener = Arc::new(CountingScreener::new(false));
        let filter = MarketCapFilter::new(screener);
        let symbols: Vec<String> = ["AAPL", "FAIL", "NONE", "KEYS"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let profiles = filter.batch_profiles(&symbols);
        assert_eq!(profiles.len(), 2);
        assert!(profiles.contains_key("AAPL"));
        assert!(profiles.contains_key("KEYS"));
    }

    #[test]
    fn batch_profiles_respects_concurrency_ceiling() {
        let screener = Arc::new(CountingScreener::new(false));
        let filter = MarketCapFilter::with_concurrency(screener.clone(), 3);
        let symbols: Vec<String> = (0..30).map(|i| format!("S{i}")).collect();

        let profiles = filter.batch_profiles(&symbols);
        assert_eq!(profiles.len(), 30);
        assert!(screener.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn profiles_are_cached_after_success() {
        let screener = Arc::new(CountingScreener::new(false));
        let filter = MarketCapFilter::new(screener.clone());

        filter.profile("AAPL").unwrap();
        filter.profile("AAPL").unwrap();
        assert_eq!(screener.profiles.load(Ordering::SeqCst), 1);
    }
}
