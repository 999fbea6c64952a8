//! Property tests for result-list invariants.
//!
//! Uses proptest to verify:
//! 1. Magnitude ordering: records sorted by |change| descending
//! 2. Stability: equal magnitudes keep their first-seen order
//! 3. Dedup: no two events share (symbol, date) and first occurrences survive

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use earnlab_core::domain::{round4, EarningsEvent, ReactionRecord, Timing};
use earnlab_runner::engine::{dedup_events, sort_by_magnitude};

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn arb_change() -> impl Strategy<Value = f64> {
    // Coarse grid so ties are common.
    (-40i32..=40).prop_map(|bp| round4(bp as f64 / 100.0))
}

fn arb_records() -> impl Strategy<Value = Vec<ReactionRecord>> {
    prop::collection::vec(arb_change(), 0..40).prop_map(|changes| {
        changes
            .into_iter()
            .enumerate()
            .map(|(i, change)| ReactionRecord {
                symbol: format!("S{i:03}"),
                company_name: String::new(),
                market_cap: 1e10,
                earnings_date: base_date(),
                earnings_time: Some(Timing::AfterClose),
                price_before: 100.0,
                price_after: 100.0 * (1.0 + change),
                price_change_pct: change,
                date_before: base_date(),
                date_after: base_date() + Duration::days(1),
            })
            .collect()
    })
}

fn arb_events() -> impl Strategy<Value = Vec<EarningsEvent>> {
    prop::collection::vec((0usize..4, 0i64..3), 0..30).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(s, offset)| {
                let symbol = ["AAPL", "MSFT", "NVDA", "AMZN"][s];
                EarningsEvent::new(symbol, base_date() + Duration::days(offset))
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn sorted_by_magnitude_and_stable(mut records in arb_records()) {
        sort_by_magnitude(&mut records);
        for pair in records.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.abs_change() >= b.abs_change());
            if a.abs_change() == b.abs_change() {
                // Symbols encode the original index.
                prop_assert!(a.symbol < b.symbol);
            }
        }
    }

    #[test]
    fn dedup_leaves_unique_keys_in_first_seen_order(events in arb_events()) {
        let out = dedup_events(events.clone());

        let keys: HashSet<_> = out.iter().map(|e| e.key()).collect();
        prop_assert_eq!(keys.len(), out.len());

        let all: HashSet<_> = events.iter().map(|e| e.key()).collect();
        prop_assert_eq!(all.len(), out.len());

        let mut seen = HashSet::new();
        let expected: Vec<_> = events
            .iter()
            .filter(|e| seen.insert(e.key()))
            .map(|e| e.key())
            .collect();
        let actual: Vec<_> = out.iter().map(|e| e.key()).collect();
        prop_assert_eq!(expected, actual);
    }
}
