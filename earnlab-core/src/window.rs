//! Price-window resolution around an announcement date.
//!
//! Given the bars near an earnings date and a timing verdict, pick which two
//! closes measure the market's reaction:
//! - BeforeOpen: prior trading day close vs. announcement day close
//! - AfterClose: announcement day close vs. next trading day close
//!
//! Neighbouring trading days are searched at most [`MAX_GAP_DAYS`] calendar
//! days away, which covers weekends and holiday clusters. Strict resolution
//! never guesses: unknown timing is insufficient. Callers that accept a
//! best-effort comparison opt in through [`resolve_assuming_after_close`].

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::domain::{Bar, PricePoint, PriceWindow, Timing};

/// Furthest a neighbouring trading day may sit from the event date.
pub const MAX_GAP_DAYS: i64 = 5;

/// Why a window could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("no bar on the announcement date")]
    NoEventDayBar,
    #[error("no trading day in the 5 days before the announcement")]
    NoPriorBar,
    #[error("no trading day in the 5 days after the announcement")]
    NoFollowingBar,
    #[error("announcement timing unknown")]
    UnknownTiming,
}

/// The three bars a resolution can draw from.
struct Neighbourhood {
    day_of: Option<PricePoint>,
    day_before: Option<PricePoint>,
    day_after: Option<PricePoint>,
}

impl Neighbourhood {
    fn around(event_date: NaiveDate, bars: &[Bar]) -> Self {
        let by_date: BTreeMap<NaiveDate, PricePoint> = bars
            .iter()
            .filter(|b| !b.is_void())
            .map(|b| (b.date, b.price_point()))
            .collect();

        let nearest = |direction: i64| {
            (1..=MAX_GAP_DAYS)
                .find_map(|offset| by_date.get(&(event_date + Duration::days(direction * offset))))
                .copied()
        };

        Self {
            day_of: by_date.get(&event_date).copied(),
            day_before: nearest(-1),
            day_after: nearest(1),
        }
    }
}

/// Resolve the comparison pair for an announcement with a timing verdict.
pub fn resolve(
    event_date: NaiveDate,
    bars: &[Bar],
    timing: Timing,
) -> Result<PriceWindow, WindowError> {
    let n = Neighbourhood::around(event_date, bars);

    // Announced on a non-trading day: the session gap already straddles it,
    // but only a known timing makes the pair meaningful.
    if n.day_of.is_none() {
        if let Some(after) = n.day_after {
            if !timing.is_known() {
                return Err(WindowError::UnknownTiming);
            }
            let before = n.day_before.ok_or(WindowError::NoPriorBar)?;
            return Ok(PriceWindow {
                timing,
                before,
                after,
            });
        }
    }

    let day_of = n.day_of.ok_or(WindowError::NoEventDayBar)?;
    let day_before = n.day_before.ok_or(WindowError::NoPriorBar)?;

    match timing {
        Timing::Unknown => Err(WindowError::UnknownTiming),
        Timing::BeforeOpen => Ok(PriceWindow {
            timing,
            before: day_before,
            after: day_of,
        }),
        Timing::AfterClose => {
            let after = n.day_after.ok_or(WindowError::NoFollowingBar)?;
            Ok(PriceWindow {
                timing,
                before: day_of,
                after,
            })
        }
    }
}

/// Best-effort pair ignoring timing: the announcement day (or the nearest
/// prior trading day) against the next trading day.
///
/// The result always carries `Timing::Unknown`.
pub fn resolve_assuming_after_close(
    event_date: NaiveDate,
    bars: &[Bar],
) -> Result<PriceWindow, WindowError> {
    let n = Neighbourhood::around(event_date, bars);
    let before = n.day_of.or(n.day_before).ok_or(WindowError::NoPriorBar)?;
    let after = n.day_after.ok_or(WindowError::NoFollowingBar)?;
    Ok(PriceWindow {
        timing: Timing::Unknown,
        before,
        after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, close: f64) -> Bar {
        Bar {
            symbol: "AAPL".into(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    /// Thu 2024-05-02 announcement with Wed/Thu/Fri bars.
    fn midweek() -> Vec<Bar> {
        vec![
            bar(d(2024, 5, 1), 169.0),
            bar(d(2024, 5, 2), 170.0),
            bar(d(2024, 5, 3), 190.0),
        ]
    }

    #[test]
    fn before_open_compares_prior_close_to_same_day() {
        let w = resolve(d(2024, 5, 2), &midweek(), Timing::BeforeOpen).unwrap();
        assert_eq!(w.timing, Timing::BeforeOpen);
        assert_eq!(w.before.date, d(2024, 5, 1));
        assert_eq!(w.after.date, d(2024, 5, 2));
    }

    #[test]
    fn after_close_compares_same_day_to_next() {
        let w = resolve(d(2024, 5, 2), &midweek(), Timing::AfterClose).unwrap();
        assert_eq!(w.timing, Timing::AfterClose);
        assert_eq!(w.before.close, 170.0);
        assert_eq!(w.after.close, 190.0);
    }

    #[test]
    fn unknown_timing_never_resolves() {
        assert_eq!(
            resolve(d(2024, 5, 2), &midweek(), Timing::Unknown),
            Err(WindowError::UnknownTiming)
        );
    }

    #[test]
    fn after_close_without_next_day_is_insufficient() {
        let bars = vec![bar(d(2024, 5, 1), 169.0), bar(d(2024, 5, 2), 170.0)];
        assert_eq!(
            resolve(d(2024, 5, 2), &bars, Timing::AfterClose),
            Err(WindowError::NoFollowingBar)
        );
        // BeforeOpen does not need the next day
        assert!(resolve(d(2024, 5, 2), &bars, Timing::BeforeOpen).is_ok());
    }

    #[test]
    fn missing_prior_day_is_insufficient() {
        let bars = vec![bar(d(2024, 5, 2), 170.0), bar(d(2024, 5, 3), 190.0)];
        assert_eq!(
            resolve(d(2024, 5, 2), &bars, Timing::AfterClose),
            Err(WindowError::NoPriorBar)
        );
    }

    #[test]
    fn prior_day_skips_weekend() {
        // Monday 2024-05-06 announcement; previous bar is Friday.
        let bars = vec![
            bar(d(2024, 5, 3), 100.0),
            bar(d(2024, 5, 6), 110.0),
            bar(d(2024, 5, 7), 120.0),
        ];
        let w = resolve(d(2024, 5, 6), &bars, Timing::BeforeOpen).unwrap();
        assert_eq!(w.before.date, d(2024, 5, 3));
    }

    #[test]
    fn weekend_announcement_uses_straddling_days_with_known_timing() {
        // Saturday 2024-05-04
        let bars = vec![bar(d(2024, 5, 3), 100.0), bar(d(2024, 5, 6), 88.0)];
        let w = resolve(d(2024, 5, 4), &bars, Timing::AfterClose).unwrap();
        assert_eq!(w.timing, Timing::AfterClose);
        assert_eq!(w.before.date, d(2024, 5, 3));
        assert_eq!(w.after.date, d(2024, 5, 6));

        assert_eq!(
            resolve(d(2024, 5, 4), &bars, Timing::Unknown),
            Err(WindowError::UnknownTiming)
        );
    }

    #[test]
    fn weekend_announcement_without_prior_day_is_insufficient() {
        let bars = vec![bar(d(2024, 5, 6), 88.0)];
        assert_eq!(
            resolve(d(2024, 5, 4), &bars, Timing::BeforeOpen),
            Err(WindowError::NoPriorBar)
        );
    }

    #[test]
    fn neighbours_beyond_five_days_are_ignored() {
        let bars = vec![
            bar(d(2024, 4, 25), 100.0),
            bar(d(2024, 5, 1), 100.0),
            bar(d(2024, 5, 8), 150.0),
        ];
        // 2024-04-25 is 6 days before 2024-05-01
        assert_eq!(
            resolve(d(2024, 5, 1), &bars, Timing::BeforeOpen),
            Err(WindowError::NoPriorBar)
        );
        // 2024-05-08 is 7 days after
        assert_eq!(
            resolve_assuming_after_close(d(2024, 5, 1), &bars),
            Err(WindowError::NoFollowingBar)
        );
    }

    #[test]
    fn nearest_neighbour_wins() {
        let bars = vec![
            bar(d(2024, 4, 29), 90.0),
            bar(d(2024, 4, 30), 95.0),
            bar(d(2024, 5, 1), 100.0),
            bar(d(2024, 5, 2), 105.0),
            bar(d(2024, 5, 3), 110.0),
        ];
        let w = resolve(d(2024, 5, 1), &bars, Timing::BeforeOpen).unwrap();
        assert_eq!(w.before.close, 95.0);
        let w = resolve(d(2024, 5, 1), &bars, Timing::AfterClose).unwrap();
        assert_eq!(w.after.close, 105.0);
    }

    #[test]
    fn void_bars_are_not_trading_days() {
        let mut bars = midweek();
        bars[0].close = f64::NAN;
        assert_eq!(
            resolve(d(2024, 5, 2), &bars, Timing::BeforeOpen),
            Err(WindowError::NoPriorBar)
        );
    }

    #[test]
    fn fallback_uses_same_day_and_next() {
        let w = resolve_assuming_after_close(d(2024, 5, 2), &midweek()).unwrap();
        assert_eq!(w.timing, Timing::Unknown);
        assert_eq!(w.before.date, d(2024, 5, 2));
        assert_eq!(w.after.date, d(2024, 5, 3));
    }

    #[test]
    fn fallback_uses_prior_day_when_event_day_missing() {
        let bars = vec![bar(d(2024, 5, 3), 100.0), bar(d(2024, 5, 6), 88.0)];
        let w = resolve_assuming_after_close(d(2024, 5, 4), &bars).unwrap();
        assert_eq!(w.before.date, d(2024, 5, 3));
        assert_eq!(w.after.date, d(2024, 5, 6));
    }

    #[test]
    fn fallback_needs_a_following_day() {
        let bars = vec![bar(d(2024, 5, 1), 169.0), bar(d(2024, 5, 2), 170.0)];
        assert_eq!(
            resolve_assuming_after_close(d(2024, 5, 2), &bars),
            Err(WindowError::NoFollowingBar)
        );
    }

    #[test]
    fn unsorted_input_is_fine() {
        let mut bars = midweek();
        bars.reverse();
        let w = resolve(d(2024, 5, 2), &bars, Timing::AfterClose).unwrap();
        assert_eq!(w.after.date, d(2024, 5, 3));
    }
}
