//! Transcript heuristic: infer session timing from how a call opens.
//!
//! Operators greet the audience for the time of day ("good morning" for a
//! pre-market call) and often announce the call's clock time. Only the start
//! of the transcript is scanned; later mentions are usually about other
//! events.

use std::sync::{Arc, OnceLock};

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tracing::debug;

use super::TimingSource;
use crate::data::EarningsCalendar;
use crate::domain::Timing;

/// Characters of transcript text inspected.
pub const TRANSCRIPT_SCAN_CHARS: usize = 2000;

fn clock_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(\d{1,2})[:.](\d{2})\s*(a\.?m\.?|p\.?m\.?)")
                .expect("valid clock-time pattern"),
            Regex::new(r"at\s+(\d{1,2})[:.](\d{2})\s*(a\.?m\.?|p\.?m\.?)")
                .expect("valid clock-time pattern"),
        ]
    })
}

/// The two fiscal quarters whose call most plausibly falls in `date`'s month.
///
/// Q1 results come out in Apr/May, Q2 in Jul/Aug, Q3 in Oct/Nov and Q4 in
/// Jan/Feb of the following year.
pub fn candidate_quarters(date: NaiveDate) -> [(i32, u8); 2] {
    let year = date.year();
    match date.month() {
        1 | 2 => [(year - 1, 4), (year, 1)],
        4 | 5 => [(year, 1), (year, 2)],
        7 | 8 => [(year, 2), (year, 3)],
        10 | 11 => [(year, 3), (year, 4)],
        month => {
            let quarter = ((month - 1) / 3 + 1) as u8;
            let previous = if quarter > 1 { quarter - 1 } else { 4 };
            [(year, quarter), (year, previous)]
        }
    }
}

/// Classify from transcript text alone.
pub fn classify_transcript(text: &str) -> Timing {
    let head: String = text
        .chars()
        .take(TRANSCRIPT_SCAN_CHARS)
        .collect::<String>()
        .to_lowercase();

    if head.contains("good morning") {
        return Timing::BeforeOpen;
    }
    if head.contains("good afternoon") || head.contains("good evening") {
        return Timing::AfterClose;
    }

    for pattern in clock_patterns() {
        let Some(caps) = pattern.captures(&head) else {
            continue;
        };
        let Ok(hour) = caps[1].parse::<u32>() else {
            continue;
        };
        let timing = classify_clock_time(hour, caps[3].starts_with('a'));
        if timing.is_known() {
            return timing;
        }
    }

    Timing::Unknown
}

/// 6–9 AM is pre-market Eastern. Afternoon hours cover 4–8 PM Eastern and
/// 1–4 PM Pacific; 9–11 PM is left unclassified.
fn classify_clock_time(hour: u32, is_am: bool) -> Timing {
    if is_am {
        if (6..=9).contains(&hour) {
            return Timing::BeforeOpen;
        }
    } else if hour >= 12 || (1..=8).contains(&hour) {
        return Timing::AfterClose;
    }
    Timing::Unknown
}

/// Last tier of the waterfall: fetch candidate transcripts and scan them.
pub struct TranscriptHeuristic {
    calendar: Arc<dyn EarningsCalendar>,
}

impl TranscriptHeuristic {
    pub fn new(calendar: Arc<dyn EarningsCalendar>) -> Self {
        Self { calendar }
    }
}

impl TimingSource for TranscriptHeuristic {
    fn name(&self) -> &'static str {
        "transcript"
    }

    fn lookup(&self, symbol: &str, date: NaiveDate) -> Timing {
        for (year, quarter) in candidate_quarters(date) {
            match self.calendar.transcript(symbol, year, quarter) {
                Ok(Some(text)) => {
                    let timing = classify_transcript(&text);
                    if timing.is_known() {
                        return timing;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(symbol, year, quarter, error = %e, "transcript unavailable");
                }
            }
        }
        Timing::Unknown
    }
}
