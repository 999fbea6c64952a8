//! EarnLab Core: domain types, provider contracts, timing classification and
//! price-window resolution.
//!
//! This crate holds everything below the orchestration layer:
//! - Domain types (events, bars, profiles, timing verdicts, reaction records)
//! - Provider traits plus blocking HTTP clients for the calendar and hour-code APIs
//! - Market-cap filtering with per-process caches
//! - The timing waterfall (hour codes, then transcript heuristics)
//! - Trading-day window resolution around an announcement

pub mod data;
pub mod domain;
pub mod market_cap;
pub mod timing;
pub mod window;
