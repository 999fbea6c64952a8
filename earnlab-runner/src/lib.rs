//! EarnLab Runner: reaction engine orchestration, configuration, history, export.
//!
//! This crate builds on `earnlab-core` to provide:
//! - The `ReactionEngine` (backtests, single-stock lookups, stock history search)
//! - TOML application configuration with environment overrides
//! - A file-backed history store for saved query results
//! - JSON and CSV export of reaction records

pub mod config;
pub mod engine;
pub mod export;
pub mod history;

pub use config::{AppConfig, ConfigError, EngineConfig, HistoryConfig, ProvidersConfig};
pub use engine::{Providers, ReactionEngine, ReactionError};
pub use export::{export_csv, export_json};
pub use history::{FileHistoryStore, HistoryError, HistorySnapshot, HistoryStore, HistorySummary};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn engine_is_send_sync() {
        assert_send::<ReactionEngine>();
        assert_sync::<ReactionEngine>();
    }

    #[test]
    fn history_store_is_send_sync() {
        assert_send::<FileHistoryStore>();
        assert_sync::<FileHistoryStore>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<AppConfig>();
        assert_sync::<AppConfig>();
    }
}
