//! EarnLab CLI: earnings reaction queries and saved-history management.
//!
//! Commands:
//! - `backtest`: significant reactions for every large-cap announcement in a date range
//! - `recent`: the same over the last N days
//! - `stock`: one symbol's reaction around a date
//! - `search`: every announcement of one symbol in a date range
//! - `history list|show|delete`: saved query results
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use earnlab_core::domain::ReactionRecord;
use earnlab_runner::history::{FileHistoryStore, HistoryStore, HistorySummary};
use earnlab_runner::engine::{MAX_RECENT_DAYS, MIN_RECENT_DAYS};
use earnlab_runner::{
    export_csv, export_json, AppConfig, EngineConfig, Providers, ReactionEngine, ReactionError,
};

#[derive(Parser)]
#[command(
    name = "earnlab",
    about = "EarnLab CLI: stock-price reactions to earnings announcements"
)]
struct Cli {
    /// Path to a TOML config file. Defaults plus FMP_API_KEY / FINNHUB_API_KEY otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Significant reactions for announcements between two dates.
    Backtest {
        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: NaiveDate,

        /// Market-cap floor in USD. Defaults to the configured value.
        #[arg(long)]
        min_market_cap: Option<f64>,

        /// Save the results to history.
        #[arg(long)]
        save: bool,
    },
    /// Significant reactions over the last N days (1-30).
    Recent {
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Market-cap floor in USD. Defaults to the configured value.
        #[arg(long)]
        min_market_cap: Option<f64>,

        /// Save the results to history.
        #[arg(long)]
        save: bool,
    },
    /// One symbol's reaction around a date.
    Stock {
        symbol: String,

        /// Announcement date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,
    },
    /// Every announcement of one symbol between two dates, newest first.
    Search {
        symbol: String,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,
    },
    /// Saved query results.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List saved results, newest first.
    List {
        /// Only ids starting with this prefix (e.g. `stock/AAPL`).
        #[arg(long)]
        prefix: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print one saved result.
    Show { id: String },
    /// Delete one saved result.
    Delete { id: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let format = cli.format;

    match cli.command {
        Commands::Backtest {
            start,
            end,
            min_market_cap,
            save,
        } => {
            if start > end {
                bail!("--start {start} is after --end {end}");
            }
            let settings = engine_config(&config, min_market_cap)?;
            let floor = settings.min_market_cap;
            let engine = build_engine(&config, settings)?;
            let records = engine.run_backtest(start, end, floor);
            if save {
                let params = json!({
                    "start_date": start.to_string(),
                    "end_date": end.to_string(),
                    "min_market_cap": floor,
                });
                save_results(&engine, &config, "custom", &params, &records);
            }
            print_records(&records, format)
        }
        Commands::Recent {
            days,
            min_market_cap,
            save,
        } => {
            let settings = engine_config(&config, min_market_cap)?;
            let floor = settings.min_market_cap;
            let engine = build_engine(&config, settings)?;
            let records = engine.recent(days, floor);
            if save {
                let days = days.clamp(MIN_RECENT_DAYS, MAX_RECENT_DAYS);
                let params = json!({ "days": days, "min_market_cap": floor });
                save_results(&engine, &config, "recent", &params, &records);
            }
            print_records(&records, format)
        }
        Commands::Stock { symbol, date } => {
            let engine = build_engine(&config, config.engine.clone())?;
            match engine.single_stock_reaction(&symbol, date) {
                Ok(record) => print_records(&[record], format),
                Err(ReactionError::NotFound { symbol, date }) => {
                    bail!("no reaction data for {symbol} around {date}")
                }
                Err(e) => Err(anyhow::Error::new(e).context("single-stock lookup failed")),
            }
        }
        Commands::Search { symbol, start, end } => {
            if start > end {
                bail!("--start {start} is after --end {end}");
            }
            let engine = build_engine(&config, config.engine.clone())?;
            print_records(&engine.search_stock_history(&symbol, start, end), format)
        }
        Commands::History { action } => {
            let store = FileHistoryStore::new(&config.history.dir);
            run_history(&store, action, format)
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let config = AppConfig::from_env();
            config.validate()?;
            config
        }
    };
    if config.providers.fmp_api_key.is_empty() {
        tracing::warn!("no FMP API key configured; upstream calls will be rejected");
    }
    if !config.providers.hour_codes_enabled() {
        tracing::info!("no Finnhub API key; timing falls back to transcripts only");
    }
    Ok(config)
}

/// Engine settings with the command-line market-cap floor applied.
fn engine_config(config: &AppConfig, min_market_cap: Option<f64>) -> Result<EngineConfig> {
    let mut engine = config.engine.clone();
    if let Some(floor) = min_market_cap {
        engine.min_market_cap = floor;
    }
    engine.validate().context("invalid engine settings")?;
    Ok(engine)
}

fn build_engine(config: &AppConfig, settings: EngineConfig) -> Result<ReactionEngine> {
    let providers = Providers::from_config(config).context("building provider clients")?;
    let mut engine = ReactionEngine::new(providers, settings);
    if config.history.enabled {
        engine = engine.with_history(Arc::new(FileHistoryStore::new(&config.history.dir)));
    }
    Ok(engine)
}

fn save_results(
    engine: &ReactionEngine,
    config: &AppConfig,
    query_type: &str,
    params: &serde_json::Value,
    records: &[ReactionRecord],
) {
    if !config.history.enabled {
        tracing::warn!("history is disabled in config; --save ignored");
        return;
    }
    if records.is_empty() {
        return;
    }
    if let Some(id) = engine.record_history(query_type, params, records) {
        tracing::info!(id = %id, "results saved");
    }
}

fn run_history(
    store: &FileHistoryStore,
    action: HistoryAction,
    format: OutputFormat,
) -> Result<()> {
    match action {
        HistoryAction::List { prefix, limit } => {
            let summaries = store.list(prefix.as_deref(), limit)?;
            match format {
                OutputFormat::Table => print_summaries(&summaries),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&summaries)?)
                }
                OutputFormat::Csv => bail!("history list supports table or json output"),
            }
            Ok(())
        }
        HistoryAction::Show { id } => {
            let Some(snapshot) = store.get(&id)? else {
                bail!("no saved result with id '{id}'");
            };
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }
            if format == OutputFormat::Table {
                println!(
                    "{} ({} records, saved {})",
                    snapshot.query_type, snapshot.count, snapshot.timestamp
                );
                println!("params: {}", snapshot.params);
                println!();
            }
            print_records(&snapshot.results, format)
        }
        HistoryAction::Delete { id } => {
            if store.delete(&id)? {
                println!("deleted {id}");
                Ok(())
            } else {
                bail!("no saved result with id '{id}'")
            }
        }
    }
}

// ── Output ───────────────────────────────────────────────────────────

fn print_records(records: &[ReactionRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", export_json(records)?),
        OutputFormat::Csv => print!("{}", export_csv(records)?),
        OutputFormat::Table => print_table(records),
    }
    Ok(())
}

fn print_table(records: &[ReactionRecord]) {
    if records.is_empty() {
        println!("No results.");
        return;
    }

    println!(
        "{:<8} {:<28} {:>10} {:<10} {:<7} {:>10} {:>10} {:>8}  {:<10} {:<10}",
        "Symbol", "Company", "Mkt Cap", "Date", "Timing", "Before", "After", "Change", "From", "To"
    );
    for r in records {
        println!(
            "{:<8} {:<28} {:>10} {:<10} {:<7} {:>10.2} {:>10.2} {:>7.2}%  {:<10} {:<10}",
            r.symbol,
            truncate(&r.company_name, 28),
            format_cap(r.market_cap),
            r.earnings_date,
            r.earnings_time.map(|t| t.code()).unwrap_or("-"),
            r.price_before,
            r.price_after,
            r.price_change_pct * 100.0,
            r.date_before,
            r.date_after,
        );
    }
    println!();
    println!("{} result(s)", records.len());
}

fn print_summaries(summaries: &[HistorySummary]) {
    if summaries.is_empty() {
        println!("No saved results.");
        return;
    }
    println!("{:<48} {:<8} {:>6}  {}", "Id", "Type", "Count", "Saved");
    for s in summaries {
        println!(
            "{:<48} {:<8} {:>6}  {}",
            s.id, s.query_type, s.count, s.timestamp
        );
    }
}

fn format_cap(cap: f64) -> String {
    if cap >= 1e12 {
        format!("{:.2}T", cap / 1e12)
    } else if cap >= 1e9 {
        format!("{:.2}B", cap / 1e9)
    } else {
        format!("{:.0}M", cap / 1e6)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}
