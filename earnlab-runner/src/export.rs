//! Export: JSON and CSV renderings of reaction records.

use anyhow::{Context, Result};
use earnlab_core::domain::ReactionRecord;

/// CSV columns, in record field order.
pub const CSV_HEADER: [&str; 10] = [
    "symbol",
    "company_name",
    "market_cap",
    "earnings_date",
    "earnings_time",
    "price_before",
    "price_after",
    "price_change_pct",
    "date_before",
    "date_after",
];

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize records to pretty JSON.
pub fn export_json(records: &[ReactionRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("failed to serialize records to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export records as CSV. Unknown timing is an empty cell.
pub fn export_csv(records: &[ReactionRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for r in records {
        wtr.write_record([
            r.symbol.clone(),
            r.company_name.clone(),
            format!("{:.0}", r.market_cap),
            r.earnings_date.to_string(),
            r.earnings_time.map(|t| t.code().to_string()).unwrap_or_default(),
            format!("{:.2}", r.price_before),
            format!("{:.2}", r.price_after),
            format!("{:.4}", r.price_change_pct),
            r.date_before.to_string(),
            r.date_after.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}
