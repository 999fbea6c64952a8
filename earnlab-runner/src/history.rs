//! Saved query results.
//!
//! Each save stores the records of one query verbatim together with the
//! query parameters. Ids are slash-separated paths that group saves by query
//! kind, e.g. `stock/AAPL/20240601_153000`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use earnlab_core::domain::ReactionRecord;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O: {0}")]
    Io(#[from] io::Error),
    #[error("history serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid history id '{0}'")]
    InvalidId(String),
}

/// One saved query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub query_type: String,
    pub params: serde_json::Value,
    pub results: Vec<ReactionRecord>,
    pub timestamp: NaiveDateTime,
    pub count: usize,
}

/// Listing entry: everything but the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub id: String,
    pub query_type: String,
    pub params: serde_json::Value,
    pub timestamp: NaiveDateTime,
    pub count: usize,
}

/// Persistence collaborator for query results.
pub trait HistoryStore: Send + Sync {
    /// Store `records` and return the new snapshot id.
    fn save(
        &self,
        query_type: &str,
        params: &serde_json::Value,
        records: &[ReactionRecord],
    ) -> Result<String, HistoryError>;

    /// Newest first, optionally restricted to ids starting with `prefix`.
    fn list(&self, prefix: Option<&str>, limit: usize) -> Result<Vec<HistorySummary>, HistoryError>;

    fn get(&self, id: &str) -> Result<Option<HistorySnapshot>, HistoryError>;

    /// Returns whether a snapshot was removed.
    fn delete(&self, id: &str) -> Result<bool, HistoryError>;
}

/// Build the id prefix for a query: `stock/{SYMBOL}`, `recent/{days}d`,
/// `custom/{start}_{end}`, or the bare query type.
pub fn id_prefix(query_type: &str, params: &serde_json::Value) -> String {
    let param = |name: &str| -> String {
        match params.get(name) {
            Some(serde_json::Value::String(s)) => sanitize(s),
            Some(other) => sanitize(&other.to_string()),
            None => "unknown".to_string(),
        }
    };

    match query_type {
        "stock" => format!("stock/{}", param("symbol").to_uppercase()),
        "recent" => format!("recent/{}d", param("days")),
        "custom" => format!("custom/{}_{}", param("start_date"), param("end_date")),
        other => sanitize(other),
    }
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Reject ids that could escape the store root.
pub fn validate_id(id: &str) -> Result<(), HistoryError> {
    let valid = !id.is_empty()
        && !id.starts_with('/')
        && id.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        });
    if valid {
        Ok(())
    } else {
        Err(HistoryError::InvalidId(id.to_string()))
    }
}

/// One pretty-printed JSON file per snapshot under a root directory.
pub struct FileHistoryStore {
    root: PathBuf,
}

impl FileHistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Save with an explicit timestamp.
    pub fn save_at(
        &self,
        query_type: &str,
        params: &serde_json::Value,
        records: &[ReactionRecord],
        timestamp: NaiveDateTime,
    ) -> Result<String, HistoryError> {
        let prefix = id_prefix(query_type, params);
        let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();

        // Two saves in the same second get a counter suffix.
        let mut id = format!("{prefix}/{stamp}");
        let mut n = 1;
        while self.path_for(&id).exists() {
            id = format!("{prefix}/{stamp}_{n}");
            n += 1;
        }

        let snapshot = HistorySnapshot {
            query_type: query_type.to_string(),
            params: params.clone(),
            results: records.to_vec(),
            timestamp,
            count: records.len(),
        };

        let path = self.path_for(&id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;

        debug!(id = %id, count = snapshot.count, "saved history snapshot");
        Ok(id)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in id.split('/') {
            path.push(segment);
        }
        path.set_extension(EXTENSION);
        path
    }

    fn collect_ids(&self, dir: &Path, ids: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_ids(&path, ids)?;
            } else if path.extension().is_some_and(|ext| ext == EXTENSION) {
                if let Ok(rel) = path.with_extension("").strip_prefix(&self.root) {
                    let id = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    ids.push(id);
                }
            }
        }
        Ok(())
    }
}

impl HistoryStore for FileHistoryStore {
    fn save(
        &self,
        query_type: &str,
        params: &serde_json::Value,
        records: &[ReactionRecord],
    ) -> Result<String, HistoryError> {
        self.save_at(query_type, params, records, Utc::now().naive_utc())
    }

    fn list(
        &self,
        prefix: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistorySummary>, HistoryError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        self.collect_ids(&self.root, &mut ids)?;

        let mut summaries: Vec<HistorySummary> = ids
            .into_iter()
            .filter(|id| prefix.map_or(true, |p| id.starts_with(p)))
            .filter_map(|id| match self.get(&id) {
                Ok(Some(snapshot)) => Some(HistorySummary {
                    id,
                    query_type: snapshot.query_type,
                    params: snapshot.params,
                    timestamp: snapshot.timestamp,
                    count: snapshot.count,
                }),
                Ok(None) => None,
                Err(e) => {
                    warn!(id = %id, error = %e, "skipping unreadable history snapshot");
                    None
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        summaries.truncate(limit);
        Ok(summaries)
    }

    fn get(&self, id: &str) -> Result<Option<HistorySnapshot>, HistoryError> {
        validate_id(id)?;
        let content = match fs::read_to_string(self.path_for(id)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        validate_id(id)?;
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
