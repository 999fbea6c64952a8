//! Shared blocking JSON client for the HTTP providers.
//!
//! One `reqwest::blocking::Client` per provider, a fixed per-request timeout,
//! and a single place where transport and status failures are mapped onto
//! [`DataError`]. No retries: a failed call drops only the symbol or event
//! that needed it.

use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::provider::DataError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated JSON-over-HTTP client for one provider.
pub struct JsonClient {
    client: reqwest::blocking::Client,
    base_url: String,
    key_param: &'static str,
    api_key: String,
}

impl JsonClient {
    pub fn new(
        base_url: impl Into<String>,
        key_param: &'static str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_param,
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `{base_url}/{endpoint}` with query `params` plus the API key.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, DataError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(endpoint, "upstream request");

        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[(self.key_param, self.api_key.as_str())])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(format!("{endpoint}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        resp.json::<T>().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse {endpoint} response: {e}"))
        })
    }
}

/// Parse the leading `YYYY-MM-DD` of a provider date string.
///
/// Some endpoints append a time of day (`2024-08-01 17:00:00`); it is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
