//! Index series providers.
//!
//! [`HttpIndexProvider`] fetches a published series over HTTPS with a bearer
//! token. [`StaticIndexProvider`] serves series held in memory or loaded from
//! a JSON file. Failures are reported as [`ProviderError`] values; nothing in
//! this module panics on a bad response.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::IndexProviderSettings;
use crate::error::RentLedgerError;
use crate::index_series::{IndexSeries, RawIndexPoint};
use crate::types::IndexKind;
use crate::RentLedgerResult;

/// Why a series could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Short machine-readable class, e.g. `timeout`, `http_non_200`
    pub kind: String,
    pub status: Option<u16>,
    pub detail: String,
}

impl ProviderError {
    pub fn new(kind: &str, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "index provider {} (HTTP {}): {}",
                self.kind, status, self.detail
            ),
            None => write!(f, "index provider {}: {}", self.kind, self.detail),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Source of published index series.
pub trait IndexProvider {
    fn fetch_series(&self, kind: IndexKind) -> Result<IndexSeries, ProviderError>;
}

// ---------------------------------------------------------------------------
// HTTP provider
// ---------------------------------------------------------------------------

pub struct HttpIndexProvider {
    agent: ureq::Agent,
    settings: IndexProviderSettings,
}

impl HttpIndexProvider {
    pub fn new(settings: IndexProviderSettings) -> RentLedgerResult<Self> {
        let agent = build_http_agent(settings.timeout_ms, &settings.user_agent)?;
        Ok(Self { agent, settings })
    }

    pub fn endpoint_url(&self, kind: IndexKind) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.endpoint_for(kind).trim_start_matches('/')
        )
    }
}

impl IndexProvider for HttpIndexProvider {
    fn fetch_series(&self, kind: IndexKind) -> Result<IndexSeries, ProviderError> {
        let token = self
            .settings
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::new("config_missing", None, "no API token configured"))?;
        let url = self.endpoint_url(kind);
        debug!(index = %kind, %url, "fetching index series");

        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {token}"))
            .set("Accept", "application/json")
            .call()
            .map_err(provider_error_from_ureq)?;

        let rows: Vec<RawIndexPoint> = serde_json::from_reader(response.into_reader())
            .map_err(|e| ProviderError::new("json_parse", None, e.to_string()))?;
        let (series, dropped) = IndexSeries::from_raw(rows);
        if dropped > 0 {
            warn!(index = %kind, dropped, "dropped index rows with unreadable dates");
        }
        debug!(index = %kind, points = series.len(), "index series fetched");
        Ok(series)
    }
}

fn build_http_agent(timeout_ms: u32, user_agent: &str) -> RentLedgerResult<ureq::Agent> {
    if timeout_ms == 0 {
        return Err(RentLedgerError::Config("index provider timeout must be > 0".into()));
    }
    let timeout = Duration::from_millis(u64::from(timeout_ms).max(100));
    Ok(ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(user_agent)
        .build())
}

fn provider_error_from_ureq(err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Status(status, response) => {
            let detail = response.status_text().to_string();
            ProviderError::new("http_non_200", Some(status), detail)
        }
        ureq::Error::Transport(transport) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            let kind = classify_transport_error_kind(&combined);
            ProviderError::new(kind, None, transport.to_string())
        }
    }
}

fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}

// ---------------------------------------------------------------------------
// Static provider
// ---------------------------------------------------------------------------

/// Series held in memory, keyed by index kind.
#[derive(Debug, Clone, Default)]
pub struct StaticIndexProvider {
    series: HashMap<IndexKind, IndexSeries>,
}

impl StaticIndexProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, kind: IndexKind, series: IndexSeries) -> Self {
        self.series.insert(kind, series);
        self
    }

    /// Load `{"IPC": [{"d": "...", "v": ...}], "ICL": [...]}`.
    pub fn from_json_file(path: &Path) -> RentLedgerResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RentLedgerError::Storage(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let raw: HashMap<IndexKind, Vec<RawIndexPoint>> = serde_json::from_str(&contents)?;
        let series = raw
            .into_iter()
            .map(|(kind, rows)| (kind, IndexSeries::from_raw(rows).0))
            .collect();
        Ok(Self { series })
    }
}

impl IndexProvider for StaticIndexProvider {
    fn fetch_series(&self, kind: IndexKind) -> Result<IndexSeries, ProviderError> {
        self.series
            .get(&kind)
            .cloned()
            .ok_or_else(|| {
                ProviderError::new("not_found", None, format!("no series loaded for {kind}"))
            })
    }
}
