//! Settings: TOML file with defaults, overridden by the caller.
//!
//! ```toml
//! data_dir = "/var/lib/rent-ledger"
//!
//! [index_provider]
//! base_url = "https://api.estadisticasbcra.com"
//! token = "..."
//! timeout_ms = 10000
//!
//! [index_provider.endpoints]
//! ipc = "cer"
//! icl = "icl"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RentLedgerError;
use crate::types::IndexKind;
use crate::RentLedgerResult;

const DEFAULT_DATA_DIR: &str = ".rent-ledger";
const DEFAULT_INDEX_BASE_URL: &str = "https://api.estadisticasbcra.com";
const DEFAULT_TIMEOUT_MS: u32 = 10_000;

pub const CONTRACTS_FILE: &str = "contracts.json";
pub const USERS_FILE: &str = "users.json";
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub index_provider: IndexProviderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            index_provider: IndexProviderSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> RentLedgerResult<Self> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| {
                    RentLedgerError::Config(format!("Failed to read '{}': {}", path.display(), e))
                })?;
                Self::from_toml(&contents)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(contents: &str) -> RentLedgerResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn contracts_path(&self) -> PathBuf {
        self.data_dir.join(CONTRACTS_FILE)
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_FILE)
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexProviderSettings {
    pub base_url: String,
    /// Bearer token; required by the HTTP provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_ms: u32,
    pub user_agent: String,
    pub endpoints: IndexEndpoints,
}

impl Default for IndexProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INDEX_BASE_URL.to_string(),
            token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: format!("rent-ledger/{}", env!("CARGO_PKG_VERSION")),
            endpoints: IndexEndpoints::default(),
        }
    }
}

impl IndexProviderSettings {
    pub fn endpoint_for(&self, kind: IndexKind) -> &str {
        match kind {
            IndexKind::Ipc => &self.endpoints.ipc,
            IndexKind::Icl => &self.endpoints.icl,
        }
    }
}

/// Path segment per index kind, appended to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexEndpoints {
    pub ipc: String,
    pub icl: String,
}

impl Default for IndexEndpoints {
    fn default() -> Self {
        Self {
            ipc: "cer".to_string(),
            icl: "icl".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            data_dir = "/tmp/rent"

            [index_provider]
            token = "abc"

            [index_provider.endpoints]
            ipc = "ipc_series"
            "#,
        )
        .unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/rent"));
        assert_eq!(settings.index_provider.token.as_deref(), Some("abc"));
        assert_eq!(settings.index_provider.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(settings.index_provider.endpoint_for(IndexKind::Ipc), "ipc_series");
        assert_eq!(settings.index_provider.endpoint_for(IndexKind::Icl), "icl");
        assert_eq!(settings.contracts_path(), PathBuf::from("/tmp/rent/contracts.json"));
    }

    #[test]
    fn test_no_path_gives_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.index_provider.base_url, DEFAULT_INDEX_BASE_URL);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Settings::from_toml("data_dir = [").unwrap_err();
        assert!(matches!(err, RentLedgerError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/rent.toml"))).unwrap_err();
        assert!(matches!(err, RentLedgerError::Config(_)));
    }
}
