use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RentLedgerError;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Multiplicative adjustment factors (1.10 = +10%).
pub type Factor = Decimal;

/// Price index a contract's adjustment is pegged to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Consumer price index
    #[default]
    #[serde(rename = "IPC")]
    Ipc,
    /// Rental contracts index
    #[serde(rename = "ICL")]
    Icl,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Ipc => "IPC",
            IndexKind::Icl => "ICL",
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = RentLedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IPC" => Ok(IndexKind::Ipc),
            "ICL" => Ok(IndexKind::Icl),
            other => Err(RentLedgerError::InvalidInput {
                field: "index".into(),
                reason: format!("unknown index kind '{other}' (expected IPC or ICL)"),
            }),
        }
    }
}

/// Whether the factor is applied to the running amount or to the original one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentMode {
    #[default]
    Cumulative,
    FromOriginal,
}

impl std::fmt::Display for AdjustmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdjustmentMode::Cumulative => write!(f, "cumulative"),
            AdjustmentMode::FromOriginal => write!(f, "from-original"),
        }
    }
}

impl FromStr for AdjustmentMode {
    type Err = RentLedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "cumulative" => Ok(AdjustmentMode::Cumulative),
            "from-original" | "original" => Ok(AdjustmentMode::FromOriginal),
            other => Err(RentLedgerError::InvalidInput {
                field: "mode".into(),
                reason: format!("unknown adjustment mode '{other}'"),
            }),
        }
    }
}

/// How a history entry's new amount was computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentMethod {
    #[default]
    FixedFactor,
    IndexRatio,
}

/// One past adjustment event. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(alias = "fecha")]
    pub date: NaiveDate,
    #[serde(alias = "indice", default)]
    pub index_kind: IndexKind,
    #[serde(alias = "monto_anterior")]
    pub previous_amount: Money,
    #[serde(alias = "monto_nuevo")]
    pub new_amount: Money,
    #[serde(default)]
    pub method: AdjustmentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<Factor>,
}

/// A rental contract as held in the contract store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub tenant: String,
    /// Current rent
    pub amount: Money,
    /// Rent as signed; base for `from-original` adjustments
    pub original_amount: Money,
    pub index_kind: IndexKind,
    pub mode: AdjustmentMode,
    pub start_date: NaiveDate,
    /// `None` when the stored value could not be read
    pub last_payment: Option<NaiveDate>,
    pub period_months: u32,
    pub history: Vec<HistoryEntry>,
    pub owner: String,
}

impl Contract {
    /// Amount an adjustment is computed from, per the contract's mode.
    pub fn base_amount(&self) -> Money {
        match self.mode {
            AdjustmentMode::Cumulative => self.amount,
            AdjustmentMode::FromOriginal => self.original_amount,
        }
    }

    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner == username
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_index_kind_parses_case_insensitively() {
        assert_eq!("ipc".parse::<IndexKind>().unwrap(), IndexKind::Ipc);
        assert_eq!(" ICL ".parse::<IndexKind>().unwrap(), IndexKind::Icl);
        assert!("UVA".parse::<IndexKind>().is_err());
    }

    #[test]
    fn test_mode_accepts_underscore_spelling() {
        assert_eq!(
            "from_original".parse::<AdjustmentMode>().unwrap(),
            AdjustmentMode::FromOriginal
        );
        assert_eq!(
            "Cumulative".parse::<AdjustmentMode>().unwrap(),
            AdjustmentMode::Cumulative
        );
    }

    #[test]
    fn test_legacy_history_entry_deserializes() {
        let raw = r#"{"fecha":"2024-03-01","indice":"ICL",
                      "monto_anterior":1000.0,"monto_nuevo":1120.0}"#;
        let entry: HistoryEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(entry.index_kind, IndexKind::Icl);
        assert_eq!(entry.new_amount, dec!(1120));
        assert_eq!(entry.method, AdjustmentMethod::FixedFactor);
        assert_eq!(entry.factor, None);
    }

    #[test]
    fn test_index_kind_serializes_as_code() {
        let json = serde_json::to_string(&IndexKind::Icl).unwrap();
        assert_eq!(json, "\"ICL\"");
    }
}
