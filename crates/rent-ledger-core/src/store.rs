//! Contract persistence.
//!
//! The whole contract list is one JSON document, read and rewritten in full.
//! [`ContractRepository::modify`] owns the read-modify-write sequence and
//! holds the store's lock across it, so two callers in the same process
//! cannot lose each other's updates. Separate processes writing the same
//! file can still race.
//!
//! Loading is permissive: missing or malformed fields get defaults and
//! legacy (Spanish) keys are accepted next to current ones. Items that are
//! not contract objects are never dropped; they are written back verbatim at
//! their position. A file that is not a JSON array loads as empty and is
//! never overwritten.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::RentLedgerError;
use crate::types::{AdjustmentMode, Contract, HistoryEntry, IndexKind, Money};
use crate::RentLedgerResult;

const DEFAULT_PERIOD_MONTHS: u32 = 6;

/// Store abstraction owning read-modify-write sequences.
pub trait ContractRepository {
    /// All contracts, in store order.
    fn load(&self, today: NaiveDate) -> RentLedgerResult<Vec<Contract>>;

    /// Run `f` against the loaded contracts and persist the result if `f`
    /// succeeds and changed anything.
    fn modify<T, F>(&self, today: NaiveDate, f: F) -> RentLedgerResult<T>
    where
        F: FnOnce(&mut Vec<Contract>) -> RentLedgerResult<T>;
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// Decoded contract file.
#[derive(Debug, Default)]
struct Document {
    contracts: Vec<Contract>,
    /// Items that are not contract objects, with their position in the file
    unreadable: Vec<(usize, Value)>,
    /// False when the file exists but is not a JSON array
    writable: bool,
}

impl Document {
    fn empty() -> Self {
        Self {
            writable: true,
            ..Self::default()
        }
    }

    fn to_items(&self, contracts: &[Contract]) -> RentLedgerResult<Vec<Value>> {
        let mut items = contracts
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        for (pos, raw) in &self.unreadable {
            items.insert((*pos).min(items.len()), raw.clone());
        }
        Ok(items)
    }
}

pub struct JsonContractStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonContractStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, today: NaiveDate) -> RentLedgerResult<Document> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::empty()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Document::empty());
        }
        let parsed = serde_json::from_str::<Value>(&contents)
            .map_err(|e| e.to_string())
            .and_then(|value| {
                parse_document(value, today).ok_or_else(|| "not a JSON array".to_string())
            });
        match parsed {
            Ok(doc) => Ok(doc),
            Err(reason) => {
                warn!(
                    path = %self.path.display(),
                    %reason,
                    "contract store unreadable; loading as empty"
                );
                Ok(Document::default())
            }
        }
    }

    fn write(&self, doc: &Document, contracts: &[Contract]) -> RentLedgerResult<()> {
        if !doc.writable {
            return Err(RentLedgerError::Storage(format!(
                "'{}' is not a JSON array of contracts; refusing to overwrite it",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&doc.to_items(contracts)?)?;
        fs::write(&self.path, json).map_err(|e| {
            RentLedgerError::Storage(format!("Failed to write '{}': {}", self.path.display(), e))
        })?;
        info!(
            path = %self.path.display(),
            contracts = contracts.len(),
            kept_unreadable = doc.unreadable.len(),
            "contract store written"
        );
        Ok(())
    }
}

impl ContractRepository for JsonContractStore {
    fn load(&self, today: NaiveDate) -> RentLedgerResult<Vec<Contract>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let doc = self.read(today)?;
        debug!(
            path = %self.path.display(),
            contracts = doc.contracts.len(),
            "contract store loaded"
        );
        Ok(doc.contracts)
    }

    fn modify<T, F>(&self, today: NaiveDate, f: F) -> RentLedgerResult<T>
    where
        F: FnOnce(&mut Vec<Contract>) -> RentLedgerResult<T>,
    {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let doc = self.read(today)?;
        let mut contracts = doc.contracts.clone();
        let out = f(&mut contracts)?;
        if contracts != doc.contracts {
            self.write(&doc, &contracts)?;
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryContractStore {
    contracts: Mutex<Vec<Contract>>,
}

impl MemoryContractStore {
    pub fn new(contracts: Vec<Contract>) -> Self {
        Self {
            contracts: Mutex::new(contracts),
        }
    }
}

impl ContractRepository for MemoryContractStore {
    fn load(&self, _today: NaiveDate) -> RentLedgerResult<Vec<Contract>> {
        Ok(self.contracts.lock().map_err(|_| poisoned())?.clone())
    }

    fn modify<T, F>(&self, _today: NaiveDate, f: F) -> RentLedgerResult<T>
    where
        F: FnOnce(&mut Vec<Contract>) -> RentLedgerResult<T>,
    {
        let mut guard = self.contracts.lock().map_err(|_| poisoned())?;
        let mut working = guard.clone();
        let out = f(&mut working)?;
        *guard = working;
        Ok(out)
    }
}

fn poisoned() -> RentLedgerError {
    RentLedgerError::Storage("contract store lock poisoned".into())
}

// ---------------------------------------------------------------------------
// Permissive decoding
// ---------------------------------------------------------------------------

// Current key first, then its legacy spelling.
const TENANT: &[&str] = &["tenant", "inquilino"];
const AMOUNT: &[&str] = &["amount", "monto"];
const ORIGINAL_AMOUNT: &[&str] = &["original_amount", "monto_original"];
const INDEX_KIND: &[&str] = &["index_kind", "indice"];
const MODE: &[&str] = &["mode", "modo"];
const START_DATE: &[&str] = &["start_date", "inicio"];
const LAST_PAYMENT: &[&str] = &["last_payment", "ultimo_pago"];
const PERIOD: &[&str] = &["period_months", "periodo"];
const HISTORY: &[&str] = &["history", "historial"];
const OWNER: &[&str] = &["owner", "usuario"];

const ENTRY_DATE: &[&str] = &["date", "fecha"];
const ENTRY_PREVIOUS: &[&str] = &["previous_amount", "monto_anterior"];
const ENTRY_NEW: &[&str] = &["new_amount", "monto_nuevo"];

fn field<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| record.get(*key))
}

fn parse_document(value: Value, today: NaiveDate) -> Option<Document> {
    let Value::Array(items) = value else {
        return None;
    };
    let mut doc = Document::empty();
    for (pos, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(record) => doc.contracts.push(contract_from_record(&record, today)),
            other => {
                warn!(position = pos, "contract record is not an object; keeping it as is");
                doc.unreadable.push((pos, other));
            }
        }
    }
    Some(doc)
}

fn contract_from_record(record: &Map<String, Value>, today: NaiveDate) -> Contract {
    let start_date = field(record, START_DATE).and_then(as_date).unwrap_or(today);
    // Absent means "paid at start"; present but unreadable (or null) is unknown.
    let last_payment = match field(record, LAST_PAYMENT) {
        None => Some(start_date),
        Some(value) => as_date(value),
    };
    let amount = field(record, AMOUNT).and_then(as_decimal).unwrap_or(Decimal::ZERO);
    let original_amount = field(record, ORIGINAL_AMOUNT)
        .and_then(as_decimal)
        .unwrap_or(amount);

    Contract {
        tenant: field(record, TENANT).and_then(as_string).unwrap_or_default(),
        amount,
        original_amount,
        index_kind: field(record, INDEX_KIND).and_then(as_index_kind).unwrap_or_default(),
        mode: field(record, MODE)
            .and_then(as_string)
            .and_then(|s| AdjustmentMode::from_str(&s).ok())
            .unwrap_or_default(),
        start_date,
        last_payment,
        period_months: field(record, PERIOD)
            .and_then(as_period)
            .unwrap_or(DEFAULT_PERIOD_MONTHS),
        history: field(record, HISTORY).map(parse_history).unwrap_or_default(),
        owner: field(record, OWNER).and_then(as_string).unwrap_or_default(),
    }
}

fn parse_history(value: &Value) -> Vec<HistoryEntry> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let entry = item.as_object().and_then(history_entry_from_record);
            if entry.is_none() {
                warn!(position = i, "skipping history entry without date or amounts");
            }
            entry
        })
        .collect()
}

fn history_entry_from_record(record: &Map<String, Value>) -> Option<HistoryEntry> {
    Some(HistoryEntry {
        date: field(record, ENTRY_DATE).and_then(as_date)?,
        index_kind: field(record, INDEX_KIND).and_then(as_index_kind).unwrap_or_default(),
        previous_amount: field(record, ENTRY_PREVIOUS).and_then(as_decimal)?,
        new_amount: field(record, ENTRY_NEW).and_then(as_decimal)?,
        method: record
            .get("method")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        factor: record.get("factor").and_then(as_decimal),
    })
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_index_kind(value: &Value) -> Option<IndexKind> {
    as_string(value).and_then(|s| IndexKind::from_str(&s).ok())
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

fn as_decimal(value: &Value) -> Option<Money> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn as_period(value: &Value) -> Option<u32> {
    let months = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(months).ok().filter(|m| *m > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn parse_contracts(raw: Value, today: NaiveDate) -> Vec<Contract> {
        parse_document(raw, today).unwrap().contracts
    }

    fn blank_contract(today: NaiveDate) -> Contract {
        contract_from_record(&Map::new(), today)
    }

    #[test]
    fn test_legacy_record_gets_defaults() {
        let today = d(2026, 10, 19);
        let raw = serde_json::json!([{ "inquilino": "Juan", "monto": 85000.5 }]);
        let contracts = parse_contracts(raw, today);
        assert_eq!(contracts.len(), 1);
        let c = &contracts[0];
        assert_eq!(c.tenant, "Juan");
        assert_eq!(c.amount, dec!(85000.5));
        assert_eq!(c.original_amount, dec!(85000.5));
        assert_eq!(c.index_kind, IndexKind::Ipc);
        assert_eq!(c.mode, AdjustmentMode::Cumulative);
        assert_eq!(c.start_date, today);
        assert_eq!(c.last_payment, Some(today));
        assert_eq!(c.period_months, 6);
        assert!(c.history.is_empty());
        assert_eq!(c.owner, "");
    }

    #[test]
    fn test_malformed_last_payment_becomes_unknown() {
        let today = d(2026, 10, 19);
        let raw = serde_json::json!([{
            "tenant": "Ana",
            "amount": "1000",
            "start_date": "2025-01-10",
            "last_payment": "10/01/2025",
            "period_months": "3",
            "index_kind": "ICL",
            "mode": "from-original",
            "owner": "ana"
        }]);
        let c = &parse_contracts(raw, today)[0];
        assert_eq!(c.last_payment, None);
        assert_eq!(c.start_date, d(2025, 1, 10));
        assert_eq!(c.period_months, 3);
        assert_eq!(c.index_kind, IndexKind::Icl);
        assert_eq!(c.mode, AdjustmentMode::FromOriginal);
    }

    #[test]
    fn test_unknown_last_payment_survives_rewrite() {
        let today = d(2026, 10, 19);
        let raw = serde_json::json!([
            { "tenant": "Ana", "start_date": "2025-01-10", "last_payment": null }
        ]);
        let contracts = parse_contracts(raw, today);
        assert_eq!(contracts[0].last_payment, None);

        let rewritten = serde_json::to_value(&contracts).unwrap();
        let reloaded = parse_contracts(rewritten, today);
        assert_eq!(reloaded[0].last_payment, None);
    }

    #[test]
    fn test_garbage_fields_fall_back() {
        let today = d(2026, 10, 19);
        let raw = serde_json::json!([
            { "monto": "lots", "periodo": 0, "indice": "UVA", "historial": "none" },
            42
        ]);
        let contracts = parse_contracts(raw, today);
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].amount, Decimal::ZERO);
        assert_eq!(contracts[0].period_months, 6);
        assert_eq!(contracts[0].index_kind, IndexKind::Ipc);
        assert!(contracts[0].history.is_empty());
    }

    #[test]
    fn test_missing_and_corrupt_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let today = d(2026, 10, 19);

        let store = JsonContractStore::new(dir.path().join("contracts.json"));
        assert!(store.load(today).unwrap().is_empty());

        fs::write(store.path(), "{ not json").unwrap();
        assert!(store.load(today).unwrap().is_empty());
    }

    #[test]
    fn test_modify_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let today = d(2026, 10, 19);
        let store = JsonContractStore::new(dir.path().join("nested").join("contracts.json"));

        store
            .modify(today, |contracts| {
                contracts.push(blank_contract(today));
                contracts[0].tenant = "Ana".into();
                Ok(())
            })
            .unwrap();

        let reloaded = store.load(today).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].tenant, "Ana");
    }

    #[test]
    fn test_failed_modify_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let today = d(2026, 10, 19);
        let store = JsonContractStore::new(dir.path().join("contracts.json"));

        let result: RentLedgerResult<()> = store.modify(today, |contracts| {
            contracts.push(blank_contract(today));
            Err(RentLedgerError::ContractNotFound { index: 3 })
        });
        assert!(result.is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_current_and_legacy_keys_together_prefer_current() {
        let today = d(2026, 10, 19);
        let raw = serde_json::json!([{
            "tenant": "Keep",
            "inquilino": "Old name",
            "monto": 500,
            "owner": "bob",
            "historial": [{
                "date": "2026-01-01",
                "fecha": "2025-01-01",
                "monto_anterior": 450,
                "new_amount": "500",
                "monto_nuevo": 499
            }]
        }]);
        let contracts = parse_contracts(raw, today);
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].tenant, "Keep");
        assert_eq!(contracts[0].amount, dec!(500));
        assert_eq!(contracts[0].owner, "bob");
        assert_eq!(contracts[0].history.len(), 1);
        assert_eq!(contracts[0].history[0].date, d(2026, 1, 1));
        assert_eq!(contracts[0].history[0].new_amount, dec!(500));
    }

    #[test]
    fn test_non_object_items_are_written_back_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let today = d(2026, 10, 19);
        let store = JsonContractStore::new(dir.path().join("contracts.json"));
        fs::write(store.path(), r#"[42, {"tenant": "A", "owner": "bob"}, "junk"]"#).unwrap();

        store
            .modify(today, |contracts| {
                let mut c = blank_contract(today);
                c.tenant = "B".into();
                contracts.push(c);
                Ok(())
            })
            .unwrap();

        let on_disk: Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let items = on_disk.as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], serde_json::json!(42));
        assert_eq!(items[1]["tenant"], "A");
        assert_eq!(items[2], serde_json::json!("junk"));
        assert_eq!(items[3]["tenant"], "B");
    }

    #[test]
    fn test_corrupt_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let today = d(2026, 10, 19);
        let store = JsonContractStore::new(dir.path().join("contracts.json"));
        fs::write(store.path(), "{ not json").unwrap();

        let result = store.modify(today, |contracts| {
            contracts.push(blank_contract(today));
            Ok(())
        });
        assert!(matches!(result, Err(RentLedgerError::Storage(_))));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ not json");
    }
}
