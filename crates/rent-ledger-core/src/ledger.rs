//! Contract operations scoped to an owner.
//!
//! Contracts are addressed by their position in the owner's listing: index 0
//! is the owner's first contract in store order, regardless of how many
//! contracts other users hold before it.

use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adjustment::{self, AdjustmentOutcome};
use crate::error::RentLedgerError;
use crate::provider::IndexProvider;
use crate::schedule::{self, PaymentStatus, StatusReport};
use crate::store::ContractRepository;
use crate::types::{
    with_metadata, AdjustmentMethod, AdjustmentMode, ComputationOutput, Contract, IndexKind, Money,
};
use crate::RentLedgerResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Fields for a new contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContract {
    pub tenant: String,
    pub amount: Money,
    #[serde(default)]
    pub index_kind: IndexKind,
    #[serde(default)]
    pub mode: AdjustmentMode,
    pub start_date: NaiveDate,
    pub period_months: u32,
}

/// Fields to change on an existing contract; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractEdit {
    pub tenant: Option<String>,
    pub amount: Option<Money>,
    pub index_kind: Option<IndexKind>,
    pub mode: Option<AdjustmentMode>,
    pub period_months: Option<u32>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A contract as listed to its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractView {
    /// Position in the owner's listing
    pub index: usize,
    pub tenant: String,
    pub amount: Money,
    pub original_amount: Money,
    pub index_kind: IndexKind,
    pub mode: AdjustmentMode,
    pub start_date: NaiveDate,
    pub last_payment: Option<NaiveDate>,
    pub period_months: u32,
    pub status: PaymentStatus,
    pub due_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    pub adjustments: usize,
}

impl ContractView {
    fn new(index: usize, contract: &Contract, report: StatusReport) -> Self {
        Self {
            index,
            tenant: contract.tenant.clone(),
            amount: contract.amount,
            original_amount: contract.original_amount,
            index_kind: contract.index_kind,
            mode: contract.mode,
            start_date: contract.start_date,
            last_payment: contract.last_payment,
            period_months: contract.period_months,
            status: report.status,
            due_date: report.due_date,
            days_remaining: report.days_remaining,
            adjustments: contract.history.len(),
        }
    }
}

/// Result of an adjustment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentReport {
    pub index: usize,
    pub tenant: String,
    pub method: AdjustmentMethod,
    /// Amount after the request (unchanged when skipped)
    pub amount: Money,
    pub outcome: AdjustmentOutcome,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct RentLedger<R> {
    repo: R,
}

impl<R: ContractRepository> RentLedger<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn list(&self, owner: &str, today: NaiveDate) -> RentLedgerResult<Vec<ContractView>> {
        let contracts = self.repo.load(today)?;
        Ok(contracts
            .iter()
            .filter(|c| c.is_owned_by(owner))
            .enumerate()
            .map(|(i, c)| ContractView::new(i, c, status_of(c, today)))
            .collect())
    }

    pub fn get(&self, owner: &str, index: usize, today: NaiveDate) -> RentLedgerResult<Contract> {
        let contracts = self.repo.load(today)?;
        let pos = position_for(&contracts, owner, index)?;
        Ok(contracts[pos].clone())
    }

    pub fn status(
        &self,
        owner: &str,
        index: usize,
        today: NaiveDate,
    ) -> RentLedgerResult<ContractView> {
        let contract = self.get(owner, index, today)?;
        Ok(ContractView::new(index, &contract, status_of(&contract, today)))
    }

    /// Add a contract for `owner`; returns its listing index.
    pub fn create(
        &self,
        owner: &str,
        input: NewContract,
        today: NaiveDate,
    ) -> RentLedgerResult<usize> {
        validate_new(&input)?;
        let contract = Contract {
            tenant: input.tenant.trim().to_string(),
            amount: input.amount,
            original_amount: input.amount,
            index_kind: input.index_kind,
            mode: input.mode,
            start_date: input.start_date,
            last_payment: Some(input.start_date),
            period_months: input.period_months,
            history: Vec::new(),
            owner: owner.to_string(),
        };
        let index = self.repo.modify(today, |contracts| {
            let index = contracts.iter().filter(|c| c.is_owned_by(owner)).count();
            contracts.push(contract);
            Ok(index)
        })?;
        info!(owner, index, "contract created");
        Ok(index)
    }

    pub fn edit(
        &self,
        owner: &str,
        index: usize,
        edit: ContractEdit,
        today: NaiveDate,
    ) -> RentLedgerResult<Contract> {
        validate_edit(&edit)?;
        let updated = self.repo.modify(today, |contracts| {
            let pos = position_for(contracts, owner, index)?;
            let c = &mut contracts[pos];
            if let Some(tenant) = edit.tenant {
                c.tenant = tenant.trim().to_string();
            }
            if let Some(amount) = edit.amount {
                c.amount = amount;
            }
            if let Some(kind) = edit.index_kind {
                c.index_kind = kind;
            }
            if let Some(mode) = edit.mode {
                c.mode = mode;
            }
            if let Some(period) = edit.period_months {
                c.period_months = period;
            }
            Ok(c.clone())
        })?;
        info!(owner, index, "contract edited");
        Ok(updated)
    }

    /// Remove the owner's `index`-th contract; returns it.
    pub fn delete(
        &self,
        owner: &str,
        index: usize,
        today: NaiveDate,
    ) -> RentLedgerResult<Contract> {
        let removed = self.repo.modify(today, |contracts| {
            let pos = position_for(contracts, owner, index)?;
            Ok(contracts.remove(pos))
        })?;
        info!(owner, index, "contract deleted");
        Ok(removed)
    }

    /// Apply the fixed factor for the contract's index kind.
    pub fn adjust_fixed(
        &self,
        owner: &str,
        index: usize,
        today: NaiveDate,
    ) -> RentLedgerResult<ComputationOutput<AdjustmentReport>> {
        let start = Instant::now();
        let report = self.repo.modify(today, |contracts| {
            let pos = position_for(contracts, owner, index)?;
            let c = &mut contracts[pos];
            let entry = adjustment::apply_fixed(c, today);
            Ok(AdjustmentReport {
                index,
                tenant: c.tenant.clone(),
                method: AdjustmentMethod::FixedFactor,
                amount: c.amount,
                outcome: AdjustmentOutcome::Applied(entry),
            })
        })?;
        info!(owner, index, amount = %report.amount, "fixed-factor adjustment applied");

        let assumptions = serde_json::json!({
            "factor_ipc": adjustment::fixed_factor(IndexKind::Ipc),
            "factor_icl": adjustment::fixed_factor(IndexKind::Icl),
            "rounding": "2 decimals, banker's rounding",
            "as_of": today,
        });
        Ok(with_metadata(
            "Fixed-factor rent adjustment",
            &assumptions,
            Vec::new(),
            start.elapsed().as_micros() as u64,
            report,
        ))
    }

    /// Apply the ratio of the published index between contract start and
    /// `today`. Skipped adjustments leave the store untouched and come back
    /// with a warning naming the reason.
    ///
    /// The series is fetched before the store is locked.
    pub fn adjust_with_index<P: IndexProvider + ?Sized>(
        &self,
        owner: &str,
        index: usize,
        provider: &P,
        today: NaiveDate,
    ) -> RentLedgerResult<ComputationOutput<AdjustmentReport>> {
        let start = Instant::now();
        let kind = self.get(owner, index, today)?.index_kind;
        let fetched = provider.fetch_series(kind);
        let report = self.repo.modify(today, |contracts| {
            let pos = position_for(contracts, owner, index)?;
            let c = &mut contracts[pos];
            let outcome = if c.index_kind == kind {
                adjustment::apply_fetched(c, fetched, today)
            } else {
                AdjustmentOutcome::NoData {
                    reason: format!("contract index changed from {kind} to {}", c.index_kind),
                }
            };
            Ok(AdjustmentReport {
                index,
                tenant: c.tenant.clone(),
                method: AdjustmentMethod::IndexRatio,
                amount: c.amount,
                outcome,
            })
        })?;

        let mut warnings = Vec::new();
        match report.outcome.skip_reason() {
            Some(reason) => {
                warn!(owner, index, reason, "index adjustment skipped");
                warnings.push(format!("Adjustment skipped: {reason}"));
            }
            None => info!(owner, index, amount = %report.amount, "index-ratio adjustment applied"),
        }

        let assumptions = serde_json::json!({
            "formula": "base × index(today) / index(contract start)",
            "rounding": "2 decimals, banker's rounding",
            "as_of": today,
        });
        Ok(with_metadata(
            "Index-ratio rent adjustment",
            &assumptions,
            warnings,
            start.elapsed().as_micros() as u64,
            report,
        ))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn status_of(contract: &Contract, today: NaiveDate) -> StatusReport {
    schedule::classify(contract.last_payment, contract.period_months, today)
}

/// Store position of the owner's `index`-th contract.
fn position_for(contracts: &[Contract], owner: &str, index: usize) -> RentLedgerResult<usize> {
    contracts
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_owned_by(owner))
        .nth(index)
        .map(|(pos, _)| pos)
        .ok_or(RentLedgerError::ContractNotFound { index })
}

fn validate_new(input: &NewContract) -> RentLedgerResult<()> {
    validate_tenant(&input.tenant)?;
    validate_amount(input.amount)?;
    validate_period(input.period_months)
}

fn validate_edit(edit: &ContractEdit) -> RentLedgerResult<()> {
    if let Some(tenant) = &edit.tenant {
        validate_tenant(tenant)?;
    }
    if let Some(amount) = edit.amount {
        validate_amount(amount)?;
    }
    if let Some(period) = edit.period_months {
        validate_period(period)?;
    }
    Ok(())
}

fn validate_tenant(tenant: &str) -> RentLedgerResult<()> {
    if tenant.trim().is_empty() {
        return Err(RentLedgerError::InvalidInput {
            field: "tenant".into(),
            reason: "Tenant name must not be empty".into(),
        });
    }
    Ok(())
}

fn validate_amount(amount: Money) -> RentLedgerResult<()> {
    if amount < Money::ZERO {
        return Err(RentLedgerError::InvalidInput {
            field: "amount".into(),
            reason: "Rent amount must not be negative".into(),
        });
    }
    Ok(())
}

fn validate_period(period_months: u32) -> RentLedgerResult<()> {
    if period_months == 0 {
        return Err(RentLedgerError::InvalidInput {
            field: "period_months".into(),
            reason: "Adjustment period must be at least one month".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_series::{IndexPoint, IndexSeries};
    use crate::provider::ProviderError;
    use crate::store::MemoryContractStore;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn new_contract(tenant: &str) -> NewContract {
        NewContract {
            tenant: tenant.to_string(),
            amount: dec!(1000),
            index_kind: IndexKind::Ipc,
            mode: AdjustmentMode::Cumulative,
            start_date: d(2026, 1, 1),
            period_months: 6,
        }
    }

    #[test]
    fn test_listing_indexes_are_per_owner() {
        let ledger = RentLedger::new(MemoryContractStore::default());
        let today = d(2026, 2, 1);
        ledger.create("bob", new_contract("B0"), today).unwrap();
        assert_eq!(ledger.create("ana", new_contract("A0"), today).unwrap(), 0);
        ledger.create("bob", new_contract("B1"), today).unwrap();
        assert_eq!(ledger.create("ana", new_contract("A1"), today).unwrap(), 1);

        let ana = ledger.list("ana", today).unwrap();
        assert_eq!(ana.len(), 2);
        assert_eq!(ana[1].tenant, "A1");
        assert_eq!(ana[1].index, 1);
        assert_eq!(ledger.get("bob", 1, today).unwrap().tenant, "B1");
    }

    #[test]
    fn test_create_validates() {
        let ledger = RentLedger::new(MemoryContractStore::default());
        let today = d(2026, 2, 1);
        let mut bad = new_contract(" ");
        assert!(ledger.create("ana", bad.clone(), today).is_err());
        bad.tenant = "Ok".into();
        bad.period_months = 0;
        assert!(ledger.create("ana", bad.clone(), today).is_err());
        bad.period_months = 3;
        bad.amount = dec!(-1);
        assert!(ledger.create("ana", bad, today).is_err());
        assert!(ledger.list("ana", today).unwrap().is_empty());
    }

    #[test]
    fn test_edit_changes_only_given_fields() {
        let ledger = RentLedger::new(MemoryContractStore::default());
        let today = d(2026, 2, 1);
        ledger.create("ana", new_contract("Old"), today).unwrap();
        let edit = ContractEdit {
            tenant: Some("New".into()),
            period_months: Some(3),
            ..ContractEdit::default()
        };
        let c = ledger.edit("ana", 0, edit, today).unwrap();
        assert_eq!(c.tenant, "New");
        assert_eq!(c.period_months, 3);
        assert_eq!(c.amount, dec!(1000));
        assert_eq!(c.index_kind, IndexKind::Ipc);
    }

    #[test]
    fn test_other_owners_contracts_are_not_found() {
        let ledger = RentLedger::new(MemoryContractStore::default());
        let today = d(2026, 2, 1);
        ledger.create("bob", new_contract("B0"), today).unwrap();
        let err = ledger.delete("ana", 0, today).unwrap_err();
        assert!(matches!(err, RentLedgerError::ContractNotFound { index: 0 }));
        assert!(ledger.adjust_fixed("ana", 0, today).is_err());
        assert_eq!(ledger.list("bob", today).unwrap().len(), 1);
    }

    #[test]
    fn test_status_view_reports_due_date() {
        let ledger = RentLedger::new(MemoryContractStore::default());
        ledger.create("ana", new_contract("A"), d(2026, 1, 1)).unwrap();
        let view = ledger.status("ana", 0, d(2026, 6, 1)).unwrap();
        assert_eq!(view.due_date, Some(d(2026, 7, 1)));
        assert_eq!(view.days_remaining, Some(30));
        assert_eq!(view.status, PaymentStatus::DueSoon);
    }

    struct EditingProvider<'a> {
        ledger: &'a RentLedger<MemoryContractStore>,
        today: NaiveDate,
    }

    impl IndexProvider for EditingProvider<'_> {
        fn fetch_series(&self, _kind: IndexKind) -> Result<IndexSeries, ProviderError> {
            let edit = ContractEdit {
                amount: Some(dec!(2000)),
                ..ContractEdit::default()
            };
            self.ledger
                .edit("ana", 0, edit, self.today)
                .map_err(|e| ProviderError::new("store", None, e.to_string()))?;
            Ok(IndexSeries::new(vec![
                IndexPoint { date: d(2026, 1, 1), value: dec!(100) },
                IndexPoint { date: d(2026, 6, 1), value: dec!(110) },
            ]))
        }
    }

    #[test]
    fn test_series_fetch_runs_outside_the_store_lock() {
        let ledger = RentLedger::new(MemoryContractStore::default());
        let today = d(2026, 6, 1);
        ledger.create("ana", new_contract("A"), today).unwrap();

        let provider = EditingProvider { ledger: &ledger, today };
        let out = ledger.adjust_with_index("ana", 0, &provider, today).unwrap();
        // The edit made during the fetch is the base: 2000 * 110 / 100
        assert!(out.result.outcome.is_applied());
        assert_eq!(out.result.amount, dec!(2200.00));
    }
}
