use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::json;

use rent_ledger_core::ledger::{ContractEdit, NewContract};
use rent_ledger_core::schedule::PaymentStatus;
use rent_ledger_core::{AdjustmentMode, IndexKind};

use super::CommandResult;
use crate::context::AppContext;
use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Current,
    DueSoon,
    Overdue,
}

impl StatusFilter {
    fn matches(self, status: PaymentStatus) -> bool {
        matches!(
            (self, status),
            (StatusFilter::Current, PaymentStatus::Current)
                | (StatusFilter::DueSoon, PaymentStatus::DueSoon)
                | (StatusFilter::Overdue, PaymentStatus::Overdue)
        )
    }
}

/// Arguments for listing contracts
#[derive(Args)]
pub struct ListArgs {
    /// Only show contracts in this payment status
    #[arg(long)]
    pub status: Option<StatusFilter>,
}

/// A contract's position in your listing (see `rent list`)
#[derive(Args)]
pub struct IndexArg {
    pub index: usize,
}

/// Arguments for creating a contract
#[derive(Args)]
pub struct CreateArgs {
    /// Tenant name
    #[arg(long)]
    pub tenant: Option<String>,

    /// Monthly rent as signed
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Price index the rent follows (IPC or ICL)
    #[arg(long = "index", default_value = "IPC")]
    pub index_kind: IndexKind,

    /// Adjust the running amount (cumulative) or the signed amount (from-original)
    #[arg(long, default_value = "cumulative")]
    pub mode: AdjustmentMode,

    /// Contract start date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Months between adjustments (3 quarterly, 4 four-monthly, 6 half-yearly)
    #[arg(long, default_value = "6")]
    pub period: u32,

    /// Path to JSON input file (used when --tenant is absent)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for editing a contract
#[derive(Args)]
pub struct EditArgs {
    pub index: usize,

    #[arg(long)]
    pub tenant: Option<String>,

    #[arg(long)]
    pub amount: Option<Decimal>,

    #[arg(long = "index")]
    pub index_kind: Option<IndexKind>,

    #[arg(long)]
    pub mode: Option<AdjustmentMode>,

    #[arg(long)]
    pub period: Option<u32>,
}

pub fn run_list(ctx: &AppContext, args: ListArgs) -> CommandResult {
    let owner = ctx.owner()?;
    let views: Vec<_> = ctx
        .ledger()
        .list(&owner, ctx.today())?
        .into_iter()
        .filter(|v| args.status.map_or(true, |f| f.matches(v.status)))
        .collect();
    Ok(serde_json::to_value(views)?)
}

pub fn run_create(ctx: &AppContext, args: CreateArgs) -> CommandResult {
    let owner = ctx.owner()?;
    let today = ctx.today();
    let new_contract: NewContract = if let Some(tenant) = args.tenant {
        NewContract {
            tenant,
            amount: args.amount.ok_or("--amount is required (or provide --input)")?,
            index_kind: args.index_kind,
            mode: args.mode,
            start_date: args.start.unwrap_or(today),
            period_months: args.period,
        }
    } else if let Some(parsed) = input::read_new_contract(args.input.as_deref())? {
        parsed
    } else {
        return Err("give --tenant and --amount, --input <file.json> or a contract on stdin".into());
    };

    let ledger = ctx.ledger();
    let index = ledger.create(&owner, new_contract, today)?;
    Ok(serde_json::to_value(ledger.status(&owner, index, today)?)?)
}

pub fn run_edit(ctx: &AppContext, args: EditArgs) -> CommandResult {
    let owner = ctx.owner()?;
    let today = ctx.today();
    let edit = ContractEdit {
        tenant: args.tenant,
        amount: args.amount,
        index_kind: args.index_kind,
        mode: args.mode,
        period_months: args.period,
    };
    let ledger = ctx.ledger();
    ledger.edit(&owner, args.index, edit, today)?;
    Ok(serde_json::to_value(ledger.status(&owner, args.index, today)?)?)
}

pub fn run_delete(ctx: &AppContext, args: IndexArg) -> CommandResult {
    let owner = ctx.owner()?;
    let removed = ctx.ledger().delete(&owner, args.index, ctx.today())?;
    Ok(json!({
        "deleted": args.index,
        "tenant": removed.tenant,
        "amount": removed.amount,
    }))
}

pub fn run_status(ctx: &AppContext, args: IndexArg) -> CommandResult {
    let owner = ctx.owner()?;
    let view = ctx.ledger().status(&owner, args.index, ctx.today())?;
    Ok(serde_json::to_value(view)?)
}

pub fn run_history(ctx: &AppContext, args: IndexArg) -> CommandResult {
    let owner = ctx.owner()?;
    let contract = ctx.ledger().get(&owner, args.index, ctx.today())?;
    Ok(serde_json::to_value(contract.history)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_matches_only_its_bucket() {
        assert!(StatusFilter::Overdue.matches(PaymentStatus::Overdue));
        assert!(!StatusFilter::Overdue.matches(PaymentStatus::DueSoon));
        assert!(StatusFilter::DueSoon.matches(PaymentStatus::DueSoon));
        assert!(StatusFilter::Current.matches(PaymentStatus::Current));
        assert!(!StatusFilter::Current.matches(PaymentStatus::Overdue));
    }
}
