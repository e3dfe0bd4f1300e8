use chrono::NaiveDate;
use clap::Args;
use serde_json::json;

use rent_ledger_core::IndexKind;

use super::CommandResult;
use crate::context::AppContext;

/// Arguments for an index lookup
#[derive(Args)]
pub struct IndexLookupArgs {
    /// Index to query (IPC or ICL)
    #[arg(long = "index", default_value = "IPC")]
    pub index_kind: IndexKind,

    /// Target date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Read index series from a JSON file instead of the provider API
    #[arg(long)]
    pub series_file: Option<String>,
}

pub fn run_index_lookup(
    ctx: &AppContext,
    args: IndexLookupArgs,
) -> CommandResult {
    let target = args.date.unwrap_or_else(|| ctx.today());
    let provider = ctx.index_provider(args.series_file.as_deref())?;
    let series = provider.fetch_series(args.index_kind)?;
    Ok(json!({
        "index": args.index_kind,
        "date": target,
        "value": series.value_at(target),
        "points": series.len(),
        "first_date": series.first_date(),
        "last_date": series.last_date(),
    }))
}
