use clap::{Args, ValueEnum};

use super::CommandResult;
use crate::context::AppContext;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AdjustMethod {
    /// Constant factor per index (IPC 1.10, ICL 1.12)
    Fixed,
    /// Ratio of the published index between contract start and today
    Index,
}

/// Arguments for a rent adjustment
#[derive(Args)]
pub struct AdjustArgs {
    /// A contract's position in your listing
    pub index: usize,

    #[arg(long, default_value = "fixed")]
    pub method: AdjustMethod,

    /// Read index series from a JSON file instead of the provider API
    #[arg(long)]
    pub series_file: Option<String>,
}

pub fn run_adjust(ctx: &AppContext, args: AdjustArgs) -> CommandResult {
    let owner = ctx.owner()?;
    let today = ctx.today();
    let ledger = ctx.ledger();
    let result = match args.method {
        AdjustMethod::Fixed => ledger.adjust_fixed(&owner, args.index, today)?,
        AdjustMethod::Index => {
            let provider = ctx.index_provider(args.series_file.as_deref())?;
            ledger.adjust_with_index(&owner, args.index, provider.as_ref(), today)?
        }
    };
    Ok(serde_json::to_value(result)?)
}
