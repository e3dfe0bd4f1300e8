mod commands;
mod context;
mod input;
mod output;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::adjust::AdjustArgs;
use commands::auth::{LoginArgs, RegisterArgs};
use commands::contracts::{CreateArgs, EditArgs, IndexArg, ListArgs};
use commands::index::IndexLookupArgs;
use context::AppContext;

/// Rental contract ledger with index-linked rent adjustments
#[derive(Parser)]
#[command(
    name = "rent",
    version,
    about = "Rental contract ledger with index-linked rent adjustments",
    long_about = "Manage rental contracts per user: create, edit, delete and list \
                  contracts, track whether payments are current, due soon or overdue, \
                  and adjust rents by a fixed factor or by a published price index."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Settings file (TOML)
    #[arg(long, global = true, env = "RENT_LEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding contracts.json, users.json and session.json
    #[arg(long, global = true, env = "RENT_LEDGER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Base URL of the index provider API
    #[arg(long, global = true, env = "RENT_LEDGER_INDEX_URL")]
    index_url: Option<String>,

    /// Bearer token for the index provider API
    #[arg(long, global = true, env = "RENT_LEDGER_INDEX_TOKEN", hide_env_values = true)]
    index_token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user account
    Register(RegisterArgs),
    /// Log in as an existing user
    Login(LoginArgs),
    /// End the current session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List your contracts with their payment status
    List(ListArgs),
    /// Add a contract
    Create(CreateArgs),
    /// Change a contract's tenant, amount, index, mode or period
    Edit(EditArgs),
    /// Delete a contract
    Delete(IndexArg),
    /// Payment status of one contract
    Status(IndexArg),
    /// Adjustment history of one contract
    History(IndexArg),
    /// Apply a rent adjustment
    Adjust(AdjustArgs),
    /// Look up a published index value at a date
    IndexLookup(IndexLookupArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_json = std::env::var("RENT_LEDGER_LOG_JSON")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("rent {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let ctx = match AppContext::from_args(
        cli.config.as_deref(),
        cli.data_dir,
        cli.index_url,
        cli.index_token,
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Register(args) => commands::auth::run_register(&ctx, args),
        Commands::Login(args) => commands::auth::run_login(&ctx, args),
        Commands::Logout => commands::auth::run_logout(&ctx),
        Commands::Whoami => commands::auth::run_whoami(&ctx),
        Commands::List(args) => commands::contracts::run_list(&ctx, args),
        Commands::Create(args) => commands::contracts::run_create(&ctx, args),
        Commands::Edit(args) => commands::contracts::run_edit(&ctx, args),
        Commands::Delete(args) => commands::contracts::run_delete(&ctx, args),
        Commands::Status(args) => commands::contracts::run_status(&ctx, args),
        Commands::History(args) => commands::contracts::run_history(&ctx, args),
        Commands::Adjust(args) => commands::adjust::run_adjust(&ctx, args),
        Commands::IndexLookup(args) => commands::index::run_index_lookup(&ctx, args),
        Commands::Version => return,
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
