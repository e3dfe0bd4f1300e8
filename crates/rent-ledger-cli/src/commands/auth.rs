use chrono::Utc;
use clap::Args;
use serde_json::json;

use super::CommandResult;
use crate::context::AppContext;

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: String,

    /// Password (prompted without echo when omitted)
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub username: String,

    /// Password (prompted without echo when omitted)
    #[arg(long)]
    pub password: Option<String>,
}

fn password_or_prompt(password: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match password {
        Some(p) => Ok(p),
        None => Ok(rpassword::prompt_password("Password: ")?),
    }
}

pub fn run_register(ctx: &AppContext, args: RegisterArgs) -> CommandResult {
    let password = password_or_prompt(args.password)?;
    let user = ctx.users().register(&args.username, &password)?;
    Ok(json!({
        "username": user.username,
        "registered": true,
    }))
}

pub fn run_login(ctx: &AppContext, args: LoginArgs) -> CommandResult {
    let password = password_or_prompt(args.password)?;
    let user = ctx.users().authenticate(&args.username, &password)?;
    let session = ctx.sessions().start(&user.username, Utc::now())?;
    Ok(serde_json::to_value(session)?)
}

pub fn run_logout(ctx: &AppContext) -> CommandResult {
    let ended = ctx.sessions().end()?;
    Ok(json!({ "logged_out": ended }))
}

pub fn run_whoami(ctx: &AppContext) -> CommandResult {
    match ctx.sessions().current()? {
        Some(session) => Ok(serde_json::to_value(session)?),
        None => Err(rent_ledger_core::RentLedgerError::NotLoggedIn.into()),
    }
}
