//! gobank - ledger maintenance and transfer tool
//!
//! ```text
//! gobank [--env dev] --migrate
//! gobank [--env dev] --create-account --owner alice --currency USD
//! gobank [--env dev] --accounts --owner alice
//! gobank [--env dev] --from 1 --to 2 --amount 30 [--owner alice]
//! ```
//!
//! Connects to PostgreSQL, applies migrations, then runs the requested
//! command. Results are printed to stdout as JSON.

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use gobank::account::AccountRepository;
use gobank::config::AppConfig;
use gobank::db::Database;
use gobank::ledger::{Currency, PgLedgerStore};
use gobank::transfer::{TransferEngine, TransferRequest, TransferService};

// ============================================================
// ARGUMENTS
// ============================================================

fn get_arg(name: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == name && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().any(|a| a == name)
}

fn get_env() -> String {
    get_arg("--env")
        .or_else(|| get_arg("-e"))
        .unwrap_or_else(|| "dev".to_string())
}

fn required<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = get_arg(name).with_context(|| format!("missing {}", name))?;
    raw.parse::<T>()
        .with_context(|| format!("invalid value for {}: {}", name, raw))
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env).context("loading configuration")?;
    let _log_guard = gobank::logging::init_logging(&app_config);

    tracing::info!(
        env = %env,
        git = env!("GIT_HASH"),
        "Starting gobank"
    );

    let db = Database::connect(&app_config.database)
        .await
        .context("connecting to PostgreSQL")?;
    db.health_check().await.context("database health check")?;
    db.migrate().await.context("applying migrations")?;

    if has_flag("--migrate") {
        return Ok(());
    }

    let accounts = AccountRepository::new(db.pool().clone());

    if has_flag("--create-account") {
        let owner: String = required("--owner")?;
        let currency: Currency = required("--currency")?;
        let account = accounts.create(&owner, currency).await?;
        println!("{}", serde_json::to_string_pretty(&account)?);
        return Ok(());
    }

    if has_flag("--accounts") {
        let owner: String = required("--owner")?;
        let list = accounts.list_by_owner(&owner, 100, 0).await?;
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if get_arg("--from").is_none() {
        bail!("nothing to do: pass --migrate, --create-account, --accounts or --from/--to/--amount");
    }

    let mut req = TransferRequest::new(
        required("--from")?,
        required("--to")?,
        required("--amount")?,
    );
    req.owner = get_arg("--owner");

    let store = Arc::new(PgLedgerStore::new(db.pool().clone()));
    let engine = TransferEngine::new(store, app_config.transfer.tx_timeout());
    let service = TransferService::new(engine, accounts, &app_config.transfer);

    match service.transfer(&req).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(code = e.code(), retryable = e.is_retryable(), error = %e, "Transfer failed");
            Err(e).context("transfer failed")
        }
    }
}
