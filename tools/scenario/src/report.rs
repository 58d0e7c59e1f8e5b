//! Machine-readable run report.

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use relay_pool::{BatchIdentity, Deployment};

/// Balances of the accounts the drain moves funds between.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Balances {
    pub pool: U256,
    pub pool_total_deposits: U256,
    pub receiver: U256,
    pub recovery: U256,
}

impl Balances {
    pub fn snapshot(deployment: &mut Deployment) -> Result<Self> {
        let ledger = deployment.ledger().context("pool ledger view reverted")?;
        Ok(Self {
            pool: deployment.asset_balance(deployment.pool),
            pool_total_deposits: ledger.total_balance,
            receiver: deployment.asset_balance(deployment.receiver),
            recovery: deployment.asset_balance(deployment.recovery),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub executed_at: String,
    pub batch_identity: BatchIdentity,
    pub player: Address,
    pub pool: Address,
    pub loans: u64,
    pub withdraw_amount: U256,
    pub before: Balances,
    pub after: Balances,
    /// `None` when the relay call itself reverted.
    pub relay_success: Option<bool>,
    pub player_nonce: U256,
    pub gas_used: u64,
    pub drained: bool,
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

pub fn write_json_atomic(path: &Path, report: &Report) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(report).context("failed serialising report")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
