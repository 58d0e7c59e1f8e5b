//! Scenario configuration and world bootstrap.
//!
//! Deploys the asset, the forwarder, the pool and a funded borrower, the way the pool's
//! operator would: the deployer wraps native value into the pool and hands the borrower
//! its starting balance.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use relay_pool_types::{IForwarder, IPool, IWrappedAsset};

use crate::{
    contracts::{BatchIdentity, FlashLoanReceiver, Forwarder, Ledger, Pool, PoolConfig, WrappedAsset},
    errors::Revert,
    host::{BlockEnv, Host, Message, Receipt},
    utils::labels::labeled_address,
};

/// Parameters of a deployment. Every field has a default; amounts are base units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub chain_id: u64,
    pub timestamp: u64,
    /// Deposited into the pool by the deployer.
    pub pool_funds: u128,
    /// Starting asset balance of the borrower.
    pub receiver_funds: u128,
    pub fixed_fee: u128,
    pub batch_identity: BatchIdentity,
    pub tx_gas_limit: u64,
    /// Privileged withdrawer of the pool. Defaults to the deployer.
    pub fee_receiver: Option<Address>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            timestamp: 1_700_000_000,
            pool_funds: 1_000,
            receiver_funds: 10,
            fixed_fee: 1,
            batch_identity: BatchIdentity::PerPayload,
            tx_gas_limit: 30_000_000,
            fee_receiver: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("setup step `{step}` reverted: {revert}")]
    SetupReverted { step: &'static str, revert: Revert },
    #[error("fixed fee must be non-zero")]
    ZeroFee,
}

/// A deployed world plus the named actors of the scenario.
pub struct Deployment {
    pub host: Host,
    pub config: ScenarioConfig,
    /// Deploys and funds everything.
    pub deployer: Address,
    pub fee_receiver: Address,
    /// Signs requests through the forwarder.
    pub player: Address,
    /// Where recovered funds go.
    pub recovery: Address,
    pub asset: Address,
    pub forwarder: Address,
    pub pool: Address,
    pub receiver: Address,
}

impl Deployment {
    pub fn new(config: ScenarioConfig, player: Address) -> Result<Self, DeploymentError> {
        if config.fixed_fee == 0 {
            return Err(DeploymentError::ZeroFee);
        }
        let mut host = Host::new(BlockEnv {
            chain_id: config.chain_id,
            timestamp: config.timestamp,
        });
        let deployer = labeled_address("deployer");
        let recovery = labeled_address("recovery");
        let fee_receiver = config.fee_receiver.unwrap_or(deployer);
        let pool_funds = U256::from(config.pool_funds);
        let receiver_funds = U256::from(config.receiver_funds);
        host.fund(deployer, pool_funds + receiver_funds);

        let asset = host.deploy(deployer, WrappedAsset);
        let forwarder = host.deploy(deployer, Forwarder);
        let pool = host.deploy(
            deployer,
            Pool::new(PoolConfig {
                asset,
                trusted_forwarder: forwarder,
                fee_receiver,
                fixed_fee: U256::from(config.fixed_fee),
                batch_identity: config.batch_identity,
            }),
        );
        let receiver = host.deploy(deployer, FlashLoanReceiver::new(pool, asset));

        let mut deployment = Self {
            host,
            config,
            deployer,
            fee_receiver,
            player,
            recovery,
            asset,
            forwarder,
            pool,
            receiver,
        };

        deployment.setup_step(
            "pool deposit",
            deployer,
            pool,
            pool_funds,
            &IPool::depositCall {}.abi_encode(),
        )?;
        deployment.setup_step(
            "wrap receiver funds",
            deployer,
            asset,
            receiver_funds,
            &IWrappedAsset::depositCall {}.abi_encode(),
        )?;
        deployment.setup_step(
            "fund receiver",
            deployer,
            asset,
            U256::ZERO,
            &IWrappedAsset::transferCall {
                to: receiver,
                amount: receiver_funds,
            }
            .abi_encode(),
        )?;

        info!(
            %asset,
            %forwarder,
            %pool,
            %receiver,
            batch_identity = %deployment.config.batch_identity,
            "deployment ready"
        );
        Ok(deployment)
    }

    fn setup_step(
        &mut self,
        step: &'static str,
        from: Address,
        to: Address,
        value: U256,
        data: &[u8],
    ) -> Result<(), DeploymentError> {
        let receipt = self.send(from, to, value, data);
        receipt
            .outcome
            .map(|_| ())
            .map_err(|revert| DeploymentError::SetupReverted { step, revert })
    }

    /// Submit a transaction with the configured gas limit.
    pub fn send(&mut self, from: Address, to: Address, value: U256, data: &[u8]) -> Receipt {
        let msg = Message::new(from, to, data)
            .value(value)
            .gas_limit(self.config.tx_gas_limit);
        self.host.transact(msg)
    }

    /// Submit `execute(request, signature)` to the forwarder.
    pub fn relay(&mut self, from: Address, execute: &IForwarder::executeCall) -> Receipt {
        let value = execute.request.value;
        let forwarder = self.forwarder;
        self.send(from, forwarder, value, &execute.abi_encode())
    }

    pub fn asset_balance(&self, owner: Address) -> U256 {
        WrappedAsset::balance_of(&self.host, self.asset, owner)
    }

    pub fn nonce_of(&self, signer: Address) -> U256 {
        Forwarder::nonce_of(&self.host, self.forwarder, signer)
    }

    pub fn ledger(&mut self) -> Result<Ledger, Revert> {
        Ledger::fetch(&mut self.host, self.pool)
    }

    pub fn chain_id(&self) -> u64 {
        self.host.env().chain_id
    }

    pub fn timestamp(&self) -> u64 {
        self.host.env().timestamp
    }
}

/// Decode the `bool` returned by a relayed `execute`.
pub fn relay_succeeded(receipt: &Receipt) -> Option<bool> {
    let out: &Bytes = receipt.outcome.as_ref().ok()?;
    IForwarder::executeCall::abi_decode_returns(out, false)
        .ok()
        .map(|r| r.success)
}
