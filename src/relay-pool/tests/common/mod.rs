#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use eyre::{eyre, Result};

use relay_pool::{contracts::Forwarder, relay_succeeded, BatchIdentity, Deployment, Receipt, ScenarioConfig};
use relay_pool_client::{DrainPlan, DrainTargets, RequestSigner};
use relay_pool_types::{IForwarder, Request};

pub const REQUEST_GAS: u64 = 5_000_000;

pub struct World {
    pub d: Deployment,
    pub player: RequestSigner,
}

impl World {
    pub fn new(mode: BatchIdentity) -> Result<Self> {
        Self::build(mode, false)
    }

    /// World whose pool pays fees to, and is withdrawable by, the player.
    pub fn player_owned(mode: BatchIdentity) -> Result<Self> {
        Self::build(mode, true)
    }

    fn build(mode: BatchIdentity, player_is_fee_receiver: bool) -> Result<Self> {
        let player = RequestSigner::from_label("player")?;
        let config = ScenarioConfig {
            batch_identity: mode,
            fee_receiver: player_is_fee_receiver.then(|| player.address()),
            ..ScenarioConfig::default()
        };
        let d = Deployment::new(config, player.address())?;
        Ok(Self { d, player })
    }

    pub fn player_address(&self) -> Address {
        self.player.address()
    }

    pub fn deadline(&self) -> u64 {
        self.d.timestamp() + 3_600
    }

    /// Request from the player to the pool with the player's current nonce.
    pub fn request_to_pool(&self, data: Vec<u8>) -> Request {
        Request {
            from: self.player_address(),
            target: self.d.pool,
            value: U256::ZERO,
            gas: U256::from(REQUEST_GAS),
            nonce: self.d.nonce_of(self.player_address()),
            data: data.into(),
            deadline: U256::from(self.deadline()),
        }
    }

    pub fn sign(&self, request: Request) -> Result<IForwarder::executeCall> {
        let domain = Forwarder::domain(&self.d.host, self.d.forwarder);
        Ok(self.player.execute_call(request, &domain)?)
    }

    /// Player relays its own signed request.
    pub fn relay(&mut self, execute: &IForwarder::executeCall) -> Receipt {
        let player = self.player_address();
        self.d.relay(player, execute)
    }

    pub fn drain_plan(&mut self, loan_amount: u64) -> Result<DrainPlan> {
        let ledger = self.d.ledger()?;
        Ok(DrainPlan::size(
            DrainTargets {
                pool: self.d.pool,
                asset: self.d.asset,
                borrower: self.d.receiver,
                fee_receiver: ledger.fee_receiver,
                recovery: self.d.recovery,
            },
            ledger.total_balance,
            self.d.asset_balance(self.d.receiver),
            ledger.fee_per_loan,
            U256::from(loan_amount),
        ))
    }
}

pub fn units(n: u64) -> U256 {
    U256::from(n)
}

/// The `bool` returned by `execute`; errors if the relay call itself reverted.
pub fn relayed(receipt: &Receipt) -> Result<bool> {
    relay_succeeded(receipt).ok_or_else(|| eyre!("relay reverted: {:?}", receipt.revert()))
}
