//! Flash-loan borrower holding its own asset balance.
//!
//! It only accepts callbacks from its pool and for the pool's asset, and always approves
//! the repayment. It does not care who initiated the loan.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;

use relay_pool_types::{IFlashBorrower, IWrappedAsset};

use crate::{
    constants::callback_success,
    contracts::{Contract, Frame},
    errors::{ReceiverError, Revert},
    host::Host,
};

#[derive(Clone, Copy, Debug)]
pub struct FlashLoanReceiver {
    pool: Address,
    asset: Address,
}

impl FlashLoanReceiver {
    pub fn new(pool: Address, asset: Address) -> Self {
        Self { pool, asset }
    }
}

impl Contract for FlashLoanReceiver {
    fn name(&self) -> &'static str {
        "FlashLoanReceiver"
    }

    fn call(&self, host: &mut Host, frame: Frame<'_>) -> Result<Bytes, Revert> {
        if !frame.value.is_zero() {
            return Err(Revert::NonPayable);
        }
        let c = IFlashBorrower::onFlashLoanCall::abi_decode(frame.data, false)
            .map_err(|_| Revert::BadCalldata)?;

        if frame.caller != self.pool {
            return Err(ReceiverError::UntrustedLender(frame.caller).into());
        }
        if c.token != self.asset {
            return Err(ReceiverError::UnsupportedCurrency(c.token).into());
        }

        let approve = IWrappedAsset::approveCall {
            spender: self.pool,
            amount: c.amount + c.fee,
        };
        host.call_sol(frame.address, self.asset, &approve)?;

        Ok(IFlashBorrower::onFlashLoanCall::abi_encode_returns(&(callback_success(),)).into())
    }
}
