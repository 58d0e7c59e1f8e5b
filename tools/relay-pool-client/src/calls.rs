//! Calldata builders for the pool.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;

use relay_pool_types::{append_identity, IPool};

pub fn flash_loan(receiver: Address, token: Address, amount: U256) -> Vec<u8> {
    IPool::flashLoanCall {
        receiver,
        token,
        amount,
        data: Bytes::new(),
    }
    .abi_encode()
}

pub fn withdraw(amount: U256, receiver: Address) -> Vec<u8> {
    IPool::withdrawCall { amount, receiver }.abi_encode()
}

/// Append `identity` to a payload. Only meaningful to a pool that trusts the immediate
/// caller to have put it there.
pub fn tagged(payload: Vec<u8>, identity: Address) -> Vec<u8> {
    append_identity(&payload, identity)
}

pub fn multicall(payloads: Vec<Vec<u8>>) -> Vec<u8> {
    IPool::multicallCall {
        data: payloads.into_iter().map(Bytes::from).collect(),
    }
    .abi_encode()
}
