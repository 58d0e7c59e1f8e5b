//! Contracts executed by the [`Host`].
//!
//! A contract is immutable code: construction-time parameters live in the struct, every
//! mutable value lives in host storage under the contract's address. That keeps
//! re-entrant calls (pool → borrower → asset → ...) free of aliasing and lets the host
//! roll any frame back by restoring its state checkpoint.

pub mod asset;
pub mod forwarder;
pub mod pool;
pub mod receiver;

use alloy_primitives::{Address, Bytes, U256};

use crate::{errors::Revert, host::Host};

pub use asset::WrappedAsset;
pub use forwarder::Forwarder;
pub use pool::{BatchIdentity, Ledger, Origin, Pool, PoolConfig};
pub use receiver::FlashLoanReceiver;

/// Execution context of one call frame.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    /// Address of the executing contract.
    pub address: Address,
    /// Immediate caller (`msg.sender`).
    pub caller: Address,
    pub value: U256,
    pub data: &'a [u8],
}

impl Frame<'_> {
    /// Same context, different calldata (`delegatecall` into self).
    pub fn with_data<'b>(&self, data: &'b [u8]) -> Frame<'b> {
        Frame {
            address: self.address,
            caller: self.caller,
            value: self.value,
            data,
        }
    }
}

pub trait Contract {
    /// Label for logs.
    fn name(&self) -> &'static str;

    /// Handle calldata. An `Err` reverts the frame.
    fn call(&self, host: &mut Host, frame: Frame<'_>) -> Result<Bytes, Revert>;
}
