use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolError;
use thiserror::Error;

use relay_pool_types::{IFlashBorrower, IForwarder, IPool, IWrappedAsset};

/// Authentication-layer failures of the forwarder. Fatal to the single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ForwarderError {
    #[error("signature does not recover to the request signer")]
    InvalidSignature,
    #[error("request expired at {deadline} (now {timestamp})")]
    Expired { deadline: U256, timestamp: u64 },
    #[error("nonce mismatch: expected {expected}, got {provided}")]
    NonceMismatch { expected: U256, provided: U256 },
    #[error("target {0} does not trust this forwarder")]
    InvalidTarget(Address),
    #[error("request value {expected} does not match msg.value {provided}")]
    InvalidValue { expected: U256, provided: U256 },
}

/// Accounting-layer failures of the pool. Abort the enclosing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("flash loan of {principal} to {borrower} not repaid with fee {fee}")]
    LoanNotRepaid {
        borrower: Address,
        principal: U256,
        fee: U256,
    },
    #[error("requested {requested}, available {available}")]
    InsufficientBalance { requested: U256, available: U256 },
    #[error("{caller} is not authorized")]
    Unauthorized { caller: Address },
    #[error("token {0} is not the pool asset")]
    UnsupportedCurrency(Address),
    #[error("flash-loan callback on {0} failed")]
    CallbackFailed(Address),
}

/// Asset (ERC-20) failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("{owner} holds {balance}, needs {needed}")]
    InsufficientBalance {
        owner: Address,
        balance: U256,
        needed: U256,
    },
    #[error("{spender} may spend {allowance} of {owner}, needs {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: U256,
        needed: U256,
    },
}

/// Flash-loan receiver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReceiverError {
    #[error("callback from untrusted lender {0}")]
    UntrustedLender(Address),
    #[error("unexpected loan token {0}")]
    UnsupportedCurrency(Address),
}

/// Reason a call frame reverted. Every effect of the frame is undone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Revert {
    #[error(transparent)]
    Forwarder(#[from] ForwarderError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Receiver(#[from] ReceiverError),
    #[error("out of gas")]
    OutOfGas,
    #[error("call depth exceeded")]
    DepthExceeded,
    #[error("{account} holds {balance} native, needs {needed}")]
    InsufficientNative {
        account: Address,
        balance: U256,
        needed: U256,
    },
    #[error("calldata does not match any function")]
    BadCalldata,
    #[error("function is not payable")]
    NonPayable,
}

impl Revert {
    /// ABI revert data, as a Solidity caller would observe it.
    ///
    /// Host-level failures (gas, depth, native balance) revert without data.
    pub fn revert_data(&self) -> Bytes {
        let encoded = match *self {
            Revert::Forwarder(e) => match e {
                ForwarderError::InvalidSignature => IForwarder::InvalidSignature {}.abi_encode(),
                ForwarderError::Expired {
                    deadline,
                    timestamp,
                } => IForwarder::Expired {
                    deadline,
                    timestamp: U256::from(timestamp),
                }
                .abi_encode(),
                ForwarderError::NonceMismatch { expected, provided } => {
                    IForwarder::NonceMismatch { expected, provided }.abi_encode()
                }
                ForwarderError::InvalidTarget(target) => {
                    IForwarder::InvalidTarget { target }.abi_encode()
                }
                ForwarderError::InvalidValue { expected, provided } => {
                    IForwarder::InvalidValue { expected, provided }.abi_encode()
                }
            },
            Revert::Pool(e) => match e {
                PoolError::LoanNotRepaid {
                    borrower,
                    principal,
                    fee,
                } => IPool::LoanNotRepaid {
                    borrower,
                    principal,
                    fee,
                }
                .abi_encode(),
                PoolError::InsufficientBalance {
                    requested,
                    available,
                } => IPool::InsufficientBalance {
                    requested,
                    available,
                }
                .abi_encode(),
                PoolError::Unauthorized { caller } => IPool::Unauthorized { caller }.abi_encode(),
                PoolError::UnsupportedCurrency(token) => {
                    IPool::UnsupportedCurrency { token }.abi_encode()
                }
                PoolError::CallbackFailed(receiver) => {
                    IPool::CallbackFailed { receiver }.abi_encode()
                }
            },
            Revert::Asset(e) => match e {
                AssetError::InsufficientBalance {
                    owner,
                    balance,
                    needed,
                } => IWrappedAsset::InsufficientBalance {
                    owner,
                    balance,
                    needed,
                }
                .abi_encode(),
                AssetError::InsufficientAllowance {
                    owner,
                    spender,
                    allowance,
                    needed,
                } => IWrappedAsset::InsufficientAllowance {
                    owner,
                    spender,
                    allowance,
                    needed,
                }
                .abi_encode(),
            },
            Revert::Receiver(e) => match e {
                ReceiverError::UntrustedLender(lender) => {
                    IFlashBorrower::UntrustedLender { lender }.abi_encode()
                }
                ReceiverError::UnsupportedCurrency(token) => {
                    IFlashBorrower::UnsupportedCurrency { token }.abi_encode()
                }
            },
            Revert::OutOfGas
            | Revert::DepthExceeded
            | Revert::InsufficientNative { .. }
            | Revert::BadCalldata
            | Revert::NonPayable => Vec::new(),
        };
        Bytes::from(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_data_carries_solidity_selector() {
        let revert = Revert::from(ForwarderError::NonceMismatch {
            expected: U256::from(1u64),
            provided: U256::ZERO,
        });
        let data = revert.revert_data();
        assert_eq!(&data[..4], IForwarder::NonceMismatch::SELECTOR.as_slice());
        assert_eq!(data.len(), 4 + 64);

        let decoded = IForwarder::NonceMismatch::abi_decode(&data, true).unwrap();
        assert_eq!(decoded.expected, U256::from(1u64));
    }

    #[test]
    fn host_failures_revert_without_data() {
        assert!(Revert::OutOfGas.revert_data().is_empty());
        assert!(Revert::BadCalldata.revert_data().is_empty());
        assert!(Revert::NonPayable.revert_data().is_empty());
    }
}
