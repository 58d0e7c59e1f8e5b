//! Gas schedule and protocol constants.

use alloy_primitives::{keccak256, B256};

/// Flat charge for entering any call frame.
pub const CALL_COST: u64 = 2_600;
/// Per byte of calldata handed to a frame.
pub const CALLDATA_BYTE_COST: u64 = 16;
/// Per storage write.
pub const SSTORE_COST: u64 = 5_000;
/// A frame forwards at most `available - available / CALL_GAS_RETENTION` to its child.
pub const CALL_GAS_RETENTION: u64 = 64;
pub const MAX_CALL_DEPTH: usize = 1024;

/// Gas allowed for `trustedForwarder()` when the forwarder vets a target.
pub const TARGET_CHECK_GAS: u64 = 30_000;
/// Gas the host grants to `view` calls.
pub const VIEW_GAS: u64 = 10_000_000;

/// ERC-3156 borrower success word.
pub fn callback_success() -> B256 {
    keccak256(b"ERC3156FlashBorrower.onFlashLoan")
}
