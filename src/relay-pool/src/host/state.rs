//! World state: contract storage and native balances.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::errors::Revert;

/// Storage and native balances of every account.
///
/// Cloned as a checkpoint on frame entry; a reverted frame restores its checkpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldState {
    storage: BTreeMap<(Address, B256), U256>,
    native: BTreeMap<Address, U256>,
}

impl WorldState {
    pub fn sload(&self, account: Address, slot: B256) -> U256 {
        self.storage
            .get(&(account, slot))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn sstore(&mut self, account: Address, slot: B256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(account, slot));
        } else {
            self.storage.insert((account, slot), value);
        }
    }

    pub fn native_balance(&self, account: Address) -> U256 {
        self.native.get(&account).copied().unwrap_or(U256::ZERO)
    }

    pub fn credit_native(&mut self, account: Address, amount: U256) {
        let balance = self.native_balance(account).saturating_add(amount);
        self.native.insert(account, balance);
    }

    pub fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<(), Revert> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self.native_balance(from);
        if balance < amount {
            return Err(Revert::InsufficientNative {
                account: from,
                balance,
                needed: amount,
            });
        }
        self.native.insert(from, balance - amount);
        self.credit_native(to, amount);
        Ok(())
    }
}

/// Solidity layout of `mapping(address => ..)` at `slot`: keccak256(pad32(key) ‖ slot).
pub fn mapping_slot(key: Address, slot: u64) -> B256 {
    let mut buf = Vec::with_capacity(32 + 32);
    buf.extend_from_slice(key.into_word().as_slice());
    buf.extend_from_slice(&U256::from(slot).to_be_bytes::<32>());
    keccak256(buf)
}

/// Slot of `mapping(address => mapping(address => ..))[outer][inner]` rooted at `slot`.
pub fn nested_mapping_slot(outer: Address, inner: Address, slot: u64) -> B256 {
    let root = mapping_slot(outer, slot);
    let mut buf = Vec::with_capacity(32 + 32);
    buf.extend_from_slice(inner.into_word().as_slice());
    buf.extend_from_slice(root.as_slice());
    keccak256(buf)
}

/// Plain value slot.
pub fn value_slot(slot: u64) -> B256 {
    B256::from(U256::from(slot).to_be_bytes::<32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_writes_clear_the_slot() {
        let mut state = WorldState::default();
        let account = Address::repeat_byte(1);
        state.sstore(account, value_slot(0), U256::from(5u64));
        assert_eq!(state.sload(account, value_slot(0)), U256::from(5u64));

        state.sstore(account, value_slot(0), U256::ZERO);
        assert_eq!(state, WorldState::default());
    }

    #[test]
    fn native_transfer_requires_balance() {
        let mut state = WorldState::default();
        let (a, b) = (Address::repeat_byte(1), Address::repeat_byte(2));
        state.credit_native(a, U256::from(10u64));

        state.transfer_native(a, b, U256::from(4u64)).unwrap();
        assert_eq!(state.native_balance(a), U256::from(6u64));
        assert_eq!(state.native_balance(b), U256::from(4u64));

        let err = state.transfer_native(a, b, U256::from(7u64)).unwrap_err();
        assert!(matches!(err, Revert::InsufficientNative { .. }));
    }

    #[test]
    fn mapping_slots_are_distinct_per_key_and_root() {
        let (a, b) = (Address::repeat_byte(1), Address::repeat_byte(2));
        assert_ne!(mapping_slot(a, 0), mapping_slot(b, 0));
        assert_ne!(mapping_slot(a, 0), mapping_slot(a, 1));
        assert_ne!(nested_mapping_slot(a, b, 1), nested_mapping_slot(b, a, 1));
    }
}
