//! Wrapped native asset (WETH-style ERC-20), the fungible asset the pool lends.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolInterface};
use tracing::trace;

use relay_pool_types::IWrappedAsset::{self, IWrappedAssetCalls};

use crate::{
    contracts::{Contract, Frame},
    errors::{AssetError, Revert},
    host::{mapping_slot, nested_mapping_slot, value_slot, Host, Message},
};

const BALANCES_SLOT: u64 = 0;
const ALLOWANCES_SLOT: u64 = 1;
const TOTAL_SUPPLY_SLOT: u64 = 2;

#[derive(Clone, Copy, Debug, Default)]
pub struct WrappedAsset;

impl WrappedAsset {
    pub fn balance_of(host: &Host, asset: Address, owner: Address) -> U256 {
        host.sload(asset, mapping_slot(owner, BALANCES_SLOT))
    }

    pub fn allowance(host: &Host, asset: Address, owner: Address, spender: Address) -> U256 {
        host.sload(asset, nested_mapping_slot(owner, spender, ALLOWANCES_SLOT))
    }

    fn move_balance(
        host: &mut Host,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        let from_balance = Self::balance_of(host, asset, from);
        if from_balance < amount {
            return Err(AssetError::InsufficientBalance {
                owner: from,
                balance: from_balance,
                needed: amount,
            }
            .into());
        }
        host.sstore(asset, mapping_slot(from, BALANCES_SLOT), from_balance - amount)?;
        let to_balance = Self::balance_of(host, asset, to);
        host.sstore(asset, mapping_slot(to, BALANCES_SLOT), to_balance + amount)?;
        trace!(%from, %to, %amount, "asset transfer");
        Ok(())
    }

    fn spend_allowance(
        host: &mut Host,
        asset: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        let allowance = Self::allowance(host, asset, owner, spender);
        // Infinite approvals are never decremented.
        if allowance == U256::MAX {
            return Ok(());
        }
        if allowance < amount {
            return Err(AssetError::InsufficientAllowance {
                owner,
                spender,
                allowance,
                needed: amount,
            }
            .into());
        }
        host.sstore(
            asset,
            nested_mapping_slot(owner, spender, ALLOWANCES_SLOT),
            allowance - amount,
        )
    }

    fn adjust_supply(host: &mut Host, asset: Address, to: U256) -> Result<(), Revert> {
        host.sstore(asset, value_slot(TOTAL_SUPPLY_SLOT), to)
    }
}

impl Contract for WrappedAsset {
    fn name(&self) -> &'static str {
        "WrappedAsset"
    }

    fn call(&self, host: &mut Host, frame: Frame<'_>) -> Result<Bytes, Revert> {
        let asset = frame.address;
        let call =
            IWrappedAssetCalls::abi_decode(frame.data, false).map_err(|_| Revert::BadCalldata)?;
        if !frame.value.is_zero() && !matches!(call, IWrappedAssetCalls::deposit(_)) {
            return Err(Revert::NonPayable);
        }

        let out = match call {
            IWrappedAssetCalls::deposit(_) => {
                let balance = Self::balance_of(host, asset, frame.caller);
                host.sstore(asset, mapping_slot(frame.caller, BALANCES_SLOT), balance + frame.value)?;
                let supply = host.sload(asset, value_slot(TOTAL_SUPPLY_SLOT));
                Self::adjust_supply(host, asset, supply + frame.value)?;
                Vec::new()
            }
            IWrappedAssetCalls::withdraw(c) => {
                let balance = Self::balance_of(host, asset, frame.caller);
                if balance < c.amount {
                    return Err(AssetError::InsufficientBalance {
                        owner: frame.caller,
                        balance,
                        needed: c.amount,
                    }
                    .into());
                }
                host.sstore(asset, mapping_slot(frame.caller, BALANCES_SLOT), balance - c.amount)?;
                let supply = host.sload(asset, value_slot(TOTAL_SUPPLY_SLOT));
                Self::adjust_supply(host, asset, supply - c.amount)?;
                host.call(Message::new(asset, frame.caller, &[]).value(c.amount))?;
                Vec::new()
            }
            IWrappedAssetCalls::transfer(c) => {
                Self::move_balance(host, asset, frame.caller, c.to, c.amount)?;
                IWrappedAsset::transferCall::abi_encode_returns(&(true,))
            }
            IWrappedAssetCalls::transferFrom(c) => {
                if c.from != frame.caller {
                    Self::spend_allowance(host, asset, c.from, frame.caller, c.amount)?;
                }
                Self::move_balance(host, asset, c.from, c.to, c.amount)?;
                IWrappedAsset::transferFromCall::abi_encode_returns(&(true,))
            }
            IWrappedAssetCalls::approve(c) => {
                host.sstore(
                    asset,
                    nested_mapping_slot(frame.caller, c.spender, ALLOWANCES_SLOT),
                    c.amount,
                )?;
                IWrappedAsset::approveCall::abi_encode_returns(&(true,))
            }
            IWrappedAssetCalls::balanceOf(c) => {
                let balance = Self::balance_of(host, asset, c.owner);
                IWrappedAsset::balanceOfCall::abi_encode_returns(&(balance,))
            }
            IWrappedAssetCalls::allowance(c) => {
                let allowance = Self::allowance(host, asset, c.owner, c.spender);
                IWrappedAsset::allowanceCall::abi_encode_returns(&(allowance,))
            }
            IWrappedAssetCalls::totalSupply(_) => {
                let supply = host.sload(asset, value_slot(TOTAL_SUPPLY_SLOT));
                IWrappedAsset::totalSupplyCall::abi_encode_returns(&(supply,))
            }
        };
        Ok(out.into())
    }
}
