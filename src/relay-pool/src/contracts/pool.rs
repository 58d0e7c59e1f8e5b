//! Flash-loan accounting pool with batched self-calls and a privileged withdrawal.
//!
//! Design notes:
//! - Loans are ERC-3156 style: lend, call back, pull `principal + fee`, verify.
//! - The fee is flat per loan and anyone may trigger a loan for any borrower, so a third
//!   party can make a borrower pay the fee as often as it likes.
//! - The logical caller of an operation is the trailing identity suffix when the trusted
//!   forwarder is `msg.sender`, otherwise `msg.sender` itself.
//! - `multicall` dispatches every payload as a self-call with the outer `msg.sender`. With
//!   [`BatchIdentity::PerPayload`] each payload re-reads its own trailing bytes, so whoever
//!   writes the batch chooses the identity of every inner call.
//!   [`BatchIdentity::CapturedOnce`] resolves the identity once from the outer call and
//!   threads it through the batch unchanged.
//! - `withdraw` only runs as a batch payload. Called directly it is `Unauthorized`.
//! - Only `deposit` is payable. Batch payloads therefore always run with zero value.

use std::{fmt, str::FromStr};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolInterface};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use relay_pool_types::{
    trailing_identity, IFlashBorrower,
    IPool::{self, IPoolCalls},
    IWrappedAsset,
};

use crate::{
    constants::callback_success,
    contracts::{Contract, Frame},
    errors::{PoolError, Revert},
    host::{value_slot, Host, Message},
};

/// `uint256 totalDeposits`
const TOTAL_DEPOSITS_SLOT: u64 = 0;

/// How `multicall` resolves the logical caller of the operations it contains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchIdentity {
    /// Each payload re-derives the caller from its own trailing bytes.
    #[default]
    PerPayload,
    /// The caller is resolved once from the outer call and applied to every payload.
    CapturedOnce,
}

impl fmt::Display for BatchIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchIdentity::PerPayload => "per-payload",
            BatchIdentity::CapturedOnce => "captured-once",
        })
    }
}

impl FromStr for BatchIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-payload" => Ok(BatchIdentity::PerPayload),
            "captured-once" => Ok(BatchIdentity::CapturedOnce),
            other => Err(format!(
                "unknown batch identity mode `{other}` (expected per-payload or captured-once)"
            )),
        }
    }
}

/// How a dispatch was reached, and where its logical caller comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Top-level call into the pool. Caller derived from the frame.
    Direct,
    /// Batch payload. Caller derived from the payload's own frame.
    Batched,
    /// Batch payload with the caller fixed by the enclosing batch; calldata is not consulted.
    Captured(Address),
}

/// Construction-time parameters of a pool.
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    pub asset: Address,
    pub trusted_forwarder: Address,
    pub fee_receiver: Address,
    /// Charged once per loan, whatever the amount.
    pub fixed_fee: U256,
    pub batch_identity: BatchIdentity,
}

/// Accounting view of a pool, as returned by `ledger()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ledger {
    pub total_balance: U256,
    pub fee_receiver: Address,
    pub fee_per_loan: U256,
    pub max_loan_amount: U256,
}

impl Ledger {
    pub fn fetch(host: &mut Host, pool: Address) -> Result<Self, Revert> {
        let r = host.view_sol(pool, &IPool::ledgerCall {})?;
        Ok(Self {
            total_balance: r.totalBalance,
            fee_receiver: r.feeReceiver,
            fee_per_loan: r.feePerLoan,
            max_loan_amount: r.maxLoanAmount,
        })
    }
}

/// One in-flight loan.
#[derive(Clone, Copy, Debug)]
struct LoanRecord {
    borrower: Address,
    principal: U256,
    fee: U256,
}

impl LoanRecord {
    fn repayment(&self) -> U256 {
        self.principal + self.fee
    }

    fn not_repaid(&self) -> Revert {
        PoolError::LoanNotRepaid {
            borrower: self.borrower,
            principal: self.principal,
            fee: self.fee,
        }
        .into()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Pool {
    config: PoolConfig,
}

impl Pool {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn total_deposits(host: &Host, pool: Address) -> U256 {
        host.sload(pool, value_slot(TOTAL_DEPOSITS_SLOT))
    }

    fn set_total_deposits(host: &mut Host, pool: Address, total: U256) -> Result<(), Revert> {
        host.sstore(pool, value_slot(TOTAL_DEPOSITS_SLOT), total)
    }

    /// Logical caller of the operation in `frame`.
    fn msg_sender(&self, frame: Frame<'_>, origin: Origin) -> Address {
        match origin {
            Origin::Captured(sender) => sender,
            Origin::Direct | Origin::Batched if frame.caller == self.config.trusted_forwarder => {
                trailing_identity(frame.data).unwrap_or(frame.caller)
            }
            Origin::Direct | Origin::Batched => frame.caller,
        }
    }

    fn max_flash_loan(&self, host: &mut Host, pool: Address, token: Address) -> Result<U256, Revert> {
        if token != self.config.asset {
            return Ok(U256::ZERO);
        }
        let balance = host.call_sol(pool, token, &IWrappedAsset::balanceOfCall { owner: pool })?;
        Ok(balance._0)
    }

    fn dispatch(&self, host: &mut Host, frame: Frame<'_>, origin: Origin) -> Result<Vec<u8>, Revert> {
        let call = IPoolCalls::abi_decode(frame.data, false).map_err(|_| Revert::BadCalldata)?;
        if !frame.value.is_zero() && !matches!(call, IPoolCalls::deposit(_)) {
            return Err(Revert::NonPayable);
        }
        let out = match call {
            IPoolCalls::flashLoan(c) => {
                self.flash_loan(host, frame, c.receiver, c.token, c.amount, c.data)?;
                IPool::flashLoanCall::abi_encode_returns(&(true,))
            }
            IPoolCalls::multicall(c) => {
                let results = self.multicall(host, frame, &c.data, origin)?;
                IPool::multicallCall::abi_encode_returns(&(results,))
            }
            IPoolCalls::withdraw(c) => {
                self.withdraw(host, frame, origin, c.amount, c.receiver)?;
                Vec::new()
            }
            IPoolCalls::deposit(_) => {
                self.deposit(host, frame)?;
                Vec::new()
            }
            IPoolCalls::flashFee(c) => {
                if c.token != self.config.asset {
                    return Err(PoolError::UnsupportedCurrency(c.token).into());
                }
                IPool::flashFeeCall::abi_encode_returns(&(self.config.fixed_fee,))
            }
            IPoolCalls::maxFlashLoan(c) => {
                let max = self.max_flash_loan(host, frame.address, c.token)?;
                IPool::maxFlashLoanCall::abi_encode_returns(&(max,))
            }
            IPoolCalls::totalDeposits(_) => {
                let total = Self::total_deposits(host, frame.address);
                IPool::totalDepositsCall::abi_encode_returns(&(total,))
            }
            IPoolCalls::feeReceiver(_) => {
                IPool::feeReceiverCall::abi_encode_returns(&(self.config.fee_receiver,))
            }
            IPoolCalls::trustedForwarder(_) => {
                IPool::trustedForwarderCall::abi_encode_returns(&(self.config.trusted_forwarder,))
            }
            IPoolCalls::asset(_) => IPool::assetCall::abi_encode_returns(&(self.config.asset,)),
            IPoolCalls::ledger(_) => {
                let total = Self::total_deposits(host, frame.address);
                let max = self.max_flash_loan(host, frame.address, self.config.asset)?;
                IPool::ledgerCall::abi_encode_returns(&(
                    total,
                    self.config.fee_receiver,
                    self.config.fixed_fee,
                    max,
                ))
            }
        };
        Ok(out)
    }

    fn flash_loan(
        &self,
        host: &mut Host,
        frame: Frame<'_>,
        receiver: Address,
        token: Address,
        amount: U256,
        data: Bytes,
    ) -> Result<(), Revert> {
        let pool = frame.address;
        let asset = self.config.asset;
        if token != asset {
            return Err(PoolError::UnsupportedCurrency(token).into());
        }
        let balance_before = self.max_flash_loan(host, pool, token)?;
        if amount > balance_before {
            return Err(PoolError::InsufficientBalance {
                requested: amount,
                available: balance_before,
            }
            .into());
        }
        if !host.has_code(receiver) {
            return Err(PoolError::CallbackFailed(receiver).into());
        }

        let loan = LoanRecord {
            borrower: receiver,
            principal: amount,
            fee: self.config.fixed_fee,
        };
        debug!(borrower = %loan.borrower, principal = %loan.principal, fee = %loan.fee, "flash loan");

        host.call_sol(pool, asset, &IWrappedAsset::transferCall { to: receiver, amount })?;
        let total = Self::total_deposits(host, pool);
        let lent = total.checked_sub(amount).ok_or(PoolError::InsufficientBalance {
            requested: amount,
            available: total,
        })?;
        Self::set_total_deposits(host, pool, lent)?;

        let callback = IFlashBorrower::onFlashLoanCall {
            initiator: frame.caller,
            token,
            amount,
            fee: loan.fee,
            data,
        };
        let word = host
            .call_sol(pool, receiver, &callback)
            .map_err(|e| match e {
                Revert::BadCalldata => PoolError::CallbackFailed(receiver).into(),
                other => other,
            })?
            ._0;
        if word != callback_success() {
            return Err(PoolError::CallbackFailed(receiver).into());
        }

        let pull = IWrappedAsset::transferFromCall {
            from: receiver,
            to: pool,
            amount: loan.repayment(),
        };
        host.call_sol(pool, asset, &pull).map_err(|e| match e {
            Revert::Asset(_) => loan.not_repaid(),
            other => other,
        })?;
        Self::set_total_deposits(host, pool, lent + loan.repayment())?;

        let balance_after = self.max_flash_loan(host, pool, token)?;
        if balance_after < balance_before + loan.fee {
            return Err(loan.not_repaid());
        }
        info!(
            initiator = %frame.caller,
            borrower = %loan.borrower,
            principal = %loan.principal,
            fee = %loan.fee,
            "flash loan repaid"
        );
        Ok(())
    }

    fn multicall(
        &self,
        host: &mut Host,
        frame: Frame<'_>,
        payloads: &[Bytes],
        origin: Origin,
    ) -> Result<Vec<Bytes>, Revert> {
        let inner = match (self.config.batch_identity, origin) {
            (_, Origin::Captured(sender)) => Origin::Captured(sender),
            (BatchIdentity::PerPayload, _) => Origin::Batched,
            (BatchIdentity::CapturedOnce, _) => Origin::Captured(self.msg_sender(frame, origin)),
        };
        debug!(payloads = payloads.len(), ?inner, "batch");

        let mut results = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            let out = self
                .dispatch(host, frame.with_data(payload), inner)
                .inspect_err(|revert| debug!(index, %revert, "batch payload failed"))?;
            results.push(Bytes::from(out));
        }
        Ok(results)
    }

    fn withdraw(
        &self,
        host: &mut Host,
        frame: Frame<'_>,
        origin: Origin,
        amount: U256,
        receiver: Address,
    ) -> Result<(), Revert> {
        let sender = self.msg_sender(frame, origin);
        if origin == Origin::Direct || sender != self.config.fee_receiver {
            return Err(PoolError::Unauthorized { caller: sender }.into());
        }

        let total = Self::total_deposits(host, frame.address);
        if amount > total {
            return Err(PoolError::InsufficientBalance {
                requested: amount,
                available: total,
            }
            .into());
        }
        Self::set_total_deposits(host, frame.address, total - amount)?;
        host.call_sol(
            frame.address,
            self.config.asset,
            &IWrappedAsset::transferCall {
                to: receiver,
                amount,
            },
        )?;
        info!(%sender, %receiver, %amount, "withdrawal");
        Ok(())
    }

    fn deposit(&self, host: &mut Host, frame: Frame<'_>) -> Result<(), Revert> {
        let wrap = IWrappedAsset::depositCall {}.abi_encode();
        host.call(Message::new(frame.address, self.config.asset, &wrap).value(frame.value))?;
        let total = Self::total_deposits(host, frame.address);
        Self::set_total_deposits(host, frame.address, total + frame.value)?;
        debug!(depositor = %frame.caller, amount = %frame.value, "deposit");
        Ok(())
    }
}

impl Contract for Pool {
    fn name(&self) -> &'static str {
        "Pool"
    }

    fn call(&self, host: &mut Host, frame: Frame<'_>) -> Result<Bytes, Revert> {
        self.dispatch(host, frame, Origin::Direct).map(Bytes::from)
    }
}
