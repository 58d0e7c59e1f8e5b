//! In-process EVM-style execution host.
//!
//! Provides what the chain provides to the contracts: accounts, storage, native value,
//! message calls with a gas meter, and whole-frame rollback. Execution is single-threaded
//! and strictly nested, so one `&mut Host` threads through every frame.

pub mod state;

use std::{collections::BTreeMap, rc::Rc};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, trace, warn};

use crate::{
    constants::{CALLDATA_BYTE_COST, CALL_COST, CALL_GAS_RETENTION, MAX_CALL_DEPTH, SSTORE_COST, VIEW_GAS},
    contracts::{Contract, Frame},
    errors::Revert,
};

pub use state::{mapping_slot, nested_mapping_slot, value_slot, WorldState};

/// Block environment visible to contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockEnv {
    pub chain_id: u64,
    pub timestamp: u64,
}

/// A message call.
#[derive(Clone, Copy, Debug)]
pub struct Message<'a> {
    pub caller: Address,
    pub target: Address,
    pub value: U256,
    pub data: &'a [u8],
    /// Upper bound; the callee never gets more than the 63/64 of what the caller has left.
    pub gas_limit: u64,
}

impl<'a> Message<'a> {
    pub fn new(caller: Address, target: Address, data: &'a [u8]) -> Self {
        Self {
            caller,
            target,
            value: U256::ZERO,
            data,
            gas_limit: u64::MAX,
        }
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// Outcome of a top-level transaction.
#[derive(Clone, Debug)]
pub struct Receipt {
    pub outcome: Result<Bytes, Revert>,
    pub gas_used: u64,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Return data on success, ABI revert data on failure.
    pub fn output(&self) -> Bytes {
        match &self.outcome {
            Ok(out) => out.clone(),
            Err(revert) => revert.revert_data(),
        }
    }

    pub fn revert(&self) -> Option<&Revert> {
        self.outcome.as_ref().err()
    }
}

pub struct Host {
    env: BlockEnv,
    state: WorldState,
    code: BTreeMap<Address, Rc<dyn Contract>>,
    account_nonces: BTreeMap<Address, u64>,
    gas_left: u64,
    depth: usize,
}

impl Host {
    pub fn new(env: BlockEnv) -> Self {
        Self {
            env,
            state: WorldState::default(),
            code: BTreeMap::new(),
            account_nonces: BTreeMap::new(),
            gas_left: 0,
            depth: 0,
        }
    }

    pub fn env(&self) -> BlockEnv {
        self.env
    }

    /// Move block time to `timestamp`.
    pub fn warp(&mut self, timestamp: u64) {
        self.env.timestamp = timestamp;
    }

    /// Genesis credit of native value.
    pub fn fund(&mut self, account: Address, amount: U256) {
        self.state.credit_native(account, amount);
    }

    pub fn native_balance(&self, account: Address) -> U256 {
        self.state.native_balance(account)
    }

    /// Install `contract` at the CREATE address of `deployer`'s next nonce.
    pub fn deploy<C: Contract + 'static>(&mut self, deployer: Address, contract: C) -> Address {
        let nonce = self.account_nonces.entry(deployer).or_insert(0);
        let address = deployer.create(*nonce);
        *nonce += 1;
        debug!(%deployer, %address, contract = contract.name(), "deployed");
        self.code.insert(address, Rc::new(contract));
        address
    }

    pub fn has_code(&self, account: Address) -> bool {
        self.code.contains_key(&account)
    }

    pub fn sload(&self, account: Address, slot: B256) -> U256 {
        self.state.sload(account, slot)
    }

    pub fn sstore(&mut self, account: Address, slot: B256, value: U256) -> Result<(), Revert> {
        self.charge(SSTORE_COST)?;
        self.state.sstore(account, slot, value);
        Ok(())
    }

    pub fn gas_left(&self) -> u64 {
        self.gas_left
    }

    pub fn charge(&mut self, cost: u64) -> Result<(), Revert> {
        if self.gas_left < cost {
            self.gas_left = 0;
            return Err(Revert::OutOfGas);
        }
        self.gas_left -= cost;
        Ok(())
    }

    /// Nested message call from inside a frame. State changes of the callee are undone if
    /// it reverts; the caller decides whether to bubble the error.
    pub fn call(&mut self, msg: Message<'_>) -> Result<Bytes, Revert> {
        let available = self.gas_left - self.gas_left / CALL_GAS_RETENTION;
        self.run_frame(msg, msg.gas_limit.min(available))
    }

    /// [`Host::call`] with typed calldata and return decoding.
    pub fn call_sol<C: SolCall>(
        &mut self,
        caller: Address,
        target: Address,
        call: &C,
    ) -> Result<C::Return, Revert> {
        let out = self.call(Message::new(caller, target, &call.abi_encode()))?;
        C::abi_decode_returns(&out, false).map_err(|_| Revert::BadCalldata)
    }

    /// Execute a top-level transaction.
    pub fn transact(&mut self, msg: Message<'_>) -> Receipt {
        debug_assert_eq!(self.depth, 0, "transactions do not nest");
        self.gas_left = msg.gas_limit;
        let outcome = self.run_frame(msg, msg.gas_limit);
        let gas_used = msg.gas_limit - self.gas_left;
        if let Err(ref revert) = outcome {
            warn!(from = %msg.caller, to = %msg.target, %revert, gas_used, "transaction reverted");
        }
        Receipt { outcome, gas_used }
    }

    /// Read-only call; every state change is discarded.
    pub fn view(&mut self, target: Address, data: &[u8]) -> Result<Bytes, Revert> {
        let checkpoint = self.state.clone();
        let parent_gas = self.gas_left;
        let result = self.run_frame(Message::new(Address::ZERO, target, data), VIEW_GAS);
        self.state = checkpoint;
        self.gas_left = parent_gas;
        result
    }

    /// [`Host::view`] with typed calldata and return decoding.
    pub fn view_sol<C: SolCall>(&mut self, target: Address, call: &C) -> Result<C::Return, Revert> {
        let out = self.view(target, &call.abi_encode())?;
        C::abi_decode_returns(&out, false).map_err(|_| Revert::BadCalldata)
    }

    fn run_frame(&mut self, msg: Message<'_>, gas: u64) -> Result<Bytes, Revert> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Revert::DepthExceeded);
        }
        let parent_gas = std::mem::replace(&mut self.gas_left, gas);
        let checkpoint = self.state.clone();

        self.depth += 1;
        let result = self.enter(&msg);
        self.depth -= 1;

        let used = gas - self.gas_left;
        self.gas_left = parent_gas.saturating_sub(used);
        if let Err(ref revert) = result {
            trace!(depth = self.depth, to = %msg.target, %revert, "frame reverted");
            self.state = checkpoint;
        }
        result
    }

    fn enter(&mut self, msg: &Message<'_>) -> Result<Bytes, Revert> {
        self.charge(CALL_COST + CALLDATA_BYTE_COST * msg.data.len() as u64)?;
        self.state.transfer_native(msg.caller, msg.target, msg.value)?;

        // No code: a plain value transfer.
        let Some(code) = self.code.get(&msg.target).cloned() else {
            return Ok(Bytes::new());
        };
        debug!(depth = self.depth, contract = code.name(), from = %msg.caller, "enter");
        code.call(
            self,
            Frame {
                address: msg.target,
                caller: msg.caller,
                value: msg.value,
                data: msg.data,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes its calldata length to slot 0, then reverts when asked to.
    struct Recorder;

    impl Contract for Recorder {
        fn name(&self) -> &'static str {
            "Recorder"
        }

        fn call(&self, host: &mut Host, frame: Frame<'_>) -> Result<Bytes, Revert> {
            host.sstore(frame.address, value_slot(0), U256::from(frame.data.len()))?;
            if frame.data.first() == Some(&0xff) {
                return Err(Revert::BadCalldata);
            }
            Ok(Bytes::new())
        }
    }

    fn env() -> BlockEnv {
        BlockEnv {
            chain_id: 31337,
            timestamp: 1_000,
        }
    }

    #[test]
    fn deploy_uses_create_addresses() {
        let mut host = Host::new(env());
        let deployer = Address::repeat_byte(0xd0);
        let first = host.deploy(deployer, Recorder);
        let second = host.deploy(deployer, Recorder);
        assert_eq!(first, deployer.create(0));
        assert_eq!(second, deployer.create(1));
        assert!(host.has_code(first));
    }

    #[test]
    fn reverted_frame_leaves_no_trace() {
        let mut host = Host::new(env());
        let sender = Address::repeat_byte(1);
        host.fund(sender, U256::from(100u64));
        let recorder = host.deploy(sender, Recorder);

        let ok = host.transact(Message::new(sender, recorder, &[1, 2, 3]).value(U256::from(10u64)).gas_limit(100_000));
        assert!(ok.is_success());
        assert_eq!(host.sload(recorder, value_slot(0)), U256::from(3u64));
        assert_eq!(host.native_balance(recorder), U256::from(10u64));

        let failed = host.transact(Message::new(sender, recorder, &[0xff]).value(U256::from(10u64)).gas_limit(100_000));
        assert_eq!(failed.revert(), Some(&Revert::BadCalldata));
        assert_eq!(host.sload(recorder, value_slot(0)), U256::from(3u64));
        assert_eq!(host.native_balance(sender), U256::from(90u64));
    }

    #[test]
    fn frames_run_out_of_gas() {
        let mut host = Host::new(env());
        let sender = Address::repeat_byte(1);
        let recorder = host.deploy(sender, Recorder);

        // Enough to enter, not enough to write.
        let receipt = host.transact(Message::new(sender, recorder, &[1]).gas_limit(CALL_COST + 100));
        assert_eq!(receipt.revert(), Some(&Revert::OutOfGas));
        assert_eq!(receipt.gas_used, CALL_COST + 100);
        assert_eq!(host.sload(recorder, value_slot(0)), U256::ZERO);
    }

    #[test]
    fn views_discard_writes() {
        let mut host = Host::new(env());
        let recorder = host.deploy(Address::repeat_byte(1), Recorder);
        host.view(recorder, &[1, 2]).unwrap();
        assert_eq!(host.sload(recorder, value_slot(0)), U256::ZERO);
    }

    #[test]
    fn calls_to_accounts_without_code_move_value() {
        let mut host = Host::new(env());
        let (a, b) = (Address::repeat_byte(1), Address::repeat_byte(2));
        host.fund(a, U256::from(5u64));
        let receipt = host.transact(Message::new(a, b, &[]).value(U256::from(5u64)).gas_limit(50_000));
        assert!(receipt.is_success());
        assert_eq!(host.native_balance(b), U256::from(5u64));
    }
}
