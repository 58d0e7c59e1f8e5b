mod common;

use std::{cell::RefCell, rc::Rc};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use common::{relayed, units, World, REQUEST_GAS};
use eyre::Result;

use relay_pool::{
    contracts::Forwarder, BatchIdentity, Contract, ForwarderError, Frame, Host, Message, Revert,
};
use relay_pool_client::{calls, RequestSigner};
use relay_pool_types::{ForwarderDomain, IForwarder, ITrustedForwarderAware, Request};

fn withdraw_request(w: &World) -> Request {
    w.request_to_pool(calls::withdraw(units(1), w.d.recovery))
}

fn forwarder_error(receipt: &relay_pool::Receipt) -> Option<ForwarderError> {
    match receipt.revert() {
        Some(Revert::Forwarder(e)) => Some(*e),
        _ => None,
    }
}

#[test]
fn nonce_is_consumed_once() -> Result<()> {
    let mut w = World::new(BatchIdentity::PerPayload)?;
    let player = w.player_address();
    let execute = w.sign(w.request_to_pool(calls::flash_loan(w.d.receiver, w.d.asset, units(0))))?;

    assert!(relayed(&w.relay(&execute))?);
    assert_eq!(w.d.nonce_of(player), units(1));

    let replay = w.relay(&execute);
    assert_eq!(
        forwarder_error(&replay),
        Some(ForwarderError::NonceMismatch {
            expected: units(1),
            provided: units(0),
        })
    );
    assert_eq!(w.d.nonce_of(player), units(1));
    Ok(())
}

#[test]
fn rejected_requests_leave_the_nonce_untouched() -> Result<()> {
    let mut w = World::new(BatchIdentity::PerPayload)?;
    let player = w.player_address();

    // Signed by someone else.
    let impostor = RequestSigner::from_label("impostor")?;
    let domain = Forwarder::domain(&w.d.host, w.d.forwarder);
    let forged = impostor.execute_call(withdraw_request(&w), &domain)?;
    assert_eq!(forwarder_error(&w.relay(&forged)), Some(ForwarderError::InvalidSignature));

    // Signed for a different forwarder.
    let elsewhere = ForwarderDomain::new(w.d.chain_id(), Address::repeat_byte(0xee));
    let cross = w.player.execute_call(withdraw_request(&w), &elsewhere)?;
    assert_eq!(forwarder_error(&w.relay(&cross)), Some(ForwarderError::InvalidSignature));

    // Target that does not trust the forwarder.
    let mut to_asset = withdraw_request(&w);
    to_asset.target = w.d.asset;
    let execute = w.sign(to_asset)?;
    assert_eq!(
        forwarder_error(&w.relay(&execute)),
        Some(ForwarderError::InvalidTarget(w.d.asset))
    );

    // Declared value not attached.
    let mut with_value = withdraw_request(&w);
    with_value.value = units(5);
    let execute = w.sign(with_value)?;
    let forwarder = w.d.forwarder;
    let receipt = w.d.send(player, forwarder, U256::ZERO, &execute.abi_encode());
    assert_eq!(
        forwarder_error(&receipt),
        Some(ForwarderError::InvalidValue {
            expected: units(5),
            provided: units(0),
        })
    );

    // Past its deadline.
    let execute = w.sign(withdraw_request(&w))?;
    let deadline = w.deadline();
    w.d.host.warp(deadline + 1);
    assert_eq!(
        forwarder_error(&w.relay(&execute)),
        Some(ForwarderError::Expired {
            deadline: U256::from(deadline),
            timestamp: deadline + 1,
        })
    );

    assert_eq!(w.d.nonce_of(player), units(0));
    Ok(())
}

#[test]
fn deadline_is_inclusive() -> Result<()> {
    let mut w = World::new(BatchIdentity::PerPayload)?;
    let execute = w.sign(w.request_to_pool(calls::flash_loan(w.d.receiver, w.d.asset, units(1))))?;
    let deadline = w.deadline();
    w.d.host.warp(deadline);
    assert!(relayed(&w.relay(&execute))?);
    Ok(())
}

#[test]
fn starved_forwarded_call_reports_false_and_consumes_the_nonce() -> Result<()> {
    let mut w = World::new(BatchIdentity::PerPayload)?;
    let player = w.player_address();
    let mut request = w.request_to_pool(calls::flash_loan(w.d.receiver, w.d.asset, units(1)));
    request.gas = U256::from(3_000u64);
    let execute = w.sign(request)?;

    assert!(!relayed(&w.relay(&execute))?);
    assert_eq!(w.d.nonce_of(player), units(1));
    assert_eq!(w.d.asset_balance(w.d.receiver), units(10));
    Ok(())
}

#[test]
fn domain_separator_matches_the_client() -> Result<()> {
    let mut w = World::new(BatchIdentity::PerPayload)?;
    let forwarder = w.d.forwarder;
    let onchain = w.d.host.view_sol(forwarder, &IForwarder::domainSeparatorCall {})?._0;
    let expected = ForwarderDomain::new(w.d.chain_id(), forwarder).separator();
    assert_eq!(onchain, expected);

    let player = w.player_address();
    let nonce = w.d.host.view_sol(forwarder, &IForwarder::noncesCall { signer: player })?._0;
    assert_eq!(nonce, U256::ZERO);
    Ok(())
}

/// Trusts the forwarder and, when called through it, re-submits the request it was given.
struct Replayer {
    forwarder: Address,
    calldata: Rc<RefCell<Vec<u8>>>,
    outcome: Rc<RefCell<Option<Result<Bytes, Revert>>>>,
}

impl Contract for Replayer {
    fn name(&self) -> &'static str {
        "Replayer"
    }

    fn call(&self, host: &mut Host, frame: Frame<'_>) -> Result<Bytes, Revert> {
        if frame.data.starts_with(&ITrustedForwarderAware::trustedForwarderCall::SELECTOR) {
            return Ok(self.forwarder.abi_encode().into());
        }
        let calldata = self.calldata.borrow().clone();
        let result = host.call(Message::new(frame.address, self.forwarder, &calldata));
        *self.outcome.borrow_mut() = Some(result);
        Ok(Bytes::new())
    }
}

#[test]
fn reentrant_replay_is_rejected() -> Result<()> {
    let mut w = World::new(BatchIdentity::PerPayload)?;
    let calldata = Rc::new(RefCell::new(Vec::new()));
    let outcome = Rc::new(RefCell::new(None));
    let deployer = w.d.deployer;
    let replayer = w.d.host.deploy(
        deployer,
        Replayer {
            forwarder: w.d.forwarder,
            calldata: Rc::clone(&calldata),
            outcome: Rc::clone(&outcome),
        },
    );

    let mut request = w.request_to_pool(vec![0x01, 0x02, 0x03, 0x04]);
    request.target = replayer;
    let execute = w.sign(request)?;
    *calldata.borrow_mut() = execute.abi_encode();

    assert!(relayed(&w.relay(&execute))?);
    assert_eq!(
        outcome.borrow().clone(),
        Some(Err(Revert::Forwarder(ForwarderError::NonceMismatch {
            expected: units(1),
            provided: units(0),
        })))
    );
    assert_eq!(w.d.nonce_of(w.player_address()), units(1));
    Ok(())
}

#[test]
fn request_gas_bounds_the_forwarded_call() -> Result<()> {
    let mut w = World::new(BatchIdentity::PerPayload)?;
    let execute = w.sign(w.request_to_pool(calls::flash_loan(w.d.receiver, w.d.asset, units(1))))?;
    let receipt = w.relay(&execute);
    assert!(relayed(&receipt)?);
    assert!(receipt.gas_used < REQUEST_GAS);
    Ok(())
}
