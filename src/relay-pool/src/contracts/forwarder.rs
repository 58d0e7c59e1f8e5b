//! Signed meta-transaction relay.
//!
//! The forwarder executes a [`Request`] on behalf of its signer and appends the signer's
//! address to the relayed calldata. To the target the immediate caller is always the
//! forwarder, so that 20-byte suffix is the only channel carrying "who authorized this".
//! The forwarder vouches for the suffix of its own top-level dispatch and nothing else:
//! bytes nested inside the payload are the signer's to choose.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolInterface};
use tracing::{debug, info, warn};

use relay_pool_types::{
    append_identity, request_digest, ForwarderDomain,
    IForwarder::{self, IForwarderCalls},
    ITrustedForwarderAware, Request,
};

use crate::{
    constants::TARGET_CHECK_GAS,
    contracts::{Contract, Frame},
    errors::{ForwarderError, Revert},
    host::{mapping_slot, Host, Message},
    utils::crypto::recover_signer,
};

/// `mapping(address => uint256) nonces`
const NONCES_SLOT: u64 = 0;

#[derive(Clone, Copy, Debug, Default)]
pub struct Forwarder;

impl Forwarder {
    /// Next valid nonce of `signer`.
    pub fn nonce_of(host: &Host, forwarder: Address, signer: Address) -> U256 {
        host.sload(forwarder, mapping_slot(signer, NONCES_SLOT))
    }

    /// EIP-712 domain of the forwarder deployed at `forwarder`.
    pub fn domain(host: &Host, forwarder: Address) -> ForwarderDomain {
        ForwarderDomain::new(host.env().chain_id, forwarder)
    }

    /// Validate a request without consuming it.
    ///
    /// Order: value, deadline, nonce, target, signature. Cheap checks first; the nonce
    /// check precedes signature recovery so a replay always reports `NonceMismatch`.
    fn check_request(
        &self,
        host: &mut Host,
        frame: Frame<'_>,
        request: &Request,
        signature: &[u8],
    ) -> Result<(), ForwarderError> {
        if request.value != frame.value {
            return Err(ForwarderError::InvalidValue {
                expected: request.value,
                provided: frame.value,
            });
        }

        let timestamp = host.env().timestamp;
        if U256::from(timestamp) > request.deadline {
            return Err(ForwarderError::Expired {
                deadline: request.deadline,
                timestamp,
            });
        }

        let expected = Self::nonce_of(host, frame.address, request.from);
        if request.nonce != expected {
            return Err(ForwarderError::NonceMismatch {
                expected,
                provided: request.nonce,
            });
        }

        if self.trusted_forwarder_of(host, frame.address, request.target) != Some(frame.address) {
            return Err(ForwarderError::InvalidTarget(request.target));
        }

        let digest = request_digest(&Self::domain(host, frame.address), request);
        match recover_signer(digest, signature) {
            Ok(signer) if signer == request.from => Ok(()),
            _ => Err(ForwarderError::InvalidSignature),
        }
    }

    /// Ask `target` which forwarder it trusts. `None` if it cannot answer.
    fn trusted_forwarder_of(&self, host: &mut Host, forwarder: Address, target: Address) -> Option<Address> {
        let query = ITrustedForwarderAware::trustedForwarderCall {}.abi_encode();
        let out = host
            .call(Message::new(forwarder, target, &query).gas_limit(TARGET_CHECK_GAS))
            .ok()?;
        ITrustedForwarderAware::trustedForwarderCall::abi_decode_returns(&out, false)
            .ok()
            .map(|r| r._0)
    }

    fn execute(
        &self,
        host: &mut Host,
        frame: Frame<'_>,
        request: &Request,
        signature: &[u8],
    ) -> Result<bool, Revert> {
        self.check_request(host, frame, request, signature)?;

        // Consume the nonce before dispatch: a re-entrant replay or a failing call
        // cannot make the same request valid again.
        let slot = mapping_slot(request.from, NONCES_SLOT);
        host.sstore(frame.address, slot, request.nonce + U256::from(1u64))?;

        let payload = append_identity(&request.data, request.from);
        let gas = request.gas.saturating_to::<u64>();
        debug!(target = %request.target, gas, len = payload.len(), "forwarding");

        let result = host.call(
            Message::new(frame.address, request.target, &payload)
                .value(request.value)
                .gas_limit(gas),
        );
        match &result {
            Ok(_) => info!(
                signer = %request.from,
                target = %request.target,
                nonce = %request.nonce,
                "relayed request succeeded"
            ),
            Err(revert) => warn!(
                signer = %request.from,
                target = %request.target,
                nonce = %request.nonce,
                %revert,
                "relayed request failed; nonce consumed"
            ),
        }
        Ok(result.is_ok())
    }
}

impl Contract for Forwarder {
    fn name(&self) -> &'static str {
        "Forwarder"
    }

    fn call(&self, host: &mut Host, frame: Frame<'_>) -> Result<Bytes, Revert> {
        let call = IForwarderCalls::abi_decode(frame.data, false).map_err(|_| Revert::BadCalldata)?;
        // `execute` checks its value against the request.
        if !frame.value.is_zero() && !matches!(call, IForwarderCalls::execute(_)) {
            return Err(Revert::NonPayable);
        }
        let out = match call {
            IForwarderCalls::execute(c) => {
                let success = self.execute(host, frame, &c.request, &c.signature)?;
                IForwarder::executeCall::abi_encode_returns(&(success,))
            }
            IForwarderCalls::nonces(c) => {
                let nonce = Self::nonce_of(host, frame.address, c.signer);
                IForwarder::noncesCall::abi_encode_returns(&(nonce,))
            }
            IForwarderCalls::domainSeparator(_) => {
                let separator = Self::domain(host, frame.address).separator();
                IForwarder::domainSeparatorCall::abi_encode_returns(&(separator,))
            }
        };
        Ok(out.into())
    }
}
