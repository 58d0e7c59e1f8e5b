//! Trailing identity suffix convention (ERC-2771 style).
//!
//! The forwarder appends the verified signer's 20-byte address to the calldata it relays.
//! A receiver that trusts the forwarder reads it back from the end of `msg.data`. The
//! suffix says nothing about who put it there: only the receiver knows whether the bytes
//! arrived straight from the forwarder.

use alloy_primitives::Address;

/// Width of the identity suffix.
pub const IDENTITY_LEN: usize = 20;

/// `payload ‖ identity`, the same bytes as `abi.encodePacked(payload, identity)`.
pub fn append_identity(payload: &[u8], identity: Address) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + IDENTITY_LEN);
    out.extend_from_slice(payload);
    out.extend_from_slice(identity.as_slice());
    out
}

/// Last 20 bytes of `data` as an address, if there are that many.
pub fn trailing_identity(data: &[u8]) -> Option<Address> {
    if data.len() < IDENTITY_LEN {
        return None;
    }
    Some(Address::from_slice(&data[data.len() - IDENTITY_LEN..]))
}
