//! Signature recovery for forwarder requests.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Recover the EOA that signed a 32-byte digest with a 65-byte `r || s || v` signature.
///
/// Notes:
/// - v is accepted in {27, 28} and {0, 1}; anything else fails.
/// - high-s signatures are rejected so a signature has exactly one valid encoding.
pub fn recover_signer(digest: B256, sig: &[u8]) -> Result<Address, ()> {
    if sig.len() != 65 {
        return Err(());
    }
    let v = match sig[64] {
        27 | 28 => sig[64] - 27,
        0 | 1 => sig[64],
        _ => return Err(()),
    };

    let signature = Signature::from_slice(&sig[..64]).map_err(|_| ())?;
    if signature.normalize_s().is_some() {
        return Err(());
    }
    let recovery_id = RecoveryId::from_byte(v).ok_or(())?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| ())?;
    Ok(address_of(&key))
}

/// Ethereum address of a secp256k1 public key: low 20 bytes of keccak256(x ‖ y).
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
