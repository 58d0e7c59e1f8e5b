use alloy_primitives::{keccak256, Address, Bytes};
use k256::ecdsa::SigningKey;
use thiserror::Error;

use relay_pool_types::{request_digest, ForwarderDomain, IForwarder, Request};

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("private key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("private key is not a valid secp256k1 scalar")]
    InvalidKey,
    #[error("signing failed")]
    Signing,
}

/// Holds a secp256k1 key and signs forwarder requests with it.
#[derive(Clone)]
pub struct RequestSigner {
    key: SigningKey,
}

impl RequestSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Deterministic key for a named test actor: the key bytes are keccak256(label).
    pub fn from_label(label: &str) -> Result<Self, SignerError> {
        let seed = keccak256(label.as_bytes());
        let key = SigningKey::from_slice(seed.as_slice()).map_err(|_| SignerError::InvalidKey)?;
        Ok(Self::new(key))
    }

    /// Parse a 32-byte private key, with or without `0x`.
    pub fn from_hex(private_key: &str) -> Result<Self, SignerError> {
        let raw = hex::decode(private_key.trim().trim_start_matches("0x"))?;
        let key = SigningKey::from_slice(&raw).map_err(|_| SignerError::InvalidKey)?;
        Ok(Self::new(key))
    }

    pub fn address(&self) -> Address {
        let point = self.key.verifying_key().to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        Address::from_slice(&hash[12..])
    }

    /// 65-byte `r || s || v` signature over the request digest, with v in {27, 28}.
    pub fn sign(&self, request: &Request, domain: &ForwarderDomain) -> Result<Bytes, SignerError> {
        let digest = request_digest(domain, request);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|_| SignerError::Signing)?;

        let mut sig_bytes = Vec::with_capacity(65);
        sig_bytes.extend_from_slice(&signature.to_bytes());
        sig_bytes.push(27 + recovery_id.to_byte());
        Ok(sig_bytes.into())
    }

    /// Sign `request` and wrap it into forwarder calldata.
    pub fn execute_call(
        &self,
        request: Request,
        domain: &ForwarderDomain,
    ) -> Result<IForwarder::executeCall, SignerError> {
        let signature = self.sign(&request, domain)?;
        Ok(IForwarder::executeCall { request, signature })
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
