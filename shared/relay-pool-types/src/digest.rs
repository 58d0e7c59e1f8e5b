//! EIP-712 digest of a forwarder [`Request`].
//!
//! The relay verifies signatures against this digest and the client signs it, so the
//! encoding is written out field by field. Any change in field order, type string or
//! domain tag breaks every externally produced signature.

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::interfaces::Request;

/// EIP-712 domain name of the forwarder.
pub const FORWARDER_NAME: &str = "BasicForwarder";
/// EIP-712 domain version of the forwarder.
pub const FORWARDER_VERSION: &str = "1";

pub const DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const REQUEST_TYPE: &[u8] =
    b"Request(address from,address target,uint256 value,uint256 gas,uint256 nonce,bytes data,uint256 deadline)";

/// Deployment-specific half of the domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForwarderDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl ForwarderDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }

    /// keccak256(typeHash ‖ nameHash ‖ versionHash ‖ chainId ‖ verifyingContract)
    pub fn separator(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(keccak256(DOMAIN_TYPE).as_slice());
        buf.extend_from_slice(keccak256(FORWARDER_NAME.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(FORWARDER_VERSION.as_bytes()).as_slice());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(self.verifying_contract.into_word().as_slice());
        keccak256(buf)
    }
}

/// Struct hash of a request. Dynamic `data` is hashed so every member is one word.
pub fn request_struct_hash(request: &Request) -> B256 {
    let mut buf = Vec::with_capacity(32 * 8);
    buf.extend_from_slice(keccak256(REQUEST_TYPE).as_slice());
    buf.extend_from_slice(request.from.into_word().as_slice());
    buf.extend_from_slice(request.target.into_word().as_slice());
    buf.extend_from_slice(&request.value.to_be_bytes::<32>());
    buf.extend_from_slice(&request.gas.to_be_bytes::<32>());
    buf.extend_from_slice(&request.nonce.to_be_bytes::<32>());
    buf.extend_from_slice(keccak256(&request.data).as_slice());
    buf.extend_from_slice(&request.deadline.to_be_bytes::<32>());
    keccak256(buf)
}

/// Final digest: keccak256("\x19\x01" ‖ domainSeparator ‖ structHash)
pub fn request_digest(domain: &ForwarderDomain, request: &Request) -> B256 {
    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(domain.separator().as_slice());
    buf.extend_from_slice(request_struct_hash(request).as_slice());
    keccak256(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, Bytes};
    use alloy_sol_types::{eip712_domain, SolStruct};

    fn sample_request() -> Request {
        Request {
            from: address!("1111111111111111111111111111111111111111"),
            target: address!("2222222222222222222222222222222222222222"),
            value: U256::from(7u64),
            gas: U256::from(1_000_000u64),
            nonce: U256::from(3u64),
            data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            deadline: U256::from(1_700_000_000u64),
        }
    }

    #[test]
    fn digest_matches_alloy_typed_data() {
        let forwarder = address!("3333333333333333333333333333333333333333");
        let domain = ForwarderDomain::new(31337, forwarder);
        let request = sample_request();

        let alloy_domain = eip712_domain! {
            name: FORWARDER_NAME,
            version: FORWARDER_VERSION,
            chain_id: 31337,
            verifying_contract: forwarder,
        };

        assert_eq!(domain.separator(), alloy_domain.separator());
        assert_eq!(request_struct_hash(&request), request.eip712_hash_struct());
        assert_eq!(
            request_digest(&domain, &request),
            request.eip712_signing_hash(&alloy_domain)
        );
    }

    #[test]
    fn digest_is_domain_scoped() {
        let request = sample_request();
        let a = ForwarderDomain::new(1, address!("3333333333333333333333333333333333333333"));
        let b = ForwarderDomain::new(2, a.verifying_contract);
        let c = ForwarderDomain::new(1, address!("4444444444444444444444444444444444444444"));

        assert_ne!(request_digest(&a, &request), request_digest(&b, &request));
        assert_ne!(request_digest(&a, &request), request_digest(&c, &request));
    }
}
