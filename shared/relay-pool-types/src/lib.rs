//! Shared types for the signed relay and the flash-loan pool (on-chain/off-chain).

pub mod digest;
pub mod identity;
pub mod interfaces;

pub use digest::{request_digest, ForwarderDomain, FORWARDER_NAME, FORWARDER_VERSION};
pub use identity::{append_identity, trailing_identity, IDENTITY_LEN};
pub use interfaces::{
    IFlashBorrower, IForwarder, IPool, ITrustedForwarderAware, IWrappedAsset, Request,
};
