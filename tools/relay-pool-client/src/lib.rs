//! Off-chain side of the relay: request signing and calldata construction.

pub mod calls;
pub mod drain;
pub mod signer;


pub use drain::{DrainPlan, DrainTargets};
pub use signer::{RequestSigner, SignerError};
