//! Signed meta-transaction relay and flash-loan accounting pool.
//!
//! The contracts run on [`host::Host`], an in-process EVM-style execution environment with
//! storage, native value, gas and per-frame rollback. The interesting part is the trust
//! boundary between [`contracts::Forwarder`], which tags relayed calldata with the verified
//! signer, and [`contracts::Pool`], which has to decide how far it believes that tag once
//! a call has been fanned out by `multicall`.

pub mod constants;
pub mod contracts;
pub mod deployment;
pub mod errors;
pub mod host;
pub mod utils;

pub use contracts::{BatchIdentity, Contract, Frame, Ledger};
pub use deployment::{relay_succeeded, Deployment, DeploymentError, ScenarioConfig};
pub use errors::{AssetError, ForwarderError, PoolError, ReceiverError, Revert};
pub use host::{BlockEnv, Host, Message, Receipt};
