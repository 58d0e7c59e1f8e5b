//! Shared utilities for the contracts.

pub mod crypto;
pub mod labels;
