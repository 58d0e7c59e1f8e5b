//! Deterministic addresses for named actors.

use alloy_primitives::{keccak256, Address};

/// Address derived from a human-readable label: low 20 bytes of keccak256(label).
pub fn labeled_address(label: &str) -> Address {
    let hash = keccak256(label.as_bytes());
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable_and_distinct() {
        assert_eq!(labeled_address("deployer"), labeled_address("deployer"));
        assert_ne!(labeled_address("deployer"), labeled_address("recovery"));
    }
}
