//! Pair hashing for Merkle roots.

use alloy_primitives::B256;
use sha2::{Digest, Sha256};

/// A 32-byte content hash identifying a tree node.
pub type Root = B256;

/// Host-supplied hash combining two child roots into a parent root.
pub type HashFn = fn(left: &Root, right: &Root) -> Root;

/// SHA-256 over `left || right`, the SSZ pair hash.
pub fn sha256_merge(left: &Root, right: &Root) -> Root {
    let mut hasher = Sha256::new();
    hasher.update(left.as_slice());
    hasher.update(right.as_slice());
    Root::from_slice(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_merge_zero_pair() {
        // H(0x00 * 64), the depth-1 zero subtree root.
        let expected: Root =
            "0xf5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
                .parse()
                .unwrap();
        assert_eq!(sha256_merge(&Root::ZERO, &Root::ZERO), expected);
    }

    #[test]
    fn test_sha256_merge_is_order_sensitive() {
        let a = Root::repeat_byte(0xAA);
        let b = Root::repeat_byte(0xBB);
        assert_ne!(sha256_merge(&a, &b), sha256_merge(&b, &a));
    }
}
