//! On-disk key layout.
//!
//! Every record key is
//!
//! ```text
//! namespace(3) ++ gindex_bit_len(u16 LE) ++ gindex_left_aligned_BE ++ root(32)
//! ```
//!
//! The bit length precedes the gindex bytes so that, within a namespace,
//! keys at the same depth sort together; within a depth they order by
//! position, then by root. Gindex bit lengths of 0 or above 256 are
//! unrepresentable by construction (see [`Gindex`]).

use crate::primitives::{Gindex, Root};

/// Length of the namespace partitioning the shared backend.
pub const NAMESPACE_LEN: usize = 3;
/// Length of the little-endian gindex bit-length field.
pub const GINDEX_LEN_BYTES: usize = 2;
/// Maximum length of the left-aligned gindex segment.
pub const MAX_GINDEX_BYTES: usize = 32;
/// Length of the node-root suffix.
pub const ROOT_LEN: usize = 32;
/// Longest possible key.
pub const MAX_KEY_LEN: usize = NAMESPACE_LEN + GINDEX_LEN_BYTES + MAX_GINDEX_BYTES + ROOT_LEN;

const GINDEX_OFF: usize = NAMESPACE_LEN + GINDEX_LEN_BYTES;

/// The key for the record of the node with `root` at `gindex`.
pub fn encode_key(namespace: &[u8; NAMESPACE_LEN], gindex: &Gindex, root: &Root) -> Vec<u8> {
    let gindex_bytes = gindex.as_left_aligned();
    let mut key = Vec::with_capacity(GINDEX_OFF + gindex_bytes.len() + ROOT_LEN);
    key.extend_from_slice(namespace);
    key.extend_from_slice(&gindex.bit_len().to_le_bytes());
    key.extend_from_slice(gindex_bytes);
    key.extend_from_slice(root.as_slice());
    key
}

/// The shared prefix of all record keys at `gindex`: the key without its
/// root suffix. Used for range scans.
pub fn encode_prefix(namespace: &[u8; NAMESPACE_LEN], gindex: &Gindex) -> Vec<u8> {
    let gindex_bytes = gindex.as_left_aligned();
    let mut prefix = Vec::with_capacity(GINDEX_OFF + gindex_bytes.len());
    prefix.extend_from_slice(namespace);
    prefix.extend_from_slice(&gindex.bit_len().to_le_bytes());
    prefix.extend_from_slice(gindex_bytes);
    prefix
}

/// The writer's in-place key buffer.
///
/// During the recursive insert the scratchpad holds the key of the node
/// currently being visited: descending writes the child's path bit into
/// the gindex segment and swaps the root suffix for the child's root, so
/// no per-node allocation is needed. The buffer is a depth-first encoding
/// of the current path; bits at and below the current position are kept
/// zero so a later [`KeyScratch::key`] slice is always well formed.
#[derive(Debug)]
pub struct KeyScratch {
    buf: [u8; MAX_KEY_LEN],
}

impl KeyScratch {
    /// A scratchpad positioned at the tree root (gindex 1) with `root` in
    /// the suffix.
    pub fn new(namespace: &[u8; NAMESPACE_LEN], root: &Root) -> Self {
        let mut buf = [0u8; MAX_KEY_LEN];
        buf[..NAMESPACE_LEN].copy_from_slice(namespace);
        buf[NAMESPACE_LEN..GINDEX_OFF].copy_from_slice(&1u16.to_le_bytes());
        buf[GINDEX_OFF] = 0x80;
        buf[GINDEX_OFF + 1..GINDEX_OFF + 1 + ROOT_LEN].copy_from_slice(root.as_slice());
        Self { buf }
    }

    /// The key of the node at `bit_index` (0 for the root), assuming the
    /// path bits and root suffix for that node are already in place.
    pub fn key(&mut self, bit_index: u16) -> &[u8] {
        self.buf[NAMESPACE_LEN..GINDEX_OFF].copy_from_slice(&(bit_index + 1).to_le_bytes());
        let len = GINDEX_OFF + (bit_index as usize >> 3) + 1 + ROOT_LEN;
        &self.buf[..len]
    }

    /// Step into the left child at `child_bit_index`, installing its root.
    ///
    /// Clears the child's path bit and every trailing bit of that byte;
    /// when the step enters a fresh gindex byte this wipes the whole byte,
    /// which may still hold root bytes from a shallower key.
    pub fn descend_left(&mut self, child_bit_index: u16, root: &Root) {
        let byte = GINDEX_OFF + (child_bit_index as usize >> 3);
        let bit = 0x80u8 >> (child_bit_index & 7);
        self.buf[byte] &= !(bit | bit.wrapping_sub(1));
        self.buf[byte + 1..byte + 1 + ROOT_LEN].copy_from_slice(root.as_slice());
    }

    /// Step into the right child at `child_bit_index`, installing its root.
    pub fn descend_right(&mut self, child_bit_index: u16, root: &Root) {
        let byte = GINDEX_OFF + (child_bit_index as usize >> 3);
        let bit = 0x80u8 >> (child_bit_index & 7);
        self.buf[byte] = (self.buf[byte] | bit) & !bit.wrapping_sub(1);
        self.buf[byte + 1..byte + 1 + ROOT_LEN].copy_from_slice(root.as_slice());
    }
}
