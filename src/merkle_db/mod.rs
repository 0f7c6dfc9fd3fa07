//! Persistent binary Merkle tree store.
//!
//! This module persists arbitrary binary Merkle trees (as used in
//! SSZ-style commitments) on an ordered key/value backend and serves
//! subtrees back as lazily materialized node handles.
//!
//! # On-disk format
//!
//! All integers, including the gindex bit length, are little-endian;
//! the gindex itself is left-bit-aligned big-endian.
//!
//! ```text
//! Leaf node:
//! namespace(3) ++ u16(gindex_bitlen) ++ gindex ++ bytes32(self)
//!   -> u8(0) ++ u64(slot)
//!
//! Pair node:
//! namespace(3) ++ u16(gindex_bitlen) ++ gindex ++ bytes32(self)
//!   -> u8(1) ++ u64(slot) ++ bytes32(left) ++ bytes32(right)
//! ```
//!
//! # Flow
//!
//! ```text
//! put(slot, tree) ──walk──> one record per node ──> atomic batch
//!                    └─ child already stored? prune the subtree
//!
//! get(gindex, root) ──> leaf record  -> LeafNode
//!                   └─> pair record  -> VirtualNode ──lazy get──> children
//! ```

pub mod db;
pub mod error;
pub mod keys;
pub mod record;
pub mod virtual_node;

pub use db::{MerkleDb, SlottedNode};
pub use error::{Error, Side};
pub use keys::{encode_key, encode_prefix, KeyScratch, MAX_KEY_LEN, NAMESPACE_LEN, ROOT_LEN};
pub use record::{Record, RecordError, LEAF_RECORD_LEN, LEAF_TAG, PAIR_RECORD_LEN, PAIR_TAG};
pub use virtual_node::VirtualNode;
