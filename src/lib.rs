//! Persistent binary Merkle tree store over an ordered key/value backend.
//!
//! `merkledb` persists binary Merkle trees node by node: every record is
//! keyed by (namespace, generalized index, node root), so structurally
//! adjacent nodes co-locate in the backend while staying content
//! addressed. Inserting a tree walks it once, emits one record per node
//! into an atomic batch, and prunes subtrees the store already holds.
//! Reading returns either a plain leaf or a virtual node that fetches and
//! caches its children on demand, while still participating in the
//! generic tree-node operations (traversal, rebind, summarization).
//!
//! # Modules
//!
//! - [`primitives`]: gindex, roots, hashing, and the tree-node trait
//! - [`storage`]: the ordered key/value backend contract and an
//!   in-memory implementation
//! - [`merkle_db`]: the store engine: key/value codecs, writer, reader,
//!   virtual nodes, range scans

#![warn(unused_crate_dependencies)]

pub mod merkle_db;
pub mod primitives;
pub mod storage;

// Re-export the engine surface
pub use merkle_db::{Error, MerkleDb, Record, RecordError, SlottedNode, VirtualNode};

// Re-export the tree-node capability set
pub use primitives::{
    sha256_merge, Gindex, HashFn, LeafNode, Link, Node, NodeError, PairNode, Root,
    SummaryLink,
};

// Re-export the backend contract
pub use storage::{BatchOp, InMemoryStore, KeyValueStore, StoreError, WriteBatch};
