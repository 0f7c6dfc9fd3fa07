//! Tree primitives consumed by the Merkle store.
//!
//! The engine treats trees through a small capability set: a 32-byte
//! [`Root`] per node, a [`Gindex`] addressing positions, a host-supplied
//! [`HashFn`], and the [`Node`] trait for traversal and rebinding. The
//! store itself never hashes a stored node; roots travel in keys.

pub mod gindex;
pub mod hasher;
pub mod node;

pub use gindex::{Gindex, MAX_GINDEX_BITS};
pub use hasher::{sha256_merge, HashFn, Root};
pub use node::{
    deeper_setter, expand_into, identity, summary_into, LeafNode, Link, Node, NodeError,
    PairNode, SummaryLink,
};
