//! The tree-node capability set.
//!
//! Every node the engine consumes or serves implements [`Node`]: leaves and
//! constructed pairs here, lazily materialized stored pairs in
//! `merkle_db::virtual_node`. Children are shared `Arc` handles so subtrees
//! can appear under several parents without copying.

use std::sync::Arc;
use std::sync::OnceLock;
use std::fmt;

use crate::primitives::gindex::Gindex;
use crate::primitives::hasher::{HashFn, Root};

/// Errors surfaced by tree-node navigation and mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    /// A leaf has no children to navigate or rebind into.
    #[error("cannot navigate into a leaf node")]
    NavigationFromLeaf,

    /// Navigation would exceed the maximum gindex bit length.
    #[error("gindex exceeds the maximum bit length")]
    GindexOverflow,

    /// A backing-store failure while resolving a stored child.
    #[error("database error: {0}")]
    Database(String),
}

/// A deferred rebind: takes the node for a target position and produces the
/// tree with that position replaced.
pub type Link = Box<dyn FnOnce(Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError> + Send>;

/// A deferred summarization: collapses a target subtree into a leaf of its
/// Merkle root and produces the resulting tree.
pub type SummaryLink = Box<dyn FnOnce() -> Result<Arc<dyn Node>, NodeError> + Send>;

/// The link that returns its input unchanged.
pub fn identity() -> Link {
    Box::new(Ok)
}

/// A binary Merkle tree node.
///
/// Targets passed to `getter`/`setter`/`summarize_into` are interpreted
/// relative to `self`: the sentinel stands for this node and each following
/// bit selects a child.
pub trait Node: Send + Sync + fmt::Debug {
    /// The node's Merkle root. Pairs compute and cache it; leaves and
    /// stored nodes return it without hashing.
    fn merkle_root(&self, hash: HashFn) -> Root;

    /// Whether this node is a leaf.
    fn is_leaf(&self) -> bool;

    /// The left child.
    fn left(&self) -> Result<Arc<dyn Node>, NodeError>;

    /// The right child.
    fn right(&self) -> Result<Arc<dyn Node>, NodeError>;

    /// A new pair with the left child replaced and the right kept.
    fn rebind_left(&self, left: Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError>;

    /// A new pair with the right child replaced and the left kept.
    fn rebind_right(&self, right: Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError>;

    /// The node at `target`.
    fn getter(self: Arc<Self>, target: &Gindex) -> Result<Arc<dyn Node>, NodeError>;

    /// A link that replaces the node at `target`. With `expand`, leaves on
    /// the path are grown into zero-padded subtrees instead of failing.
    fn setter(self: Arc<Self>, target: &Gindex, expand: bool) -> Result<Link, NodeError>;

    /// A link that collapses the subtree at `target` into its root leaf.
    fn summarize_into(self: Arc<Self>, target: &Gindex, hash: HashFn)
        -> Result<SummaryLink, NodeError>;
}

/// Compose a child's setter with the parent rebind, descending one level.
pub fn deeper_setter(
    rebind: Link,
    child: Arc<dyn Node>,
    target: &Gindex,
    expand: bool,
) -> Result<Link, NodeError> {
    let inner = child.setter(&target.subtree(), expand)?;
    Ok(Box::new(move |node| rebind(inner(node)?)))
}

/// Generic summarization: resolve the target once, then hand back a link
/// that swaps it for a leaf of its Merkle root.
pub fn summary_into(
    node: Arc<dyn Node>,
    target: &Gindex,
    hash: HashFn,
) -> Result<SummaryLink, NodeError> {
    let setter = node.clone().setter(target, false)?;
    let subtree = node.getter(target)?;
    Ok(Box::new(move || {
        let root = subtree.merkle_root(hash);
        setter(Arc::new(LeafNode::new(root)))
    }))
}

/// A link that wraps its input in pairs of zero leaves along `target`,
/// placing the input at the target position of the resulting subtree.
pub fn expand_into(target: &Gindex) -> Result<Link, NodeError> {
    if target.is_root() {
        return Ok(identity());
    }
    let rest = expand_into(&target.subtree())?;
    let goes_left = target.is_left();
    Ok(Box::new(move |node| {
        let child = rest(node)?;
        let zero: Arc<dyn Node> = Arc::new(LeafNode::zero());
        Ok(if goes_left {
            Arc::new(PairNode::new(child, zero))
        } else {
            Arc::new(PairNode::new(zero, child))
        })
    }))
}

/// A leaf: a bare 32-byte root.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LeafNode {
    root: Root,
}

impl LeafNode {
    pub fn new(root: Root) -> Self {
        Self { root }
    }

    /// The all-zero leaf.
    pub fn zero() -> Self {
        Self { root: Root::ZERO }
    }

    pub fn root(&self) -> Root {
        self.root
    }
}

impl Node for LeafNode {
    fn merkle_root(&self, _hash: HashFn) -> Root {
        self.root
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn left(&self) -> Result<Arc<dyn Node>, NodeError> {
        Err(NodeError::NavigationFromLeaf)
    }

    fn right(&self) -> Result<Arc<dyn Node>, NodeError> {
        Err(NodeError::NavigationFromLeaf)
    }

    fn rebind_left(&self, _left: Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError> {
        Err(NodeError::NavigationFromLeaf)
    }

    fn rebind_right(&self, _right: Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError> {
        Err(NodeError::NavigationFromLeaf)
    }

    fn getter(self: Arc<Self>, target: &Gindex) -> Result<Arc<dyn Node>, NodeError> {
        if target.is_root() {
            Ok(self)
        } else {
            Err(NodeError::NavigationFromLeaf)
        }
    }

    fn setter(self: Arc<Self>, target: &Gindex, expand: bool) -> Result<Link, NodeError> {
        if target.is_root() {
            Ok(identity())
        } else if expand {
            expand_into(target)
        } else {
            Err(NodeError::NavigationFromLeaf)
        }
    }

    fn summarize_into(
        self: Arc<Self>,
        target: &Gindex,
        hash: HashFn,
    ) -> Result<SummaryLink, NodeError> {
        summary_into(self, target, hash)
    }
}

impl fmt::Debug for LeafNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LeafNode({})", self.root)
    }
}

/// A constructed pair of child handles with a lazily computed root.
pub struct PairNode {
    left: Arc<dyn Node>,
    right: Arc<dyn Node>,
    root: OnceLock<Root>,
}

impl PairNode {
    pub fn new(left: Arc<dyn Node>, right: Arc<dyn Node>) -> Self {
        Self { left, right, root: OnceLock::new() }
    }
}

impl Node for PairNode {
    fn merkle_root(&self, hash: HashFn) -> Root {
        *self.root.get_or_init(|| {
            let left = self.left.merkle_root(hash);
            let right = self.right.merkle_root(hash);
            hash(&left, &right)
        })
    }

    fn is_leaf(&self) -> bool {
        false
    }

    fn left(&self) -> Result<Arc<dyn Node>, NodeError> {
        Ok(self.left.clone())
    }

    fn right(&self) -> Result<Arc<dyn Node>, NodeError> {
        Ok(self.right.clone())
    }

    fn rebind_left(&self, left: Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError> {
        Ok(Arc::new(PairNode::new(left, self.right.clone())))
    }

    fn rebind_right(&self, right: Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError> {
        Ok(Arc::new(PairNode::new(self.left.clone(), right)))
    }

    fn getter(self: Arc<Self>, target: &Gindex) -> Result<Arc<dyn Node>, NodeError> {
        if target.is_root() {
            return Ok(self);
        }
        let child = if target.is_left() { self.left.clone() } else { self.right.clone() };
        child.getter(&target.subtree())
    }

    fn setter(self: Arc<Self>, target: &Gindex, expand: bool) -> Result<Link, NodeError> {
        if target.is_root() {
            return Ok(identity());
        }
        if target.is_close() {
            let this = self;
            return Ok(if target.is_left() {
                Box::new(move |node| this.rebind_left(node))
            } else {
                Box::new(move |node| this.rebind_right(node))
            });
        }
        if target.is_left() {
            let child = self.left.clone();
            let this = self;
            deeper_setter(Box::new(move |node| this.rebind_left(node)), child, target, expand)
        } else {
            let child = self.right.clone();
            let this = self;
            deeper_setter(Box::new(move |node| this.rebind_right(node)), child, target, expand)
        }
    }

    fn summarize_into(
        self: Arc<Self>,
        target: &Gindex,
        hash: HashFn,
    ) -> Result<SummaryLink, NodeError> {
        summary_into(self, target, hash)
    }
}

impl fmt::Debug for PairNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairNode")
            .field("left_is_leaf", &self.left.is_leaf())
            .field("right_is_leaf", &self.right.is_leaf())
            .finish()
    }
}
