//! Lazily materialized stored nodes.
//!
//! A [`VirtualNode`] stands in for a pair record: it knows its own root and
//! its children's roots, and resolves each child against the store the
//! first time it is asked for. Once both children are cached the store
//! handle is released, so a fully materialized subtree no longer pins the
//! backend.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::primitives::{
    deeper_setter, identity, summary_into, Gindex, HashFn, Link, Node, NodeError, PairNode,
    Root, SummaryLink,
};

use super::db::MerkleDb;

/// A stored pair node whose children are fetched on demand.
///
/// The node itself is immutable: rebinds produce fresh in-memory
/// [`PairNode`]s. The child caches are the only mutable state; they are
/// written once and a failed load leaves them empty, so the next call
/// simply retries.
pub struct VirtualNode {
    db: RwLock<Option<MerkleDb>>,
    gindex: Gindex,
    root: Root,
    left_root: Root,
    right_root: Root,
    left_cache: RwLock<Option<Arc<dyn Node>>>,
    right_cache: RwLock<Option<Arc<dyn Node>>>,
}

impl VirtualNode {
    /// A handle for the pair stored at `gindex` with `root`, referencing
    /// children `left_root` and `right_root`.
    pub fn new(db: MerkleDb, gindex: Gindex, root: Root, left_root: Root, right_root: Root) -> Self {
        Self {
            db: RwLock::new(Some(db)),
            gindex,
            root,
            left_root,
            right_root,
            left_cache: RwLock::new(None),
            right_cache: RwLock::new(None),
        }
    }

    /// The stored roots of the two children.
    pub fn child_roots(&self) -> (Root, Root) {
        (self.left_root, self.right_root)
    }

    /// Force-load both children and release the store handle, making this
    /// node's immediate subtree independent of the store.
    pub fn detach(&self) -> Result<(), NodeError> {
        self.left()?;
        self.right()?;
        Ok(())
    }

    fn fetch(&self, gindex: Option<Gindex>, root: &Root) -> Result<Arc<dyn Node>, NodeError> {
        let gindex = gindex.ok_or(NodeError::GindexOverflow)?;
        let db = self
            .db
            .read()
            .clone()
            .ok_or_else(|| NodeError::Database("store handle already released".into()))?;
        let slotted = db.get(&gindex, root)?;
        Ok(slotted.node)
    }

    /// Drop the store handle once both children are materialized.
    fn release_if_complete(&self) {
        if self.left_cache.read().is_some() && self.right_cache.read().is_some() {
            *self.db.write() = None;
        }
    }
}

impl Node for VirtualNode {
    /// The root stored in the key; never rehashes.
    fn merkle_root(&self, _hash: HashFn) -> Root {
        self.root
    }

    fn is_leaf(&self) -> bool {
        false
    }

    fn left(&self) -> Result<Arc<dyn Node>, NodeError> {
        if let Some(node) = self.left_cache.read().clone() {
            return Ok(node);
        }
        let node = self.fetch(self.gindex.left(), &self.left_root)?;
        *self.left_cache.write() = Some(node.clone());
        self.release_if_complete();
        Ok(node)
    }

    fn right(&self) -> Result<Arc<dyn Node>, NodeError> {
        if let Some(node) = self.right_cache.read().clone() {
            return Ok(node);
        }
        let node = self.fetch(self.gindex.right(), &self.right_root)?;
        *self.right_cache.write() = Some(node.clone());
        self.release_if_complete();
        Ok(node)
    }

    fn rebind_left(&self, left: Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError> {
        let right = self.right()?;
        Ok(Arc::new(PairNode::new(left, right)))
    }

    fn rebind_right(&self, right: Arc<dyn Node>) -> Result<Arc<dyn Node>, NodeError> {
        let left = self.left()?;
        Ok(Arc::new(PairNode::new(left, right)))
    }

    fn getter(self: Arc<Self>, target: &Gindex) -> Result<Arc<dyn Node>, NodeError> {
        if target.is_root() {
            return Ok(self);
        }
        let child = if target.is_left() { self.left()? } else { self.right()? };
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
        // TODO: defer this load until the link runs, like the depth-1
        // rebind path already does.
        if target.is_left() {
            let child = self.left()?;
            let this = self;
            deeper_setter(Box::new(move |node| this.rebind_left(node)), child, target, expand)
        } else {
            let child = self.right()?;
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

impl fmt::Debug for VirtualNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualNode")
            .field("gindex", &self.gindex)
            .field("root", &self.root)
            .field("left", &self.left_root)
            .field("right", &self.right_root)
            .field("attached", &self.db.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{sha256_merge, LeafNode};
    use crate::storage::InMemoryStore;
    use crate::KeyValueStore;

    const NS: [u8; 3] = [0x42, 0x30, 0x78];

    fn leaf(byte: u8) -> Arc<dyn Node> {
        Arc::new(LeafNode::new(Root::repeat_byte(byte)))
    }

    fn pair(left: Arc<dyn Node>, right: Arc<dyn Node>) -> Arc<dyn Node> {
        Arc::new(PairNode::new(left, right))
    }

    /// Store a depth-2 tree and hand back its virtual root.
    fn stored_tree() -> (MerkleDb, Arc<InMemoryStore>, Arc<VirtualNode>, Root) {
        let store = InMemoryStore::new_arc();
        let db = MerkleDb::new(NS, store.clone());
        let tree = pair(pair(leaf(0x01), leaf(0x02)), leaf(0x03));
        let root = tree.merkle_root(sha256_merge);
        db.put(1, tree.as_ref(), sha256_merge).unwrap();

        let left_root = sha256_merge(&Root::repeat_byte(0x01), &Root::repeat_byte(0x02));
        let node = Arc::new(VirtualNode::new(
            db.clone(),
            Gindex::ROOT,
            root,
            left_root,
            Root::repeat_byte(0x03),
        ));
        (db, store, node, root)
    }

    #[test]
    fn test_merkle_root_does_not_rehash() {
        let (_db, _store, node, root) = stored_tree();
        assert_eq!(node.merkle_root(sha256_merge), root);
        assert!(!node.is_leaf());
    }

    #[test]
    fn test_children_load_lazily() {
        let (_db, _store, node, _root) = stored_tree();

        let left = node.left().unwrap();
        assert!(!left.is_leaf());
        let right = node.right().unwrap();
        assert!(right.is_leaf());
        assert_eq!(right.merkle_root(sha256_merge), Root::repeat_byte(0x03));

        // Second load comes from the cache: same handle.
        let again = node.left().unwrap();
        assert!(Arc::ptr_eq(&left, &again));
    }

    #[test]
    fn test_detach_releases_store() {
        let (_db, store, node, _root) = stored_tree();
        node.detach().unwrap();

        // The backend can go away; the immediate subtree stays resolvable.
        store.close().unwrap();
        let left = node.left().unwrap();
        let right = node.right().unwrap();
        assert_eq!(
            sha256_merge(&left.merkle_root(sha256_merge), &right.merkle_root(sha256_merge)),
            node.merkle_root(sha256_merge)
        );

        // The grandchildren were materialized through the left virtual
        // node's own store handle before the close.
        let deep = left.left().unwrap_err();
        assert!(matches!(deep, NodeError::Database(_)));
    }

    #[test]
    fn test_failed_load_does_not_poison_cache() {
        let (_db, store, node, _root) = stored_tree();
        store.close().unwrap();
        assert!(node.left().is_err());

        // Reopening is not possible for InMemoryStore, but the error must
        // repeat rather than surface a stale cache entry.
        assert!(node.left().is_err());
    }

    #[test]
    fn test_getter_descends_through_store() {
        let (_db, _store, node, _root) = stored_tree();
        let target = Gindex::from_u64(0b101).unwrap();
        let found = node.getter(&target).unwrap();
        assert_eq!(found.merkle_root(sha256_merge), Root::repeat_byte(0x02));
    }

    #[test]
    fn test_rebind_left_builds_real_pair() {
        let (_db, _store, node, _root) = stored_tree();
        let rebound = node.rebind_left(leaf(0xFF)).unwrap();
        assert_eq!(
            rebound.merkle_root(sha256_merge),
            sha256_merge(&Root::repeat_byte(0xFF), &Root::repeat_byte(0x03))
        );
    }

    #[test]
    fn test_setter_at_depth_one_rebinds() {
        let (_db, _store, node, _root) = stored_tree();
        let link = node.clone().setter(&Gindex::from_u64(0b11).unwrap(), false).unwrap();
        let updated = link(leaf(0xEE)).unwrap();
        let (left_root, _) = node.child_roots();
        assert_eq!(
            updated.merkle_root(sha256_merge),
            sha256_merge(&left_root, &Root::repeat_byte(0xEE))
        );
    }

    #[test]
    fn test_setter_descends_below_depth_one() {
        let (_db, _store, node, _root) = stored_tree();
        let target = Gindex::from_u64(0b100).unwrap();
        let link = node.clone().setter(&target, false).unwrap();
        let updated = link(leaf(0xDD)).unwrap();

        let changed = updated.clone().getter(&target).unwrap();
        assert_eq!(changed.merkle_root(sha256_merge), Root::repeat_byte(0xDD));
        let untouched = updated.getter(&Gindex::from_u64(0b101).unwrap()).unwrap();
        assert_eq!(untouched.merkle_root(sha256_merge), Root::repeat_byte(0x02));
    }

    #[test]
    fn test_summarize_into_collapses_stored_subtree() {
        let (_db, _store, node, root) = stored_tree();
        let target = Gindex::from_u64(0b10).unwrap();
        let summary = node.clone().summarize_into(&target, sha256_merge).unwrap();
        let collapsed = summary().unwrap();

        assert_eq!(collapsed.merkle_root(sha256_merge), root);
        let summarized = collapsed.getter(&target).unwrap();
        assert!(summarized.is_leaf());
        let (left_root, _) = node.child_roots();
        assert_eq!(summarized.merkle_root(sha256_merge), left_root);
    }
}
