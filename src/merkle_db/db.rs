//! The store engine: batched tree insertion and point retrieval.

use std::sync::Arc;

use alloy_primitives::hex;
use tracing::{debug, trace};

use crate::primitives::{Gindex, HashFn, LeafNode, Node, Root, MAX_GINDEX_BITS};
use crate::storage::{KeyValueStore, WriteBatch};

use super::error::{Error, Side};
use super::keys::{self, KeyScratch, NAMESPACE_LEN, ROOT_LEN};
use super::record::{Record, RecordError};
use super::virtual_node::VirtualNode;

/// A stored node together with the slot its tree was inserted at.
#[derive(Debug, Clone)]
pub struct SlottedNode {
    pub slot: u64,
    pub node: Arc<dyn Node>,
}

/// Persistent binary Merkle tree store over an ordered key/value backend.
///
/// Records are keyed by (namespace, gindex, node root); inserting a tree
/// emits one record per node into an atomic batch, skipping subtrees the
/// store already holds. Reads hand back either a plain leaf or a
/// [`VirtualNode`] that resolves its children against the store on demand.
///
/// Cloning is cheap and shares the backend handle; a clone is the reader
/// handle each virtual node keeps until its children are materialized.
#[derive(Clone)]
pub struct MerkleDb {
    namespace: [u8; NAMESPACE_LEN],
    store: Arc<dyn KeyValueStore>,
}

impl MerkleDb {
    /// Wrap `store` with a binary-tree Merkle interface under `namespace`.
    pub fn new(namespace: [u8; NAMESPACE_LEN], store: Arc<dyn KeyValueStore>) -> Self {
        Self { namespace, store }
    }

    /// The namespace partitioning this store's keys.
    pub fn namespace(&self) -> [u8; NAMESPACE_LEN] {
        self.namespace
    }

    /// Insert the whole tree rooted at `node`, tagging every record with
    /// `slot`.
    ///
    /// Subtrees whose (gindex, root) is already present are not re-walked:
    /// an existence probe per child prunes the recursion, so successive
    /// trees sharing structure only pay for what changed. The probe reads
    /// committed state; records emitted earlier in the same batch are not
    /// visible to it.
    pub fn put(&self, slot: u64, node: &dyn Node, hash: HashFn) -> Result<(), Error> {
        let root = node.merkle_root(hash);

        // A single leaf needs no batch.
        if node.is_leaf() {
            let key = keys::encode_key(&self.namespace, &Gindex::ROOT, &root);
            self.store.put(&key, &Record::encode_leaf(slot))?;
            trace!(target: "merkledb", slot, root = ?root, "Stored leaf record");
            return Ok(());
        }

        let mut batch = WriteBatch::new();
        let mut scratch = KeyScratch::new(&self.namespace, &root);
        self.add(&mut batch, &mut scratch, 0, node, slot, hash)?;

        let records = batch.len();
        self.store.write_batch(batch)?;
        debug!(target: "merkledb", slot, root = ?root, records, "Committed tree batch");
        Ok(())
    }

    /// Emit the record for `node` at `bit_index` and recurse into children
    /// the store does not already hold.
    fn add(
        &self,
        batch: &mut WriteBatch,
        scratch: &mut KeyScratch,
        bit_index: u16,
        node: &dyn Node,
        slot: u64,
        hash: HashFn,
    ) -> Result<(), Error> {
        if node.is_leaf() {
            // The caller already prepared the scratchpad for this node.
            batch.put(scratch.key(bit_index).to_vec(), Record::encode_leaf(slot).to_vec());
            return Ok(());
        }

        let left = node.left().map_err(|e| Error::child(Side::Left, e))?;
        let right = node.right().map_err(|e| Error::child(Side::Right, e))?;
        let left_root = left.merkle_root(hash);
        let right_root = right.merkle_root(hash);

        batch.put(
            scratch.key(bit_index).to_vec(),
            Record::encode_pair(slot, &left_root, &right_root).to_vec(),
        );

        let child_bit = bit_index + 1;
        if child_bit >= MAX_GINDEX_BITS {
            return Err(Error::GindexTooLarge);
        }

        scratch.descend_left(child_bit, &left_root);
        if !self.store.has(scratch.key(child_bit))? {
            self.add(batch, scratch, child_bit, left.as_ref(), slot, hash)?;
        }

        scratch.descend_right(child_bit, &right_root);
        if !self.store.has(scratch.key(child_bit))? {
            self.add(batch, scratch, child_bit, right.as_ref(), slot, hash)?;
        }

        Ok(())
    }

    /// Fetch the node stored for `root` at `gindex`.
    ///
    /// Leaf records come back as plain [`LeafNode`]s; pair records come
    /// back as [`VirtualNode`]s closing over a clone of this handle.
    pub fn get(&self, gindex: &Gindex, root: &Root) -> Result<SlottedNode, Error> {
        let key = keys::encode_key(&self.namespace, gindex, root);
        let value = self
            .store
            .get(&key)?
            .ok_or_else(|| Error::NotFound { key: hex::encode(&key) })?;
        self.decode_slotted(&key, &value, gindex, root)
    }

    /// Whether a record exists for `root` at `gindex`.
    pub fn has(&self, gindex: &Gindex, root: &Root) -> Result<bool, Error> {
        Ok(self.store.has(&keys::encode_key(&self.namespace, gindex, root))?)
    }

    /// Remove the single record for `root` at `gindex`. Records of the
    /// subtree previously reached through it are left in place.
    pub fn delete(&self, gindex: &Gindex, root: &Root) -> Result<(), Error> {
        self.store.delete(&keys::encode_key(&self.namespace, gindex, root))?;
        trace!(target: "merkledb", gindex = ?gindex, root = ?root, "Deleted record");
        Ok(())
    }

    /// All nodes stored at `gindex` whose slot lies in
    /// `[start_slot, end_slot]`, in backend key order (by node root).
    /// There may be multiple nodes per slot.
    pub fn range(
        &self,
        start_slot: u64,
        end_slot: u64,
        gindex: &Gindex,
    ) -> Result<Vec<SlottedNode>, Error> {
        let prefix = keys::encode_prefix(&self.namespace, gindex);
        let mut nodes = Vec::new();
        for (key, value) in self.store.scan_prefix(&prefix)? {
            if key.len() != prefix.len() + ROOT_LEN {
                return Err(Error::CorruptRecord {
                    key: hex::encode(&key),
                    value: hex::encode(&value),
                    reason: RecordError::KeyLength { len: key.len() },
                });
            }
            let root = Root::from_slice(&key[prefix.len()..]);
            let slotted = self.decode_slotted(&key, &value, gindex, &root)?;
            if (start_slot..=end_slot).contains(&slotted.slot) {
                nodes.push(slotted);
            }
        }
        Ok(nodes)
    }

    /// Release the underlying store.
    pub fn close(&self) -> Result<(), Error> {
        Ok(self.store.close()?)
    }

    fn decode_slotted(
        &self,
        key: &[u8],
        value: &[u8],
        gindex: &Gindex,
        root: &Root,
    ) -> Result<SlottedNode, Error> {
        let record = Record::decode(value).map_err(|reason| Error::CorruptRecord {
            key: hex::encode(key),
            value: hex::encode(value),
            reason,
        })?;
        Ok(match record {
            Record::Leaf { slot } => SlottedNode {
                slot,
                node: Arc::new(LeafNode::new(*root)),
            },
            Record::Pair { slot, left, right } => SlottedNode {
                slot,
                node: Arc::new(VirtualNode::new(self.clone(), *gindex, *root, left, right)),
            },
        })
    }
}
