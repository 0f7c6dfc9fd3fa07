//! The ordered key/value backend contract.
//!
//! The Merkle store assumes very little of its backend: point reads,
//! point writes, an atomic batch, and an ascending prefix scan. Anything
//! shaped like an ordered KV store (LSM tree, B-tree, in-memory map)
//! satisfies this trait.

/// Error type for backend operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// Backend failure.
    #[error("database error: {0}")]
    Database(String),
}

/// A single operation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// An ordered set of writes applied atomically.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { key, value });
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { key });
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The queued operations, in application order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consume the batch into its operations.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// An ordered byte-keyed key/value store.
///
/// Implementations must be safe for concurrent reads; writes are expected
/// to be serialized internally. `write_batch` must be atomic with respect
/// to readers: either every operation is visible or none is.
pub trait KeyValueStore: Send + Sync {
    /// Get the value at `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Whether `key` is present.
    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Set `key` to `value`, overwriting any prior value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Remove `key` if present.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Apply all operations in `batch` atomically.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Release the store. Later operations fail.
    fn close(&self) -> Result<(), StoreError>;
}
