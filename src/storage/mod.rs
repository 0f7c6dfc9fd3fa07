//! Ordered key/value backend layer.
//!
//! The Merkle store sits on top of any store implementing
//! [`KeyValueStore`]: point get/has/put/delete, an atomic [`WriteBatch`],
//! and an ascending prefix scan. [`InMemoryStore`] is the bundled
//! `BTreeMap` implementation for tests and development; production
//! deployments wrap their ordered KV engine of choice.

mod memory;
mod traits;

pub use memory::InMemoryStore;
pub use traits::{BatchOp, KeyValueStore, StoreError, WriteBatch};
