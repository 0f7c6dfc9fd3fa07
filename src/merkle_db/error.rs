//! Error types for Merkle store operations.

use crate::primitives::NodeError;
use crate::storage::StoreError;

use super::record::RecordError;

/// Which child of a pair was being resolved when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Merkle store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Failure from the underlying key/value store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No record exists at the requested key.
    #[error("no record found for key {key}")]
    NotFound { key: String },

    /// The stored value does not decode as a known record shape.
    #[error("key {key} has corrupt value {value}: {reason}")]
    CorruptRecord {
        key: String,
        value: String,
        reason: RecordError,
    },

    /// A tree deeper than the maximum gindex bit length was inserted.
    #[error("gindex too large")]
    GindexTooLarge,

    /// Resolving a child of an input tree node failed.
    #[error("failed to resolve {side} child: {source}")]
    ChildResolution {
        side: Side,
        #[source]
        source: NodeError,
    },
}

impl Error {
    pub(crate) fn child(side: Side, source: NodeError) -> Self {
        Error::ChildResolution { side, source }
    }
}

// Virtual nodes surface engine failures through the tree-node capability
// set, which only knows the stringly database-error kind.
impl From<Error> for NodeError {
    fn from(err: Error) -> Self {
        NodeError::Database(err.to_string())
    }
}
