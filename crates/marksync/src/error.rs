//! Error types.

use crate::ids::{AnnotationId, NodeKey};
use thiserror::Error;

/// Errors reported by document engine primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// No live node has this key.
    #[error("node {0} not found")]
    NodeNotFound(NodeKey),
    /// The node exists but is not a text node.
    #[error("node {0} is not a text node")]
    NotText(NodeKey),
    /// The node exists but is not a marker node.
    #[error("node {0} is not a marker node")]
    NotMarker(NodeKey),
    /// The node exists but cannot hold inline children.
    #[error("node {0} cannot contain inline content")]
    NotContainer(NodeKey),
    /// A text offset lies past the end of the node's text.
    #[error("offset {offset} out of bounds for node {key} (length {len})")]
    OffsetOutOfBounds {
        /// Text node key.
        key: NodeKey,
        /// Requested offset in characters.
        offset: usize,
        /// Text length in characters.
        len: usize,
    },
    /// Markers passed to a coalesce are not adjacent siblings.
    #[error("markers {0} and {1} are not adjacent siblings")]
    NotAdjacent(NodeKey, NodeKey),
    /// `begin_update` was called while an update was already open.
    #[error("an update is already in progress")]
    UpdateInProgress,
    /// A mutating primitive was called outside of an update.
    #[error("no update in progress")]
    NoUpdate,
}

/// Index invariant violations.
///
/// These indicate a missed or double-processed mutation event and are checked with debug
/// assertions; they are not expected in normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// `id -> keys` lists a key whose cached ids do not include the id.
    #[error("annotation {id} lists node {key}, but the node does not list the annotation")]
    MissingReverseEntry {
        /// Annotation id.
        id: AnnotationId,
        /// Node key.
        key: NodeKey,
    },
    /// `key -> ids` lists an id whose key set does not include the key.
    #[error("node {key} lists annotation {id}, but the annotation does not list the node")]
    MissingForwardEntry {
        /// Annotation id.
        id: AnnotationId,
        /// Node key.
        key: NodeKey,
    },
    /// An empty key set was left behind.
    #[error("annotation {0} has an empty key set")]
    EmptyKeySet(AnnotationId),
    /// An empty id list was left behind.
    #[error("node {0} has an empty id list")]
    EmptyIdList(NodeKey),
    /// The index disagrees with a live marker node.
    #[error("index has {indexed:?} for node {key}, document has {actual:?}")]
    StaleNode {
        /// Node key.
        key: NodeKey,
        /// Ids recorded by the index.
        indexed: Vec<AnnotationId>,
        /// Ids carried by the node.
        actual: Vec<AnnotationId>,
    },
}

/// Errors surfaced by the annotation session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A document engine primitive failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The index failed validation.
    #[error(transparent)]
    Index(#[from] IndexError),
}
