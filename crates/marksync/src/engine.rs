//! Host document engine interface.
//!
//! `marksync` does not own the document tree. Everything it needs from the host (the tree,
//! its transactions, selection, rendered elements and root element) goes through
//! [`DocumentEngine`]. The crate ships an in-memory implementation in [`crate::document`].
//!
//! # Transactions
//!
//! All tree mutations happen between [`DocumentEngine::begin_update`] and
//! [`DocumentEngine::commit_update`]. Committing runs the engine's normalization and returns
//! the lifecycle events of every marker node the transaction touched. Reads always observe
//! committed state or the state of the open transaction, never a partially normalized tree.

use crate::error::DocumentError;
use crate::ids::{AnnotationId, NodeKey, RootId};
use crate::resolver::MarkerResolver;
use crate::selection::RangeSelection;

/// Lifecycle event kind for a marker node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutationKind {
    /// The node did not exist before the transaction.
    Created,
    /// The node existed before and after the transaction and changed.
    Updated,
    /// The node existed before the transaction and is gone now.
    Destroyed,
}

/// One marker node lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeMutation {
    /// Key of the affected marker node.
    pub key: NodeKey,
    /// What happened to it.
    pub kind: MutationKind,
}

impl NodeMutation {
    /// Create a new mutation record.
    pub fn new(key: NodeKey, kind: MutationKind) -> Self {
        Self { key, kind }
    }
}

/// UI listener kinds bound to the host root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerKind {
    /// Editing focus lost.
    Blur,
    /// Editing focus gained.
    Focus,
    /// Pointer activation.
    Click,
}

impl ListenerKind {
    /// Every listener kind the annotation session binds.
    pub const ALL: [ListenerKind; 3] = [ListenerKind::Blur, ListenerKind::Focus, ListenerKind::Click];
}

/// The document engine an annotation session runs against.
pub trait DocumentEngine {
    /// Open a transaction.
    fn begin_update(&mut self) -> Result<(), DocumentError>;

    /// Normalize, close the transaction and return its marker lifecycle events.
    fn commit_update(&mut self) -> Result<Vec<NodeMutation>, DocumentError>;

    /// Discard every change made since [`begin_update`](Self::begin_update).
    fn rollback_update(&mut self);

    /// Run `f` inside a transaction.
    ///
    /// On success the transaction is committed and its mutations are returned with `f`'s
    /// value; on failure the transaction is rolled back.
    fn update<R, F>(&mut self, f: F) -> Result<(R, Vec<NodeMutation>), DocumentError>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<R, DocumentError>,
    {
        self.begin_update()?;
        match f(self) {
            Ok(value) => {
                let mutations = self.commit_update()?;
                Ok((value, mutations))
            }
            Err(err) => {
                self.rollback_update();
                Err(err)
            }
        }
    }

    /// Current selection, if any.
    fn selection(&self) -> Option<RangeSelection>;

    /// Replace the selection. Requires an open transaction.
    fn set_selection(&mut self, selection: Option<RangeSelection>) -> Result<(), DocumentError>;

    /// Wrap the current selection in new marker node(s) carrying `id`, splitting text nodes at
    /// the selection boundaries. Requires an open transaction.
    ///
    /// Returns the keys of the markers created (before normalization). A missing or collapsed
    /// selection creates nothing.
    fn wrap_selection_in_marker(&mut self, id: &AnnotationId)
    -> Result<Vec<NodeKey>, DocumentError>;

    /// Remove `id` from a marker, returning the ids left on it. Requires an open transaction.
    fn delete_marker_id(
        &mut self,
        key: NodeKey,
        id: &AnnotationId,
    ) -> Result<Vec<AnnotationId>, DocumentError>;

    /// Replace a marker with its children. Requires an open transaction.
    fn unwrap_marker(&mut self, key: NodeKey) -> Result<(), DocumentError>;

    /// Ids carried by a live marker node; `None` if `key` is not a live marker.
    fn marker_ids(&self, key: NodeKey) -> Option<&[AnnotationId]>;

    /// Keys of every live marker node, in document order.
    fn marker_keys(&self) -> Vec<NodeKey>;

    /// Text length in characters of a live text node; `None` for anything else.
    fn text_len(&self, key: NodeKey) -> Option<usize>;

    /// Parent of a live node.
    fn parent(&self, key: NodeKey) -> Option<NodeKey>;

    /// Next sibling of a live node.
    fn next_sibling(&self, key: NodeKey) -> Option<NodeKey>;

    /// Toggle a class flag on the rendered element of `key`.
    ///
    /// Returns `false` if the node has no rendered element.
    fn set_element_class(&mut self, key: NodeKey, class: &str, enabled: bool) -> bool;

    /// Drop any platform-level text selection so no range stays visually highlighted.
    fn clear_native_selection(&mut self);

    /// Install (or remove) the marker merge/split policy used during normalization.
    fn set_marker_resolver(&mut self, resolver: Option<Box<dyn MarkerResolver>>);

    /// The root element UI listeners attach to, if mounted.
    fn root_element(&self) -> Option<RootId>;

    /// Bind a listener to a root element.
    fn add_root_listener(&mut self, root: RootId, kind: ListenerKind);

    /// Unbind a listener from a root element.
    fn remove_root_listener(&mut self, root: RootId, kind: ListenerKind);
}
