//! Session change notifications and serializable snapshots.

use crate::active::ActiveChange;
use crate::ids::{AnnotationId, NodeKey};
use serde::{Deserialize, Serialize};

/// Session change type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionChangeType {
    /// The id index changed
    IndexChanged,
    /// The active annotation set changed
    ActiveChanged,
    /// A selection was wrapped in a new annotation
    AnnotationCommitted,
    /// An annotation was removed from the document
    AnnotationResolved,
}

/// Session change record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    /// Change type
    pub change_type: SessionChangeType,
    /// Old version number
    pub old_version: u64,
    /// New version number
    pub new_version: u64,
    /// Annotation committed or resolved, if any.
    pub annotation: Option<AnnotationId>,
    /// Active set transition, for [`SessionChangeType::ActiveChanged`].
    pub active: Option<ActiveChange>,
}

impl SessionChange {
    /// Create a new change record.
    pub fn new(change_type: SessionChangeType, old_version: u64, new_version: u64) -> Self {
        Self {
            change_type,
            old_version,
            new_version,
            annotation: None,
            active: None,
        }
    }

    /// Attach the annotation this change is about.
    pub fn with_annotation(mut self, id: AnnotationId) -> Self {
        self.annotation = Some(id);
        self
    }

    /// Attach an active set transition.
    pub fn with_active(mut self, active: ActiveChange) -> Self {
        self.active = Some(active);
        self
    }
}

/// Session change callback function type
pub type SessionChangeCallback = Box<dyn FnMut(&SessionChange) + Send>;

/// One indexed annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationState {
    /// Annotation id.
    pub id: AnnotationId,
    /// Marker nodes carrying it, in key order.
    pub keys: Vec<NodeKey>,
}

/// Serializable session snapshot for UI layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Session version number (incremented after each change)
    pub version: u64,
    /// Ids active at the caret.
    pub active_ids: Vec<AnnotationId>,
    /// Keys whose rendered element carries the highlight class.
    pub highlighted: Vec<NodeKey>,
    /// Every indexed annotation, in id order.
    pub annotations: Vec<AnnotationState>,
    /// Whether UI listeners are attached to a root element.
    pub listening: bool,
}

impl SessionState {
    /// Look up one annotation by id.
    pub fn annotation(&self, id: &AnnotationId) -> Option<&AnnotationState> {
        self.annotations.iter().find(|a| &a.id == id)
    }
}
