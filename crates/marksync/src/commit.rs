//! Selection commit protocol.
//!
//! Two document-side actions turn UI events into marker edits:
//!
//! - [`commit_selection`] (focus loss): wrap the selected range in a marker carrying a fresh
//!   annotation id and collapse the selection onto the end of that range.
//! - [`resolve_annotation`] (focus gain / pointer activation): strip an annotation id from every
//!   marker carrying it, unwrapping markers left without ids.
//!
//! Each action is one engine update. The caller reconciles the returned mutations.

use crate::engine::{DocumentEngine, NodeMutation};
use crate::error::DocumentError;
use crate::ids::{AnnotationId, IdGenerator, NodeKey};
use crate::index::IdIndex;

/// Result of wrapping a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The annotation id generated for the range.
    pub id: AnnotationId,
    /// Markers created by the wrap, before normalization.
    pub markers: Vec<NodeKey>,
    /// Lifecycle events of the update.
    pub mutations: Vec<NodeMutation>,
}

/// Wrap the current range selection in a new annotation.
///
/// A missing or collapsed selection is a no-op and yields `Ok(None)` without opening an
/// update. A range that covers no text still runs the update but creates no markers. With
/// `collapse` set the selection ends up as a caret at the end of the original range (the
/// anchor of a backward selection, the focus of a forward one).
pub fn commit_selection<E: DocumentEngine>(
    doc: &mut E,
    ids: &mut dyn IdGenerator,
    collapse: bool,
) -> Result<Option<CommitOutcome>, DocumentError> {
    match doc.selection() {
        Some(selection) if !selection.is_collapsed() => {}
        _ => return Ok(None),
    }

    let ((id, markers), mutations) = doc.update(|d| {
        let id = ids.next_id();
        let markers = d.wrap_selection_in_marker(&id)?;
        if collapse && let Some(selection) = d.selection() {
            d.set_selection(Some(selection.collapse_to_end()))?;
        }
        Ok((id, markers))
    })?;

    tracing::debug!(%id, markers = markers.len(), "selection committed");
    Ok(Some(CommitOutcome {
        id,
        markers,
        mutations,
    }))
}

/// Remove `id` from every marker recorded for it in `index`.
///
/// Markers left without ids are unwrapped. Returns the update's lifecycle events; an id the
/// index does not know yields no update at all.
pub fn resolve_annotation<E: DocumentEngine>(
    doc: &mut E,
    index: &IdIndex,
    id: &AnnotationId,
) -> Result<Vec<NodeMutation>, DocumentError> {
    let Some(keys) = index.keys_for_id(id) else {
        return Ok(Vec::new());
    };
    let keys: Vec<NodeKey> = keys.iter().copied().collect();

    let (_, mutations) = doc.update(|d| {
        for key in &keys {
            if d.marker_ids(*key).is_none() {
                continue;
            }
            let remaining = d.delete_marker_id(*key, id)?;
            if remaining.is_empty() {
                d.unwrap_marker(*key)?;
            }
        }
        Ok(())
    })?;
    tracing::debug!(%id, nodes = keys.len(), "annotation resolved");
    Ok(mutations)
}
