//! Active annotation tracking.
//!
//! The active set is the ids of the marker under a collapsed caret. It is recomputed after
//! every committed update and mirrored onto rendered elements as a highlight class flag.

use crate::engine::DocumentEngine;
use crate::ids::{AnnotationId, NodeKey};
use crate::index::IdIndex;
use crate::selection::RangeSelection;
use serde::Serialize;
use std::collections::BTreeSet;

/// Active set transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveChange {
    /// Ids active before the transition.
    pub previous: Vec<AnnotationId>,
    /// Ids active after the transition.
    pub current: Vec<AnnotationId>,
}

/// Ids of the annotation under `selection`, if it is a caret inside a text node.
///
/// A caret at the very end of a text node whose next sibling is a marker reports that
/// marker's ids. Otherwise the walk goes up through the text node's ancestors and returns the
/// ids of the first marker found. Anything else yields an empty list.
pub fn marker_ids_at<E: DocumentEngine>(
    doc: &E,
    selection: Option<&RangeSelection>,
) -> Vec<AnnotationId> {
    let Some(selection) = selection else {
        return Vec::new();
    };
    if !selection.is_collapsed() {
        return Vec::new();
    }
    let point = selection.anchor;
    let Some(len) = doc.text_len(point.key) else {
        return Vec::new();
    };

    if point.offset == len
        && let Some(next) = doc.next_sibling(point.key)
        && let Some(ids) = doc.marker_ids(next)
    {
        return ids.to_vec();
    }

    let mut current = doc.parent(point.key);
    while let Some(key) = current {
        if let Some(ids) = doc.marker_ids(key) {
            return ids.to_vec();
        }
        current = doc.parent(key);
    }
    Vec::new()
}

/// Remembers the active set and the elements currently highlighted for it.
#[derive(Debug, Clone, Default)]
pub struct ActiveTracker {
    active: Vec<AnnotationId>,
    highlighted: BTreeSet<NodeKey>,
}

impl ActiveTracker {
    /// Create a tracker with an empty active set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active ids.
    pub fn active(&self) -> &[AnnotationId] {
        &self.active
    }

    /// Keys whose rendered element currently carries the highlight class.
    pub fn highlighted(&self) -> &BTreeSet<NodeKey> {
        &self.highlighted
    }

    /// Recompute the active set from the current selection and refresh highlights.
    ///
    /// Highlights are re-applied whenever the set is non-empty, since the nodes carrying an
    /// unchanged active annotation may have been split or merged. Returns the transition if
    /// the set itself changed.
    pub fn refresh<E: DocumentEngine>(
        &mut self,
        doc: &mut E,
        index: &IdIndex,
        class: &str,
    ) -> Option<ActiveChange> {
        let selection = doc.selection();
        let current = marker_ids_at(doc, selection.as_ref());
        if current.is_empty() && self.active.is_empty() {
            return None;
        }

        self.clear_highlights(doc, class);
        for id in &current {
            let Some(keys) = index.keys_for_id(id) else {
                continue;
            };
            for key in keys {
                if doc.set_element_class(*key, class, true) {
                    self.highlighted.insert(*key);
                }
            }
        }

        if current == self.active {
            return None;
        }
        let previous = std::mem::replace(&mut self.active, current.clone());
        tracing::debug!(?previous, ?current, "active annotations changed");
        Some(ActiveChange { previous, current })
    }

    /// Remove every highlight and empty the active set.
    pub fn clear<E: DocumentEngine>(&mut self, doc: &mut E, class: &str) -> Option<ActiveChange> {
        self.clear_highlights(doc, class);
        if self.active.is_empty() {
            return None;
        }
        let previous = std::mem::take(&mut self.active);
        Some(ActiveChange {
            previous,
            current: Vec::new(),
        })
    }

    fn clear_highlights<E: DocumentEngine>(&mut self, doc: &mut E, class: &str) {
        for key in std::mem::take(&mut self.highlighted) {
            // Destroyed nodes have no element left to update.
            doc.set_element_class(key, class, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::index_document;
    use crate::document::Document;
    use crate::selection::Point;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> AnnotationId {
        AnnotationId::from(s)
    }

    #[test]
    fn test_caret_inside_marker() {
        let mut doc = Document::from_paragraphs(&[&["ab", "cd"]]);
        let leaves = doc.text_leaves();
        doc.update(|d| {
            d.wrap_node(leaves[1], vec![id("x")])?;
            d.select_collapsed(Point::new(leaves[1], 1))
        })
        .unwrap();

        let selection = doc.selection();
        assert_eq!(marker_ids_at(&doc, selection.as_ref()), vec![id("x")]);
    }

    #[test]
    fn test_caret_at_end_before_marker() {
        let mut doc = Document::from_paragraphs(&[&["ab", "cd"]]);
        let leaves = doc.text_leaves();
        doc.update(|d| {
            d.wrap_node(leaves[1], vec![id("x")])?;
            d.select_collapsed(Point::new(leaves[0], 2))
        })
        .unwrap();
        let selection = doc.selection();
        assert_eq!(marker_ids_at(&doc, selection.as_ref()), vec![id("x")]);

        doc.update(|d| d.select_collapsed(Point::new(leaves[0], 1)))
            .unwrap();
        let selection = doc.selection();
        assert!(marker_ids_at(&doc, selection.as_ref()).is_empty());
    }

    #[test]
    fn test_range_selection_has_no_active_ids() {
        let mut doc = Document::from_paragraphs(&[&["ab"]]);
        let leaf = doc.text_leaves()[0];
        doc.update(|d| {
            d.wrap_node(leaf, vec![id("x")])?;
            d.select(Point::new(leaf, 0), Point::new(leaf, 2))
        })
        .unwrap();
        let selection = doc.selection();
        assert!(marker_ids_at(&doc, selection.as_ref()).is_empty());
    }

    #[test]
    fn test_refresh_highlights_every_node_of_annotation() {
        let mut doc = Document::from_paragraphs(&[&["ab", "cd", "ef"]]);
        let leaves = doc.text_leaves();
        let ((m1, m3), _) = doc
            .update(|d| {
                let m1 = d.wrap_node(leaves[0], vec![id("x")])?;
                let m3 = d.wrap_node(leaves[2], vec![id("x")])?;
                d.select_collapsed(Point::new(leaves[0], 1))?;
                Ok((m1, m3))
            })
            .unwrap();
        let index = index_document(&doc);
        let mut tracker = ActiveTracker::new();

        let change = tracker.refresh(&mut doc, &index, "selected").unwrap();
        assert!(change.previous.is_empty());
        assert_eq!(change.current, vec![id("x")]);
        assert_eq!(
            doc.elements_with_class("selected"),
            BTreeSet::from([m1, m3])
        );

        // Same annotation, different node: no transition.
        doc.update(|d| d.select_collapsed(Point::new(leaves[2], 1)))
            .unwrap();
        assert!(tracker.refresh(&mut doc, &index, "selected").is_none());

        doc.update(|d| d.select_collapsed(Point::new(leaves[1], 1)))
            .unwrap();
        let change = tracker.refresh(&mut doc, &index, "selected").unwrap();
        assert!(change.current.is_empty());
        assert!(doc.elements_with_class("selected").is_empty());
        assert!(tracker.highlighted().is_empty());
    }

    #[test]
    fn test_empty_to_empty_does_nothing() {
        let mut doc = Document::from_text("plain");
        let index = IdIndex::new();
        let mut tracker = ActiveTracker::new();
        assert!(tracker.refresh(&mut doc, &index, "selected").is_none());
        assert!(tracker.clear(&mut doc, "selected").is_none());
    }
}
