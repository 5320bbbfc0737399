//! Mutation bridge: folds marker lifecycle events into the [`IdIndex`].
//!
//! For created and updated markers the live node is the source of truth, so the key's entry
//! is re-synced from [`DocumentEngine::marker_ids`]. Destroyed markers cannot be read any
//! more; their cached id list in the index decides which entries to drop.

use crate::engine::{DocumentEngine, MutationKind, NodeMutation};
use crate::ids::{AnnotationId, NodeKey};
use crate::index::IdIndex;
use std::collections::BTreeSet;

/// Summary of one batch of folded mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeReport {
    /// Keys whose recorded ids were (re)written.
    pub indexed: BTreeSet<NodeKey>,
    /// Keys dropped from the index.
    pub forgotten: BTreeSet<NodeKey>,
    /// Annotations that had no node before the batch and have at least one now.
    pub appeared: BTreeSet<AnnotationId>,
    /// Annotations that had nodes before the batch and have none now.
    pub vanished: BTreeSet<AnnotationId>,
}

impl BridgeReport {
    /// Returns `true` if the batch changed the index.
    pub fn index_changed(&self) -> bool {
        !self.indexed.is_empty() || !self.forgotten.is_empty()
    }
}

/// Apply `mutations` to `index`, reading live marker ids from `doc`.
pub fn apply_mutations<E: DocumentEngine>(
    index: &mut IdIndex,
    doc: &E,
    mutations: &[NodeMutation],
) -> BridgeReport {
    let before: BTreeSet<AnnotationId> = index.annotation_ids().cloned().collect();
    let mut report = BridgeReport::default();

    for mutation in mutations {
        let live = match mutation.kind {
            MutationKind::Created | MutationKind::Updated => doc.marker_ids(mutation.key),
            MutationKind::Destroyed => None,
        };
        match live {
            Some(ids) if !ids.is_empty() => {
                if index.sync_key(mutation.key, ids) {
                    report.indexed.insert(mutation.key);
                }
            }
            // Destroyed, id-less, or reported but no longer a live marker.
            _ => {
                if !index.forget_key(mutation.key).is_empty() {
                    report.forgotten.insert(mutation.key);
                }
            }
        }
        tracing::trace!(key = %mutation.key, kind = ?mutation.kind, "marker mutation");
    }

    let after: BTreeSet<AnnotationId> = index.annotation_ids().cloned().collect();
    report.appeared = after.difference(&before).cloned().collect();
    report.vanished = before.difference(&after).cloned().collect();

    debug_assert!(index.validate().is_ok(), "index maps diverged");
    debug_assert!(
        mutations.iter().all(|m| {
            let live = doc.marker_ids(m.key).unwrap_or(&[]);
            let cached = index.ids_for_key(m.key);
            live.len() == cached.len() && live.iter().all(|id| cached.contains(id))
        }),
        "indexed ids differ from live marker ids"
    );

    report
}

/// Index every live marker of `doc` from scratch.
pub fn index_document<E: DocumentEngine>(doc: &E) -> IdIndex {
    let mut index = IdIndex::new();
    for key in doc.marker_keys() {
        if let Some(ids) = doc.marker_ids(key) {
            index.sync_key(key, ids);
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> AnnotationId {
        AnnotationId::from(s)
    }

    #[test]
    fn test_created_and_destroyed() {
        let mut doc = Document::from_paragraphs(&[&["ab", "cd"]]);
        let leaves = doc.text_leaves();
        let mut index = IdIndex::new();

        let ((m1, m2), mutations) = doc
            .update(|d| {
                let m1 = d.wrap_node(leaves[0], vec![id("a")])?;
                let m2 = d.wrap_node(leaves[1], vec![id("a"), id("b")])?;
                Ok((m1, m2))
            })
            .unwrap();
        let report = apply_mutations(&mut index, &doc, &mutations);
        assert_eq!(report.appeared, BTreeSet::from([id("a"), id("b")]));
        assert_eq!(index.keys_for_id(&id("a")), Some(&BTreeSet::from([m1, m2])));

        let (_, mutations) = doc.update(|d| d.unwrap_marker(m2)).unwrap();
        let report = apply_mutations(&mut index, &doc, &mutations);
        assert_eq!(report.vanished, BTreeSet::from([id("b")]));
        assert!(report.appeared.is_empty());
        assert_eq!(report.forgotten, BTreeSet::from([m2]));
        assert_eq!(index.keys_for_id(&id("a")).unwrap().len(), 1);
        assert!(index.ids_for_key(m2).is_empty());
    }

    #[test]
    fn test_batch_unwrap_empties_index() {
        let mut doc = Document::from_text("one\ntwo\nthree");
        let leaves = doc.text_leaves();
        let (_, created) = doc
            .update(|d| {
                for (i, leaf) in leaves.iter().enumerate() {
                    d.wrap_node(*leaf, vec![id(if i % 2 == 0 { "even" } else { "odd" })])?;
                }
                Ok(())
            })
            .unwrap();
        let mut index = IdIndex::new();
        apply_mutations(&mut index, &doc, &created);
        assert_eq!(index.key_count(), 3);

        let markers = doc.marker_keys();
        let (_, destroyed) = doc
            .update(|d| {
                for marker in &markers {
                    d.unwrap_marker(*marker)?;
                }
                Ok(())
            })
            .unwrap();
        assert!(destroyed.iter().all(|m| m.kind == MutationKind::Destroyed));

        let report = apply_mutations(&mut index, &doc, &destroyed);
        assert_eq!(report.forgotten, markers.iter().copied().collect::<BTreeSet<_>>());
        assert_eq!(report.vanished, BTreeSet::from([id("even"), id("odd")]));
        assert!(index.is_empty());
    }

    #[test]
    fn test_updated_marker_resyncs() {
        let mut doc = Document::from_text("abc");
        let leaf = doc.text_leaves()[0];
        let (marker, mutations) = doc
            .update(|d| d.wrap_node(leaf, vec![id("a"), id("b")]))
            .unwrap();
        let mut index = IdIndex::new();
        apply_mutations(&mut index, &doc, &mutations);

        let (_, mutations) = doc
            .update(|d| d.delete_marker_id(marker, &id("a")))
            .unwrap();
        let report = apply_mutations(&mut index, &doc, &mutations);
        assert_eq!(report.indexed, BTreeSet::from([marker]));
        assert_eq!(index.ids_for_key(marker), &[id("b")]);
        assert!(!index.contains(&id("a")));
    }

    #[test]
    fn test_unknown_destroy_is_ignored() {
        let doc = Document::new();
        let mut index = IdIndex::new();
        index.add_id(&id("a"), NodeKey(7));

        let report = apply_mutations(
            &mut index,
            &doc,
            &[NodeMutation::new(NodeKey(42), MutationKind::Destroyed)],
        );
        assert!(!report.index_changed());
        assert_eq!(index.ids_for_key(NodeKey(7)), &[id("a")]);
    }

    #[test]
    fn test_index_document() {
        let mut doc = Document::from_paragraphs(&[&["ab", "cd"]]);
        let leaves = doc.text_leaves();
        doc.update(|d| d.wrap_node(leaves[1], vec![id("z")]))
            .unwrap();

        let index = index_document(&doc);
        assert_eq!(index.annotation_count(), 1);
        assert!(index.validate().is_ok());
    }
}
