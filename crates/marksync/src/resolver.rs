//! Marker merge/split policy.
//!
//! The document engine decides *when* marker nodes are split or coalesced (a normalization
//! pass the engine owns); this module only supplies *what* the resulting id sets are.

use crate::ids::AnnotationId;

/// Policy hooks invoked by the document engine while normalizing marker nodes.
pub trait MarkerResolver {
    /// Ids for a fresh marker cloned from a marker carrying `source` (e.g. the tail half of a
    /// split marker).
    fn create_from(&self, source: &[AnnotationId]) -> Vec<AnnotationId>;

    /// Fold the ids of an absorbed marker (`from`) into the surviving marker (`to`).
    ///
    /// Must be idempotent for the same pair.
    fn merge_into(&self, from: &[AnnotationId], to: &mut Vec<AnnotationId>);
}

/// Default policy: clones keep the same ids, merges take the order-preserving set union.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnionResolver;

impl MarkerResolver for UnionResolver {
    fn create_from(&self, source: &[AnnotationId]) -> Vec<AnnotationId> {
        let mut ids = Vec::with_capacity(source.len());
        for id in source {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    fn merge_into(&self, from: &[AnnotationId], to: &mut Vec<AnnotationId>) {
        for id in from {
            if !to.contains(id) {
                to.push(id.clone());
            }
        }
    }
}
