//! Bidirectional annotation id <-> node key index.
//!
//! The index is the consistent snapshot the rest of the engine reads synchronously:
//!
//! - `id -> keys`: which marker nodes currently carry an annotation
//! - `key -> ids`: last known id list of a node
//!
//! The second map exists for destroy events. A destroyed node can no longer be read, only its
//! key arrives, so the cached list is what tells us which `id -> keys` entries to decrement.
//!
//! Both maps drop entries as soon as they become empty.

use crate::error::IndexError;
use crate::ids::{AnnotationId, NodeKey};
use std::collections::{BTreeMap, BTreeSet};

/// Annotation id <-> node key index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdIndex {
    id_to_keys: BTreeMap<AnnotationId, BTreeSet<NodeKey>>,
    key_to_ids: BTreeMap<NodeKey, Vec<AnnotationId>>,
}

impl IdIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` carries `id`. Idempotent.
    pub fn add_id(&mut self, id: &AnnotationId, key: NodeKey) {
        self.id_to_keys.entry(id.clone()).or_default().insert(key);
        let ids = self.key_to_ids.entry(key).or_default();
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    /// Forget that `key` carries `id`. Removing an absent pair is a no-op.
    pub fn remove_id(&mut self, id: &AnnotationId, key: NodeKey) {
        if let Some(keys) = self.id_to_keys.get_mut(id) {
            keys.remove(&key);
            if keys.is_empty() {
                self.id_to_keys.remove(id);
            }
        }
        if let Some(ids) = self.key_to_ids.get_mut(&key) {
            ids.retain(|existing| existing != id);
            if ids.is_empty() {
                self.key_to_ids.remove(&key);
            }
        }
    }

    /// Make the recorded ids of `key` equal `ids`.
    ///
    /// Returns `true` if anything changed.
    pub fn sync_key(&mut self, key: NodeKey, ids: &[AnnotationId]) -> bool {
        let stale: Vec<AnnotationId> = self
            .ids_for_key(key)
            .iter()
            .filter(|id| !ids.contains(id))
            .cloned()
            .collect();
        let mut changed = !stale.is_empty();
        for id in &stale {
            self.remove_id(id, key);
        }
        for id in ids {
            let known = self
                .key_to_ids
                .get(&key)
                .is_some_and(|existing| existing.contains(id));
            if !known {
                self.add_id(id, key);
                changed = true;
            }
        }
        if !ids.is_empty() {
            // Keep the cached list in node order.
            let mut ordered: Vec<AnnotationId> = Vec::with_capacity(ids.len());
            for id in ids {
                if !ordered.contains(id) {
                    ordered.push(id.clone());
                }
            }
            if self.ids_for_key(key) != ordered.as_slice() {
                self.key_to_ids.insert(key, ordered);
                changed = true;
            }
        }
        changed
    }

    /// Remove every pair recorded for `key`, returning the ids it carried.
    pub fn forget_key(&mut self, key: NodeKey) -> Vec<AnnotationId> {
        let ids = self.ids_for_key(key).to_vec();
        for id in &ids {
            self.remove_id(id, key);
        }
        ids
    }

    /// Cached ids of `key`; empty if the key is unknown.
    pub fn ids_for_key(&self, key: NodeKey) -> &[AnnotationId] {
        self.key_to_ids.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys of the nodes carrying `id`.
    pub fn keys_for_id(&self, id: &AnnotationId) -> Option<&BTreeSet<NodeKey>> {
        self.id_to_keys.get(id)
    }

    /// Returns `true` if any node carries `id`.
    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.id_to_keys.contains_key(id)
    }

    /// All indexed annotation ids, in order.
    pub fn annotation_ids(&self) -> impl Iterator<Item = &AnnotationId> {
        self.id_to_keys.keys()
    }

    /// All `(id, keys)` entries, in id order.
    pub fn entries(&self) -> impl Iterator<Item = (&AnnotationId, &BTreeSet<NodeKey>)> {
        self.id_to_keys.iter()
    }

    /// Number of distinct annotations.
    pub fn annotation_count(&self) -> usize {
        self.id_to_keys.len()
    }

    /// Number of indexed node keys.
    pub fn key_count(&self) -> usize {
        self.key_to_ids.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.id_to_keys.is_empty() && self.key_to_ids.is_empty()
    }

    /// Check that both maps mirror each other and hold no empty entries.
    pub fn validate(&self) -> Result<(), IndexError> {
        for (id, keys) in &self.id_to_keys {
            if keys.is_empty() {
                return Err(IndexError::EmptyKeySet(id.clone()));
            }
            for key in keys {
                if !self.ids_for_key(*key).contains(id) {
                    return Err(IndexError::MissingReverseEntry {
                        id: id.clone(),
                        key: *key,
                    });
                }
            }
        }
        for (key, ids) in &self.key_to_ids {
            if ids.is_empty() {
                return Err(IndexError::EmptyIdList(*key));
            }
            for id in ids {
                let listed = self
                    .id_to_keys
                    .get(id)
                    .is_some_and(|keys| keys.contains(key));
                if !listed {
                    return Err(IndexError::MissingForwardEntry {
                        id: id.clone(),
                        key: *key,
                    });
                }
            }
        }
        Ok(())
    }
}
