//! Root element listener binding.
//!
//! The session listens for blur, focus and click on the host's root element. Hosts may swap
//! the root element at any time; [`RootBinding`] keeps exactly one set of listeners attached,
//! always on the current root, and detaches with the same kinds it attached.

use crate::engine::{DocumentEngine, ListenerKind};
use crate::ids::RootId;

/// Tracks which root element currently carries the session's listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootBinding {
    root: Option<RootId>,
}

impl RootBinding {
    /// Create an unbound binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Root element the listeners are attached to.
    pub fn root(&self) -> Option<RootId> {
        self.root
    }

    /// Returns `true` if listeners are attached somewhere.
    pub fn is_bound(&self) -> bool {
        self.root.is_some()
    }

    /// Move the listeners to `root`.
    ///
    /// Listeners on the previous root are removed first. Binding the root that is already
    /// bound is a no-op, and `None` simply detaches.
    pub fn bind<E: DocumentEngine>(&mut self, doc: &mut E, root: Option<RootId>) {
        if self.root == root {
            return;
        }
        self.teardown(doc);
        if let Some(root) = root {
            for kind in ListenerKind::ALL {
                doc.add_root_listener(root, kind);
            }
            tracing::debug!(root = root.0, "listeners attached");
        }
        self.root = root;
    }

    /// Remove every listener this binding attached.
    pub fn teardown<E: DocumentEngine>(&mut self, doc: &mut E) {
        if let Some(root) = self.root.take() {
            for kind in ListenerKind::ALL {
                doc.remove_root_listener(root, kind);
            }
            tracing::debug!(root = root.0, "listeners detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn test_rebinding_moves_listeners() {
        let mut doc = Document::new();
        let first = doc.root_element();
        let mut binding = RootBinding::new();

        binding.bind(&mut doc, first);
        binding.bind(&mut doc, first);
        assert_eq!(doc.total_listeners(), 3);

        let (second, _) = doc.replace_root_element();
        binding.bind(&mut doc, Some(second));
        assert_eq!(binding.root(), Some(second));
        assert_eq!(doc.total_listeners(), 3);
        for kind in ListenerKind::ALL {
            assert_eq!(doc.listener_count(second, kind), 1);
        }

        binding.bind(&mut doc, None);
        assert!(!binding.is_bound());
        assert_eq!(doc.total_listeners(), 0);
    }

    #[test]
    fn test_teardown_is_symmetric() {
        let mut doc = Document::new();
        let root = doc.root_element();
        let mut binding = RootBinding::new();
        binding.bind(&mut doc, root);
        binding.teardown(&mut doc);
        binding.teardown(&mut doc);
        assert_eq!(doc.total_listeners(), 0);
    }
}
