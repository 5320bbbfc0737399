//! Annotation session.
//!
//! [`AnnotationSession`] owns the annotation side of one editor: the id index, the active set
//! tracker, the root listener binding and the id source. The document engine is never stored;
//! every operation borrows it for the duration of the call.
//!
//! # Lifecycle
//!
//! 1. [`attach`](AnnotationSession::attach) installs the marker resolver, binds UI listeners
//!    to the current root element and indexes any markers already in the document.
//! 2. After every engine update the host passes the update's mutations to
//!    [`reconcile`](AnnotationSession::reconcile) (or runs the update through
//!    [`edit`](AnnotationSession::edit), which does both).
//! 3. UI events arriving on the root element go through
//!    [`dispatch`](AnnotationSession::dispatch); root element swaps through
//!    [`on_root_changed`](AnnotationSession::on_root_changed).
//! 4. [`detach`](AnnotationSession::detach) undoes step 1 and hands the index back.
//!
//! # Example
//!
//! ```rust
//! use marksync::{AnnotationSession, Document, Point, SequentialIdGenerator, SyncConfig};
//!
//! let mut doc = Document::from_text("Hello world");
//! let mut session = AnnotationSession::new(SyncConfig::default())
//!     .with_id_generator(SequentialIdGenerator::new("c"));
//! session.attach(&mut doc);
//!
//! let leaf = doc.text_leaves()[0];
//! session
//!     .edit(&mut doc, |d| d.select(Point::new(leaf, 6), Point::new(leaf, 11)))
//!     .unwrap();
//!
//! let id = session.commit_selection(&mut doc).unwrap().unwrap();
//! assert_eq!(id.as_str(), "c1");
//! assert_eq!(session.index().annotation_count(), 1);
//!
//! let index = session.detach(&mut doc);
//! assert!(index.contains(&id));
//! ```

use crate::active::ActiveTracker;
use crate::bridge::{BridgeReport, apply_mutations, index_document};
use crate::commit;
use crate::engine::{DocumentEngine, NodeMutation};
use crate::error::{DocumentError, IndexError, SyncError};
use crate::ids::{AnnotationId, IdGenerator, RootId, UuidIdGenerator};
use crate::index::IdIndex;
use crate::listeners::RootBinding;
use crate::resolver::UnionResolver;
use crate::state::{
    AnnotationState, SessionChange, SessionChangeCallback, SessionChangeType, SessionState,
};
use marksync_config::SyncConfig;
use std::fmt;

/// UI event kinds the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEventKind {
    /// Editing focus lost: commit the current range selection.
    Blur,
    /// Editing focus gained, with the annotation in context (if any).
    Focus(Option<AnnotationId>),
    /// Pointer activation, with the annotation in context (if any).
    Click(Option<AnnotationId>),
}

/// UI event delivered by a root element listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    /// Root element the event fired on.
    pub root: RootId,
    /// What happened.
    pub kind: UiEventKind,
}

impl UiEvent {
    /// Focus loss on `root`.
    pub fn blur(root: RootId) -> Self {
        Self {
            root,
            kind: UiEventKind::Blur,
        }
    }

    /// Focus gain on `root`.
    pub fn focus(root: RootId, id: Option<AnnotationId>) -> Self {
        Self {
            root,
            kind: UiEventKind::Focus(id),
        }
    }

    /// Pointer activation on `root`.
    pub fn click(root: RootId, id: Option<AnnotationId>) -> Self {
        Self {
            root,
            kind: UiEventKind::Click(id),
        }
    }
}

/// Keeps annotations, the active set and highlights in sync with a document engine.
pub struct AnnotationSession {
    config: SyncConfig,
    index: IdIndex,
    tracker: ActiveTracker,
    binding: RootBinding,
    ids: Box<dyn IdGenerator + Send>,
    version: u64,
    callbacks: Vec<SessionChangeCallback>,
}

impl fmt::Debug for AnnotationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationSession")
            .field("config", &self.config)
            .field("index", &self.index)
            .field("tracker", &self.tracker)
            .field("binding", &self.binding)
            .field("version", &self.version)
            .field("callbacks", &self.callbacks.len())
            .finish_non_exhaustive()
    }
}

impl AnnotationSession {
    /// Create a detached session.
    ///
    /// Ids come from [`UuidIdGenerator`], prefixed with `config.id_prefix` when set.
    pub fn new(config: SyncConfig) -> Self {
        let ids = match config.id_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => UuidIdGenerator::with_prefix(prefix),
            _ => UuidIdGenerator::new(),
        };
        Self {
            config,
            index: IdIndex::new(),
            tracker: ActiveTracker::new(),
            binding: RootBinding::new(),
            ids: Box::new(ids),
            version: 0,
            callbacks: Vec::new(),
        }
    }

    /// Replace the id source.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + Send + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Session settings.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The id index.
    pub fn index(&self) -> &IdIndex {
        &self.index
    }

    /// Ids active at the caret.
    pub fn active_ids(&self) -> &[AnnotationId] {
        self.tracker.active()
    }

    /// Root element the UI listeners are attached to.
    pub fn bound_root(&self) -> Option<RootId> {
        self.binding.root()
    }

    /// Current version number
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Check if state has changed since a version
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.version > version
    }

    /// Subscribe to session changes
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Start observing `doc`.
    pub fn attach<E: DocumentEngine>(&mut self, doc: &mut E) {
        doc.set_marker_resolver(Some(Box::new(UnionResolver)));
        let root = doc.root_element();
        self.binding.bind(doc, root);

        let index = index_document(doc);
        if index != self.index {
            self.index = index;
            self.bump(SessionChangeType::IndexChanged, |change| change);
        }
        self.refresh_active(doc);
        tracing::debug!(
            annotations = self.index.annotation_count(),
            "annotation session attached"
        );
    }

    /// Stop observing `doc`: drop highlights, unbind listeners, remove the resolver and
    /// return the index.
    pub fn detach<E: DocumentEngine>(mut self, doc: &mut E) -> IdIndex {
        self.tracker.clear(doc, &self.config.highlight_class);
        self.binding.teardown(doc);
        doc.set_marker_resolver(None);
        tracing::debug!("annotation session detached");
        self.index
    }

    /// Fold one update's mutations into the index, then recompute the active set.
    pub fn reconcile<E: DocumentEngine>(
        &mut self,
        doc: &mut E,
        mutations: &[NodeMutation],
    ) -> BridgeReport {
        let report = apply_mutations(&mut self.index, doc, mutations);
        if report.index_changed() {
            self.bump(SessionChangeType::IndexChanged, |change| change);
        }
        self.refresh_active(doc);
        report
    }

    /// Run `f` as one engine update and reconcile its mutations.
    pub fn edit<E, R, F>(&mut self, doc: &mut E, f: F) -> Result<R, SyncError>
    where
        E: DocumentEngine,
        F: FnOnce(&mut E) -> Result<R, DocumentError>,
    {
        let (value, mutations) = doc.update(f)?;
        self.reconcile(doc, &mutations);
        Ok(value)
    }

    /// Wrap the current range selection in a new annotation.
    ///
    /// Returns the new id, or `None` if there was no non-empty range to wrap.
    pub fn commit_selection<E: DocumentEngine>(
        &mut self,
        doc: &mut E,
    ) -> Result<Option<AnnotationId>, SyncError> {
        let outcome =
            commit::commit_selection(doc, self.ids.as_mut(), self.config.collapse_on_commit)?;
        let Some(outcome) = outcome else {
            return Ok(None);
        };
        self.reconcile(doc, &outcome.mutations);
        if outcome.markers.is_empty() {
            return Ok(None);
        }
        if self.config.clear_native_selection {
            doc.clear_native_selection();
        }
        let id = outcome.id;
        self.bump(SessionChangeType::AnnotationCommitted, |change| {
            change.with_annotation(id.clone())
        });
        Ok(Some(id))
    }

    /// Remove annotation `id` from the document.
    ///
    /// Returns `false` if the index does not know the id.
    pub fn resolve<E: DocumentEngine>(
        &mut self,
        doc: &mut E,
        id: &AnnotationId,
    ) -> Result<bool, SyncError> {
        if !self.index.contains(id) {
            return Ok(false);
        }
        let mutations = commit::resolve_annotation(doc, &self.index, id)?;
        self.reconcile(doc, &mutations);
        self.bump(SessionChangeType::AnnotationResolved, |change| {
            change.with_annotation(id.clone())
        });
        Ok(true)
    }

    /// Handle a UI event. Events from any root other than the bound one are ignored.
    pub fn dispatch<E: DocumentEngine>(
        &mut self,
        doc: &mut E,
        event: UiEvent,
    ) -> Result<(), SyncError> {
        if self.binding.root() != Some(event.root) {
            tracing::trace!(root = event.root.0, "event from unbound root ignored");
            return Ok(());
        }
        match event.kind {
            UiEventKind::Blur => {
                self.commit_selection(doc)?;
            }
            UiEventKind::Focus(Some(id)) | UiEventKind::Click(Some(id)) => {
                self.resolve(doc, &id)?;
            }
            UiEventKind::Focus(None) | UiEventKind::Click(None) => {}
        }
        Ok(())
    }

    /// Move the UI listeners to the engine's current root element.
    pub fn on_root_changed<E: DocumentEngine>(&mut self, doc: &mut E) {
        let root = doc.root_element();
        let previous = self.binding.root();
        self.binding.bind(doc, root);
        tracing::debug!(?previous, ?root, "root element changed");
    }

    /// Check the index against itself and against every live marker of `doc`.
    pub fn verify<E: DocumentEngine>(&self, doc: &E) -> Result<(), SyncError> {
        self.index.validate()?;
        let live = index_document(doc);
        let keys = live
            .entries()
            .flat_map(|(_, keys)| keys.iter().copied())
            .chain(
                self.index
                    .entries()
                    .flat_map(|(_, keys)| keys.iter().copied()),
            );
        for key in keys {
            let indexed = self.index.ids_for_key(key);
            let actual = doc.marker_ids(key).unwrap_or(&[]);
            let same = indexed.len() == actual.len() && indexed.iter().all(|id| actual.contains(id));
            if !same {
                return Err(IndexError::StaleNode {
                    key,
                    indexed: indexed.to_vec(),
                    actual: actual.to_vec(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Serializable snapshot of the session.
    pub fn snapshot(&self) -> SessionState {
        SessionState {
            version: self.version,
            active_ids: self.tracker.active().to_vec(),
            highlighted: self.tracker.highlighted().iter().copied().collect(),
            annotations: self
                .index
                .entries()
                .map(|(id, keys)| AnnotationState {
                    id: id.clone(),
                    keys: keys.iter().copied().collect(),
                })
                .collect(),
            listening: self.binding.is_bound(),
        }
    }

    fn refresh_active<E: DocumentEngine>(&mut self, doc: &mut E) {
        let change = self
            .tracker
            .refresh(doc, &self.index, &self.config.highlight_class);
        if let Some(active) = change {
            self.bump(SessionChangeType::ActiveChanged, |change| {
                change.with_active(active)
            });
        }
    }

    fn bump(
        &mut self,
        change_type: SessionChangeType,
        build: impl FnOnce(SessionChange) -> SessionChange,
    ) {
        let old_version = self.version;
        self.version += 1;
        let change = build(SessionChange::new(change_type, old_version, self.version));
        for callback in &mut self.callbacks {
            callback(&change);
        }
    }
}
