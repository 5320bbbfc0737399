#![warn(missing_docs)]
//! Marksync - Headless Annotation Sync Engine
//!
//! # Overview
//!
//! `marksync` keeps inline annotations (comments, highlights) consistent with a rich-text
//! document tree. Annotations live in the document as *marker* nodes carrying one or more
//! annotation ids. The engine maintains a bidirectional index between ids and marker nodes,
//! turns UI events into marker edits, and tracks which annotations sit under the caret.
//!
//! It does not render anything. The host document engine is reached through the
//! [`DocumentEngine`] trait; [`Document`] is an in-memory implementation for tests and
//! headless hosts.
//!
//! # Core Features
//!
//! - **ID Index**: `id -> node keys` and `node key -> ids`, kept in lockstep from marker
//!   lifecycle events
//! - **Merge Resolver**: id set union when markers split or coalesce
//! - **Commit Protocol**: focus loss wraps the selection in a new annotation; focus gain or a
//!   click on an annotation resolves it
//! - **Active Tracking**: ids under the caret, mirrored onto rendered elements as a class flag
//! - **State Tracking**: version number and change notifications
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  AnnotationSession (events, notifications)  │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Commit Protocol │ Active Tracker │ Binding │  ← Behaviour
//! ├─────────────────────────────────────────────┤
//! │  Mutation Bridge → IdIndex                  │  ← Consistency
//! ├─────────────────────────────────────────────┤
//! │  DocumentEngine (+ MarkerResolver)          │  ← Host document
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use marksync::{AnnotationSession, Document, Point, SequentialIdGenerator, SyncConfig, UiEvent};
//!
//! let mut doc = Document::from_paragraphs(&[&["Hello ", "world"]]);
//! let mut session = AnnotationSession::new(SyncConfig::default())
//!     .with_id_generator(SequentialIdGenerator::new("comment-"));
//! session.attach(&mut doc);
//! let root = session.bound_root().unwrap();
//!
//! // The user selects "world" and the editor loses focus.
//! let world = doc.text_leaves()[1];
//! session
//!     .edit(&mut doc, |d| d.select(Point::new(world, 0), Point::new(world, 5)))
//!     .unwrap();
//! session.dispatch(&mut doc, UiEvent::blur(root)).unwrap();
//!
//! // The caret now sits at the end of the new annotation.
//! assert_eq!(session.active_ids()[0].as_str(), "comment-1");
//! assert!(!doc.has_native_selection());
//! ```
//!
//! # Module Description
//!
//! - [`index`] - Bidirectional id index
//! - [`resolver`] - Marker merge/split policy
//! - [`engine`] - Host document engine interface
//! - [`document`] - In-memory reference engine
//! - [`bridge`] - Mutation events to index updates
//! - [`commit`] - Selection commit protocol
//! - [`active`] - Active annotation tracking and highlights
//! - [`listeners`] - Root element listener binding
//! - [`session`] - Annotation session
//! - [`state`] - Change notifications and snapshots

pub mod active;
pub mod bridge;
pub mod commit;
pub mod document;
pub mod engine;
pub mod error;
pub mod ids;
pub mod index;
pub mod listeners;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod state;

pub use active::{ActiveChange, ActiveTracker, marker_ids_at};
pub use bridge::{BridgeReport, apply_mutations, index_document};
pub use commit::{CommitOutcome, commit_selection, resolve_annotation};
pub use document::{Document, NodeKind};
pub use engine::{DocumentEngine, ListenerKind, MutationKind, NodeMutation};
pub use error::{DocumentError, IndexError, SyncError};
pub use ids::{
    AnnotationId, IdGenerator, NodeKey, RootId, SequentialIdGenerator, UuidIdGenerator,
};
pub use index::IdIndex;
pub use listeners::RootBinding;
pub use marksync_config::{ConfigError, DEFAULT_HIGHLIGHT_CLASS, SyncConfig};
pub use resolver::{MarkerResolver, UnionResolver};
pub use selection::{Point, RangeSelection, SelectionDirection};
pub use session::{AnnotationSession, UiEvent, UiEventKind};
pub use state::{
    AnnotationState, SessionChange, SessionChangeCallback, SessionChangeType, SessionState,
};
