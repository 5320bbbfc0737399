//! In-memory reference document engine.
//!
//! [`Document`] is a headless rich-text tree implementing [`DocumentEngine`]:
//!
//! ```text
//! Root
//! └── Paragraph*
//!     └── (Text | Marker)*
//!                  └── (Text | Marker)*
//! ```
//!
//! Text offsets are expressed in Unicode scalar values (`char`). Every live node except the
//! root has a rendered element carrying a set of class flags.
//!
//! # Normalization
//!
//! Committing an update normalizes marker nodes:
//!
//! 1. a marker nested directly inside another marker is lifted out, taking the outer
//!    marker's ids through [`MarkerResolver::merge_into`]; the outer marker's children that
//!    followed it move into a clone built with [`MarkerResolver::create_from`];
//! 2. markers without children are removed;
//! 3. adjacent sibling markers with equal id sets coalesce into the left one.
//!
//! Steps 1 and 3 only run while a resolver is installed. Marker lifecycle events are derived
//! by diffing the marker nodes before and after the transaction, so a marker created and
//! removed within one transaction produces no event.

use crate::engine::{DocumentEngine, ListenerKind, MutationKind, NodeMutation};
use crate::error::DocumentError;
use crate::ids::{AnnotationId, NodeKey, RootId};
use crate::resolver::{MarkerResolver, UnionResolver};
use crate::selection::{Point, RangeSelection, SelectionDirection};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root.
    Root,
    /// A block containing inline nodes.
    Paragraph,
    /// Plain text.
    Text(String),
    /// An inline annotation span carrying annotation ids.
    Marker(Vec<AnnotationId>),
}

impl NodeKind {
    fn is_marker(&self) -> bool {
        matches!(self, NodeKind::Marker(_))
    }

    fn holds_inline(&self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::Marker(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

struct PendingUpdate {
    base_nodes: BTreeMap<NodeKey, Node>,
    base_selection: Option<RangeSelection>,
}

/// Headless in-memory document tree.
pub struct Document {
    nodes: BTreeMap<NodeKey, Node>,
    root: NodeKey,
    next_key: u64,
    selection: Option<RangeSelection>,
    pending: Option<PendingUpdate>,
    elements: BTreeMap<NodeKey, BTreeSet<String>>,
    native_selection: bool,
    root_element: Option<RootId>,
    next_root_id: u64,
    listeners: BTreeMap<RootId, Vec<ListenerKind>>,
    resolver: Option<Box<dyn MarkerResolver>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("selection", &self.selection)
            .field("updating", &self.pending.is_some())
            .field("root_element", &self.root_element)
            .field("has_resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document mounted on a fresh root element.
    pub fn new() -> Self {
        let root = NodeKey(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root,
            Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            nodes,
            root,
            next_key: 1,
            selection: None,
            pending: None,
            elements: BTreeMap::new(),
            native_selection: false,
            root_element: Some(RootId(1)),
            next_root_id: 2,
            listeners: BTreeMap::new(),
            resolver: None,
        }
    }

    /// Create a document with one paragraph per entry, each holding one text node per string.
    pub fn from_paragraphs(paragraphs: &[&[&str]]) -> Self {
        let mut doc = Self::new();
        for texts in paragraphs {
            let root = doc.root;
            let index = doc.child_count(root);
            let paragraph = doc.insert_node(root, index, NodeKind::Paragraph);
            for (i, text) in texts.iter().enumerate() {
                doc.insert_node(paragraph, i, NodeKind::Text((*text).to_string()));
            }
        }
        doc.sync_elements();
        doc
    }

    /// Create a document with one single-text paragraph per line of `text`.
    pub fn from_text(text: &str) -> Self {
        let lines: Vec<&str> = text.split('\n').collect();
        let paragraphs: Vec<[&str; 1]> = lines.iter().map(|line| [*line]).collect();
        let refs: Vec<&[&str]> = paragraphs.iter().map(|p| p.as_slice()).collect();
        Self::from_paragraphs(&refs)
    }

    /// Key of the root node.
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Returns `true` while an update is open.
    pub fn is_updating(&self) -> bool {
        self.pending.is_some()
    }

    /// Payload of a live node.
    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.nodes.get(&key).map(|node| &node.kind)
    }

    /// Children of a live node; empty for unknown keys.
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes
            .get(&key)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Text of a live text node.
    pub fn text(&self, key: NodeKey) -> Option<&str> {
        match self.kind(key) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns `true` if `key` is a live node.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Every live node below the root, in document (pre-)order.
    pub fn descendants(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeKey> = self.children(self.root).iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            out.push(key);
            stack.extend(self.children(key).iter().rev().copied());
        }
        out
    }

    /// Text nodes in document order.
    pub fn text_leaves(&self) -> Vec<NodeKey> {
        self.descendants()
            .into_iter()
            .filter(|key| self.text(*key).is_some())
            .collect()
    }

    /// Plain text content: paragraphs joined by `'\n'`, markup ignored.
    pub fn text_content(&self) -> String {
        let mut paragraphs = Vec::new();
        for paragraph in self.children(self.root) {
            let mut text = String::new();
            let mut stack: Vec<NodeKey> = self.children(*paragraph).iter().rev().copied().collect();
            while let Some(key) = stack.pop() {
                if let Some(t) = self.text(key) {
                    text.push_str(t);
                }
                stack.extend(self.children(key).iter().rev().copied());
            }
            paragraphs.push(text);
        }
        paragraphs.join("\n")
    }

    /// Class flags on the rendered element of `key`.
    pub fn element_classes(&self, key: NodeKey) -> Option<&BTreeSet<String>> {
        self.elements.get(&key)
    }

    /// Keys of every rendered element carrying `class`.
    pub fn elements_with_class(&self, class: &str) -> BTreeSet<NodeKey> {
        self.elements
            .iter()
            .filter(|(_, classes)| classes.contains(class))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Returns `true` if a platform-level text selection is showing.
    pub fn has_native_selection(&self) -> bool {
        self.native_selection
    }

    /// Number of `kind` listeners bound to `root`.
    pub fn listener_count(&self, root: RootId, kind: ListenerKind) -> usize {
        self.listeners
            .get(&root)
            .map(|kinds| kinds.iter().filter(|k| **k == kind).count())
            .unwrap_or(0)
    }

    /// Total number of listeners bound across all root elements.
    pub fn total_listeners(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    /// Mount a fresh root element, returning `(new, previous)`.
    pub fn replace_root_element(&mut self) -> (RootId, Option<RootId>) {
        let root = RootId(self.next_root_id);
        self.next_root_id += 1;
        let previous = self.root_element.replace(root);
        (root, previous)
    }

    /// Unmount the root element, returning the previous one.
    pub fn unmount_root_element(&mut self) -> Option<RootId> {
        self.root_element.take()
    }

    /// Append a paragraph to the root. Requires an open update.
    pub fn append_paragraph(&mut self) -> Result<NodeKey, DocumentError> {
        self.ensure_update()?;
        let root = self.root;
        let index = self.child_count(root);
        Ok(self.insert_node(root, index, NodeKind::Paragraph))
    }

    /// Append a text node to a paragraph or marker. Requires an open update.
    pub fn append_text(
        &mut self,
        parent: NodeKey,
        text: impl Into<String>,
    ) -> Result<NodeKey, DocumentError> {
        self.ensure_update()?;
        self.ensure_inline_container(parent)?;
        let index = self.child_count(parent);
        Ok(self.insert_node(parent, index, NodeKind::Text(text.into())))
    }

    /// Append an empty marker to a paragraph or marker. Requires an open update.
    pub fn append_marker(
        &mut self,
        parent: NodeKey,
        ids: Vec<AnnotationId>,
    ) -> Result<NodeKey, DocumentError> {
        self.ensure_update()?;
        self.ensure_inline_container(parent)?;
        let index = self.child_count(parent);
        Ok(self.insert_node(parent, index, NodeKind::Marker(ids)))
    }

    /// Wrap one existing inline node in a new marker carrying `ids`. Requires an open update.
    pub fn wrap_node(
        &mut self,
        key: NodeKey,
        ids: Vec<AnnotationId>,
    ) -> Result<NodeKey, DocumentError> {
        self.ensure_update()?;
        let parent = self.parent_of(key)?;
        self.ensure_inline_container(parent)?;
        let index = self.child_index(parent, key);
        let marker = self.insert_node(parent, index, NodeKind::Marker(ids));
        self.move_node(key, marker);
        Ok(marker)
    }

    /// Replace the text of a text node, clamping selection points. Requires an open update.
    pub fn set_text(&mut self, key: NodeKey, text: impl Into<String>) -> Result<(), DocumentError> {
        self.ensure_update()?;
        let node = self
            .nodes
            .get_mut(&key)
            .ok_or(DocumentError::NodeNotFound(key))?;
        let NodeKind::Text(current) = &mut node.kind else {
            return Err(DocumentError::NotText(key));
        };
        *current = text.into();
        let len = current.chars().count();
        if let Some(selection) = self.selection.as_mut() {
            for point in [&mut selection.anchor, &mut selection.focus] {
                if point.key == key {
                    point.offset = point.offset.min(len);
                }
            }
        }
        Ok(())
    }

    /// Remove a node and its subtree. Requires an open update.
    ///
    /// A selection with a point inside the removed subtree is dropped.
    pub fn remove_node(&mut self, key: NodeKey) -> Result<(), DocumentError> {
        self.ensure_update()?;
        if key == self.root {
            return Err(DocumentError::NotContainer(key));
        }
        if !self.nodes.contains_key(&key) {
            return Err(DocumentError::NodeNotFound(key));
        }
        let removed = self.subtree(key);
        self.detach(key);
        for k in &removed {
            self.nodes.remove(k);
        }
        if let Some(selection) = self.selection
            && (removed.contains(&selection.anchor.key) || removed.contains(&selection.focus.key))
        {
            self.selection = None;
        }
        Ok(())
    }

    /// Coalesce two adjacent sibling markers: `from`'s ids are merged into `to` through the
    /// installed resolver (set union if none is installed), `from`'s children move into `to`
    /// and `from` is removed. Requires an open update.
    pub fn coalesce_markers(&mut self, to: NodeKey, from: NodeKey) -> Result<(), DocumentError> {
        self.ensure_update()?;
        let from_ids = self.marker_ids(from).ok_or_else(|| self.not_marker(from))?.to_vec();
        let mut to_ids = self.marker_ids(to).ok_or_else(|| self.not_marker(to))?.to_vec();
        let parent = self.parent_of(to)?;
        if self.parent_of(from)? != parent {
            return Err(DocumentError::NotAdjacent(to, from));
        }
        let to_index = self.child_index(parent, to);
        let from_index = self.child_index(parent, from);
        if to_index.abs_diff(from_index) != 1 {
            return Err(DocumentError::NotAdjacent(to, from));
        }

        match self.resolver.as_deref() {
            Some(resolver) => resolver.merge_into(&from_ids, &mut to_ids),
            None => UnionResolver.merge_into(&from_ids, &mut to_ids),
        }
        self.set_marker_ids(to, to_ids);

        let moved = std::mem::take(&mut self.node_mut(from).children);
        let prepend = from_index < to_index;
        for (i, child) in moved.iter().enumerate() {
            self.node_mut(*child).parent = Some(to);
            let children = &mut self.node_mut(to).children;
            if prepend {
                children.insert(i, *child);
            } else {
                children.push(*child);
            }
        }
        self.detach(from);
        self.nodes.remove(&from);
        Ok(())
    }

    /// Select from `anchor` to `focus`. Requires an open update.
    ///
    /// Both points must be inside text nodes. Direction is derived from document order.
    pub fn select(&mut self, anchor: Point, focus: Point) -> Result<(), DocumentError> {
        self.ensure_update()?;
        self.check_point(anchor)?;
        self.check_point(focus)?;
        let direction = self.direction_of(anchor, focus);
        self.selection = Some(RangeSelection {
            anchor,
            focus,
            direction,
        });
        self.native_selection = true;
        Ok(())
    }

    /// Place a caret at `point`. Requires an open update.
    pub fn select_collapsed(&mut self, point: Point) -> Result<(), DocumentError> {
        self.select(point, point)
    }

    fn ensure_update(&self) -> Result<(), DocumentError> {
        if self.pending.is_some() {
            Ok(())
        } else {
            Err(DocumentError::NoUpdate)
        }
    }

    fn ensure_inline_container(&self, key: NodeKey) -> Result<(), DocumentError> {
        match self.kind(key) {
            Some(kind) if kind.holds_inline() => Ok(()),
            Some(_) => Err(DocumentError::NotContainer(key)),
            None => Err(DocumentError::NodeNotFound(key)),
        }
    }

    fn not_marker(&self, key: NodeKey) -> DocumentError {
        if self.nodes.contains_key(&key) {
            DocumentError::NotMarker(key)
        } else {
            DocumentError::NodeNotFound(key)
        }
    }

    fn check_point(&self, point: Point) -> Result<(), DocumentError> {
        let len = match self.text_len(point.key) {
            Some(len) => len,
            None if self.nodes.contains_key(&point.key) => {
                return Err(DocumentError::NotText(point.key));
            }
            None => return Err(DocumentError::NodeNotFound(point.key)),
        };
        if point.offset > len {
            return Err(DocumentError::OffsetOutOfBounds {
                key: point.key,
                offset: point.offset,
                len,
            });
        }
        Ok(())
    }

    fn direction_of(&self, anchor: Point, focus: Point) -> SelectionDirection {
        let backward = if anchor.key == focus.key {
            focus.offset < anchor.offset
        } else {
            let leaves = self.text_leaves();
            let anchor_index = leaves.iter().position(|k| *k == anchor.key);
            let focus_index = leaves.iter().position(|k| *k == focus.key);
            focus_index < anchor_index
        };
        if backward {
            SelectionDirection::Backward
        } else {
            SelectionDirection::Forward
        }
    }

    fn node_mut(&mut self, key: NodeKey) -> &mut Node {
        self.nodes
            .get_mut(&key)
            .expect("live node")
    }

    fn parent_of(&self, key: NodeKey) -> Result<NodeKey, DocumentError> {
        self.nodes
            .get(&key)
            .ok_or(DocumentError::NodeNotFound(key))?
            .parent
            .ok_or(DocumentError::NotContainer(key))
    }

    fn child_count(&self, key: NodeKey) -> usize {
        self.children(key).len()
    }

    fn child_index(&self, parent: NodeKey, child: NodeKey) -> usize {
        self.children(parent)
            .iter()
            .position(|k| *k == child)
            .unwrap_or_else(|| self.child_count(parent))
    }

    fn is_marker_key(&self, key: NodeKey) -> bool {
        self.kind(key).is_some_and(NodeKind::is_marker)
    }

    fn set_marker_ids(&mut self, key: NodeKey, ids: Vec<AnnotationId>) {
        if let NodeKind::Marker(current) = &mut self.node_mut(key).kind {
            *current = ids;
        }
    }

    fn insert_node(&mut self, parent: NodeKey, index: usize, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        self.nodes.insert(
            key,
            Node {
                kind,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, key);
        key
    }

    fn detach(&mut self, key: NodeKey) {
        if let Some(parent) = self.nodes.get(&key).and_then(|node| node.parent) {
            self.node_mut(parent).children.retain(|k| *k != key);
        }
        if let Some(node) = self.nodes.get_mut(&key) {
            node.parent = None;
        }
    }

    /// Move `key` to the end of `new_parent`'s children.
    fn move_node(&mut self, key: NodeKey, new_parent: NodeKey) {
        self.detach(key);
        self.node_mut(key).parent = Some(new_parent);
        self.node_mut(new_parent).children.push(key);
    }

    fn subtree(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            out.push(k);
            stack.extend(self.children(k).iter().copied());
        }
        out
    }

    /// Split a text node at `at`, returning the key of the new tail node.
    ///
    /// Selection points past `at` move into the tail; points exactly at `at` move too when
    /// `move_boundary` is set.
    fn split_text(
        &mut self,
        key: NodeKey,
        at: usize,
        move_boundary: bool,
    ) -> Result<NodeKey, DocumentError> {
        let parent = self.parent_of(key)?;
        let node = self.node_mut(key);
        let NodeKind::Text(text) = &mut node.kind else {
            return Err(DocumentError::NotText(key));
        };
        let byte = text
            .char_indices()
            .nth(at)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let tail = text.split_off(byte);
        let index = self.child_index(parent, key) + 1;
        let tail_key = self.insert_node(parent, index, NodeKind::Text(tail));

        if let Some(selection) = self.selection.as_mut() {
            for point in [&mut selection.anchor, &mut selection.focus] {
                if point.key == key && (point.offset > at || (move_boundary && point.offset == at))
                {
                    point.key = tail_key;
                    point.offset -= at;
                }
            }
        }
        Ok(tail_key)
    }

    fn normalize(&mut self) {
        let Some(resolver) = self.resolver.take() else {
            self.remove_empty_markers();
            return;
        };
        while self.lift_nested_marker(resolver.as_ref()) {}
        self.remove_empty_markers();
        while self.coalesce_equal_siblings(resolver.as_ref()) {}
        self.resolver = Some(resolver);
    }

    /// Lift one innermost marker out of its marker parent. Returns `false` if none is nested.
    fn lift_nested_marker(&mut self, resolver: &dyn MarkerResolver) -> bool {
        let candidate = self.nodes.iter().find_map(|(key, node)| {
            let nested = node.kind.is_marker()
                && node.parent.is_some_and(|p| self.is_marker_key(p))
                && !node.children.iter().any(|c| self.is_marker_key(*c));
            nested.then_some(*key)
        });
        let Some(inner) = candidate else {
            return false;
        };
        let Ok(outer) = self.parent_of(inner) else {
            return false;
        };
        let Ok(container) = self.parent_of(outer) else {
            return false;
        };
        let outer_ids = self.marker_ids(outer).map(<[_]>::to_vec).unwrap_or_default();

        let mut inner_ids = self.marker_ids(inner).map(<[_]>::to_vec).unwrap_or_default();
        resolver.merge_into(&outer_ids, &mut inner_ids);
        self.set_marker_ids(inner, inner_ids);

        let outer_children = &mut self.node_mut(outer).children;
        let position = outer_children
            .iter()
            .position(|k| *k == inner)
            .unwrap_or(outer_children.len());
        let tail = outer_children.split_off((position + 1).min(outer_children.len()));
        outer_children.retain(|k| *k != inner);

        let outer_index = self.child_index(container, outer);
        self.node_mut(inner).parent = Some(container);
        self.node_mut(container)
            .children
            .insert(outer_index + 1, inner);

        if !tail.is_empty() {
            let clone = self.insert_node(
                container,
                outer_index + 2,
                NodeKind::Marker(resolver.create_from(&outer_ids)),
            );
            for child in tail {
                self.node_mut(child).parent = Some(clone);
                self.node_mut(clone).children.push(child);
            }
        }

        if self.children(outer).is_empty() {
            self.detach(outer);
            self.nodes.remove(&outer);
        }
        true
    }

    fn remove_empty_markers(&mut self) {
        loop {
            let empty: Vec<NodeKey> = self
                .nodes
                .iter()
                .filter(|(_, node)| node.kind.is_marker() && node.children.is_empty())
                .map(|(key, _)| *key)
                .collect();
            if empty.is_empty() {
                return;
            }
            for key in empty {
                self.detach(key);
                self.nodes.remove(&key);
            }
        }
    }

    /// Coalesce one pair of adjacent markers with equal id sets.
    fn coalesce_equal_siblings(&mut self, resolver: &dyn MarkerResolver) -> bool {
        let pair = self.nodes.values().find_map(|node| {
            node.children.windows(2).find_map(|w| {
                let (left, right) = (self.marker_ids(w[0])?, self.marker_ids(w[1])?);
                let left_set: BTreeSet<&AnnotationId> = left.iter().collect();
                let right_set: BTreeSet<&AnnotationId> = right.iter().collect();
                (left_set == right_set).then_some((w[0], w[1]))
            })
        });
        let Some((to, from)) = pair else {
            return false;
        };

        let from_ids = self.marker_ids(from).map(<[_]>::to_vec).unwrap_or_default();
        let mut to_ids = self.marker_ids(to).map(<[_]>::to_vec).unwrap_or_default();
        resolver.merge_into(&from_ids, &mut to_ids);
        self.set_marker_ids(to, to_ids);

        let moved = std::mem::take(&mut self.node_mut(from).children);
        for child in moved {
            self.node_mut(child).parent = Some(to);
            self.node_mut(to).children.push(child);
        }
        self.detach(from);
        self.nodes.remove(&from);
        true
    }

    fn diff_markers(&self, base: &BTreeMap<NodeKey, Node>) -> Vec<NodeMutation> {
        let mut mutations = Vec::new();
        for (key, node) in &self.nodes {
            if !node.kind.is_marker() {
                continue;
            }
            match base.get(key) {
                None => mutations.push(NodeMutation::new(*key, MutationKind::Created)),
                Some(old) if old != node => {
                    mutations.push(NodeMutation::new(*key, MutationKind::Updated))
                }
                Some(_) => {}
            }
        }
        for (key, old) in base {
            if old.kind.is_marker() && !self.nodes.contains_key(key) {
                mutations.push(NodeMutation::new(*key, MutationKind::Destroyed));
            }
        }
        mutations
    }

    fn sync_elements(&mut self) {
        self.elements.retain(|key, _| self.nodes.contains_key(key));
        for key in self.nodes.keys() {
            if *key != self.root {
                self.elements.entry(*key).or_default();
            }
        }
    }
}

impl DocumentEngine for Document {
    fn begin_update(&mut self) -> Result<(), DocumentError> {
        if self.pending.is_some() {
            return Err(DocumentError::UpdateInProgress);
        }
        self.pending = Some(PendingUpdate {
            base_nodes: self.nodes.clone(),
            base_selection: self.selection,
        });
        Ok(())
    }

    fn commit_update(&mut self) -> Result<Vec<NodeMutation>, DocumentError> {
        self.ensure_update()?;
        self.normalize();
        let pending = self.pending.take().ok_or(DocumentError::NoUpdate)?;
        let mutations = self.diff_markers(&pending.base_nodes);
        self.sync_elements();
        Ok(mutations)
    }

    fn rollback_update(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.nodes = pending.base_nodes;
            self.selection = pending.base_selection;
        }
    }

    fn selection(&self) -> Option<RangeSelection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Option<RangeSelection>) -> Result<(), DocumentError> {
        self.ensure_update()?;
        match selection {
            Some(selection) => self.select(selection.anchor, selection.focus),
            None => {
                self.selection = None;
                Ok(())
            }
        }
    }

    fn wrap_selection_in_marker(
        &mut self,
        id: &AnnotationId,
    ) -> Result<Vec<NodeKey>, DocumentError> {
        self.ensure_update()?;
        let Some(selection) = self.selection else {
            return Ok(Vec::new());
        };
        if selection.is_collapsed() {
            return Ok(Vec::new());
        }
        let (start, end) = (selection.start(), selection.end());
        self.check_point(start)?;
        self.check_point(end)?;

        // Split the end first so the start split can carry a same-node end point along.
        let end_len = self.text_len(end.key).unwrap_or(0);
        if end.offset > 0 && end.offset < end_len {
            self.split_text(end.key, end.offset, false)?;
        }
        let start_len = self.text_len(start.key).unwrap_or(0);
        if start.offset > 0 && start.offset < start_len {
            self.split_text(start.key, start.offset, true)?;
        }

        let Some(selection) = self.selection else {
            return Ok(Vec::new());
        };
        let (start, end) = (selection.start(), selection.end());
        let leaves = self.text_leaves();
        let (Some(mut first), Some(mut last)) = (
            leaves.iter().position(|k| *k == start.key),
            leaves.iter().position(|k| *k == end.key),
        ) else {
            return Ok(Vec::new());
        };
        if start.offset >= self.text_len(start.key).unwrap_or(0) {
            first += 1;
        }
        if end.offset == 0 {
            if last == 0 {
                return Ok(Vec::new());
            }
            last -= 1;
        }
        if first > last {
            return Ok(Vec::new());
        }

        let mut created = Vec::new();
        let mut current: Option<(NodeKey, NodeKey)> = None;
        for leaf in &leaves[first..=last] {
            let parent = self.parent_of(*leaf)?;
            match current {
                Some((marker, marker_parent)) if marker_parent == parent => {
                    self.move_node(*leaf, marker);
                }
                _ => {
                    let index = self.child_index(parent, *leaf);
                    let marker =
                        self.insert_node(parent, index, NodeKind::Marker(vec![id.clone()]));
                    self.move_node(*leaf, marker);
                    created.push(marker);
                    current = Some((marker, parent));
                }
            }
        }
        Ok(created)
    }

    fn delete_marker_id(
        &mut self,
        key: NodeKey,
        id: &AnnotationId,
    ) -> Result<Vec<AnnotationId>, DocumentError> {
        self.ensure_update()?;
        let not_marker = self.not_marker(key);
        let node = self.nodes.get_mut(&key).ok_or(not_marker.clone())?;
        let NodeKind::Marker(ids) = &mut node.kind else {
            return Err(not_marker);
        };
        ids.retain(|existing| existing != id);
        Ok(ids.clone())
    }

    fn unwrap_marker(&mut self, key: NodeKey) -> Result<(), DocumentError> {
        self.ensure_update()?;
        if !self.is_marker_key(key) {
            return Err(self.not_marker(key));
        }
        let parent = self.parent_of(key)?;
        let index = self.child_index(parent, key);
        let children = std::mem::take(&mut self.node_mut(key).children);
        for (i, child) in children.iter().enumerate() {
            self.node_mut(*child).parent = Some(parent);
            self.node_mut(parent).children.insert(index + 1 + i, *child);
        }
        self.detach(key);
        self.nodes.remove(&key);
        Ok(())
    }

    fn marker_ids(&self, key: NodeKey) -> Option<&[AnnotationId]> {
        match self.kind(key) {
            Some(NodeKind::Marker(ids)) => Some(ids.as_slice()),
            _ => None,
        }
    }

    fn marker_keys(&self) -> Vec<NodeKey> {
        self.descendants()
            .into_iter()
            .filter(|key| self.is_marker_key(*key))
            .collect()
    }

    fn text_len(&self, key: NodeKey) -> Option<usize> {
        self.text(key).map(|text| text.chars().count())
    }

    fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&key).and_then(|node| node.parent)
    }

    fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|k| *k == key)?;
        siblings.get(index + 1).copied()
    }

    fn set_element_class(&mut self, key: NodeKey, class: &str, enabled: bool) -> bool {
        let Some(classes) = self.elements.get_mut(&key) else {
            return false;
        };
        if enabled {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
        true
    }

    fn clear_native_selection(&mut self) {
        self.native_selection = false;
    }

    fn set_marker_resolver(&mut self, resolver: Option<Box<dyn MarkerResolver>>) {
        self.resolver = resolver;
    }

    fn root_element(&self) -> Option<RootId> {
        self.root_element
    }

    fn add_root_listener(&mut self, root: RootId, kind: ListenerKind) {
        self.listeners.entry(root).or_default().push(kind);
    }

    fn remove_root_listener(&mut self, root: RootId, kind: ListenerKind) {
        if let Some(kinds) = self.listeners.get_mut(&root) {
            if let Some(position) = kinds.iter().position(|k| *k == kind) {
                kinds.remove(position);
            }
            if kinds.is_empty() {
                self.listeners.remove(&root);
            }
        }
    }
}
