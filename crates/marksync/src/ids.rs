//! Identifier types and annotation id sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one logical annotation (a comment or highlight).
///
/// The engine only relies on equality, ordering and hashing; the text is never parsed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    /// Wrap an existing token.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AnnotationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Stable key of a live document node, assigned by the document engine.
///
/// Keys are unique among live nodes and never reused within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// Get the underlying numeric key.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a host root element that UI listeners are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootId(pub u64);

/// Source of fresh annotation ids.
pub trait IdGenerator {
    /// Produce an id that has never been produced before in this session.
    fn next_id(&mut self) -> AnnotationId;
}

/// Random (UUID v4) annotation ids.
#[derive(Debug, Clone, Default)]
pub struct UuidIdGenerator {
    prefix: Option<String>,
}

impl UuidIdGenerator {
    /// Create a generator producing bare UUIDs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator producing `{prefix}{uuid}` ids.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl IdGenerator for UuidIdGenerator {
    fn next_id(&mut self) -> AnnotationId {
        let uuid = uuid::Uuid::new_v4();
        match &self.prefix {
            Some(prefix) => AnnotationId(format!("{prefix}{uuid}")),
            None => AnnotationId(uuid.to_string()),
        }
    }
}

/// Deterministic ids `{prefix}{n}` counting up from 1.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    /// Create a generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> AnnotationId {
        let id = AnnotationId(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}
