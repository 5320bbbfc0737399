//! Selection model shared between the engine and its document host.

use crate::ids::NodeKey;

/// A position inside a text node: node key plus character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    /// Text node key.
    pub key: NodeKey,
    /// Offset in Unicode scalar values (`char`) from the start of the node's text.
    pub offset: usize,
}

impl Point {
    /// Create a new point.
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

/// Selection direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionDirection {
    /// Anchor precedes focus in document order.
    Forward,
    /// Focus precedes anchor in document order.
    Backward,
}

/// Range selection reported by the document engine.
///
/// The engine owns document order, so it also owns `direction`; this type never compares
/// points across nodes on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSelection {
    /// Where the selection started.
    pub anchor: Point,
    /// Where the selection currently ends (the caret).
    pub focus: Point,
    /// Whether focus comes after anchor in document order.
    pub direction: SelectionDirection,
}

impl RangeSelection {
    /// A selection with anchor and focus at the same point.
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
            direction: SelectionDirection::Forward,
        }
    }

    /// Returns `true` if anchor and focus are the same point.
    ///
    /// Two points at the same visual position in different nodes are *not* collapsed.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Returns `true` if the focus precedes the anchor.
    pub fn is_backward(&self) -> bool {
        self.direction == SelectionDirection::Backward
    }

    /// The earlier point in document order.
    pub fn start(&self) -> Point {
        if self.is_backward() {
            self.focus
        } else {
            self.anchor
        }
    }

    /// The later point in document order.
    pub fn end(&self) -> Point {
        if self.is_backward() {
            self.anchor
        } else {
            self.focus
        }
    }

    /// Collapse onto the later point, whatever the original direction.
    pub fn collapse_to_end(&self) -> Self {
        Self::collapsed(self.end())
    }
}
