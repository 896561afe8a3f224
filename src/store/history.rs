//! Snapshot-based undo/redo history.
//!
//! The history is an ordered list of `(nodes, edges)` snapshots plus a cursor pointing at the
//! snapshot that matches the live graph. Selection and viewport are not part of a snapshot.

use crate::types::{Edge, Node};
use serde::{Deserialize, Serialize};

/// Deep copy of the undoable part of a flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistorySnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl HistorySnapshot {
    pub fn new(nodes: &[Node], edges: &[Edge]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        }
    }

    /// Returns true if this snapshot holds the given graph. Measured node sizes are ignored.
    pub fn matches(&self, nodes: &[Node], edges: &[Edge]) -> bool {
        self.edges == edges
            && self.nodes.len() == nodes.len()
            && self.nodes.iter().zip(nodes).all(|(a, b)| same_node(a, b))
    }
}

fn same_node(a: &Node, b: &Node) -> bool {
    a.size == b.size || Node { size: b.size, ..a.clone() } == *b
}

/// Bounded snapshot list with a cursor.
///
/// Invariant: when non-empty, `cursor < snapshots.len()`.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<HistorySnapshot>,
    cursor: usize,
    capacity: usize,
}

impl History {
    /// Creates an empty history retaining at most `capacity` snapshots.
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Discards everything and starts over from a single snapshot.
    pub fn reset(&mut self, initial: HistorySnapshot) {
        self.snapshots.clear();
        self.snapshots.push(initial);
        self.cursor = 0;
    }

    /// Appends a snapshot after the cursor.
    ///
    /// Any redo entries beyond the cursor are dropped first. When the capacity is exceeded the
    /// oldest snapshot is evicted; the cursor always ends on the snapshot just pushed.
    pub fn record(&mut self, snapshot: HistorySnapshot) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(snapshot);
        if self.snapshots.len() > self.capacity {
            self.snapshots.remove(0);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Moves the cursor back one step and returns the snapshot now current.
    pub fn undo(&mut self) -> Option<&HistorySnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Moves the cursor forward one step and returns the snapshot now current.
    pub fn redo(&mut self) -> Option<&HistorySnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// The snapshot under the cursor.
    pub fn current(&self) -> Option<&HistorySnapshot> {
        self.snapshots.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
