//! Pointer interaction controllers.
//!
//! Raw pointer and wheel input is translated into store mutations by two cooperating
//! controllers: [`CanvasController`] for canvas-level gestures (palette drops, wheel pan/zoom)
//! and [`NodeController`] for node-level gestures (node drag, edge drawing). Both go through
//! the viewport transform and never touch the flow except through [`crate::FlowStore`].

mod canvas;
mod node;

pub use canvas::{CanvasController, DragPayload, WheelInput};
pub use node::{EdgeSource, NodeController, PressOutcome, PreviewLine, ReleaseOutcome};

use crate::types::NodeId;
use eframe::egui;

/// An input anchor found under the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputAnchor {
    /// Node the anchor belongs to
    pub node_id: NodeId,
    pub input_id: String,
}

/// What lies under the pointer when an edge is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    /// Nearest enclosing node
    pub node_id: NodeId,
    /// Nearest enclosing input anchor, if the pointer is over one
    pub input_anchor: Option<InputAnchor>,
}

/// Hit-testing capability supplied by the rendering environment.
pub trait DropTargetResolver {
    /// Resolves the node (and input anchor) under a screen-space point.
    fn resolve_drop_target(&self, screen_point: egui::Pos2) -> Option<DropTarget>;
}

impl<F> DropTargetResolver for F
where
    F: Fn(egui::Pos2) -> Option<DropTarget>,
{
    fn resolve_drop_target(&self, screen_point: egui::Pos2) -> Option<DropTarget> {
        self(screen_point)
    }
}
