//! Node-level gestures: dragging nodes and drawing edges between anchors.
//!
//! The controller owns the state of the one gesture in progress. A press that arrives while a
//! gesture is active never starts a second one; it is either ignored or, during edge drawing,
//! treated as hovering a potential edge target.

use super::{DropTarget, DropTargetResolver};
use crate::constants::DEFAULT_INPUT_ID;
use crate::error::StoreError;
use crate::storage::KeyValueStore;
use crate::store::FlowStore;
use crate::types::{EdgeId, NodeId};
use crate::viewport::{canvas_to_screen, screen_to_canvas, snap_with};
use eframe::egui;

/// Output anchor an edge is being drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSource {
    pub node_id: NodeId,
    pub output_id: String,
}

/// Rubber-band line shown while drawing an edge, in canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewLine {
    pub start: egui::Pos2,
    pub end: egui::Pos2,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    DragNode {
        node_id: NodeId,
        /// Screen-space offset from the node's projected origin to the pointer
        offset: egui::Vec2,
    },
    DrawEdge {
        source: EdgeSource,
        preview: PreviewLine,
    },
}

/// Result of pressing on a node body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// A drag gesture started and the node was selected
    DragStarted,
    /// An edge is being drawn and this node may complete it; selection and drag are suppressed
    EdgeTargetCandidate,
    /// The press was ignored
    Ignored,
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// No gesture was active
    Idle,
    /// A drag ended; `recorded` tells whether it produced an undo step
    DragFinished { node_id: NodeId, recorded: bool },
    /// An edge was drawn and created
    EdgeCreated(EdgeId),
    /// An edge was drawn but no valid target was found or the store refused it
    EdgeRejected,
}

/// Stateful controller for node drag and edge drawing.
#[derive(Debug, Clone, Default)]
pub struct NodeController {
    gesture: Option<Gesture>,
}

impl NodeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when no gesture is in progress.
    pub fn is_idle(&self) -> bool {
        self.gesture.is_none()
    }

    pub fn is_drawing_edge(&self) -> bool {
        matches!(self.gesture, Some(Gesture::DrawEdge { .. }))
    }

    /// Node currently being dragged, if any.
    pub fn dragging_node(&self) -> Option<NodeId> {
        match &self.gesture {
            Some(Gesture::DragNode { node_id, .. }) => Some(*node_id),
            _ => None,
        }
    }

    pub fn edge_source(&self) -> Option<&EdgeSource> {
        match &self.gesture {
            Some(Gesture::DrawEdge { source, .. }) => Some(source),
            _ => None,
        }
    }

    pub fn preview_line(&self) -> Option<PreviewLine> {
        match &self.gesture {
            Some(Gesture::DrawEdge { preview, .. }) => Some(*preview),
            _ => None,
        }
    }

    /// Handles a primary press on a node body.
    ///
    /// # Arguments
    ///
    /// * `store` - The flow store
    /// * `node_id` - The pressed node
    /// * `pointer` - Pointer position in canvas-widget screen space
    pub fn press_node<S: KeyValueStore>(
        &mut self,
        store: &mut FlowStore<S>,
        node_id: NodeId,
        pointer: egui::Pos2,
    ) -> Result<PressOutcome, StoreError> {
        match &self.gesture {
            Some(Gesture::DrawEdge { source, .. }) => {
                if source.node_id == node_id {
                    return Ok(PressOutcome::Ignored);
                }
                return Ok(PressOutcome::EdgeTargetCandidate);
            }
            Some(Gesture::DragNode { node_id: active, .. }) => {
                log::debug!("Ignoring press on {node_id} while dragging {active}");
                return Ok(PressOutcome::Ignored);
            }
            None => {}
        }

        let Some(node) = store.node(node_id) else {
            log::warn!("Cannot start drag: node {node_id} not found");
            return Err(StoreError::NodeNotFound(node_id));
        };
        let origin = canvas_to_screen(node.position, store.viewport());
        let offset = pointer - origin;

        store.set_selected_node(Some(node_id));
        store.begin_node_interaction(node_id)?;
        self.gesture = Some(Gesture::DragNode { node_id, offset });
        Ok(PressOutcome::DragStarted)
    }

    /// Starts drawing an edge from an output anchor.
    ///
    /// # Arguments
    ///
    /// * `store` - The flow store
    /// * `node_id` - Node owning the anchor
    /// * `output_id` - Output port id
    /// * `anchor_center` - Anchor center in canvas-widget screen space
    ///
    /// # Returns
    ///
    /// `Ok(false)` if another gesture is already in progress.
    pub fn press_output_anchor<S: KeyValueStore>(
        &mut self,
        store: &FlowStore<S>,
        node_id: NodeId,
        output_id: &str,
        anchor_center: egui::Pos2,
    ) -> Result<bool, StoreError> {
        if self.gesture.is_some() {
            log::debug!("Ignoring anchor press on {node_id}: gesture already active");
            return Ok(false);
        }
        if store.node(node_id).is_none() {
            log::warn!("Cannot draw edge: node {node_id} not found");
            return Err(StoreError::NodeNotFound(node_id));
        }

        let start = screen_to_canvas(anchor_center, store.viewport());
        self.gesture = Some(Gesture::DrawEdge {
            source: EdgeSource {
                node_id,
                output_id: output_id.to_string(),
            },
            preview: PreviewLine { start, end: start },
        });
        Ok(true)
    }

    /// Tracks pointer movement for the active gesture.
    pub fn pointer_moved<S: KeyValueStore>(
        &mut self,
        store: &mut FlowStore<S>,
        pointer: egui::Pos2,
    ) -> Result<(), StoreError> {
        let viewport = *store.viewport();
        let (node_id, offset) = match &mut self.gesture {
            Some(Gesture::DragNode { node_id, offset }) => (*node_id, *offset),
            Some(Gesture::DrawEdge { preview, .. }) => {
                preview.end = screen_to_canvas(pointer, &viewport);
                return Ok(());
            }
            None => return Ok(()),
        };

        let canvas_point = screen_to_canvas(pointer - offset, &viewport);
        let position = snap_with(canvas_point, store.editor_settings());
        if let Err(err) = store.update_node_position(node_id, position) {
            self.gesture = None;
            return Err(err);
        }
        Ok(())
    }

    /// Ends the active gesture.
    ///
    /// A drag is committed as a single undo step. An edge is created when the resolver finds
    /// a node other than the source under the pointer. The gesture state is cleared whatever
    /// the outcome.
    pub fn pointer_released<S: KeyValueStore>(
        &mut self,
        store: &mut FlowStore<S>,
        pointer: egui::Pos2,
        resolver: &dyn DropTargetResolver,
    ) -> Result<ReleaseOutcome, StoreError> {
        match self.gesture.take() {
            None => Ok(ReleaseOutcome::Idle),
            Some(Gesture::DragNode { node_id, .. }) => {
                let recorded = store.finalize_node_interaction(Some(node_id))?;
                Ok(ReleaseOutcome::DragFinished { node_id, recorded })
            }
            Some(Gesture::DrawEdge { source, .. }) => {
                let target = resolver.resolve_drop_target(pointer);
                complete_edge(store, &source, target)
            }
        }
    }

    /// Abandons the active gesture. A drag in progress is still committed.
    pub fn cancel<S: KeyValueStore>(&mut self, store: &mut FlowStore<S>) -> Result<(), StoreError> {
        if let Some(Gesture::DragNode { node_id, .. }) = self.gesture.take() {
            store.finalize_node_interaction(Some(node_id))?;
        }
        Ok(())
    }
}

fn complete_edge<S: KeyValueStore>(
    store: &mut FlowStore<S>,
    source: &EdgeSource,
    target: Option<DropTarget>,
) -> Result<ReleaseOutcome, StoreError> {
    let Some(target) = target else {
        log::debug!("Edge released over empty canvas");
        return Ok(ReleaseOutcome::EdgeRejected);
    };
    if target.node_id == source.node_id {
        log::debug!("Edge released over its own source node");
        return Ok(ReleaseOutcome::EdgeRejected);
    }

    let input_id = match target.input_anchor {
        Some(anchor) if anchor.node_id == target.node_id => anchor.input_id,
        _ => store
            .node(target.node_id)
            .and_then(|node| store.registry().get(&node.node_type))
            .and_then(|definition| definition.inputs.first())
            .map(|port| port.id.clone())
            .unwrap_or_else(|| DEFAULT_INPUT_ID.to_string()),
    };

    match store.add_edge(source.node_id, &source.output_id, target.node_id, &input_id, None) {
        Ok(edge_id) => Ok(ReleaseOutcome::EdgeCreated(edge_id)),
        Err(StoreError::Storage(err)) => Err(StoreError::Storage(err)),
        Err(err) => {
            log::debug!("Edge not created: {err}");
            Ok(ReleaseOutcome::EdgeRejected)
        }
    }
}
