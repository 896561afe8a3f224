//! Canvas hit-testing and pointer dispatch.
//!
//! All positions handed to the interaction controllers are relative to the canvas widget's
//! top-left corner. [`HitMap`] holds the node and anchor geometry of one frame in canvas space
//! and doubles as the drop-target resolver used when an edge is released.

use super::state::FlowEditorApp;
use crate::constants::{
    ANCHOR_RADIUS, EDGE_HIT_TOLERANCE, NODE_HEIGHT, NODE_TITLE_PADDING, NODE_TITLE_SIZE, NODE_WIDTH,
};
use crate::interaction::{DragPayload, DropTarget, DropTargetResolver, InputAnchor, WheelInput};
use crate::registry::NodeRegistry;
use crate::types::{EdgeId, FlowState, Node, NodeId, NodeSize, Viewport};
use crate::viewport::{canvas_to_screen, screen_to_canvas};
use eframe::egui;

/// A named anchor on a node edge, in canvas space.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorHit {
    pub port_id: String,
    pub label: String,
    pub center: egui::Pos2,
}

/// Canvas-space geometry of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHit {
    pub id: NodeId,
    pub rect: egui::Rect,
    pub inputs: Vec<AnchorHit>,
    pub outputs: Vec<AnchorHit>,
}

/// Node and anchor geometry for one frame.
#[derive(Debug, Clone)]
pub struct HitMap {
    viewport: Viewport,
    /// Nodes in paint order; later entries are on top
    nodes: Vec<NodeHit>,
}

fn default_size(node: &Node, registry: &NodeRegistry) -> NodeSize {
    registry
        .get(&node.node_type)
        .map(|def| def.default_size)
        .unwrap_or(NodeSize::new(NODE_WIDTH, NODE_HEIGHT))
}

/// Size of a node: its measured size, else its definition's default, else the global fallback.
pub fn node_size(node: &Node, registry: &NodeRegistry) -> egui::Vec2 {
    node.size
        .unwrap_or_else(|| default_size(node, registry))
        .to_vec2()
}

/// Size a node needs to fit a title of `title_width` canvas units. Never smaller than the
/// definition's default; widths are whole units so re-measuring is stable.
pub fn measured_size(node: &Node, registry: &NodeRegistry, title_width: f32) -> NodeSize {
    let default = default_size(node, registry);
    let width = (title_width + 2.0 * NODE_TITLE_PADDING).ceil().max(default.width);
    NodeSize::new(width, default.height)
}

fn spread(ports: &[crate::registry::PortDefinition], x: f32, rect: egui::Rect) -> Vec<AnchorHit> {
    let count = ports.len() as f32;
    ports
        .iter()
        .enumerate()
        .map(|(index, port)| AnchorHit {
            port_id: port.id.clone(),
            label: port.label.clone(),
            center: egui::pos2(x, rect.min.y + rect.height() * (index as f32 + 1.0) / (count + 1.0)),
        })
        .collect()
}

impl HitMap {
    pub fn build(state: &FlowState, registry: &NodeRegistry) -> Self {
        let nodes = state
            .nodes
            .iter()
            .map(|node| {
                let rect = egui::Rect::from_min_size(node.position, node_size(node, registry));
                let (inputs, outputs) = match registry.get(&node.node_type) {
                    Some(def) => (
                        spread(&def.inputs, rect.min.x, rect),
                        spread(&def.outputs, rect.max.x, rect),
                    ),
                    None => (Vec::new(), Vec::new()),
                };
                NodeHit {
                    id: node.id,
                    rect,
                    inputs,
                    outputs,
                }
            })
            .collect();
        Self {
            viewport: state.viewport,
            nodes,
        }
    }

    pub fn nodes(&self) -> &[NodeHit] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeHit> {
        self.nodes.iter().find(|hit| hit.id == id)
    }

    /// Topmost node whose body contains a canvas point.
    pub fn node_at(&self, point: egui::Pos2) -> Option<&NodeHit> {
        self.nodes.iter().rev().find(|hit| hit.rect.contains(point))
    }

    fn anchor_at<'a>(
        &'a self,
        point: egui::Pos2,
        ports: impl Fn(&'a NodeHit) -> &'a [AnchorHit],
    ) -> Option<(NodeId, &'a AnchorHit)> {
        let reach = ANCHOR_RADIUS * 2.0;
        self.nodes.iter().rev().find_map(|hit| {
            ports(hit)
                .iter()
                .find(|anchor| anchor.center.distance(point) <= reach)
                .map(|anchor| (hit.id, anchor))
        })
    }

    pub fn output_anchor_at(&self, point: egui::Pos2) -> Option<(NodeId, &AnchorHit)> {
        self.anchor_at(point, |hit| hit.outputs.as_slice())
    }

    pub fn input_anchor_at(&self, point: egui::Pos2) -> Option<(NodeId, &AnchorHit)> {
        self.anchor_at(point, |hit| hit.inputs.as_slice())
    }

    /// Start and end of an edge, falling back to the node's side midpoints for undeclared ports.
    pub fn edge_endpoints(
        &self,
        state: &FlowState,
        edge_id: EdgeId,
    ) -> Option<(egui::Pos2, egui::Pos2)> {
        let edge = state.edge(edge_id)?;
        let source = self.node(edge.source_node_id)?;
        let target = self.node(edge.target_node_id)?;
        let start = source
            .outputs
            .iter()
            .find(|a| a.port_id == edge.source_output_id)
            .map(|a| a.center)
            .unwrap_or_else(|| source.rect.right_center());
        let end = target
            .inputs
            .iter()
            .find(|a| a.port_id == edge.target_input_id)
            .map(|a| a.center)
            .unwrap_or_else(|| target.rect.left_center());
        Some((start, end))
    }

    /// Edge whose straight span passes within tolerance of a canvas point.
    pub fn edge_at(&self, state: &FlowState, point: egui::Pos2) -> Option<EdgeId> {
        state.edges.iter().rev().find_map(|edge| {
            let (start, end) = self.edge_endpoints(state, edge.id)?;
            (distance_to_segment(point, start, end) <= EDGE_HIT_TOLERANCE).then_some(edge.id)
        })
    }
}

impl DropTargetResolver for HitMap {
    fn resolve_drop_target(&self, screen_point: egui::Pos2) -> Option<DropTarget> {
        let point = screen_to_canvas(screen_point, &self.viewport);
        if let Some((node_id, anchor)) = self.input_anchor_at(point) {
            return Some(DropTarget {
                node_id,
                input_anchor: Some(InputAnchor {
                    node_id,
                    input_id: anchor.port_id.clone(),
                }),
            });
        }
        self.node_at(point).map(|hit| DropTarget {
            node_id: hit.id,
            input_anchor: None,
        })
    }
}

fn distance_to_segment(point: egui::Pos2, start: egui::Pos2, end: egui::Pos2) -> f32 {
    let span = end - start;
    let length_sq = span.length_sq();
    if length_sq == 0.0 {
        return point.distance(start);
    }
    let t = ((point - start).dot(span) / length_sq).clamp(0.0, 1.0);
    point.distance(start + span * t)
}

impl FlowEditorApp {
    /// Allocates the canvas, dispatches its input and paints it.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        self.canvas_rect = response.rect;
        let origin = response.rect.min.to_vec2();

        if let Some(payload) = response.dnd_release_payload::<DragPayload>() {
            if let Some(pointer) = ui.input(|i| i.pointer.interact_pos()) {
                let result = self.canvas.handle_drop(&mut self.store, &payload, pointer - origin);
                self.report(result);
            }
        }

        if response.hovered() {
            self.handle_wheel_events(ui, origin);
        }

        self.handle_pointer(ui, &response, origin);
        self.sync_node_sizes(&painter);

        let hits = HitMap::build(self.store.state(), self.store.registry());
        self.render_canvas(&painter, response.rect, &hits);
    }

    /// Lays out every node title and reports sizes that differ from the stored ones.
    fn sync_node_sizes(&mut self, painter: &egui::Painter) {
        let changed: Vec<(NodeId, NodeSize)> = self
            .store
            .nodes()
            .iter()
            .filter_map(|node| {
                let title = painter.layout_no_wrap(
                    node.label.clone(),
                    egui::FontId::proportional(NODE_TITLE_SIZE),
                    egui::Color32::BLACK,
                );
                let size = measured_size(node, self.store.registry(), title.size().x);
                (node.size != Some(size)).then_some((node.id, size))
            })
            .collect();
        for (node_id, size) in changed {
            let result = self.store.update_node_size(node_id, size);
            self.report(result);
        }
    }

    fn handle_wheel_events(&mut self, ui: &egui::Ui, origin: egui::Vec2) {
        let page = self.canvas_rect.height();
        let wheels: Vec<WheelInput> = ui.input(|i| {
            let pointer = i.pointer.hover_pos();
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::MouseWheel {
                        unit,
                        delta,
                        modifiers,
                        ..
                    } => {
                        let scale = match unit {
                            egui::MouseWheelUnit::Point => 1.0,
                            egui::MouseWheelUnit::Line => 40.0,
                            egui::MouseWheelUnit::Page => page,
                        };
                        // egui reports scroll-up as positive y; controllers expect DOM deltas.
                        Some(WheelInput {
                            pointer: pointer? - origin,
                            delta: -*delta * scale,
                            zoom_modifier: modifiers.command || modifiers.ctrl,
                        })
                    }
                    _ => None,
                })
                .collect()
        });
        for wheel in wheels {
            self.canvas.handle_wheel(&mut self.store, wheel);
        }
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, response: &egui::Response, origin: egui::Vec2) {
        let (pressed, released, press_origin, latest) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.press_origin(),
                i.pointer.latest_pos(),
            )
        });

        if pressed {
            if let Some(pos) = press_origin.filter(|p| response.rect.contains(*p)) {
                self.handle_primary_press(pos - origin);
            }
        }

        if self.nodes.is_idle() {
            return;
        }
        if let Some(pos) = latest {
            let result = self.nodes.pointer_moved(&mut self.store, pos - origin);
            self.report(result);
        }
        if released {
            let pointer = latest.unwrap_or(response.rect.min) - origin;
            let hits = HitMap::build(self.store.state(), self.store.registry());
            let result = self.nodes.pointer_released(&mut self.store, pointer, &hits);
            self.report(result);
        }
    }

    /// Routes a primary press at a canvas-widget position: output anchor, node body, edge, or
    /// empty canvas, in that order.
    pub(crate) fn handle_primary_press(&mut self, local: egui::Pos2) {
        let hits = HitMap::build(self.store.state(), self.store.registry());
        let point = screen_to_canvas(local, self.store.viewport());

        if let Some((node_id, anchor)) = hits.output_anchor_at(point) {
            let center = canvas_to_screen(anchor.center, self.store.viewport());
            let result = self
                .nodes
                .press_output_anchor(&self.store, node_id, &anchor.port_id, center);
            self.report(result);
            return;
        }
        if let Some(hit) = hits.node_at(point) {
            let result = self.nodes.press_node(&mut self.store, hit.id, local);
            self.report(result);
            return;
        }
        if !self.nodes.is_idle() {
            return;
        }
        match hits.edge_at(self.store.state(), point) {
            Some(edge_id) => self.store.set_selected_edge(Some(edge_id)),
            None => {
                self.store.set_selected_node(None);
                self.store.set_selected_edge(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_FLOW_TYPE;
    use crate::storage::MemoryStorage;
    use crate::store::FlowStore;

    fn store_with_two_nodes() -> (FlowStore, NodeId, NodeId) {
        let mut store = FlowStore::new(NodeRegistry::builtin(), MemoryStorage::new());
        store
            .create_new_flow("flow_hits", "Hits", "", DEFAULT_FLOW_TYPE)
            .unwrap();
        let a = store.add_node("pf.Node", egui::pos2(0.0, 0.0)).unwrap();
        let b = store.add_node("pf.BatchNode", egui::pos2(400.0, 0.0)).unwrap();
        (store, a, b)
    }

    #[test]
    fn test_anchors_are_spread_along_node_sides() {
        let (store, a, _) = store_with_two_nodes();
        let hits = HitMap::build(store.state(), store.registry());

        let node = hits.node(a).unwrap();
        assert_eq!(node.rect, egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(200.0, 120.0)));
        assert_eq!(node.inputs[0].center, egui::pos2(0.0, 60.0));
        let success = &node.outputs[0];
        assert_eq!(success.port_id, "success");
        assert!((success.center.y - 40.0).abs() < 1e-4);
        assert_eq!(success.center.x, 200.0);
    }

    #[test]
    fn test_node_and_anchor_lookup() {
        let (store, a, b) = store_with_two_nodes();
        let hits = HitMap::build(store.state(), store.registry());

        assert_eq!(hits.node_at(egui::pos2(90.0, 40.0)).map(|h| h.id), Some(a));
        assert_eq!(hits.node_at(egui::pos2(300.0, 40.0)).map(|h| h.id), None);

        let (owner, anchor) = hits.output_anchor_at(egui::pos2(202.0, 41.0)).unwrap();
        assert_eq!(owner, a);
        assert_eq!(anchor.port_id, "success");

        let (owner, anchor) = hits.input_anchor_at(egui::pos2(400.0, 72.0)).unwrap();
        assert_eq!(owner, b);
        assert_eq!(anchor.port_id, "input_default");
    }

    #[test]
    fn test_drop_target_prefers_input_anchor() {
        let (mut store, _, b) = store_with_two_nodes();
        store.set_viewport(Viewport {
            x: 10.0,
            y: 0.0,
            zoom: 1.0,
        });
        let hits = HitMap::build(store.state(), store.registry());

        let on_anchor = hits.resolve_drop_target(egui::pos2(410.0, 70.0)).unwrap();
        assert_eq!(
            on_anchor.input_anchor,
            Some(InputAnchor {
                node_id: b,
                input_id: "input_default".into()
            })
        );

        let on_body = hits.resolve_drop_target(egui::pos2(500.0, 40.0)).unwrap();
        assert_eq!(on_body.node_id, b);
        assert_eq!(on_body.input_anchor, None);

        assert_eq!(hits.resolve_drop_target(egui::pos2(300.0, 300.0)), None);
    }

    #[test]
    fn test_edge_hit_near_segment() {
        let (mut store, a, b) = store_with_two_nodes();
        let edge = store.add_edge(a, "success", b, "input_default", None).unwrap();
        let hits = HitMap::build(store.state(), store.registry());

        let (start, end) = hits.edge_endpoints(store.state(), edge).unwrap();
        let middle = start + (end - start) * 0.5;

        assert_eq!(hits.edge_at(store.state(), middle + egui::vec2(0.0, 3.0)), Some(edge));
        assert_eq!(hits.edge_at(store.state(), middle + egui::vec2(0.0, 30.0)), None);
    }

    #[test]
    fn test_measured_size_grows_with_title_only() {
        let (store, a, b) = store_with_two_nodes();
        let registry = store.registry();
        let node = store.node(a).unwrap();

        assert_eq!(measured_size(node, registry, 40.0), NodeSize::new(200.0, 120.0));
        assert_eq!(measured_size(node, registry, 250.2), NodeSize::new(283.0, 120.0));
        assert_eq!(
            measured_size(store.node(b).unwrap(), registry, 10.0),
            NodeSize::new(220.0, 140.0)
        );
    }

    #[test]
    fn test_measured_size_wins_over_definition_default() {
        let (mut store, a, _) = store_with_two_nodes();
        store.update_node_size(a, NodeSize::new(260.0, 120.0)).unwrap();

        let hits = HitMap::build(store.state(), store.registry());

        assert_eq!(hits.node(a).unwrap().rect.width(), 260.0);
        assert_eq!(hits.node(a).unwrap().outputs[0].center.x, 260.0);
    }

    #[test]
    fn test_distance_to_degenerate_segment() {
        let p = egui::pos2(3.0, 4.0);
        assert_eq!(distance_to_segment(p, egui::Pos2::ZERO, egui::Pos2::ZERO), 5.0);
    }
}
