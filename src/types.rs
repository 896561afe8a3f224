//! Core data types for the flow editor.
//!
//! This module defines the graph model shared by the store, the persistence layer and the
//! interaction controllers: nodes, edges, the viewport, editor settings and the flow aggregate.
//! Everything serializes to JSON with camelCase field names, which is the format flow bodies
//! are stored in.

use crate::constants::{DEFAULT_FLOW_TYPE, DEFAULT_GRID_SIZE, PLACEHOLDER_FLOW_ID};
use chrono::{DateTime, Utc};
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for node instances.
pub type NodeId = Uuid;

/// Unique identifier for edges.
pub type EdgeId = Uuid;

/// Free-form parameter bag attached to nodes and flows.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Pan/zoom transform mapping canvas space to screen space:
/// `screen = canvas * zoom + (x, y)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Viewport {
    /// Horizontal pan offset in screen pixels
    pub x: f32,
    /// Vertical pan offset in screen pixels
    pub y: f32,
    /// Zoom factor, kept within `[MIN_ZOOM, MAX_ZOOM]`
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// The pan offset as a screen-space vector.
    pub fn offset(&self) -> egui::Vec2 {
        egui::vec2(self.x, self.y)
    }
}

/// Partial viewport update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportUpdate {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub zoom: Option<f32>,
}

/// Per-flow editor settings. Only affects where new or dragged node positions are rounded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorSettings {
    /// Whether the grid is painted behind the canvas
    pub show_grid: bool,
    /// Whether node positions snap to the grid
    pub snap_to_grid: bool,
    /// Grid cell size in canvas units
    pub grid_size: u32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            show_grid: true,
            snap_to_grid: false,
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

/// Programming language of a node code block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    Python,
    Javascript,
    Jinja2,
    Json,
    Text,
}

impl CodeLanguage {
    /// Short display name used by the properties panel.
    pub fn display_name(&self) -> &'static str {
        match self {
            CodeLanguage::Python => "Python",
            CodeLanguage::Javascript => "JavaScript",
            CodeLanguage::Jinja2 => "Jinja2",
            CodeLanguage::Json => "JSON",
            CodeLanguage::Text => "Text",
        }
    }
}

/// A single editable code block stored on a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeBlock {
    pub code: String,
    pub language: CodeLanguage,
}

/// Rendered node size in canvas units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NodeSize {
    pub width: f32,
    pub height: f32,
}

impl NodeSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn to_vec2(self) -> egui::Vec2 {
        egui::vec2(self.width, self.height)
    }
}

/// A placed, mutable occurrence of a node definition on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,
    /// Registry key of the node's definition
    #[serde(rename = "type")]
    pub node_type: String,
    /// User-displayable label
    pub label: String,
    /// Top-left corner in canvas space
    pub position: egui::Pos2,
    /// Parameter values, seeded from the definition's defaults
    #[serde(default)]
    pub params: Params,
    /// Code blocks keyed by block name, present only for code-editable types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_blocks: Option<BTreeMap<String, CodeBlock>>,
    /// Last measured size; managed by the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<NodeSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_visuals: Option<serde_json::Value>,
    #[serde(default)]
    pub notes: String,
}

/// How an edge is drawn between its anchors.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    #[default]
    Bezier,
    Straight,
    Step,
}

impl LineType {
    pub const ALL: [LineType; 3] = [LineType::Bezier, LineType::Straight, LineType::Step];

    pub fn display_name(&self) -> &'static str {
        match self {
            LineType::Bezier => "Curved",
            LineType::Straight => "Straight",
            LineType::Step => "Step",
        }
    }
}

/// A directed connection from a node output to a node input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub source_output_id: String,
    pub target_node_id: NodeId,
    pub target_input_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub style: Params,
    #[serde(default)]
    pub line_type: LineType,
    #[serde(default)]
    pub animated: bool,
}

impl Edge {
    /// Returns true if this edge starts or ends at the given node.
    pub fn touches(&self, node_id: NodeId) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    /// Returns true if this edge connects exactly the given endpoints.
    pub fn connects(
        &self,
        source_node_id: NodeId,
        source_output_id: &str,
        target_node_id: NodeId,
        target_input_id: &str,
    ) -> bool {
        self.source_node_id == source_node_id
            && self.source_output_id == source_output_id
            && self.target_node_id == target_node_id
            && self.target_input_id == target_input_id
    }
}

/// Partial edge update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeUpdate {
    pub label: Option<String>,
    pub line_type: Option<LineType>,
    pub animated: Option<bool>,
}

/// Registry key of a container definition. Every flow is typed by one.
pub type FlowType = String;

fn default_flow_type() -> FlowType {
    DEFAULT_FLOW_TYPE.to_string()
}

/// The live graph aggregate. Exactly one is held by the store at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_flow_type")]
    pub flow_type: FlowType,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub flow_params: Params,
    #[serde(default)]
    pub selected_node_id: Option<NodeId>,
    #[serde(default)]
    pub selected_edge_id: Option<EdgeId>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub editor_settings: EditorSettings,
}

impl FlowState {
    /// Creates an empty flow carrying the given metadata.
    pub fn empty(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        flow_type: impl Into<FlowType>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            flow_type: flow_type.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            flow_params: Params::new(),
            selected_node_id: None,
            selected_edge_id: None,
            viewport: Viewport::default(),
            editor_settings: EditorSettings::default(),
        }
    }

    /// The transient flow shown while no real flow is active.
    pub fn placeholder() -> Self {
        Self::empty(PLACEHOLDER_FLOW_ID, "Untitled", "", DEFAULT_FLOW_TYPE)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// Catalog entry for a saved flow. Metadata only; the body is stored under the flow id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowListItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_flow_type")]
    pub flow_type: FlowType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial flow metadata update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowMetadataUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub flow_type: Option<FlowType>,
}

impl FlowMetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.flow_type.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_node() -> Node {
        Node {
            id: Uuid::new_v4(),
            node_type: "pf.Node".to_string(),
            label: "Node".to_string(),
            position: egui::pos2(10.0, 20.0),
            params: Params::new(),
            code_blocks: None,
            size: None,
            custom_visuals: None,
            notes: String::new(),
        }
    }

    #[test]
    fn test_node_serializes_with_camel_case_and_type_key() {
        let node = sample_node();
        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(value["type"], "pf.Node");
        assert_eq!(value["position"]["x"], 10.0);
        assert!(value.get("codeBlocks").is_none());
        assert!(value.get("size").is_none());
    }

    #[test]
    fn test_flow_state_missing_sub_objects_fall_back_to_defaults() {
        let raw = json!({
            "id": "flow_1",
            "name": "Legacy",
            "editorSettings": { "snapToGrid": true }
        });

        let flow: FlowState = serde_json::from_value(raw).unwrap();

        assert_eq!(flow.viewport, Viewport::default());
        assert!(flow.editor_settings.snap_to_grid);
        assert!(flow.editor_settings.show_grid);
        assert_eq!(flow.editor_settings.grid_size, DEFAULT_GRID_SIZE);
        assert_eq!(flow.flow_type, DEFAULT_FLOW_TYPE);
        assert!(flow.nodes.is_empty());
    }

    #[test]
    fn test_edge_connects_and_touches() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let edge = Edge {
            id: Uuid::new_v4(),
            source_node_id: a,
            source_output_id: "out".into(),
            target_node_id: b,
            target_input_id: "in".into(),
            label: String::new(),
            style: Params::new(),
            line_type: LineType::default(),
            animated: false,
        };

        assert!(edge.touches(a));
        assert!(edge.touches(b));
        assert!(!edge.touches(Uuid::new_v4()));
        assert!(edge.connects(a, "out", b, "in"));
        assert!(!edge.connects(a, "out", b, "other"));
    }

    #[test]
    fn test_placeholder_flow() {
        let flow = FlowState::placeholder();
        assert_eq!(flow.id, PLACEHOLDER_FLOW_ID);
        assert!(flow.nodes.is_empty());
        assert!(flow.edges.is_empty());
    }
}
