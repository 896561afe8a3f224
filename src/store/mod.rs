//! Graph state store.
//!
//! [`FlowStore`] owns the single live [`FlowState`] together with its undo history, the node
//! registry and the durable storage the flow is written to. Every mutation of nodes, edges,
//! selection, viewport or editor settings goes through this type.
//!
//! Expected failures (unknown node type, missing ids, self-connections, duplicate edges) are
//! logged and returned as [`StoreError`] without touching the flow. A mutation whose storage
//! write fails is rolled back before [`StoreError::Storage`] is returned, so the live flow, the
//! history and the stored body never disagree.

mod history;

pub use history::{History, HistorySnapshot};

use crate::constants::{DEFAULT_GRID_SIZE, MAX_HISTORY_LENGTH, ZOOM_STEP};
use crate::error::StoreError;
use crate::registry::NodeRegistry;
use crate::storage::{self, KeyValueStore, MemoryStorage};
use crate::types::*;
use crate::viewport::{clamp_zoom, snap_with};
use eframe::egui;
use std::collections::BTreeMap;
use uuid::Uuid;

/// What the store is currently doing. Anything other than `Idle` suppresses history recording
/// and size updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Accepting user edits
    Idle,
    /// Applying an undo/redo snapshot
    Restoring,
    /// Replacing the flow wholesale from saved data
    Loading,
}

/// Live state to return to when a mutation cannot be persisted.
struct Checkpoint {
    state: FlowState,
    active_interaction: Option<NodeId>,
}

/// The single source of truth for the flow being edited.
pub struct FlowStore<S: KeyValueStore = MemoryStorage> {
    state: FlowState,
    history: History,
    mode: StoreMode,
    registry: NodeRegistry,
    storage: S,
    /// Node whose continuous interaction (drag) has begun but not been committed
    active_interaction: Option<NodeId>,
}

impl<S: KeyValueStore> FlowStore<S> {
    /// Creates a store holding the placeholder flow.
    pub fn new(registry: NodeRegistry, storage: S) -> Self {
        let state = FlowState::placeholder();
        let mut history = History::new(MAX_HISTORY_LENGTH);
        history.reset(HistorySnapshot::new(&state.nodes, &state.edges));
        Self {
            state,
            history,
            mode: StoreMode::Idle,
            registry,
            storage,
            active_interaction: None,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn flow_id(&self) -> &str {
        &self.state.id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.state.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.state.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.state.node(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.state.edge(id)
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.state.selected_node_id.and_then(|id| self.state.node(id))
    }

    pub fn selected_edge(&self) -> Option<&Edge> {
        self.state.selected_edge_id.and_then(|id| self.state.edge(id))
    }

    pub fn viewport(&self) -> &Viewport {
        &self.state.viewport
    }

    pub fn editor_settings(&self) -> &EditorSettings {
        &self.state.editor_settings
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of retained history snapshots, including the initial one.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Node with an uncommitted continuous interaction, if any.
    pub fn active_interaction(&self) -> Option<NodeId> {
        self.active_interaction
    }

    // ─── Persistence and history plumbing ───────────────────────────────────

    /// Writes the live flow to storage. Placeholder flows are skipped.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        storage::save_flow(&mut self.storage, &self.state)?;
        Ok(())
    }

    fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::new(&self.state.nodes, &self.state.edges)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            state: self.state.clone(),
            active_interaction: self.active_interaction,
        }
    }

    /// Persists, or puts the live flow back to `checkpoint` when the write fails.
    fn persist_or_rollback(&mut self, checkpoint: Checkpoint) -> Result<(), StoreError> {
        if let Err(err) = self.persist() {
            log::error!("Rolling back flow '{}' after failed write: {err}", self.state.id);
            self.state = checkpoint.state;
            self.active_interaction = checkpoint.active_interaction;
            return Err(err);
        }
        Ok(())
    }

    /// Persists the live graph, then appends a snapshot of it to the history.
    ///
    /// A failed write rolls back to `checkpoint` and leaves the history untouched.
    fn record_history(&mut self, checkpoint: Checkpoint) -> Result<(), StoreError> {
        if self.mode != StoreMode::Idle {
            log::debug!("Skipping history record while {:?}", self.mode);
            return Ok(());
        }
        self.persist_or_rollback(checkpoint)?;
        let snapshot = self.snapshot();
        self.history.record(snapshot);
        log::debug!(
            "Recorded history entry {}/{}",
            self.history.cursor() + 1,
            self.history.len()
        );
        Ok(())
    }

    /// Applies a history snapshot. Measured sizes of surviving nodes carry over.
    fn restore(&mut self, snapshot: HistorySnapshot) -> Result<(), StoreError> {
        let checkpoint = self.checkpoint();
        self.mode = StoreMode::Restoring;
        let mut nodes = snapshot.nodes;
        for node in &mut nodes {
            if let Some(live) = self.state.node(node.id) {
                node.size = live.size.or(node.size);
            }
        }
        self.state.nodes = nodes;
        self.state.edges = snapshot.edges;
        self.state.selected_node_id = None;
        self.state.selected_edge_id = None;
        self.active_interaction = None;
        self.mode = StoreMode::Idle;
        self.persist_or_rollback(checkpoint)
    }

    fn reset_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.reset(snapshot);
        self.active_interaction = None;
    }

    // ─── Nodes ──────────────────────────────────────────────────────────────

    /// Instantiates a node of `node_type` at a canvas-space position.
    ///
    /// Default params and code blocks are copied from the registry definition and the
    /// position is snapped per the editor settings. The new node becomes the selection.
    ///
    /// # Arguments
    ///
    /// * `node_type` - Registry key of the node definition
    /// * `position` - Desired top-left corner in canvas space
    ///
    /// # Returns
    ///
    /// The id of the new node, or [`StoreError::UnknownNodeType`].
    pub fn add_node(&mut self, node_type: &str, position: egui::Pos2) -> Result<NodeId, StoreError> {
        let Some(definition) = self.registry.get(node_type) else {
            log::warn!("Cannot add node: unknown node type '{node_type}'");
            return Err(StoreError::UnknownNodeType(node_type.to_string()));
        };

        let code_blocks = if definition.supports_code_editing
            && !definition.code_blocks_definition.is_empty()
        {
            Some(
                definition
                    .code_blocks_definition
                    .iter()
                    .map(|block| {
                        (
                            block.name.clone(),
                            CodeBlock {
                                code: block.default_code.clone(),
                                language: block.language,
                            },
                        )
                    })
                    .collect::<BTreeMap<_, _>>(),
            )
        } else {
            None
        };

        let node = Node {
            id: Uuid::new_v4(),
            node_type: node_type.to_string(),
            label: definition.label.clone(),
            position: snap_with(position, &self.state.editor_settings),
            params: definition.default_params.clone(),
            code_blocks,
            size: None,
            custom_visuals: None,
            notes: String::new(),
        };
        let id = node.id;

        log::debug!("Adding '{node_type}' node {id} at {:?}", node.position);
        let checkpoint = self.checkpoint();
        self.state.nodes.push(node);
        self.state.selected_node_id = Some(id);
        self.state.selected_edge_id = None;
        self.record_history(checkpoint)?;
        Ok(id)
    }

    /// Removes a node and every edge that references it.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if no such node exists.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<bool, StoreError> {
        let Some(index) = self.state.nodes.iter().position(|n| n.id == node_id) else {
            log::debug!("Cannot remove node {node_id}: not found");
            return Ok(false);
        };

        let checkpoint = self.checkpoint();
        self.state.nodes.remove(index);
        self.state.edges.retain(|edge| !edge.touches(node_id));

        if self.state.selected_node_id == Some(node_id) {
            self.state.selected_node_id = None;
        }
        if let Some(edge_id) = self.state.selected_edge_id {
            if self.state.edge(edge_id).is_none() {
                self.state.selected_edge_id = None;
            }
        }
        if self.active_interaction == Some(node_id) {
            self.active_interaction = None;
        }

        self.record_history(checkpoint)?;
        Ok(true)
    }

    /// Shallow-merges `partial` into the node's params.
    pub fn update_node_params(&mut self, node_id: NodeId, partial: Params) -> Result<(), StoreError> {
        let checkpoint = self.checkpoint();
        let node = self.node_mut_or_err(node_id)?;
        for (key, value) in partial {
            node.params.insert(key, value);
        }
        self.record_history(checkpoint)
    }

    /// Replaces the code of one of the node's declared code blocks.
    pub fn update_node_code_block(
        &mut self,
        node_id: NodeId,
        block_name: &str,
        code: impl Into<String>,
    ) -> Result<(), StoreError> {
        let node_type = self
            .state
            .node(node_id)
            .map(|n| n.node_type.clone())
            .ok_or_else(|| {
                log::warn!("Cannot update code block: node {node_id} not found");
                StoreError::NodeNotFound(node_id)
            })?;

        let Some(definition) = self.registry.get(&node_type) else {
            log::warn!("Cannot update code block: unknown node type '{node_type}'");
            return Err(StoreError::UnknownNodeType(node_type));
        };
        if !definition.supports_code_editing {
            log::warn!("Node type '{node_type}' does not support code editing");
            return Err(StoreError::CodeEditingUnsupported(node_type));
        }
        let Some(block_definition) = definition.code_block(block_name) else {
            log::warn!("Node type '{node_type}' declares no code block '{block_name}'");
            return Err(StoreError::UnknownCodeBlock {
                node_type,
                block: block_name.to_string(),
            });
        };
        let language = block_definition.language;

        let code = code.into();
        let checkpoint = self.checkpoint();
        let node = self.node_mut_or_err(node_id)?;
        node.code_blocks
            .get_or_insert_with(BTreeMap::new)
            .entry(block_name.to_string())
            .and_modify(|block| block.code = code.clone())
            .or_insert_with(|| CodeBlock {
                code: code.clone(),
                language,
            });
        self.record_history(checkpoint)
    }

    /// Renames a node. A no-op if the label is unchanged.
    pub fn update_node_label(&mut self, node_id: NodeId, label: impl Into<String>) -> Result<(), StoreError> {
        let label = label.into();
        let checkpoint = self.checkpoint();
        let node = self.node_mut_or_err(node_id)?;
        if node.label == label {
            return Ok(());
        }
        node.label = label;
        self.record_history(checkpoint)
    }

    /// Moves a node without recording history.
    ///
    /// Used for continuous drag feedback; the gesture is committed with
    /// [`FlowStore::finalize_node_interaction`].
    pub fn update_node_position(&mut self, node_id: NodeId, position: egui::Pos2) -> Result<(), StoreError> {
        let node = self.node_mut_or_err(node_id)?;
        node.position = position;
        Ok(())
    }

    /// Stores a measured node size. Persists but never records history.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the size changed; `Ok(false)` if unchanged or suppressed during a restore.
    pub fn update_node_size(&mut self, node_id: NodeId, size: NodeSize) -> Result<bool, StoreError> {
        if self.mode != StoreMode::Idle {
            return Ok(false);
        }
        let checkpoint = self.checkpoint();
        let node = self.node_mut_or_err(node_id)?;
        if node.size == Some(size) {
            return Ok(false);
        }
        node.size = Some(size);
        self.persist_or_rollback(checkpoint)?;
        Ok(true)
    }

    /// Opens a continuous interaction on a node (first phase of a drag).
    pub fn begin_node_interaction(&mut self, node_id: NodeId) -> Result<(), StoreError> {
        if self.state.node(node_id).is_none() {
            log::warn!("Cannot begin interaction: node {node_id} not found");
            return Err(StoreError::NodeNotFound(node_id));
        }
        if let Some(previous) = self.active_interaction.replace(node_id) {
            log::debug!("Interaction on {previous} superseded by {node_id}");
        }
        Ok(())
    }

    /// Commits a continuous interaction as a single history step.
    ///
    /// Nothing is recorded when the graph equals the current history entry, so a press
    /// without movement does not create an undo step. If the write fails the graph returns to
    /// that entry.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a snapshot was recorded.
    pub fn finalize_node_interaction(&mut self, item_id: Option<NodeId>) -> Result<bool, StoreError> {
        let active = self.active_interaction.take();
        if let (Some(item), Some(active)) = (item_id, active) {
            if item != active {
                log::debug!("Finalizing {item} while interaction was open on {active}");
            }
        }

        let Some(current) = self.history.current() else {
            return Ok(false);
        };
        if current.matches(&self.state.nodes, &self.state.edges) {
            return Ok(false);
        }
        let mut checkpoint = self.checkpoint();
        checkpoint.state.nodes = current.nodes.clone();
        checkpoint.state.edges = current.edges.clone();
        self.record_history(checkpoint)?;
        Ok(true)
    }

    fn node_mut_or_err(&mut self, node_id: NodeId) -> Result<&mut Node, StoreError> {
        match self.state.node_mut(node_id) {
            Some(node) => Ok(node),
            None => {
                log::warn!("Node {node_id} not found");
                Err(StoreError::NodeNotFound(node_id))
            }
        }
    }

    // ─── Edges ──────────────────────────────────────────────────────────────

    /// Connects an output of one node to an input of another.
    ///
    /// When `label` is `None` the label is taken from the source output's declared label,
    /// falling back to the raw output id. The new edge becomes the selection.
    ///
    /// # Returns
    ///
    /// The id of the new edge, or an error if an endpoint is missing, the endpoints are the
    /// same node, or an identical edge already exists.
    pub fn add_edge(
        &mut self,
        source_node_id: NodeId,
        source_output_id: &str,
        target_node_id: NodeId,
        target_input_id: &str,
        label: Option<String>,
    ) -> Result<EdgeId, StoreError> {
        let Some(source) = self.state.node(source_node_id) else {
            log::warn!("Cannot add edge: source node {source_node_id} not found");
            return Err(StoreError::NodeNotFound(source_node_id));
        };
        if self.state.node(target_node_id).is_none() {
            log::warn!("Cannot add edge: target node {target_node_id} not found");
            return Err(StoreError::NodeNotFound(target_node_id));
        }
        if source_node_id == target_node_id {
            log::warn!("Rejected self-connecting edge on node {source_node_id}");
            return Err(StoreError::SelfConnection(source_node_id));
        }
        if self.state.edges.iter().any(|e| {
            e.connects(source_node_id, source_output_id, target_node_id, target_input_id)
        }) {
            log::warn!(
                "Rejected duplicate edge {source_node_id}/{source_output_id} -> {target_node_id}/{target_input_id}"
            );
            return Err(StoreError::DuplicateEdge {
                source_node_id,
                source_output_id: source_output_id.to_string(),
                target_node_id,
                target_input_id: target_input_id.to_string(),
            });
        }

        let label = label.unwrap_or_else(|| {
            self.registry
                .get(&source.node_type)
                .and_then(|def| def.output(source_output_id))
                .map(|port| port.label.clone())
                .unwrap_or_else(|| source_output_id.to_string())
        });

        let edge = Edge {
            id: Uuid::new_v4(),
            source_node_id,
            source_output_id: source_output_id.to_string(),
            target_node_id,
            target_input_id: target_input_id.to_string(),
            label,
            style: Params::new(),
            line_type: LineType::default(),
            animated: false,
        };
        let id = edge.id;

        let checkpoint = self.checkpoint();
        self.state.edges.push(edge);
        self.state.selected_edge_id = Some(id);
        self.state.selected_node_id = None;
        self.record_history(checkpoint)?;
        Ok(id)
    }

    /// Removes an edge by id.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if no such edge exists.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Result<bool, StoreError> {
        let Some(index) = self.state.edges.iter().position(|e| e.id == edge_id) else {
            log::debug!("Cannot remove edge {edge_id}: not found");
            return Ok(false);
        };
        let checkpoint = self.checkpoint();
        self.state.edges.remove(index);
        if self.state.selected_edge_id == Some(edge_id) {
            self.state.selected_edge_id = None;
        }
        self.record_history(checkpoint)?;
        Ok(true)
    }

    /// Changes an edge's label, line shape or animation flag.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if any field changed, or [`StoreError::EdgeNotFound`].
    pub fn update_edge(&mut self, edge_id: EdgeId, update: EdgeUpdate) -> Result<bool, StoreError> {
        let checkpoint = self.checkpoint();
        let Some(edge) = self.state.edges.iter_mut().find(|e| e.id == edge_id) else {
            log::warn!("Cannot update edge {edge_id}: not found");
            return Err(StoreError::EdgeNotFound(edge_id));
        };

        let mut changed = false;
        if let Some(label) = update.label {
            if edge.label != label {
                edge.label = label;
                changed = true;
            }
        }
        if let Some(line_type) = update.line_type {
            if edge.line_type != line_type {
                edge.line_type = line_type;
                changed = true;
            }
        }
        if let Some(animated) = update.animated {
            if edge.animated != animated {
                edge.animated = animated;
                changed = true;
            }
        }
        if changed {
            self.record_history(checkpoint)?;
        }
        Ok(changed)
    }

    // ─── Selection ──────────────────────────────────────────────────────────

    /// Selects a node (clearing any edge selection) or clears the node selection.
    pub fn set_selected_node(&mut self, node_id: Option<NodeId>) {
        match node_id {
            Some(id) if self.state.node(id).is_none() => {
                log::warn!("Cannot select node {id}: not found");
            }
            Some(id) => {
                self.state.selected_node_id = Some(id);
                self.state.selected_edge_id = None;
            }
            None => self.state.selected_node_id = None,
        }
    }

    /// Selects an edge (clearing any node selection) or clears the edge selection.
    pub fn set_selected_edge(&mut self, edge_id: Option<EdgeId>) {
        match edge_id {
            Some(id) if self.state.edge(id).is_none() => {
                log::warn!("Cannot select edge {id}: not found");
            }
            Some(id) => {
                self.state.selected_edge_id = Some(id);
                self.state.selected_node_id = None;
            }
            None => self.state.selected_edge_id = None,
        }
    }

    // ─── Viewport and editor settings ───────────────────────────────────────

    /// Applies a partial viewport update. Zoom is clamped.
    pub fn update_viewport(&mut self, update: ViewportUpdate) {
        let viewport = &mut self.state.viewport;
        if let Some(x) = update.x {
            viewport.x = x;
        }
        if let Some(y) = update.y {
            viewport.y = y;
        }
        if let Some(zoom) = update.zoom {
            viewport.zoom = clamp_zoom(zoom);
        }
    }

    /// Replaces the whole viewport. Zoom is clamped.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.update_viewport(ViewportUpdate {
            x: Some(viewport.x),
            y: Some(viewport.y),
            zoom: Some(viewport.zoom),
        });
    }

    pub fn zoom_in(&mut self) {
        let zoom = self.state.viewport.zoom + ZOOM_STEP;
        self.state.viewport.zoom = clamp_zoom(zoom);
    }

    pub fn zoom_out(&mut self) {
        let zoom = self.state.viewport.zoom - ZOOM_STEP;
        self.state.viewport.zoom = clamp_zoom(zoom);
    }

    pub fn reset_view(&mut self) {
        self.state.viewport = Viewport::default();
    }

    /// Flips grid visibility. Returns the new value.
    pub fn toggle_grid(&mut self) -> Result<bool, StoreError> {
        let checkpoint = self.checkpoint();
        self.state.editor_settings.show_grid = !self.state.editor_settings.show_grid;
        self.persist_or_rollback(checkpoint)?;
        Ok(self.state.editor_settings.show_grid)
    }

    /// Flips grid snapping. Returns the new value.
    pub fn toggle_snap_to_grid(&mut self) -> Result<bool, StoreError> {
        let checkpoint = self.checkpoint();
        self.state.editor_settings.snap_to_grid = !self.state.editor_settings.snap_to_grid;
        self.persist_or_rollback(checkpoint)?;
        Ok(self.state.editor_settings.snap_to_grid)
    }

    /// Sets the grid cell size. Zero is rejected.
    pub fn set_grid_size(&mut self, grid_size: u32) -> Result<bool, StoreError> {
        if grid_size == 0 {
            log::warn!("Ignoring grid size of zero");
            return Ok(false);
        }
        if self.state.editor_settings.grid_size == grid_size {
            return Ok(false);
        }
        let checkpoint = self.checkpoint();
        self.state.editor_settings.grid_size = grid_size;
        self.persist_or_rollback(checkpoint)?;
        Ok(true)
    }

    // ─── Whole-graph operations ─────────────────────────────────────────────

    /// Removes every node and edge.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if the canvas was already empty.
    pub fn clear_canvas(&mut self) -> Result<bool, StoreError> {
        if self.state.nodes.is_empty() && self.state.edges.is_empty() {
            return Ok(false);
        }
        let checkpoint = self.checkpoint();
        self.state.nodes.clear();
        self.state.edges.clear();
        self.state.selected_node_id = None;
        self.state.selected_edge_id = None;
        self.active_interaction = None;
        self.record_history(checkpoint)?;
        Ok(true)
    }

    /// Steps back one history entry. Clears the selection.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if already at the oldest retained entry.
    pub fn undo(&mut self) -> Result<bool, StoreError> {
        let Some(snapshot) = self.history.undo().cloned() else {
            return Ok(false);
        };
        log::debug!("Undo to history entry {}/{}", self.history.cursor() + 1, self.history.len());
        if let Err(err) = self.restore(snapshot) {
            self.history.redo();
            return Err(err);
        }
        Ok(true)
    }

    /// Steps forward one history entry. Clears the selection.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, StoreError> {
        let Some(snapshot) = self.history.redo().cloned() else {
            return Ok(false);
        };
        log::debug!("Redo to history entry {}/{}", self.history.cursor() + 1, self.history.len());
        if let Err(err) = self.restore(snapshot) {
            self.history.undo();
            return Err(err);
        }
        Ok(true)
    }

    // ─── Flow lifecycle ─────────────────────────────────────────────────────

    /// Replaces the live flow with an empty one carrying the given metadata.
    ///
    /// The new body is written first; if that fails the current flow stays live.
    pub fn create_new_flow(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        flow_type: impl Into<FlowType>,
    ) -> Result<(), StoreError> {
        let flow = FlowState::empty(id, name, description, flow_type);
        if self.registry.flow_definition(&flow.flow_type).is_none() {
            log::warn!("Flow '{}' has unknown flow type '{}'", flow.id, flow.flow_type);
        }
        storage::save_flow(&mut self.storage, &flow)?;
        self.state = flow;
        self.reset_history();
        log::info!("Created flow '{}'", self.state.id);
        Ok(())
    }

    /// Replaces the live flow with previously saved state.
    ///
    /// Zoom is clamped and a zero grid size falls back to the default. History restarts from
    /// the loaded graph.
    pub fn load_flow_state(&mut self, mut saved: FlowState) {
        self.mode = StoreMode::Loading;

        saved.viewport.zoom = clamp_zoom(saved.viewport.zoom);
        if saved.editor_settings.grid_size == 0 {
            saved.editor_settings.grid_size = DEFAULT_GRID_SIZE;
        }
        if saved.selected_node_id.is_some_and(|id| saved.node(id).is_none()) {
            saved.selected_node_id = None;
        }
        if saved.selected_edge_id.is_some_and(|id| saved.edge(id).is_none()) {
            saved.selected_edge_id = None;
        }

        self.state = saved;
        self.reset_history();
        self.mode = StoreMode::Idle;
        log::info!(
            "Loaded flow '{}' ({} nodes, {} edges)",
            self.state.id,
            self.state.nodes.len(),
            self.state.edges.len()
        );
    }

    /// Returns to the transient placeholder flow. Nothing is persisted.
    pub fn reset_to_placeholder(&mut self) {
        self.state = FlowState::placeholder();
        self.reset_history();
    }

    /// Updates flow name, description or type. Not recorded in history.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if any field changed (and the flow was persisted).
    pub fn update_flow_metadata(&mut self, update: FlowMetadataUpdate) -> Result<bool, StoreError> {
        if let Some(flow_type) = &update.flow_type {
            self.require_flow_type(flow_type)?;
        }
        let checkpoint = self.checkpoint();
        let mut changed = false;
        if let Some(name) = update.name {
            if self.state.name != name {
                self.state.name = name;
                changed = true;
            }
        }
        if let Some(description) = update.description {
            if self.state.description != description {
                self.state.description = description;
                changed = true;
            }
        }
        if let Some(flow_type) = update.flow_type {
            if self.state.flow_type != flow_type {
                self.state.flow_type = flow_type;
                changed = true;
            }
        }
        if changed {
            self.persist_or_rollback(checkpoint)?;
        }
        Ok(changed)
    }

    /// Fails with [`StoreError::UnknownFlowType`] unless `flow_type` names a container
    /// definition.
    pub fn require_flow_type(&self, flow_type: &str) -> Result<(), StoreError> {
        if self.registry.flow_definition(flow_type).is_none() {
            log::warn!("'{flow_type}' is not a registered flow type");
            return Err(StoreError::UnknownFlowType(flow_type.to_string()));
        }
        Ok(())
    }
}
