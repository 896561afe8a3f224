//! User interface for the flow editor.
//!
//! This module wires the store, the catalog and the interaction controllers into an eframe
//! application: a toolbar, a flow list and node palette, the canvas, and a properties panel.
//!
//! # Module Organization
//!
//! - `state` - The [`FlowEditorApp`] struct and its persistence
//! - `canvas` - Hit-testing and pointer dispatch for the canvas
//! - `rendering` - Painting the grid, edges and nodes

mod canvas;
mod rendering;
mod state;

pub use canvas::{AnchorHit, HitMap, NodeHit};
pub use state::FlowEditorApp;

use crate::constants::{APP_STORAGE_KEY, DEFAULT_FLOW_TYPE};
use crate::interaction::DragPayload;
use crate::types::{EdgeId, EdgeUpdate, FlowMetadataUpdate, LineType, NodeId, Params};
use eframe::egui;

impl eframe::App for FlowEditorApp {
    /// Persist the storage map between restarts.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.storage_json() {
            Ok(json) => storage.set_string(APP_STORAGE_KEY, json),
            Err(err) => log::error!("Failed to serialize editor storage: {err}"),
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show(ctx);
    }
}

impl FlowEditorApp {
    /// Lays out and runs one frame of the editor.
    pub fn show(&mut self, ctx: &egui::Context) {
        self.handle_undo_redo_keys(ctx);
        self.handle_delete_key(ctx);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.draw_status_bar(ui);
        });

        egui::SidePanel::left("flows_and_palette")
            .resizable(true)
            .default_width(200.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.draw_flow_list(ui);
                    ui.separator();
                    self.draw_palette(ui);
                });
            });

        let viewport_width = ctx.input(|i| i.screen_rect().width());
        let max_width = (viewport_width * 0.5).max(200.0);
        egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(self.properties_panel_width.clamp(200.0, max_width))
            .show(ctx, |ui| {
                self.properties_panel_width = ui.available_width().clamp(200.0, max_width);
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.draw_properties_panel(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });
    }

    fn handle_undo_redo_keys(&mut self, ctx: &egui::Context) {
        // Text fields keep their own undo
        if ctx.wants_keyboard_input() {
            return;
        }
        // Read modifiers off the key event itself; they are exact even when the aggregate
        // modifier state lags behind.
        let shortcut = ctx.input(|i| {
            i.events.iter().find_map(|event| match event {
                egui::Event::Key {
                    key: egui::Key::Z,
                    pressed: true,
                    modifiers,
                    ..
                } if modifiers.command => Some(modifiers.shift),
                _ => None,
            })
        });
        match shortcut {
            Some(false) => {
                let result = self.store.undo();
                self.report(result);
            }
            Some(true) => {
                let result = self.store.redo();
                self.report(result);
            }
            None => {}
        }
    }

    /// Removes the selected node or edge when Delete is pressed outside a text field.
    fn handle_delete_key(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() || !ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            return;
        }
        if let Some(node_id) = self.store.state().selected_node_id {
            let result = self.store.remove_node(node_id);
            self.report(result);
        } else if let Some(edge_id) = self.store.state().selected_edge_id {
            let result = self.store.remove_edge(edge_id);
            self.report(result);
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("New Flow").clicked() {
                let name = format!("Untitled flow {}", self.catalog.flows().len() + 1);
                let result = self.catalog.create_flow(&mut self.store, name, "", DEFAULT_FLOW_TYPE);
                self.report(result);
            }

            ui.separator();

            ui.add_enabled_ui(self.store.can_undo(), |ui| {
                if ui.button("⟲ Undo").clicked() {
                    let result = self.store.undo();
                    self.report(result);
                }
            });
            ui.add_enabled_ui(self.store.can_redo(), |ui| {
                if ui.button("⟳ Redo").clicked() {
                    let result = self.store.redo();
                    self.report(result);
                }
            });

            ui.separator();

            if ui.button("−").on_hover_text("Zoom out").clicked() {
                self.store.zoom_out();
            }
            ui.label(format!("{:.0}%", self.store.viewport().zoom * 100.0));
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.store.zoom_in();
            }
            if ui.button("Reset View").clicked() {
                self.store.reset_view();
            }

            ui.separator();

            let mut show_grid = self.store.editor_settings().show_grid;
            if ui.checkbox(&mut show_grid, "Grid").changed() {
                let result = self.store.toggle_grid();
                self.report(result);
            }
            let mut snap = self.store.editor_settings().snap_to_grid;
            if ui.checkbox(&mut snap, "Snap").changed() {
                let result = self.store.toggle_snap_to_grid();
                self.report(result);
            }
            let mut grid_size = self.store.editor_settings().grid_size;
            if ui
                .add(egui::DragValue::new(&mut grid_size).range(1..=200).suffix(" px"))
                .changed()
            {
                let result = self.store.set_grid_size(grid_size);
                self.report(result);
            }

            ui.separator();

            ui.add_enabled_ui(!self.store.nodes().is_empty(), |ui| {
                if ui.button("Clear Canvas").clicked() {
                    let result = self.store.clear_canvas();
                    self.report(result);
                }
            });
        });
    }

    fn draw_status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!(
                "{} node(s), {} edge(s)",
                self.store.nodes().len(),
                self.store.edges().len()
            ));
            if let Some(status) = &self.status {
                ui.separator();
                ui.colored_label(ui.visuals().warn_fg_color, status);
                if ui.small_button("✕").clicked() {
                    self.status = None;
                }
            }
        });
    }

    fn draw_flow_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Flows");
        if self.catalog.flows().is_empty() {
            ui.label("No flows yet. Use New Flow to create one.");
            return;
        }

        let mut activate = None;
        let mut delete = None;
        for flow in self.catalog.flows() {
            let is_active = self.catalog.active_flow_id() == Some(flow.id.as_str());
            let type_label = self.flow_type_label(&flow.flow_type);
            ui.horizontal(|ui| {
                if ui
                    .selectable_label(is_active, flow.name.as_str())
                    .on_hover_text(type_label)
                    .clicked()
                    && !is_active
                {
                    activate = Some(flow.id.clone());
                }
                if ui.small_button("🗑").on_hover_text("Delete flow").clicked() {
                    delete = Some(flow.id.clone());
                }
            });
        }

        if let Some(id) = activate {
            let result = self.catalog.set_active_flow(&mut self.store, Some(&id));
            self.report(result);
        }
        if let Some(id) = delete {
            let result = self.catalog.delete_flow(&mut self.store, &id);
            self.report(result);
        }
    }

    fn draw_palette(&mut self, ui: &mut egui::Ui) {
        ui.heading("Nodes");
        ui.label("Drag onto the canvas");
        for (category, definitions) in self.store.registry().categorized() {
            ui.label(egui::RichText::new(category).small().weak());
            for (node_type, definition) in definitions {
                ui.dnd_drag_source(
                    egui::Id::new(("palette", node_type)),
                    DragPayload::new(node_type),
                    |ui| {
                        ui.label(definition.label.as_str());
                    },
                );
            }
        }
    }

    /// Display label of a flow type, or the raw key when it is not registered.
    fn flow_type_label(&self, flow_type: &str) -> String {
        self.store
            .registry()
            .flow_definition(flow_type)
            .map_or_else(|| flow_type.to_string(), |def| def.label.clone())
    }

    fn draw_properties_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Properties");
        ui.separator();

        if let Some(node_id) = self.store.state().selected_node_id {
            self.draw_node_properties(ui, node_id);
        } else if let Some(edge_id) = self.store.state().selected_edge_id {
            self.draw_edge_properties(ui, edge_id);
        } else {
            self.draw_flow_properties(ui);
        }
    }

    fn draw_flow_properties(&mut self, ui: &mut egui::Ui) {
        let Some(flow_id) = self.catalog.active_flow_id().map(str::to_string) else {
            ui.label("Create or open a flow to start editing.");
            return;
        };
        let state = self.store.state();
        let (name, description, flow_type) =
            (state.name.clone(), state.description.clone(), state.flow_type.clone());

        let mut update = FlowMetadataUpdate::default();
        ui.label("Name:");
        if let Some(name) = committed_text(ui, egui::Id::new(("flow_name", &flow_id)), &name, false) {
            update.name = Some(name);
        }
        ui.label("Description:");
        if let Some(description) =
            committed_text(ui, egui::Id::new(("flow_description", &flow_id)), &description, true)
        {
            update.description = Some(description);
        }
        let options: Vec<(String, String)> = self
            .store
            .registry()
            .flow_types()
            .map(|key| (key.to_string(), self.flow_type_label(key)))
            .collect();
        let mut selected_type = flow_type.clone();
        egui::ComboBox::from_label("Type")
            .selected_text(self.flow_type_label(&selected_type))
            .show_ui(ui, |ui| {
                for (key, label) in options {
                    ui.selectable_value(&mut selected_type, key, label);
                }
            });
        if selected_type != flow_type {
            update.flow_type = Some(selected_type);
        }

        if !update.is_empty() {
            let result = self.catalog.update_flow(&mut self.store, &flow_id, update);
            self.report(result);
        }

        ui.separator();
        ui.label("Select a node or edge to edit it.");
    }

    fn draw_node_properties(&mut self, ui: &mut egui::Ui, node_id: NodeId) {
        let Some(node) = self.store.node(node_id).cloned() else {
            return;
        };
        let type_label = self
            .store
            .registry()
            .get(&node.node_type)
            .map_or_else(|| node.node_type.clone(), |def| def.label.clone());

        ui.label(format!("Type: {type_label}"));
        ui.label("Label:");
        if let Some(label) = committed_text(ui, egui::Id::new(("node_label", node_id)), &node.label, false)
        {
            let result = self.store.update_node_label(node_id, label);
            self.report(result);
        }

        ui.separator();
        ui.label(egui::RichText::new("Parameters").strong());
        for (key, value) in &node.params {
            ui.label(format!("{key}:"));
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let id = egui::Id::new(("node_param", node_id, key));
            if let Some(edited) = committed_text(ui, id, &text, false) {
                // Non-string params are edited as JSON; unparsable input is kept as a string.
                let parsed = match value {
                    serde_json::Value::String(_) => serde_json::Value::String(edited),
                    _ => serde_json::from_str(&edited).unwrap_or(serde_json::Value::String(edited)),
                };
                let mut partial = Params::new();
                partial.insert(key.clone(), parsed);
                let result = self.store.update_node_params(node_id, partial);
                self.report(result);
            }
        }

        if let Some(blocks) = &node.code_blocks {
            ui.separator();
            ui.label(egui::RichText::new("Code").strong());
            for (name, block) in blocks {
                ui.label(format!("{name} ({})", block.language.display_name()));
                let id = egui::Id::new(("node_code", node_id, name));
                if let Some(code) = committed_text(ui, id, &block.code, true) {
                    let result = self.store.update_node_code_block(node_id, name, code);
                    self.report(result);
                }
            }
        }

        if !node.notes.is_empty() {
            ui.separator();
            ui.label(egui::RichText::new("Notes").weak());
            ui.label(node.notes.as_str());
        }

        ui.separator();
        if ui.button("Delete Node").clicked() {
            let result = self.store.remove_node(node_id);
            self.report(result);
        }
    }

    fn draw_edge_properties(&mut self, ui: &mut egui::Ui, edge_id: EdgeId) {
        let Some(edge) = self.store.edge(edge_id).cloned() else {
            return;
        };
        let label_of = |id: NodeId| {
            self.store
                .node(id)
                .map_or_else(|| id.to_string(), |node| node.label.clone())
        };

        ui.label(format!("From: {} ({})", label_of(edge.source_node_id), edge.source_output_id));
        ui.label(format!("To: {} ({})", label_of(edge.target_node_id), edge.target_input_id));

        let mut update = EdgeUpdate::default();
        ui.label("Label:");
        if let Some(label) = committed_text(ui, egui::Id::new(("edge_label", edge_id)), &edge.label, false)
        {
            update.label = Some(label);
        }
        let mut line_type = edge.line_type;
        egui::ComboBox::from_label("Line")
            .selected_text(line_type.display_name())
            .show_ui(ui, |ui| {
                for option in LineType::ALL {
                    ui.selectable_value(&mut line_type, option, option.display_name());
                }
            });
        if line_type != edge.line_type {
            update.line_type = Some(line_type);
        }
        let mut animated = edge.animated;
        if ui.checkbox(&mut animated, "Animated").changed() {
            update.animated = Some(animated);
        }
        if update != EdgeUpdate::default() {
            let result = self.store.update_edge(edge_id, update);
            self.report(result);
        }

        ui.separator();
        if ui.button("Delete Edge").clicked() {
            let result = self.store.remove_edge(edge_id);
            self.report(result);
        }
    }
}

/// A text field that edits a draft and yields the new text only when focus leaves it with a
/// changed value, so each edit becomes one store mutation.
fn committed_text(ui: &mut egui::Ui, id: egui::Id, current: &str, multiline: bool) -> Option<String> {
    let draft_id = id.with("draft");
    let mut draft = ui
        .data(|d| d.get_temp::<String>(draft_id))
        .unwrap_or_else(|| current.to_string());

    let edit = if multiline {
        egui::TextEdit::multiline(&mut draft).code_editor().desired_rows(4)
    } else {
        egui::TextEdit::singleline(&mut draft)
    };
    let response = ui.add(edit.id(id).desired_width(f32::INFINITY));

    if response.has_focus() {
        ui.data_mut(|d| d.insert_temp(draft_id, draft));
        return None;
    }
    ui.data_mut(|d| d.remove::<String>(draft_id));
    (response.lost_focus() && draft != current).then_some(draft)
}
