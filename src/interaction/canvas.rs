//! Canvas-level gestures: dropping palette items and wheel pan/zoom.

use crate::constants::WHEEL_ZOOM_SPEED;
use crate::error::StoreError;
use crate::storage::KeyValueStore;
use crate::store::FlowStore;
use crate::types::{NodeId, ViewportUpdate};
use crate::viewport::{screen_to_canvas, snap_with, zoom_at};
use eframe::egui;
use serde::{Deserialize, Serialize};

/// Payload attached by the palette when a node type is dragged onto the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub node_type: String,
}

impl DragPayload {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
        }
    }
}

/// A wheel event over the canvas.
///
/// `delta` follows DOM conventions: positive `y` means scrolling down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    /// Pointer position in canvas-widget screen space
    pub pointer: egui::Pos2,
    pub delta: egui::Vec2,
    /// Whether the zoom modifier (Ctrl/Cmd) was held
    pub zoom_modifier: bool,
}

/// Handles gestures that target the canvas as a whole. Holds no state of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanvasController;

impl CanvasController {
    pub fn new() -> Self {
        Self
    }

    /// Creates a node of the dragged type at the drop point and selects it.
    ///
    /// # Arguments
    ///
    /// * `store` - The store to add the node to
    /// * `payload` - The palette drag payload
    /// * `screen_point` - Drop position in canvas-widget screen space
    pub fn handle_drop<S: KeyValueStore>(
        &self,
        store: &mut FlowStore<S>,
        payload: &DragPayload,
        screen_point: egui::Pos2,
    ) -> Result<NodeId, StoreError> {
        let canvas_point = screen_to_canvas(screen_point, store.viewport());
        let position = snap_with(canvas_point, store.editor_settings());
        let id = store.add_node(&payload.node_type, position)?;
        store.set_selected_node(Some(id));
        Ok(id)
    }

    /// Zooms around the pointer when the zoom modifier is held, otherwise pans.
    ///
    /// Zoom speed is proportional to the current zoom. Panning subtracts the wheel delta so
    /// scrolling down/right moves the content up/left.
    pub fn handle_wheel<S: KeyValueStore>(&self, store: &mut FlowStore<S>, wheel: WheelInput) {
        let viewport = *store.viewport();
        if wheel.zoom_modifier {
            if wheel.delta.y == 0.0 {
                return;
            }
            let zoom_delta = -wheel.delta.y.signum() * WHEEL_ZOOM_SPEED * viewport.zoom;
            store.set_viewport(zoom_at(&viewport, wheel.pointer, zoom_delta));
        } else {
            store.update_viewport(ViewportUpdate {
                x: Some(viewport.x - wheel.delta.x),
                y: Some(viewport.y - wheel.delta.y),
                zoom: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRegistry;
    use crate::storage::MemoryStorage;
    use crate::constants::DEFAULT_FLOW_TYPE;
    use crate::types::Viewport;
    use crate::viewport::canvas_to_screen;

    fn new_store() -> FlowStore {
        let mut store = FlowStore::new(NodeRegistry::builtin(), MemoryStorage::new());
        store
            .create_new_flow("flow_canvas", "Canvas", "", DEFAULT_FLOW_TYPE)
            .unwrap();
        store
    }

    #[test]
    fn test_drop_converts_screen_point_through_viewport() {
        let mut store = new_store();
        store.set_viewport(Viewport {
            x: 100.0,
            y: 50.0,
            zoom: 2.0,
        });

        let id = CanvasController::new()
            .handle_drop(&mut store, &DragPayload::new("pf.Node"), egui::pos2(300.0, 250.0))
            .unwrap();

        let node = store.node(id).unwrap();
        assert_eq!(node.position, egui::pos2(100.0, 100.0));
        assert_eq!(store.state().selected_node_id, Some(id));
    }

    #[test]
    fn test_drop_snaps_when_enabled() {
        let mut store = new_store();
        store.toggle_snap_to_grid().unwrap();

        let id = CanvasController::new()
            .handle_drop(&mut store, &DragPayload::new("pf.Node"), egui::pos2(13.0, 27.0))
            .unwrap();

        assert_eq!(store.node(id).unwrap().position, egui::pos2(20.0, 20.0));
    }

    #[test]
    fn test_drop_of_unknown_type_fails() {
        let mut store = new_store();

        let result = CanvasController::new().handle_drop(
            &mut store,
            &DragPayload::new("pf.Unknown"),
            egui::Pos2::ZERO,
        );

        assert!(matches!(result, Err(StoreError::UnknownNodeType(_))));
        assert!(store.nodes().is_empty());
    }

    #[test]
    fn test_modifier_wheel_zooms_around_pointer() {
        let mut store = new_store();
        let pointer = egui::pos2(240.0, 180.0);
        let before = screen_to_canvas(pointer, store.viewport());

        CanvasController::new().handle_wheel(
            &mut store,
            WheelInput {
                pointer,
                delta: egui::vec2(0.0, -100.0),
                zoom_modifier: true,
            },
        );

        assert!((store.viewport().zoom - 1.05).abs() < 1e-5);
        let after = screen_to_canvas(pointer, store.viewport());
        assert!((before - after).length() < 1e-3);
        assert!((canvas_to_screen(before, store.viewport()) - pointer).length() < 1e-3);
    }

    #[test]
    fn test_zoom_speed_scales_with_current_zoom() {
        let mut store = new_store();
        store.set_viewport(Viewport {
            x: 0.0,
            y: 0.0,
            zoom: 2.0,
        });

        CanvasController::new().handle_wheel(
            &mut store,
            WheelInput {
                pointer: egui::Pos2::ZERO,
                delta: egui::vec2(0.0, 3.0),
                zoom_modifier: true,
            },
        );

        assert!((store.viewport().zoom - 1.9).abs() < 1e-5);
    }

    #[test]
    fn test_plain_wheel_pans_with_natural_scroll() {
        let mut store = new_store();

        CanvasController::new().handle_wheel(
            &mut store,
            WheelInput {
                pointer: egui::Pos2::ZERO,
                delta: egui::vec2(10.0, 40.0),
                zoom_modifier: false,
            },
        );

        assert_eq!(
            *store.viewport(),
            Viewport {
                x: -10.0,
                y: -40.0,
                zoom: 1.0
            }
        );
        assert_eq!(store.history_len(), 1);
    }
}
