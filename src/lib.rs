//! # Flow Editor
//!
//! A visual editor for node-based flows. Nodes are instantiated from a registry of node types,
//! placed on an infinite pannable and zoomable canvas, and wired together by edges that run
//! from a named output of one node to a named input of another.
//!
//! ## Features
//! - Palette drag-and-drop node creation with optional grid snapping
//! - Node dragging and edge drawing between anchors
//! - Snapshot-based undo/redo with a bounded history
//! - Wheel panning and pointer-anchored zoom
//! - A catalog of saved flows persisted through a key-value store
//!
//! The editing core ([`FlowStore`], [`FlowCatalog`], the controllers in [`interaction`]) has no
//! dependency on a running window and can be driven directly.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod constants;
pub mod error;
pub mod interaction;
pub mod registry;
pub mod storage;
pub mod store;
pub mod types;
pub mod ui;
pub mod viewport;

// Re-export the types most callers need
pub use catalog::FlowCatalog;
pub use error::{StorageError, StoreError};
pub use registry::{NodeDefinition, NodeRegistry, PortDefinition};
pub use storage::{KeyValueStore, MemoryStorage};
pub use store::{FlowStore, StoreMode};
pub use types::*;
use ui::FlowEditorApp;

/// Runs the flow editor with default window settings.
///
/// Restores saved flows from eframe persistence and starts the main event loop.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// use flow_editor::run_app;
///
/// fn main() -> Result<(), eframe::Error> {
///     run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Flow Editor",
        options,
        Box::new(|cc| Ok(Box::new(FlowEditorApp::new(cc)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui;

    #[test]
    fn test_flow_state_default_is_placeholder() {
        let flow = FlowState::placeholder();
        assert!(flow.nodes.is_empty());
        assert!(flow.edges.is_empty());
        assert_eq!(flow.id, constants::PLACEHOLDER_FLOW_ID);
        assert_eq!(flow.viewport.zoom, 1.0);
    }

    #[test]
    fn test_editing_core_runs_without_a_window() {
        let mut store = FlowStore::new(NodeRegistry::builtin(), MemoryStorage::new());
        let mut catalog = FlowCatalog::open(&mut store).unwrap();
        let id = catalog
            .create_flow(&mut store, "Headless", "", "pf.BatchFlow")
            .unwrap();

        let node = store.add_node("pf.AsyncBatchNode", egui::pos2(0.0, 0.0)).unwrap();

        assert!(store.storage().contains_key(&id));
        assert_eq!(store.node(node).unwrap().label, "Async Batch Node");
        assert_eq!(store.state().flow_type, "pf.BatchFlow");
    }
}
