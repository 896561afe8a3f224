//! Application state for the editor shell.
//!
//! The app owns one [`FlowStore`] over an in-memory [`MemoryStorage`], the [`FlowCatalog`]
//! describing every saved flow, and the two pointer controllers. eframe persistence seeds the
//! storage at startup and receives it back on save.

use crate::catalog::FlowCatalog;
use crate::constants::APP_STORAGE_KEY;
use crate::error::StoreError;
use crate::interaction::{CanvasController, NodeController};
use crate::registry::NodeRegistry;
use crate::storage::MemoryStorage;
use crate::store::FlowStore;
use eframe::egui;

/// The main application.
pub struct FlowEditorApp {
    /// The live flow and its history
    pub store: FlowStore<MemoryStorage>,
    /// Saved flows
    pub catalog: FlowCatalog,
    pub(crate) canvas: CanvasController,
    pub(crate) nodes: NodeController,
    /// Screen rect of the canvas from the last frame
    pub(crate) canvas_rect: egui::Rect,
    /// Width of the properties panel, remembered across frames
    pub(crate) properties_panel_width: f32,
    /// Most recent failure reported to the user
    pub(crate) status: Option<String>,
}

impl Default for FlowEditorApp {
    fn default() -> Self {
        Self::from_storage(MemoryStorage::new())
    }
}

impl FlowEditorApp {
    /// Creates the app, restoring the storage map eframe persisted on the last run.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let storage = cc
            .storage
            .and_then(|storage| storage.get_string(APP_STORAGE_KEY))
            .map(|json| MemoryStorage::from_json(&json))
            .unwrap_or_default();
        Self::from_storage(storage)
    }

    /// Creates the app over an existing storage map and opens the saved catalog.
    pub fn from_storage(storage: MemoryStorage) -> Self {
        let mut store = FlowStore::new(NodeRegistry::builtin(), storage);
        let catalog = match FlowCatalog::open(&mut store) {
            Ok(catalog) => catalog,
            Err(err) => {
                log::error!("Failed to open flow catalog: {err}");
                FlowCatalog::default()
            }
        };
        log::info!(
            "Editor started with {} saved flow(s), active: {:?}",
            catalog.flows().len(),
            catalog.active_flow_id()
        );

        Self {
            store,
            catalog,
            canvas: CanvasController::new(),
            nodes: NodeController::new(),
            canvas_rect: egui::Rect::NOTHING,
            properties_panel_width: 280.0,
            status: None,
        }
    }

    /// Serializes the storage map for eframe persistence.
    pub fn storage_json(&self) -> Result<String, serde_json::Error> {
        self.store.storage().to_json()
    }

    /// Unwraps a store result, logging and surfacing any error in the status bar.
    pub(crate) fn report<T>(&mut self, result: Result<T, StoreError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("{err}");
                self.status = Some(err.to_string());
                None
            }
        }
    }
}
