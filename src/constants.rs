//! Shared application-wide constants.
//! Centralizes tweakable values used by the store, the interaction controllers and the UI shell.

// Viewport
/// Smallest zoom factor the viewport accepts.
pub const MIN_ZOOM: f32 = 0.2;
/// Largest zoom factor the viewport accepts.
pub const MAX_ZOOM: f32 = 3.0;
/// Zoom increment used by the toolbar zoom in/out buttons.
pub const ZOOM_STEP: f32 = 0.1;
/// Wheel zoom speed, multiplied by the current zoom for each wheel notch.
pub const WHEEL_ZOOM_SPEED: f32 = 0.05;

// Grid
/// Grid cell size in canvas units for freshly created flows.
pub const DEFAULT_GRID_SIZE: u32 = 20;

// Undo/redo
/// Maximum number of history snapshots to retain.
pub const MAX_HISTORY_LENGTH: usize = 50;

// Flow identifiers and storage keys
/// Prefix carried by the id of every flow that is backed by storage.
pub const FLOW_ID_PREFIX: &str = "flow_";
/// Id of the transient flow shown while no real flow is active. Never persisted.
pub const PLACEHOLDER_FLOW_ID: &str = "placeholder";
/// Storage key holding the serialized flow catalog.
pub const FLOW_LIST_KEY: &str = "catalog.flows";
/// Storage key holding the id of the active flow.
pub const ACTIVE_FLOW_KEY: &str = "catalog.active_flow_id";
/// Registry key of the container definition new flows are typed with.
pub const DEFAULT_FLOW_TYPE: &str = "pf.Flow";

// Edges
/// Input id used when an edge lands on a node that declares no inputs.
pub const DEFAULT_INPUT_ID: &str = "input_default";
/// Distance in canvas units within which a click selects an edge.
pub const EDGE_HIT_TOLERANCE: f32 = 6.0;

// Node rendering
/// Fallback node width in canvas units when neither the node nor its definition carries a size.
pub const NODE_WIDTH: f32 = 180.0;
/// Fallback node height in canvas units.
pub const NODE_HEIGHT: f32 = 80.0;
/// Radius of input/output anchors in canvas units.
pub const ANCHOR_RADIUS: f32 = 6.0;
/// Font size of node titles in canvas units.
pub const NODE_TITLE_SIZE: f32 = 14.0;
/// Horizontal space kept free on each side of a node title, in canvas units.
pub const NODE_TITLE_PADDING: f32 = 16.0;

// App persistence
/// eframe storage key under which the whole key-value storage map is saved.
pub const APP_STORAGE_KEY: &str = "flow_editor.storage";
