//! Error types for store, catalog and storage operations.

use crate::types::{EdgeId, NodeId};
use thiserror::Error;

/// Failures reported by the durable key-value storage boundary.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage is unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by graph store and flow catalog operations.
///
/// Lookup misses and invariant-violation attempts never mutate state; the operation that
/// returned the error left the flow exactly as it was.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("Node '{0}' not found")]
    NodeNotFound(NodeId),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(EdgeId),

    #[error("Node '{0}' cannot connect to itself")]
    SelfConnection(NodeId),

    #[error("An edge from '{source_node_id}'/'{source_output_id}' to '{target_node_id}'/'{target_input_id}' already exists")]
    DuplicateEdge {
        source_node_id: NodeId,
        source_output_id: String,
        target_node_id: NodeId,
        target_input_id: String,
    },

    #[error("Node type '{0}' does not support code editing")]
    CodeEditingUnsupported(String),

    #[error("Node type '{node_type}' declares no code block named '{block}'")]
    UnknownCodeBlock { node_type: String, block: String },

    #[error("'{0}' is not a registered flow type")]
    UnknownFlowType(String),

    #[error("Flow '{0}' is not in the catalog")]
    FlowNotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
