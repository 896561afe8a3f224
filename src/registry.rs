//! Node-type registry.
//!
//! Node definitions are immutable descriptive records keyed by a type string. The store reads
//! them to instantiate nodes and to resolve edge labels; nothing in the editor mutates them.

use crate::constants::{DEFAULT_FLOW_TYPE, DEFAULT_INPUT_ID};
use crate::types::{CodeLanguage, NodeSize, Params};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// A named input or output port on a node definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortDefinition {
    pub id: String,
    pub label: String,
}

impl PortDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Template for a code block seeded into new nodes of a code-editable type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlockDefinition {
    pub name: String,
    pub language: CodeLanguage,
    pub default_code: String,
}

/// Immutable description of a node type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    pub label: String,
    pub category: String,
    pub default_params: Params,
    /// JSON-schema-like description of `default_params`, consumed by the properties panel
    pub param_schema: serde_json::Value,
    pub default_size: NodeSize,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
    pub supports_code_editing: bool,
    pub code_blocks_definition: Vec<CodeBlockDefinition>,
    pub is_container: bool,
}

impl NodeDefinition {
    /// Looks up a declared output port.
    pub fn output(&self, output_id: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.id == output_id)
    }

    /// Looks up a declared input port.
    pub fn input(&self, input_id: &str) -> Option<&PortDefinition> {
        self.inputs.iter().find(|p| p.id == input_id)
    }

    /// Looks up a declared code block template.
    pub fn code_block(&self, name: &str) -> Option<&CodeBlockDefinition> {
        self.code_blocks_definition.iter().find(|b| b.name == name)
    }
}

/// Category under which definitions without one are listed.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Mapping from type string to node definition.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    definitions: BTreeMap<String, NodeDefinition>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a definition under `node_type`.
    pub fn register(&mut self, node_type: impl Into<String>, definition: NodeDefinition) {
        self.definitions.insert(node_type.into(), definition);
    }

    pub fn get(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.definitions.get(node_type)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.definitions.contains_key(node_type)
    }

    /// Iterates definitions in type-string order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeDefinition)> {
        self.definitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions grouped by category, each group in type-string order.
    pub fn categorized(&self) -> BTreeMap<&str, Vec<(&str, &NodeDefinition)>> {
        let mut categories: BTreeMap<&str, Vec<(&str, &NodeDefinition)>> = BTreeMap::new();
        for (node_type, definition) in self.iter() {
            let category = if definition.category.is_empty() {
                UNCATEGORIZED
            } else {
                definition.category.as_str()
            };
            categories.entry(category).or_default().push((node_type, definition));
        }
        categories
    }

    /// Resolves a flow type to its container definition.
    ///
    /// Returns `None` when the key is unknown or names a plain node type.
    pub fn flow_definition(&self, flow_type: &str) -> Option<&NodeDefinition> {
        self.get(flow_type).filter(|definition| definition.is_container)
    }

    /// Keys of every container definition, usable as a flow type.
    pub fn flow_types(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, definition)| definition.is_container)
            .map(|(flow_type, _)| flow_type)
    }

    /// The node and flow types shipped with the editor.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            "pf.Node",
            node(
                "Node",
                params(json!({ "name": "node", "max_retries": 1, "wait": 0 })),
                NodeSize::new(200.0, 120.0),
                vec![
                    python_block(
                        "prep",
                        "# prep(self, shared_data)\n# Runs before exec to prepare data\n# The return value is passed to exec\npass",
                    ),
                    python_block(
                        "exec",
                        "# exec(self, prep_result)\n# Core logic\n# The return value is passed to post\nprint(f\"Executing {self.params.get('name', 'Node')} with prep_result: {prep_result}\")\nreturn prep_result",
                    ),
                    python_block(
                        "post",
                        "# post(self, shared_data, prep_result, exec_result)\n# Runs after exec to store or route the result\nreturn exec_result",
                    ),
                    python_block(
                        "exec_fallback",
                        "# exec_fallback(self, prep_result, exception)\n# Runs when exec keeps failing after every retry\nprint(f\"Fallback for {self.params.get('name', 'Node')} due to: {exception}\")\nraise exception",
                    ),
                ],
            ),
        );

        registry.register(
            "pf.BatchNode",
            node(
                "Batch Node",
                params(json!({
                    "name": "batch_node",
                    "batch_param": "batch_data",
                    "max_retries": 1,
                    "wait": 0
                })),
                NodeSize::new(220.0, 140.0),
                vec![
                    python_block("prep", "# prep(self, shared_data)\n# The return value is passed to exec"),
                    python_block(
                        "exec",
                        "# exec(self, prep_result, item)\n# item is one element of batch_param\n# Runs once per batch item",
                    ),
                    python_block(
                        "post",
                        "# post(self, shared_data, prep_result, exec_results)\n# exec_results holds the result for every item",
                    ),
                    python_block("exec_fallback", "# exec_fallback(self, prep_result, item, exception)"),
                ],
            ),
        );

        registry.register(
            "pf.AsyncNode",
            node(
                "Async Node",
                params(json!({ "name": "async_node", "max_retries": 1, "wait": 0 })),
                NodeSize::new(200.0, 120.0),
                vec![
                    python_block(
                        "prep_async",
                        "# async prep_async(self, shared_data)\n# Asynchronous preparation step\npass",
                    ),
                    python_block(
                        "exec_async",
                        "# async exec_async(self, prep_result)\n# Asynchronous execution logic\nprint(f\"Executing async {self.params.get('name', 'AsyncNode')} with prep_result: {prep_result}\")\nreturn prep_result",
                    ),
                    python_block(
                        "post_async",
                        "# async post_async(self, shared_data, prep_result, exec_result)\n# Asynchronous post-processing step\nreturn exec_result",
                    ),
                    python_block(
                        "exec_fallback_async",
                        "# async exec_fallback_async(self, prep_result, exception)\n# Asynchronous fallback logic\nprint(f\"Async fallback for {self.params.get('name', 'AsyncNode')} due to: {exception}\")\nraise exception",
                    ),
                ],
            ),
        );

        registry.register(
            "pf.AsyncBatchNode",
            node(
                "Async Batch Node",
                params(json!({
                    "name": "async_batch_node",
                    "batch_param": "batch_data",
                    "max_retries": 1,
                    "wait": 0
                })),
                NodeSize::new(240.0, 140.0),
                vec![
                    python_block("prep", "# async prep(self, shared_data)\n# The return value is passed to exec"),
                    python_block(
                        "exec",
                        "# async exec(self, prep_result, item)\n# item is one element of batch_param\n# Runs once per batch item",
                    ),
                    python_block(
                        "post",
                        "# async post(self, shared_data, prep_result, exec_results)\n# exec_results holds the result for every item",
                    ),
                    python_block("exec_fallback", "# async exec_fallback(self, prep_result, item, exception)"),
                ],
            ),
        );

        registry.register(
            DEFAULT_FLOW_TYPE,
            flow(
                "Flow",
                params(json!({ "name": "flow", "description": "" })),
                NodeSize::new(200.0, 100.0),
            ),
        );

        registry.register(
            "pf.AsyncFlow",
            flow(
                "Async Flow",
                params(json!({ "name": "async_flow", "description": "" })),
                NodeSize::new(200.0, 100.0),
            ),
        );

        registry.register(
            "pf.BatchFlow",
            flow(
                "Batch Flow",
                params(json!({
                    "name": "batch_flow",
                    "description": "",
                    "batch_param": "batch_data"
                })),
                NodeSize::new(220.0, 120.0),
            ),
        );

        registry.register(
            "pf.AsyncParallelBatchFlow",
            flow(
                "Async Parallel Batch Flow",
                params(json!({
                    "name": "async_parallel_batch_flow",
                    "description": "",
                    "batch_param": "batch_data",
                    "max_parallel": 5
                })),
                NodeSize::new(280.0, 130.0),
            ),
        );

        registry
    }
}

/// A code-editable processing node with the standard ports.
fn node(
    label: &str,
    default_params: Params,
    default_size: NodeSize,
    code_blocks_definition: Vec<CodeBlockDefinition>,
) -> NodeDefinition {
    NodeDefinition {
        label: label.into(),
        category: "Core".into(),
        param_schema: schema_for(&default_params),
        default_params,
        default_size,
        inputs: vec![PortDefinition::new(DEFAULT_INPUT_ID, "Input")],
        outputs: vec![
            PortDefinition::new("success", "Success"),
            PortDefinition::new("failure", "Failure"),
        ],
        supports_code_editing: true,
        code_blocks_definition,
        is_container: false,
    }
}

/// A container that orchestrates other nodes. Flows carry no code of their own.
fn flow(label: &str, default_params: Params, default_size: NodeSize) -> NodeDefinition {
    NodeDefinition {
        label: label.into(),
        category: "Flow Control".into(),
        param_schema: schema_for(&default_params),
        default_params,
        default_size,
        inputs: vec![PortDefinition::new("flow_input", "Start")],
        outputs: vec![
            PortDefinition::new("flow_output_success", "Success"),
            PortDefinition::new("flow_output_failure", "Failure"),
        ],
        supports_code_editing: false,
        code_blocks_definition: Vec::new(),
        is_container: true,
    }
}

fn python_block(name: &str, default_code: &str) -> CodeBlockDefinition {
    CodeBlockDefinition {
        name: name.into(),
        language: CodeLanguage::Python,
        default_code: default_code.into(),
    }
}

/// Derives a `{ key: { "type": ..., "default": ... } }` schema from default params.
fn schema_for(defaults: &Params) -> serde_json::Value {
    let schema: serde_json::Map<String, serde_json::Value> = defaults
        .iter()
        .map(|(key, value)| {
            let kind = match value {
                serde_json::Value::Number(n) if n.is_f64() => "number",
                serde_json::Value::Number(_) => "integer",
                serde_json::Value::Bool(_) => "boolean",
                serde_json::Value::Array(_) => "array",
                serde_json::Value::Object(_) => "object",
                _ => "string",
            };
            (key.clone(), json!({ "type": kind, "default": value }))
        })
        .collect();
    serde_json::Value::Object(schema)
}

fn params(value: serde_json::Value) -> Params {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Params::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contains_core_types() {
        let registry = NodeRegistry::builtin();

        for node_type in ["pf.Node", "pf.BatchNode", "pf.AsyncNode", "pf.AsyncBatchNode"] {
            let def = registry.get(node_type).unwrap();
            assert!(!def.is_container, "{node_type}");
            assert!(def.supports_code_editing, "{node_type}");
            assert_eq!(def.code_blocks_definition.len(), 4, "{node_type}");
            assert_eq!(def.default_params["max_retries"], json!(1));
            assert_eq!(def.default_params["wait"], json!(0));
        }
        assert!(!registry.contains("pf.Missing"));
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_port_lookup() {
        let registry = NodeRegistry::builtin();
        let def = registry.get("pf.Node").unwrap();

        assert_eq!(def.output("success").map(|p| p.label.as_str()), Some("Success"));
        assert_eq!(def.output("failure").map(|p| p.label.as_str()), Some("Failure"));
        assert!(def.output("nope").is_none());
        assert_eq!(def.input("input_default").map(|p| p.id.as_str()), Some("input_default"));
    }

    #[test]
    fn test_node_code_blocks_are_python_phases() {
        let registry = NodeRegistry::builtin();
        let def = registry.get("pf.Node").unwrap();

        let names: Vec<&str> = def.code_blocks_definition.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["prep", "exec", "post", "exec_fallback"]);
        assert!(def
            .code_blocks_definition
            .iter()
            .all(|b| b.language == CodeLanguage::Python));
        assert!(def.code_block("exec").unwrap().default_code.contains("return prep_result"));
    }

    #[test]
    fn test_code_editable_types_declare_blocks() {
        let registry = NodeRegistry::builtin();
        for (node_type, def) in registry.iter() {
            if def.supports_code_editing {
                assert!(
                    !def.code_blocks_definition.is_empty(),
                    "{node_type} supports code editing but declares no blocks"
                );
            }
        }
    }

    #[test]
    fn test_flow_definition_only_resolves_containers() {
        let registry = NodeRegistry::builtin();

        let flow = registry.flow_definition(DEFAULT_FLOW_TYPE).unwrap();
        assert!(flow.is_container);
        assert_eq!(flow.label, "Flow");
        assert_eq!(
            registry.flow_definition("pf.AsyncParallelBatchFlow").unwrap().default_params["max_parallel"],
            json!(5)
        );
        assert!(registry.flow_definition("pf.Node").is_none());
        assert!(registry.flow_definition("PfFlowDefinition").is_none());

        let flow_types: Vec<&str> = registry.flow_types().collect();
        assert_eq!(
            flow_types,
            ["pf.AsyncFlow", "pf.AsyncParallelBatchFlow", "pf.BatchFlow", "pf.Flow"]
        );
    }

    #[test]
    fn test_categorized_lists_each_category_once() {
        let registry = NodeRegistry::builtin();
        let categories = registry.categorized();

        assert_eq!(categories.keys().copied().collect::<Vec<_>>(), ["Core", "Flow Control"]);
        assert_eq!(categories["Core"].len(), 4);
        assert_eq!(categories["Flow Control"].len(), 4);
        let total: usize = categories.values().map(Vec::len).sum();
        assert_eq!(total, registry.len());
    }

    #[test]
    fn test_categorized_groups_interleaved_and_blank_categories() {
        let mut registry = NodeRegistry::new();
        let base = NodeRegistry::builtin().get("pf.Node").cloned().unwrap();
        for (node_type, category) in [("a", "X"), ("b", "Y"), ("c", "X"), ("d", "")] {
            registry.register(
                node_type,
                NodeDefinition {
                    category: category.into(),
                    ..base.clone()
                },
            );
        }

        let categories = registry.categorized();

        assert_eq!(categories.keys().copied().collect::<Vec<_>>(), [UNCATEGORIZED, "X", "Y"]);
        let x: Vec<&str> = categories["X"].iter().map(|(t, _)| *t).collect();
        assert_eq!(x, ["a", "c"]);
    }

    #[test]
    fn test_param_schema_describes_defaults() {
        let registry = NodeRegistry::builtin();
        let schema = &registry.get("pf.BatchNode").unwrap().param_schema;

        assert_eq!(schema["batch_param"]["type"], json!("string"));
        assert_eq!(schema["max_retries"]["type"], json!("integer"));
        assert_eq!(schema["max_retries"]["default"], json!(1));
    }
}
