//! JSON schema generation for tool parameters.
//!
//! Strict tool calling needs a self-contained schema: no `$ref`, every
//! object closed with `additionalProperties: false`, and every property
//! listed in `required` (optional fields stay nullable through their type).

use schemars::{schema_for, JsonSchema};
use serde_json::{Map, Value};

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Types usable as tool parameters.
///
/// Implemented for every `JsonSchema` type.
pub trait ToolSchema: JsonSchema {
    /// Provider-ready parameter schema for this type.
    fn parameters_schema() -> Value {
        let root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        normalize_schema(root)
    }

    /// Schema name for this type.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema> ToolSchema for T {}

/// Inline definitions and close every object schema.
pub fn normalize_schema(mut root: Value) -> Value {
    let definitions = match &mut root {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("definitions")
        }
        _ => None,
    };
    let definitions = match definitions {
        Some(Value::Object(defs)) => defs,
        _ => Map::new(),
    };

    normalize_node(&mut root, &definitions, 0);
    root
}

// Self-referential types would otherwise inline forever.
const MAX_INLINE_DEPTH: usize = 32;

fn resolve_ref(value: &Value, definitions: &Map<String, Value>) -> Option<Value> {
    let name = value.get("$ref")?.as_str()?.strip_prefix(DEFINITIONS_PREFIX)?;
    definitions.get(name).cloned()
}

fn normalize_node(value: &mut Value, definitions: &Map<String, Value>, depth: usize) {
    if depth < MAX_INLINE_DEPTH {
        if let Some(inlined) = resolve_ref(value, definitions) {
            *value = inlined;
            normalize_node(value, definitions, depth + 1);
            return;
        }
    }

    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".into(), Value::Bool(false));
                let keys: Option<Vec<Value>> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect());
                if let Some(keys) = keys {
                    map.insert("required".into(), Value::Array(keys));
                }
            }

            for child in map.values_mut() {
                normalize_node(child, definitions, depth);
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_node(item, definitions, depth);
            }
        }
        _ => {}
    }
}
