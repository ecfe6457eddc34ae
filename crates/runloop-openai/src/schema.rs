//! Strict `json_schema` response formats generated from Rust types.

use crate::types::{JsonSchemaFormat, ResponseFormat};
use runloop_core::TransportError;
use schemars::JsonSchema;
use serde_json::{Map, Value};

/// Integer and float formats schemars emits for sized numbers; strict
/// structured output rejects them.
const NUMERIC_FORMATS: &[&str] = &[
    "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uint64", "float",
    "double",
];

/// Build a strict response format whose schema describes `T`.
///
/// Every object forbids additional properties and lists all of its
/// properties as required, which strict structured output demands.
pub fn response_format_for<T: JsonSchema>() -> Result<ResponseFormat, TransportError> {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))?;
    if let Some(root) = schema.as_object_mut() {
        root.remove("$schema");
    }
    make_strict(&mut schema);

    Ok(ResponseFormat::JsonSchema {
        json_schema: JsonSchemaFormat {
            name: format_name(&T::schema_name()),
            strict: true,
            schema,
        },
    })
}

fn make_strict(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            strict_object(map);
            for child in map.values_mut() {
                make_strict(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(make_strict),
        _ => {}
    }
}

fn strict_object(map: &mut Map<String, Value>) {
    if let Some(format) = map.get("format").and_then(Value::as_str)
        && NUMERIC_FORMATS.contains(&format)
    {
        map.remove("format");
    }

    let required: Option<Vec<Value>> = map
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().map(Value::String).collect());

    if let Some(required) = required {
        map.insert("required".to_string(), Value::Array(required));
        map.insert("additionalProperties".to_string(), Value::Bool(false));
    }
}

/// Schema names may only contain `[A-Za-z0-9_-]`
fn format_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "response".to_string()
    } else {
        cleaned
    }
}
