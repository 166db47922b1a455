//! Small helpers for picking fields out of the loosely-typed JSON bodies
//! the AWS JSON 1.1 protocol sends — ECS's actual wire shape is a flat
//! camelCase object per operation, not something worth a generated-schema
//! struct for (that generator is explicitly out of scope, spec 1).

use kecs_definitions::error::ApiError;
use serde_json::Value;

pub fn str_field<'a>(body: &'a Value, key: &str) -> Result<&'a str, ApiError> {
    body.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::InvalidParameter(format!("missing required field: {key}")))
}

pub fn opt_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

pub fn u32_field(body: &Value, key: &str, default: u32) -> u32 {
    body.get(key).and_then(Value::as_u64).map(|v| v as u32).unwrap_or(default)
}

pub fn bool_field(body: &Value, key: &str, default: bool) -> bool {
    body.get(key).and_then(Value::as_bool).unwrap_or(default)
}

pub fn limit_field(body: &Value, default: usize) -> usize {
    body.get("maxResults")
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

pub fn after_field(body: &Value) -> Option<i64> {
    opt_str(body, "nextToken").and_then(kecs_definitions::pagination::decode_cursor)
}

pub fn tags_field(body: &Value) -> Vec<kecs_definitions::structs::Tag> {
    body.get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|t| {
                    Some(kecs_definitions::structs::Tag {
                        key: t.get("key")?.as_str()?.to_string(),
                        value: t.get("value")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `cluster` request fields name-or-ARN; default to "default" when absent.
pub fn cluster_field(body: &Value) -> String {
    opt_str(body, "cluster").unwrap_or("default").to_string()
}
