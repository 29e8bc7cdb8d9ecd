//! Helpers for reading typed parameters out of a `serde_json::Value` object.
//!
//! The `param_*` getters never fail: a missing key or a value of the wrong
//! type yields the default. [`check_types`] is the strict counterpart used
//! when user-supplied overrides should be rejected rather than ignored.

use crate::error::FlowError;
use serde_json::Value;

/// Extracts an `f64` from `params[name]`, returning `default` if missing or wrong type.
///
/// JSON integers are accepted and converted.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Like [`param_f64`], but the result is clamped to `[min, max]`.
pub fn param_f64_in(params: &Value, name: &str, default: f64, min: f64, max: f64) -> f64 {
    param_f64(params, name, default).max(min).min(max)
}

/// Extracts a `usize` from `params[name]`, returning `default` if missing or
/// not a non-negative integer.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// Extracts a `bool` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_bool(params: &Value, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Extracts a `String` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_string(params: &Value, name: &str, default: &str) -> String {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| default.to_owned())
}

/// Verifies that every key of `params` that also appears in `schema` has the
/// JSON type the schema declares (`"number"`, `"integer"`, `"boolean"`,
/// `"string"`). Keys unknown to the schema are ignored.
pub fn check_types(params: &Value, schema: &Value) -> Result<(), FlowError> {
    let Some(object) = params.as_object() else {
        return Ok(());
    };
    for (name, value) in object {
        let Some(expected) = schema
            .get(name)
            .and_then(|entry| entry.get("type"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        let ok = match expected {
            "number" => value.is_number(),
            "integer" => value.is_u64(),
            "boolean" => value.is_boolean(),
            "string" => value.is_string(),
            _ => true,
        };
        if !ok {
            return Err(FlowError::ParamTypeMismatch {
                name: name.clone(),
                expected: expected.to_owned(),
                got: json_type_name(value).to_owned(),
            });
        }
    }
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
