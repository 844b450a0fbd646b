//! Tolerant field lookup over records of unknown shape.
//!
//! Source rows arrive as plain objects, as `{ id, fields: {...} }` wrappers,
//! as `{ values: {...} }` wrappers, or with column names whose case drifted
//! from the canonical spelling. [`resolve`] hides all of that behind one
//! lookup with a fixed priority order:
//!
//! 1. exact key on the record
//! 2. exact key inside `record.values`
//! 3. exact key inside `record.fields`
//! 4. case-insensitive key on the record
//! 5. the same search inside nested objects, at most [`MAX_NESTED_DEPTH`]
//!    levels down, first hit in key order
//!
//! `null` counts as absent, so lookup keeps going past it.

use serde_json::{Map, Value};

/// How far [`resolve`] descends into nested objects.
pub const MAX_NESTED_DEPTH: usize = 2;

/// Find `field` in `record`, or `None` when no container holds it.
#[must_use]
pub fn resolve<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    record
        .as_object()
        .and_then(|obj| lookup(obj, field, MAX_NESTED_DEPTH))
}

/// Like [`resolve`], returning `default` when the field is missing.
#[must_use]
pub fn resolve_or<'a>(record: &'a Value, field: &str, default: &'a Value) -> &'a Value {
    resolve(record, field).unwrap_or(default)
}

/// Resolve a field as display text.
///
/// Strings are trimmed, numbers and booleans are rendered, arrays of scalars
/// are joined with `", "`. Objects, `null`, and blank results yield `None`.
#[must_use]
pub fn resolve_text(record: &Value, field: &str) -> Option<String> {
    resolve(record, field).and_then(value_to_text)
}

/// Resolve a field as a floating point number, accepting numeric strings.
#[must_use]
pub fn resolve_number(record: &Value, field: &str) -> Option<f64> {
    match resolve(record, field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn lookup<'a>(obj: &'a Map<String, Value>, field: &str, depth: usize) -> Option<&'a Value> {
    if let Some(value) = present(obj.get(field)) {
        return Some(value);
    }

    for container in ["values", "fields"] {
        if let Some(value) = obj
            .get(container)
            .and_then(Value::as_object)
            .and_then(|inner| present(inner.get(field)))
        {
            return Some(value);
        }
    }

    let wanted = field.to_lowercase();
    if let Some(value) = obj
        .iter()
        .find(|(key, value)| key.to_lowercase() == wanted && !value.is_null())
        .map(|(_, value)| value)
    {
        return Some(value);
    }

    if depth == 0 {
        return None;
    }

    obj.values()
        .filter_map(Value::as_object)
        .find_map(|nested| lookup(nested, field, depth - 1))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn value_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_array() && !item.is_object())
            .filter_map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => return None,
    };

    if text.is_empty() { None } else { Some(text) }
}
