//! Helpers for walking the settings document tree.
//!
//! The document is held as a [`serde_yaml::Value`] so unknown keys and key
//! order survive a load/write cycle untouched.

use serde_yaml::{Mapping, Value};

use crate::error::{CoreError, CoreResult};

/// Build a string key for mapping lookups.
pub fn key(k: &str) -> Value {
    Value::String(k.to_string())
}

/// Follow `keys` through nested mappings.
pub fn nested_get<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let mut current = doc;
    for k in keys {
        current = current.as_mapping()?.get(*k)?;
    }
    Some(current)
}

pub fn nested_get_mut<'a>(doc: &'a mut Value, keys: &[&str]) -> Option<&'a mut Value> {
    let mut current = doc;
    for k in keys {
        current = current.as_mapping_mut()?.get_mut(*k)?;
    }
    Some(current)
}

/// Read a nested string value, if present.
pub fn nested_str<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a str> {
    nested_get(doc, keys).and_then(Value::as_str)
}

/// Return the mapping at `keys`, creating empty mappings along the way.
///
/// Null values on the path are replaced by mappings; any other non-mapping
/// value is an error.
pub fn ensure_mapping<'a>(doc: &'a mut Value, keys: &[&str]) -> CoreResult<&'a mut Mapping> {
    let mut current = doc;
    for (depth, k) in keys.iter().enumerate() {
        if current.is_null() {
            *current = Value::Mapping(Mapping::new());
        }
        let map = current
            .as_mapping_mut()
            .ok_or_else(|| CoreError::NotAMapping {
                path: keys[..depth].join("."),
            })?;
        current = map.entry(key(k)).or_insert(Value::Null);
    }
    if current.is_null() {
        *current = Value::Mapping(Mapping::new());
    }
    current.as_mapping_mut().ok_or_else(|| CoreError::NotAMapping {
        path: keys.join("."),
    })
}

/// Set the value at `keys`, creating intermediate mappings.
pub fn nested_set(doc: &mut Value, keys: &[&str], value: Value) -> CoreResult<()> {
    match keys.split_last() {
        None => {
            *doc = value;
            Ok(())
        }
        Some((last, parents)) => {
            ensure_mapping(doc, parents)?.insert(key(last), value);
            Ok(())
        }
    }
}

/// Collect every value stored under `target` at any depth, in document order.
pub fn nested_find_all<'a>(doc: &'a Value, target: &str) -> Vec<&'a Value> {
    let mut found = Vec::new();
    collect(doc, target, &mut found);
    found
}

fn collect<'a>(value: &'a Value, target: &str, found: &mut Vec<&'a Value>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                if k.as_str() == Some(target) {
                    found.push(v);
                }
                collect(v, target, found);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect(item, target, found);
            }
        }
        _ => {}
    }
}

/// Render a scalar the way it should appear in a path or argument.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}
