//! Deep merge and path edits for layer documents.
//!
//! Overlapping nested maps merge key-by-key with the overlay winning at
//! the leaf level; scalars and arrays are replaced entirely. An explicit
//! null in the overlay means "not specified" and preserves the base
//! value. Writes use the same merge so sibling keys always survive.

use serde_json::Value;

/// Deep merge two documents, with `overlay` taking precedence over `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge documents in order, later ones taking precedence.
pub fn deep_merge_all(documents: impl IntoIterator<Item = Value>) -> Value {
    documents.into_iter().fold(Value::Null, deep_merge)
}

/// Build a document containing only `path` set to `value`, suitable for
/// merging into an existing layer document.
pub fn path_overlay(path: &str, value: &str) -> Value {
    let mut doc = Value::String(value.to_string());
    for segment in path.rsplit('.') {
        let mut map = serde_json::Map::new();
        map.insert(segment.to_string(), doc);
        doc = Value::Object(map);
    }
    doc
}

/// Remove the leaf at `path`, pruning branch maps the removal leaves
/// empty. Returns whether a leaf was actually removed.
pub fn remove_path(doc: &mut Value, path: &str) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return false;
    }
    remove_segments(doc, &segments)
}

fn remove_segments(node: &mut Value, segments: &[&str]) -> bool {
    let Value::Object(map) = node else {
        return false;
    };
    let Some((head, rest)) = segments.split_first() else {
        return false;
    };
    if rest.is_empty() {
        match map.get(*head) {
            Some(value) if !value.is_object() => {
                map.remove(*head);
                true
            }
            _ => false,
        }
    } else {
        let Some(child) = map.get_mut(*head) else {
            return false;
        };
        let removed = remove_segments(child, rest);
        if removed && child.as_object().is_some_and(|m| m.is_empty()) {
            map.remove(*head);
        }
        removed
    }
}
