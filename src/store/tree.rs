//! Parsed layer trees.
//!
//! Raw documents are parsed once into a tree of classified leaves, so
//! resolution never re-detects the reference marker on a hot path and a
//! literal that happens to look like a marker stays a literal.

use crate::types::SettingValue;
use serde_json::Value;
use std::collections::BTreeMap;

/// A parsed layer document: nested maps with classified leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Branch(BTreeMap<String, Node>),
    Leaf(SettingValue),
}

impl Node {
    pub fn empty() -> Self {
        Node::Branch(BTreeMap::new())
    }

    /// Parse a document into a tree.
    ///
    /// Scalars are stringified, arrays keep their JSON text, nulls are
    /// dropped (a null leaf is an absent leaf).
    pub fn from_document(document: &Value) -> Self {
        match document {
            Value::Object(map) => Node::Branch(
                map.iter()
                    .filter(|(_, child)| !child.is_null())
                    .map(|(key, child)| (key.clone(), Node::from_document(child)))
                    .collect(),
            ),
            other => Node::Leaf(SettingValue::parse(&scalar_text(other))),
        }
    }

    /// Dotted-path lookup of a leaf value.
    pub fn get(&self, path: &str) -> Option<&SettingValue> {
        let mut node = self;
        for segment in path.split('.') {
            match node {
                Node::Branch(map) => node = map.get(segment)?,
                Node::Leaf(_) => return None,
            }
        }
        match node {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    /// All leaf paths in depth-first sorted order.
    pub fn leaf_paths(&self) -> Vec<(String, &SettingValue)> {
        let mut out = Vec::new();
        self.walk(String::new(), &mut out);
        out
    }

    fn walk<'a>(&'a self, prefix: String, out: &mut Vec<(String, &'a SettingValue)>) {
        match self {
            Node::Branch(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    child.walk(path, out);
                }
            }
            Node::Leaf(value) => out.push((prefix, value)),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_lookup() {
        let tree = Node::from_document(&json!({
            "api_keys": {"openai": "sk-1"},
            "port": 8080,
        }));
        assert_eq!(
            tree.get("api_keys.openai"),
            Some(&SettingValue::Literal("sk-1".into()))
        );
        assert_eq!(tree.get("port"), Some(&SettingValue::Literal("8080".into())));
        assert_eq!(tree.get("api_keys"), None);
        assert_eq!(tree.get("api_keys.openai.deep"), None);
        assert_eq!(tree.get("missing"), None);
    }

    #[test]
    fn references_classified_at_parse_time() {
        let tree = Node::from_document(&json!({
            "services": {"chronicle": {"OPENAI_API_KEY": "@settings.api_keys.openai"}}
        }));
        assert_eq!(
            tree.get("services.chronicle.OPENAI_API_KEY"),
            Some(&SettingValue::Reference("api_keys.openai".into()))
        );
    }

    #[test]
    fn null_leaves_are_absent() {
        let tree = Node::from_document(&json!({"a": null, "b": "v"}));
        assert_eq!(tree.get("a"), None);
        assert!(tree.get("b").is_some());
    }

    #[test]
    fn leaf_paths_are_sorted() {
        let tree = Node::from_document(&json!({
            "urls": {"registry": "r"},
            "api_keys": {"openai": "sk", "anthropic": "ak"},
        }));
        let paths: Vec<String> = tree.leaf_paths().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec!["api_keys.anthropic", "api_keys.openai", "urls.registry"]
        );
    }
}
