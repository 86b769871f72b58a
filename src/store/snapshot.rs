//! Immutable in-memory snapshot of all source layers.
//!
//! A snapshot is one consistent view of the stack: the parsed layer
//! trees plus the merged reference namespace. Resolutions are pure
//! functions of a snapshot; mutations and reloads build a new one and
//! swap it in atomically.

use super::loader::{LayerDocs, SettingsPaths};
use super::merge::{deep_merge, deep_merge_all};
use super::tree::Node;
use crate::error::Result;
use crate::types::SettingValue;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Snapshot {
    docs: LayerDocs,
    config: Node,
    /// Service overrides with sensitivity-routed values folded back in.
    override_view: Node,
    /// Instance overrides, same folding.
    instance_view: Node,
    /// Reference namespace: config defaults, secrets, then service-level
    /// overrides. Instance overrides are excluded so a shared reference
    /// can never pick up one deployment's value.
    namespace: Node,
}

impl Snapshot {
    pub fn load(paths: &SettingsPaths) -> Result<Self> {
        Ok(Self::from_docs(LayerDocs::load(paths)?))
    }

    pub fn from_docs(docs: LayerDocs) -> Self {
        let config = Node::from_document(&docs.config);
        let override_doc = deep_merge(docs.secrets.clone(), docs.overrides.clone());
        let instance_doc = deep_merge(docs.secrets.clone(), docs.instances.clone());
        let namespace_doc = deep_merge_all([
            docs.config.clone(),
            docs.secrets.clone(),
            docs.overrides.clone(),
        ]);
        Self {
            config,
            override_view: Node::from_document(&override_doc),
            instance_view: Node::from_document(&instance_doc),
            namespace: Node::from_document(&namespace_doc),
            docs,
        }
    }

    /// Raw documents this snapshot was built from.
    pub fn docs(&self) -> &LayerDocs {
        &self.docs
    }

    /// Shipped per-service binding from `config.yaml`.
    pub fn template_binding(&self, service_id: &str, var: &str) -> Option<&SettingValue> {
        self.config
            .get(&format!("services.{}.{}", service_id, var))
    }

    /// Service-level override.
    pub fn service_override(&self, service_id: &str, var: &str) -> Option<&SettingValue> {
        self.override_view
            .get(&format!("services.{}.{}", service_id, var))
    }

    /// Deployment-instance override.
    pub fn instance_override(&self, deployment_id: &str, var: &str) -> Option<&SettingValue> {
        self.instance_view
            .get(&format!("instances.{}.{}", deployment_id, var))
    }

    /// Flat `.env` entry.
    pub fn env_file_value(&self, var: &str) -> Option<SettingValue> {
        self.docs
            .env_file
            .get(var)
            .map(|raw| SettingValue::parse(raw))
    }

    /// Lookup in the merged reference namespace.
    pub fn namespace_get(&self, path: &str) -> Option<&SettingValue> {
        self.namespace.get(path)
    }

    /// All leaf paths of the config-defaults document.
    pub fn config_leaf_paths(&self) -> Vec<(String, &SettingValue)> {
        self.config.leaf_paths()
    }

    /// Rebuild with a replacement secrets document.
    pub fn with_secrets(&self, secrets: Value) -> Self {
        let mut docs = self.docs.clone();
        docs.secrets = secrets;
        Self::from_docs(docs)
    }

    /// Rebuild with a replacement overrides document.
    pub fn with_overrides(&self, overrides: Value) -> Self {
        let mut docs = self.docs.clone();
        docs.overrides = overrides;
        Self::from_docs(docs)
    }
}
