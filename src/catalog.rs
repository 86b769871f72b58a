//! Consumed interfaces: the service catalog and capability wiring.
//!
//! The engine never learns how services are registered or how provider
//! credentials get bound to capability slots; it depends on these traits
//! and the surrounding platform injects the implementations. Static
//! table-backed implementations are provided for the CLI and tests.

use crate::error::{Result, SettingsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-service catalog of required setting keys, supplied by the
/// external service registry.
pub trait ServiceCatalog: Send + Sync {
    /// Env vars the service declares, in resolution order.
    fn required_env(&self, service_id: &str) -> Vec<String>;

    /// Default values the service's compose declaration carries.
    fn declared_defaults(&self, service_id: &str) -> BTreeMap<String, String>;
}

/// Opaque lookup into whatever provider wiring has been bound.
pub trait CapabilityLookup: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Known keys, for the suggestion scan.
    fn keys(&self) -> Vec<String>;
}

/// Catalog backed by a static table, e.g. a `services.yaml` shipped next
/// to the settings documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Env vars the service requires.
    #[serde(default)]
    pub env: Vec<String>,

    /// Compose-declared default values.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl StaticCatalog {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|source| SettingsError::YamlParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ServiceCatalog for StaticCatalog {
    fn required_env(&self, service_id: &str) -> Vec<String> {
        let Some(spec) = self.services.get(service_id) else {
            return Vec::new();
        };
        let mut vars = spec.env.clone();
        for key in spec.defaults.keys() {
            if !vars.contains(key) {
                vars.push(key.clone());
            }
        }
        vars
    }

    fn declared_defaults(&self, service_id: &str) -> BTreeMap<String, String> {
        self.services
            .get(service_id)
            .map(|spec| spec.defaults.clone())
            .unwrap_or_default()
    }
}

/// Capability table for tests and the CLI's offline mode.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities {
    entries: BTreeMap<String, String>,
}

impl StaticCapabilities {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn bind(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }
}

impl CapabilityLookup for StaticCapabilities {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// The empty wiring.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCapabilities;

impl CapabilityLookup for NullCapabilities {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_env_unions_declared_defaults() {
        let catalog: StaticCatalog = serde_yaml::from_str(
            r#"
services:
  chronicle:
    env: [OPENAI_API_KEY, MODE]
    defaults:
      MODE: dev
      PORT: "8080"
"#,
        )
        .unwrap();
        assert_eq!(
            catalog.required_env("chronicle"),
            vec!["OPENAI_API_KEY", "MODE", "PORT"]
        );
        assert_eq!(
            catalog.declared_defaults("chronicle").get("PORT").unwrap(),
            "8080"
        );
    }

    #[test]
    fn unknown_service_is_empty() {
        let catalog = StaticCatalog::default();
        assert!(catalog.required_env("ghost").is_empty());
        assert!(catalog.declared_defaults("ghost").is_empty());
    }

    #[test]
    fn static_capabilities_enumerate_sorted() {
        let caps = StaticCapabilities::default()
            .bind("OPENAI_API_KEY", "sk-cap")
            .bind("DB_URL", "postgres://");
        assert_eq!(caps.keys(), vec!["DB_URL", "OPENAI_API_KEY"]);
        assert_eq!(caps.get("OPENAI_API_KEY").unwrap(), "sk-cap");
        assert!(caps.get("MISSING").is_none());
    }
}
