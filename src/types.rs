//! Core value types for settings resolution.

use serde::{Deserialize, Serialize};

/// Prefix marking a leaf value as an indirection into the settings
/// namespace rather than a literal.
pub const REFERENCE_MARKER: &str = "@settings.";

/// Where a resolved value came from.
///
/// Declaration order is precedence order, lowest first. Resolution picks
/// the highest layer that has a value and stops; layers are never blended
/// for a single key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Sentinel: no layer had a value.
    NotFound,
    /// Shipped defaults (`config.yaml`), including per-service bindings
    /// under `services.<service_id>`.
    ConfigDefault,
    /// Defaults declared by the service catalog.
    ComposeDefault,
    /// Flat `.env` namespace.
    EnvFile,
    /// Provider wiring bound by the external capability subsystem.
    Capability,
    /// Service-level overrides (`overrides.yaml`).
    DeployEnv,
    /// Deployment-instance overrides (`instances.yaml`).
    UserOverride,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Source::NotFound => "not_found",
            Source::ConfigDefault => "config_default",
            Source::ComposeDefault => "compose_default",
            Source::EnvFile => "env_file",
            Source::Capability => "capability",
            Source::DeployEnv => "deploy_env",
            Source::UserOverride => "user_override",
        };
        write!(f, "{}", name)
    }
}

/// The result of resolving one key for one entity.
///
/// Immutable value object. `path` is populated only when the value came
/// through a reference indirection, and names the terminal settings path
/// that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub value: Option<String>,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Resolution {
    /// A literal value found directly in a layer.
    pub fn literal(value: impl Into<String>, source: Source) -> Self {
        Self {
            value: Some(value.into()),
            source,
            path: None,
        }
    }

    /// A value that arrived through a reference chain ending at `path`.
    pub fn via_reference(
        value: impl Into<String>,
        source: Source,
        path: impl Into<String>,
    ) -> Self {
        Self {
            value: Some(value.into()),
            source,
            path: Some(path.into()),
        }
    }

    /// No layer had a value.
    pub fn not_found() -> Self {
        Self {
            value: None,
            source: Source::NotFound,
            path: None,
        }
    }

    /// A reference chain that fell off the namespace at `path`.
    pub fn dangling(path: impl Into<String>) -> Self {
        Self {
            value: None,
            source: Source::NotFound,
            path: Some(path.into()),
        }
    }

    pub fn found(&self) -> bool {
        self.source != Source::NotFound
    }
}

/// A parsed leaf value from any layer document.
///
/// Classification happens once at document load time, so a literal that
/// merely looks like a marker is never re-interpreted during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Literal(String),
    /// `@settings.<path>` indirection into the settings namespace.
    Reference(String),
}

impl SettingValue {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(REFERENCE_MARKER) {
            Some(path) if !path.is_empty() => SettingValue::Reference(path.to_string()),
            _ => SettingValue::Literal(raw.to_string()),
        }
    }
}

/// Candidate settings path offered for binding an env var.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub path: String,
    pub label: String,
    pub has_value: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_order_is_precedence() {
        assert!(Source::NotFound < Source::ConfigDefault);
        assert!(Source::ConfigDefault < Source::ComposeDefault);
        assert!(Source::ComposeDefault < Source::EnvFile);
        assert!(Source::EnvFile < Source::Capability);
        assert!(Source::Capability < Source::DeployEnv);
        assert!(Source::DeployEnv < Source::UserOverride);
    }

    #[test]
    fn parse_reference() {
        assert_eq!(
            SettingValue::parse("@settings.api_keys.openai"),
            SettingValue::Reference("api_keys.openai".to_string())
        );
    }

    #[test]
    fn parse_literal() {
        assert_eq!(
            SettingValue::parse("sk-12345"),
            SettingValue::Literal("sk-12345".to_string())
        );
    }

    #[test]
    fn bare_marker_is_literal() {
        // "@settings." with no path has nothing to point at.
        assert_eq!(
            SettingValue::parse("@settings."),
            SettingValue::Literal("@settings.".to_string())
        );
    }

    #[test]
    fn found_tracks_source() {
        assert!(Resolution::literal("x", Source::EnvFile).found());
        assert!(!Resolution::not_found().found());
        assert!(!Resolution::dangling("a.b").found());
    }
}
