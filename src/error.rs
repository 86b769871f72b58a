//! Error taxonomy for the settings engine.
//!
//! Absence is not an error: a key missing from every layer resolves to
//! `Resolution { source: Source::NotFound, .. }` and the caller decides
//! what that means. Everything here is a genuine failure.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    /// A reference chain revisited a path before reaching a literal.
    /// The chain lists every path walked, ending with the repeat.
    #[error("reference cycle detected: {}", chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },

    /// Backstop against runaway chains, independent of cycle detection.
    #[error("maximum reference depth ({depth}) exceeded while resolving '{path}'")]
    MaxDepthExceeded { depth: u32, path: String },

    #[error("error parsing YAML in '{}': {source}", path.display())]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("document root in '{}' must be a mapping", path.display())]
    DocumentRoot { path: PathBuf },

    #[error("invalid settings path '{path}'")]
    InvalidPath { path: String },

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// A mutation could not be durably applied in time. The in-memory
    /// snapshot was not swapped; the old state remains authoritative.
    #[error("write to '{}' timed out after {timeout:?}", path.display())]
    StorageTimeout { path: PathBuf, timeout: Duration },

    #[error("failed to persist '{}': {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_names_the_chain() {
        let err = SettingsError::CycleDetected {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "reference cycle detected: a -> b -> a");
    }
}
