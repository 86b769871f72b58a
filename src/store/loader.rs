//! Settings directory discovery and document loading.
//!
//! All persisted layers live in one settings directory. Missing files
//! load as empty documents; malformed files fail the whole load, so a
//! snapshot is either complete or not built at all.

use crate::error::{Result, SettingsError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Shipped defaults, read-only at runtime. Root of the settings namespace.
pub const CONFIG_FILE: &str = "config.yaml";
/// Write target for sensitivity-classified values.
pub const SECRETS_FILE: &str = "secrets.yaml";
/// Service-level overrides (`services` map).
pub const OVERRIDES_FILE: &str = "overrides.yaml";
/// Deployment-instance overrides (`instances` map).
pub const INSTANCES_FILE: &str = "instances.yaml";
/// Flat `KEY=value` namespace.
pub const ENV_FILE: &str = ".env";

/// Location of the settings documents.
#[derive(Debug, Clone)]
pub struct SettingsPaths {
    pub dir: PathBuf,
}

impl SettingsPaths {
    /// Discover the settings directory.
    ///
    /// `BERTH_CONFIG_DIR` wins; otherwise `./berth` when it exists,
    /// falling back to `~/.berth`.
    pub fn discover() -> Self {
        if let Ok(dir) = std::env::var("BERTH_CONFIG_DIR") {
            return Self {
                dir: PathBuf::from(dir),
            };
        }
        let local = PathBuf::from("berth");
        if local.exists() {
            return Self { dir: local };
        }
        let dir = dirs::home_dir()
            .map(|home| home.join(".berth"))
            .unwrap_or(local);
        Self { dir }
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn secrets_file(&self) -> PathBuf {
        self.dir.join(SECRETS_FILE)
    }

    pub fn overrides_file(&self) -> PathBuf {
        self.dir.join(OVERRIDES_FILE)
    }

    pub fn instances_file(&self) -> PathBuf {
        self.dir.join(INSTANCES_FILE)
    }

    pub fn env_file(&self) -> PathBuf {
        self.dir.join(ENV_FILE)
    }
}

/// Raw layer documents as loaded from disk.
#[derive(Debug, Clone)]
pub struct LayerDocs {
    pub config: Value,
    pub secrets: Value,
    pub overrides: Value,
    pub instances: Value,
    pub env_file: BTreeMap<String, String>,
}

impl Default for LayerDocs {
    fn default() -> Self {
        Self {
            config: empty_document(),
            secrets: empty_document(),
            overrides: empty_document(),
            instances: empty_document(),
            env_file: BTreeMap::new(),
        }
    }
}

impl LayerDocs {
    /// Load every document under `paths`, strictly.
    pub fn load(paths: &SettingsPaths) -> Result<Self> {
        Ok(Self {
            config: load_document(&paths.config_file())?,
            secrets: load_document(&paths.secrets_file())?,
            overrides: load_document(&paths.overrides_file())?,
            instances: load_document(&paths.instances_file())?,
            env_file: load_env_file(&paths.env_file())?,
        })
    }
}

pub(crate) fn empty_document() -> Value {
    Value::Object(serde_json::Map::new())
}

fn load_document(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!("document absent, treating as empty: {}", path.display());
        return Ok(empty_document());
    }
    let content = std::fs::read_to_string(path)?;
    let value: Value =
        serde_yaml::from_str(&content).map_err(|source| SettingsError::YamlParse {
            path: path.to_path_buf(),
            source,
        })?;
    match value {
        Value::Null => Ok(empty_document()),
        Value::Object(_) => Ok(value),
        _ => Err(SettingsError::DocumentRoot {
            path: path.to_path_buf(),
        }),
    }
}

/// Parse a flat `KEY=value` env file.
///
/// Blank lines and `#` comments are skipped; `export ` prefixes and
/// matching single or double quotes around the value are stripped.
fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content = std::fs::read_to_string(path)?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
