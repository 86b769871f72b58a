//! Engine façade: snapshot handle, mutations, reload.
//!
//! One `SettingsEngine` is constructed at startup and passed by
//! reference to every consumer. Readers resolve against an atomically
//! swapped snapshot without locking; writers serialize per mutable
//! document and only swap the snapshot after the document is durably on
//! disk, so a failed or timed-out write leaves the old state
//! authoritative.

use crate::catalog::{CapabilityLookup, ServiceCatalog};
use crate::error::{Result, SettingsError};
use crate::resolve::{entity, reference};
use crate::router::{self, WriteTarget};
use crate::store::loader::SettingsPaths;
use crate::store::merge::{deep_merge, path_overlay, remove_path};
use crate::store::Snapshot;
use crate::suggest;
use crate::types::{Resolution, Source, Suggestion};
use arc_swap::ArcSwap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default bound on a single document write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SettingsEngine {
    paths: SettingsPaths,
    snapshot: ArcSwap<Snapshot>,
    catalog: Arc<dyn ServiceCatalog>,
    capability: Arc<dyn CapabilityLookup>,
    secrets_lock: Mutex<()>,
    overrides_lock: Mutex<()>,
    write_timeout: Duration,
}

impl SettingsEngine {
    /// Load all documents under `paths` and construct the engine.
    pub fn load(
        paths: SettingsPaths,
        catalog: Arc<dyn ServiceCatalog>,
        capability: Arc<dyn CapabilityLookup>,
    ) -> Result<Self> {
        let snapshot = Snapshot::load(&paths)?;
        info!(dir = %paths.dir.display(), "settings snapshot loaded");
        Ok(Self {
            paths,
            snapshot: ArcSwap::from_pointee(snapshot),
            catalog,
            capability,
            secrets_lock: Mutex::new(()),
            overrides_lock: Mutex::new(()),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        })
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Current snapshot. Resolutions against it are mutually consistent.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    // --- entity resolution surface ---

    pub fn for_service(&self, service_id: &str) -> Result<BTreeMap<String, Resolution>> {
        let snapshot = self.snapshot();
        entity::for_service(
            snapshot.as_ref(),
            self.catalog.as_ref(),
            self.capability.as_ref(),
            service_id,
        )
    }

    pub fn for_deploy_config(
        &self,
        deploy_target: &str,
        service_id: &str,
    ) -> Result<BTreeMap<String, Resolution>> {
        let snapshot = self.snapshot();
        entity::for_deploy_config(
            snapshot.as_ref(),
            self.catalog.as_ref(),
            self.capability.as_ref(),
            deploy_target,
            service_id,
        )
    }

    pub fn for_deployment(&self, deployment_id: &str) -> Result<BTreeMap<String, Resolution>> {
        let snapshot = self.snapshot();
        entity::for_deployment(
            snapshot.as_ref(),
            self.catalog.as_ref(),
            self.capability.as_ref(),
            deployment_id,
        )
    }

    pub fn get_suggestions(&self, env_var: &str) -> Vec<Suggestion> {
        let snapshot = self.snapshot();
        suggest::get_suggestions(snapshot.as_ref(), self.capability.as_ref(), env_var)
    }

    // --- mutation router surface ---

    /// Literal lookup by path across the general namespace, for
    /// bootstrap reads. References are chased; a missing path yields
    /// `default`; a cyclic chain is an error, never the default.
    pub fn get_sync(&self, path: &str, default: Option<&str>) -> Result<Option<String>> {
        let snapshot = self.snapshot();
        match snapshot.namespace_get(path) {
            None => Ok(default.map(str::to_string)),
            Some(value) => {
                let resolution =
                    reference::resolve_value(value, Source::ConfigDefault, snapshot.as_ref())?;
                Ok(resolution.value.or_else(|| default.map(str::to_string)))
            }
        }
    }

    /// Async shim over [`Self::get_sync`] for callers already in the
    /// engine's async surface.
    pub async fn get(&self, path: &str, default: Option<&str>) -> Result<Option<String>> {
        self.get_sync(path, default)
    }

    /// Write a value, routing by sensitivity. Sibling keys in the target
    /// document survive; the write is atomic on disk.
    pub async fn set(&self, path: &str, value: &str) -> Result<()> {
        validate_path(path)?;
        let target = router::classify(path);
        let lock = self.lock_for(target);
        let file = self.file_for(target);
        let _guard = lock.lock().await;
        let current = self.current_doc(target);
        let updated = deep_merge(current, path_overlay(path, value));
        self.persist(&file, &updated).await?;
        self.swap_doc(target, updated);
        info!(path, target = ?target, "setting written");
        Ok(())
    }

    /// Remove a leaf from whichever mutable store holds it, sensitive
    /// store first. Shipped defaults are never touched. Returns whether
    /// a key was actually removed.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        validate_path(path)?;
        for target in [WriteTarget::Sensitive, WriteTarget::General] {
            let lock = self.lock_for(target);
            let file = self.file_for(target);
            let _guard = lock.lock().await;
            let mut doc = self.current_doc(target);
            if remove_path(&mut doc, path) {
                self.persist(&file, &doc).await?;
                self.swap_doc(target, doc);
                info!(path, target = ?target, "setting deleted");
                return Ok(true);
            }
        }
        debug!(path, "delete found nothing to remove");
        Ok(false)
    }

    /// Rebuild the snapshot from disk and swap it in. On failure the
    /// previous snapshot stays authoritative.
    pub fn reload(&self) -> Result<()> {
        let fresh = Snapshot::load(&self.paths)?;
        self.snapshot.store(Arc::new(fresh));
        info!("settings snapshot reloaded");
        Ok(())
    }

    fn lock_for(&self, target: WriteTarget) -> &Mutex<()> {
        match target {
            WriteTarget::Sensitive => &self.secrets_lock,
            WriteTarget::General => &self.overrides_lock,
        }
    }

    fn file_for(&self, target: WriteTarget) -> PathBuf {
        match target {
            WriteTarget::Sensitive => self.paths.secrets_file(),
            WriteTarget::General => self.paths.overrides_file(),
        }
    }

    fn current_doc(&self, target: WriteTarget) -> Value {
        let snapshot = self.snapshot.load();
        match target {
            WriteTarget::Sensitive => snapshot.docs().secrets.clone(),
            WriteTarget::General => snapshot.docs().overrides.clone(),
        }
    }

    /// Swap the snapshot with the updated document folded in. `rcu`
    /// keeps a concurrent writer to the other document from being lost.
    fn swap_doc(&self, target: WriteTarget, doc: Value) {
        self.snapshot.rcu(|snapshot| match target {
            WriteTarget::Sensitive => snapshot.with_secrets(doc.clone()),
            WriteTarget::General => snapshot.with_overrides(doc.clone()),
        });
    }

    async fn persist(&self, file: &Path, doc: &Value) -> Result<()> {
        let text = serde_yaml::to_string(doc).map_err(|source| SettingsError::YamlParse {
            path: file.to_path_buf(),
            source,
        })?;
        let target = file.to_path_buf();
        let write = tokio::task::spawn_blocking(move || write_atomic(&target, &text));
        match tokio::time::timeout(self.write_timeout, write).await {
            Err(_) => Err(SettingsError::StorageTimeout {
                path: file.to_path_buf(),
                timeout: self.write_timeout,
            }),
            Ok(Err(join_err)) => Err(SettingsError::StorageWrite {
                path: file.to_path_buf(),
                source: std::io::Error::other(join_err),
            }),
            Ok(Ok(result)) => result,
        }
    }
}

fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() || path.split('.').any(|segment| segment.is_empty()) {
        return Err(SettingsError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Write-to-temp-then-rename so a crash mid-write cannot corrupt the
/// document.
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let storage_err = |source| SettingsError::StorageWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(storage_err)?;
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, text).map_err(storage_err)?;
    std::fs::rename(&tmp, path).map_err(storage_err)?;
    Ok(())
}
