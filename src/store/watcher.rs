//! File watcher for the settings directory.
//!
//! Emits typed change events through a tokio watch channel when layer
//! documents change on disk, with debouncing to coalesce rapid writes.
//! Consumers decide what to do with an event; the engine's reload keeps
//! the last-known-good snapshot when a changed document fails to parse.

use super::loader::{
    CONFIG_FILE, ENV_FILE, INSTANCES_FILE, OVERRIDES_FILE, SECRETS_FILE, SettingsPaths,
};
use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Change events for the settings directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsChangeEvent {
    /// One of the layer documents changed.
    Document(PathBuf),
    /// The flat `.env` namespace changed.
    EnvFile(PathBuf),
    /// Several files changed in quick succession.
    Batch(Vec<PathBuf>),
    /// Watcher error.
    Error(String),
}

impl SettingsChangeEvent {
    pub fn requires_reload(&self) -> bool {
        !matches!(self, SettingsChangeEvent::Error(_))
    }
}

/// Watcher tuning.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce window for coalescing rapid changes.
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

/// Handle to the running watcher. Dropping it stops the watcher.
pub struct SettingsWatcherHandle {
    pub events: watch::Receiver<Option<SettingsChangeEvent>>,
    _task: tokio::task::JoinHandle<()>,
}

impl SettingsWatcherHandle {
    /// Wait for the next change event. `None` means the watcher stopped.
    pub async fn wait_for_change(&mut self) -> Option<SettingsChangeEvent> {
        loop {
            if self.events.changed().await.is_err() {
                return None;
            }
            let event = self.events.borrow().clone();
            if event.is_some() {
                return event;
            }
        }
    }
}

/// Start watching the settings directory.
pub fn start_settings_watcher(
    paths: &SettingsPaths,
    config: WatcherConfig,
) -> Result<SettingsWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce, notify_tx)?;
    if paths.dir.exists() {
        info!("watching settings directory: {}", paths.dir.display());
        debouncer
            .watcher()
            .watch(&paths.dir, notify::RecursiveMode::NonRecursive)?;
    } else {
        warn!(
            "settings directory does not exist, nothing to watch: {}",
            paths.dir.display()
        );
    }

    let task = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive for the task's lifetime.
        let _debouncer = debouncer;
        pump_events(notify_rx, event_tx);
    });

    Ok(SettingsWatcherHandle {
        events: event_rx,
        _task: task,
    })
}

fn pump_events(
    rx: mpsc::Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<SettingsChangeEvent>>,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .into_iter()
                    .filter(|event| {
                        matches!(
                            event.kind,
                            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                        )
                    })
                    .map(|event| event.path)
                    .filter(|path| is_watched_file(path))
                    .collect();
                if let Some(event) = coalesce(changed) {
                    debug!("settings change detected: {:?}", event);
                    if tx.send(Some(event)).is_err() {
                        info!("settings watcher receiver dropped, stopping");
                        return;
                    }
                }
            }
            Ok(Err(err)) => {
                error!("settings watcher error: {}", err);
                let _ = tx.send(Some(SettingsChangeEvent::Error(err.to_string())));
            }
            Err(_) => {
                info!("settings watcher channel closed, stopping");
                return;
            }
        }
    }
}

fn coalesce(mut changed: Vec<PathBuf>) -> Option<SettingsChangeEvent> {
    changed.sort();
    changed.dedup();
    match changed.len() {
        0 => None,
        1 => {
            let path = changed.remove(0);
            Some(classify_path(path))
        }
        _ => Some(SettingsChangeEvent::Batch(changed)),
    }
}

fn is_watched_file(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|name| name.to_str()),
        Some(CONFIG_FILE) | Some(SECRETS_FILE) | Some(OVERRIDES_FILE) | Some(INSTANCES_FILE)
            | Some(ENV_FILE)
    )
}

fn classify_path(path: PathBuf) -> SettingsChangeEvent {
    if path.file_name().and_then(|name| name.to_str()) == Some(ENV_FILE) {
        SettingsChangeEvent::EnvFile(path)
    } else {
        SettingsChangeEvent::Document(path)
    }
}
