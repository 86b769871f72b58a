//! Source stores: persisted documents, deep merging, snapshots, and the
//! settings-directory watcher.
//!
//! Six precedence-ordered layers back the resolver. Four are persisted
//! YAML documents plus a flat `.env` file in one settings directory; the
//! capability layer is injected as a trait. Documents are loaded into an
//! immutable [`Snapshot`] that readers share and mutations replace.

pub mod loader;
pub mod merge;
pub mod snapshot;
pub mod tree;
pub mod watcher;

pub use loader::{LayerDocs, SettingsPaths};
pub use merge::{deep_merge, deep_merge_all};
pub use snapshot::Snapshot;
pub use tree::Node;
