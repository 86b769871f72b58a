//! Layered settings resolution for the Berth deployment platform.
//!
//! Six precedence-ordered source layers, three entity scopes, reference
//! indirection with cycle detection, and sensitivity-routed writes.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod resolve;
pub mod router;
pub mod store;
pub mod suggest;
pub mod types;

pub use engine::SettingsEngine;
pub use error::{Result, SettingsError};
pub use types::{Resolution, SettingValue, Source, Suggestion};
