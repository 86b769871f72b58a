//! Reference and entity resolution.

pub mod entity;
pub mod reference;

pub use entity::{for_deploy_config, for_deployment, for_service};
pub use reference::{MAX_REFERENCE_DEPTH, follow_reference, resolve_value};
