//! Reference chain resolution.
//!
//! Any layer may hold `@settings.<path>` indirections. Chasing one walks
//! the merged settings namespace until the chain terminates in a literal
//! or falls off the namespace. A revisited path is a hard error carrying
//! the full chain; a depth limit backstops pathological non-repeating
//! chains.

use crate::error::{Result, SettingsError};
use crate::store::Snapshot;
use crate::types::{Resolution, SettingValue, Source};
use std::collections::HashSet;

pub const MAX_REFERENCE_DEPTH: u32 = 32;

/// Resolve a layer value into its final form.
///
/// Literals pass through tagged with their originating layer. Reference
/// terminals are attributed to the settings namespace (`ConfigDefault`)
/// and carry the terminal path.
pub fn resolve_value(
    value: &SettingValue,
    origin: Source,
    snapshot: &Snapshot,
) -> Result<Resolution> {
    match value {
        SettingValue::Literal(text) => Ok(Resolution::literal(text.clone(), origin)),
        SettingValue::Reference(path) => follow_reference(path, snapshot),
    }
}

/// Chase a reference chain starting at `path`.
pub fn follow_reference(path: &str, snapshot: &Snapshot) -> Result<Resolution> {
    let mut chain: Vec<String> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = path.to_string();

    loop {
        if !visited.insert(current.clone()) {
            chain.push(current);
            return Err(SettingsError::CycleDetected { chain });
        }
        chain.push(current.clone());
        if chain.len() as u32 > MAX_REFERENCE_DEPTH {
            return Err(SettingsError::MaxDepthExceeded {
                depth: MAX_REFERENCE_DEPTH,
                path: path.to_string(),
            });
        }
        match snapshot.namespace_get(&current) {
            None => return Ok(Resolution::dangling(current)),
            Some(SettingValue::Literal(text)) => {
                return Ok(Resolution::via_reference(
                    text.clone(),
                    Source::ConfigDefault,
                    current,
                ));
            }
            Some(SettingValue::Reference(next)) => current = next.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LayerDocs;
    use serde_json::json;

    fn snapshot(config: serde_json::Value) -> Snapshot {
        Snapshot::from_docs(LayerDocs {
            config,
            ..LayerDocs::default()
        })
    }

    #[test]
    fn literal_keeps_its_origin() {
        let snap = snapshot(json!({}));
        let resolution = resolve_value(
            &SettingValue::Literal("8080".into()),
            Source::EnvFile,
            &snap,
        )
        .unwrap();
        assert_eq!(resolution, Resolution::literal("8080", Source::EnvFile));
    }

    #[test]
    fn reference_reports_terminal_path() {
        let snap = snapshot(json!({"api_keys": {"openai": "sk-1"}}));
        let resolution = resolve_value(
            &SettingValue::Reference("api_keys.openai".into()),
            Source::DeployEnv,
            &snap,
        )
        .unwrap();
        assert_eq!(
            resolution,
            Resolution::via_reference("sk-1", Source::ConfigDefault, "api_keys.openai")
        );
    }

    #[test]
    fn chains_resolve_to_the_last_hop() {
        let snap = snapshot(json!({
            "alias": "@settings.api_keys.openai",
            "api_keys": {"openai": "sk-1"},
        }));
        let resolution = follow_reference("alias", &snap).unwrap();
        assert_eq!(
            resolution,
            Resolution::via_reference("sk-1", Source::ConfigDefault, "api_keys.openai")
        );
    }

    #[test]
    fn dangling_reference_is_not_found() {
        let snap = snapshot(json!({}));
        let resolution = follow_reference("nowhere.at_all", &snap).unwrap();
        assert_eq!(resolution, Resolution::dangling("nowhere.at_all"));
        assert!(!resolution.found());
    }

    #[test]
    fn two_step_cycle_fails_with_the_chain() {
        let snap = snapshot(json!({
            "a": "@settings.b",
            "b": "@settings.a",
        }));
        let err = follow_reference("a", &snap).unwrap_err();
        match err {
            SettingsError::CycleDetected { chain } => {
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_cycle_fails() {
        let snap = snapshot(json!({"loop": "@settings.loop"}));
        assert!(matches!(
            follow_reference("loop", &snap),
            Err(SettingsError::CycleDetected { .. })
        ));
    }

    #[test]
    fn depth_limit_backstops_long_chains() {
        let mut config = serde_json::Map::new();
        for i in 0..40 {
            config.insert(format!("p{}", i), json!(format!("@settings.p{}", i + 1)));
        }
        let snap = snapshot(serde_json::Value::Object(config));
        assert!(matches!(
            follow_reference("p0", &snap),
            Err(SettingsError::MaxDepthExceeded { .. })
        ));
    }
}
