//! Candidate-path suggestions for binding an env var.
//!
//! Helps a human (or the UI) populate an override by pointing at an
//! existing settings path whose name plausibly matches the env var.
//! Exact normalized matches sort before substring matches, each group
//! alphabetical by path, so the output is deterministic.

use crate::catalog::CapabilityLookup;
use crate::resolve::reference::resolve_value;
use crate::store::Snapshot;
use crate::types::{SettingValue, Source, Suggestion};
use heck::{ToSnakeCase, ToTitleCase};
use std::collections::BTreeSet;

/// Scan the config defaults and capability wiring for paths matching
/// `env_var`. Never fails; an unmatched name yields an empty list.
pub fn get_suggestions(
    snapshot: &Snapshot,
    capability: &dyn CapabilityLookup,
    env_var: &str,
) -> Vec<Suggestion> {
    let needle = env_var.to_snake_case();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut exact: Vec<Suggestion> = Vec::new();
    let mut partial: Vec<Suggestion> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for (path, value) in snapshot.config_leaf_paths() {
        let Some(kind) = match_kind(&needle, &path) else {
            continue;
        };
        if !seen.insert(path.clone()) {
            continue;
        }
        let suggestion = Suggestion {
            label: label_for(&path),
            has_value: resolves_to_value(snapshot, value),
            path,
        };
        match kind {
            MatchKind::Exact => exact.push(suggestion),
            MatchKind::Partial => partial.push(suggestion),
        }
    }

    for key in capability.keys() {
        let Some(kind) = match_kind(&needle, &key) else {
            continue;
        };
        if !seen.insert(key.clone()) {
            continue;
        }
        let suggestion = Suggestion {
            label: label_for(&key),
            has_value: capability.get(&key).is_some_and(|value| !value.is_empty()),
            path: key,
        };
        match kind {
            MatchKind::Exact => exact.push(suggestion),
            MatchKind::Partial => partial.push(suggestion),
        }
    }

    exact.sort_by(|a, b| a.path.cmp(&b.path));
    partial.sort_by(|a, b| a.path.cmp(&b.path));
    exact.extend(partial);
    exact
}

enum MatchKind {
    Exact,
    Partial,
}

fn match_kind(needle: &str, path: &str) -> Option<MatchKind> {
    let candidate = path.rsplit('.').next().unwrap_or(path).to_snake_case();
    if candidate == *needle {
        Some(MatchKind::Exact)
    } else if candidate.contains(needle) || needle.contains(candidate.as_str()) {
        Some(MatchKind::Partial)
    } else {
        None
    }
}

fn label_for(path: &str) -> String {
    path.split('.')
        .map(|segment| segment.to_title_case())
        .collect::<Vec<_>>()
        .join(" / ")
}

fn resolves_to_value(snapshot: &Snapshot, value: &SettingValue) -> bool {
    resolve_value(value, Source::ConfigDefault, snapshot)
        .ok()
        .and_then(|resolution| resolution.value)
        .is_some_and(|value| !value.is_empty())
}
