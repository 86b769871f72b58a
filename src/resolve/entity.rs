//! Per-scope entity resolution.
//!
//! Each scope searches its visible layers highest-precedence first and
//! stops at the first hit; this is a selection per key, never a merge.
//! Every hit passes through the reference resolver, so the returned map
//! holds only literals or not-found markers.

use super::reference::resolve_value;
use crate::catalog::{CapabilityLookup, ServiceCatalog};
use crate::error::Result;
use crate::store::Snapshot;
use crate::types::{Resolution, SettingValue, Source};
use std::collections::BTreeMap;
use tracing::debug;

/// Resolve the env map a service template sees.
///
/// Layers searched: capability wiring, the `.env` file, compose-declared
/// defaults, then the shipped per-service binding. Deploy and instance
/// overrides are invisible at this scope.
pub fn for_service(
    snapshot: &Snapshot,
    catalog: &dyn ServiceCatalog,
    capability: &dyn CapabilityLookup,
    service_id: &str,
) -> Result<BTreeMap<String, Resolution>> {
    resolve_scope(snapshot, catalog, capability, service_id, false, None)
}

/// Resolve the env map for a deploy-target preview: the template's
/// layers plus service-level overrides.
pub fn for_deploy_config(
    snapshot: &Snapshot,
    catalog: &dyn ServiceCatalog,
    capability: &dyn CapabilityLookup,
    deploy_target: &str,
    service_id: &str,
) -> Result<BTreeMap<String, Resolution>> {
    debug!(deploy_target, service_id, "resolving deploy-target preview");
    resolve_scope(snapshot, catalog, capability, service_id, true, None)
}

/// Resolve the env map a running deployment sees: all six layers, with
/// the instance override on top.
///
/// `deployment_id` is conventionally `service_id:instance_name`; an id
/// without a separator is treated as a bare service id.
pub fn for_deployment(
    snapshot: &Snapshot,
    catalog: &dyn ServiceCatalog,
    capability: &dyn CapabilityLookup,
    deployment_id: &str,
) -> Result<BTreeMap<String, Resolution>> {
    let service_id = deployment_id
        .split_once(':')
        .map(|(service, _)| service)
        .unwrap_or(deployment_id);
    resolve_scope(
        snapshot,
        catalog,
        capability,
        service_id,
        true,
        Some(deployment_id),
    )
}

fn resolve_scope(
    snapshot: &Snapshot,
    catalog: &dyn ServiceCatalog,
    capability: &dyn CapabilityLookup,
    service_id: &str,
    include_deploy_env: bool,
    deployment_id: Option<&str>,
) -> Result<BTreeMap<String, Resolution>> {
    let defaults = catalog.declared_defaults(service_id);
    let mut resolved = BTreeMap::new();
    for var in catalog.required_env(service_id) {
        let hit = first_hit(
            snapshot,
            capability,
            &defaults,
            service_id,
            include_deploy_env,
            deployment_id,
            &var,
        );
        let resolution = match hit {
            Some((value, source)) => resolve_value(&value, source, snapshot)?,
            None => Resolution::not_found(),
        };
        resolved.insert(var, resolution);
    }
    Ok(resolved)
}

fn first_hit(
    snapshot: &Snapshot,
    capability: &dyn CapabilityLookup,
    defaults: &BTreeMap<String, String>,
    service_id: &str,
    include_deploy_env: bool,
    deployment_id: Option<&str>,
    var: &str,
) -> Option<(SettingValue, Source)> {
    if let Some(deployment_id) = deployment_id
        && let Some(value) = snapshot.instance_override(deployment_id, var)
    {
        return Some((value.clone(), Source::UserOverride));
    }
    if include_deploy_env
        && let Some(value) = snapshot.service_override(service_id, var)
    {
        return Some((value.clone(), Source::DeployEnv));
    }
    if let Some(raw) = capability.get(var) {
        return Some((SettingValue::parse(&raw), Source::Capability));
    }
    if let Some(value) = snapshot.env_file_value(var) {
        return Some((value, Source::EnvFile));
    }
    if let Some(raw) = defaults.get(var) {
        return Some((SettingValue::parse(raw), Source::ComposeDefault));
    }
    if let Some(value) = snapshot.template_binding(service_id, var) {
        return Some((value.clone(), Source::ConfigDefault));
    }
    None
}
