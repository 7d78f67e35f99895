//! `webaclorch` subcommands.
//!
//! Each command opens the [`LocalBackend`] named by the configuration,
//! drives a [`WebAclOrch`] over it, and records the outcome in a resource
//! document (`{"id": ..., "attributes": {...}}`). The backend and the
//! resource document are written even when a lifecycle step fails, so a
//! re-run reconciles from whatever the last successful call left behind.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde_json::{json, Value};
use waf_api::WafAction;
use waf_orch_common::{Attributes, Resource, ResourceData, ResourceState};
use waf_types::ChangeAction;

use crate::config_file::WebAclOrchConfig;
use crate::error::{Result, WebAclError};
use crate::local::LocalBackend;
use crate::orch::WebAclOrch;
use crate::schema::{self, DEFAULT_ACTION};
use crate::translate::build_updates;

/// Reads a desired-attributes document (a JSON object).
pub fn read_desired(path: &Path) -> Result<Attributes> {
    let content = fs::read_to_string(path).map_err(|e| WebAclError::document(path, e))?;
    serde_json::from_str(&content).map_err(|e| WebAclError::document(path, e))
}

/// Reads a resource document; a missing file means no recorded resource.
pub fn read_resource(path: &Path) -> Result<Option<ResourceState>> {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| WebAclError::document(path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(WebAclError::document(path, e)),
    }
}

pub fn write_resource(path: &Path, state: &ResourceState) -> Result<()> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content).map_err(|e| WebAclError::document(path, e))
}

/// Describes the calls `apply` would make, without touching the backend.
pub fn plan(desired: Attributes, recorded: Option<ResourceState>) -> Result<Value> {
    let spec = schema::expand(&desired)?;
    let updates = build_updates(&spec.rules, ChangeAction::Insert);

    let plan = match recorded {
        Some(state) if state.id.is_some() => {
            let id = state.id.clone();
            let d = ResourceData::from_state(state, desired);
            let default_action = d
                .has_change(DEFAULT_ACTION)
                .then(|| WafAction::new(spec.default_action));
            json!({
                "operation": "update",
                "web_acl_id": id,
                "default_action": default_action,
                "updates": updates,
            })
        }
        _ => json!({
            "operation": "create",
            "name": spec.name,
            "metric_name": spec.metric_name.as_str(),
            "default_action": WafAction::new(spec.default_action),
            "updates": updates,
        }),
    };
    Ok(plan)
}

/// Creates or updates the Web ACL and records it in `resource`.
pub fn apply(
    config: &WebAclOrchConfig,
    desired: Attributes,
    resource: &Path,
) -> Result<ResourceState> {
    let backend = open_backend(config)?;
    let orch = WebAclOrch::from_config(backend.api(), config);

    let mut d = match read_resource(resource)? {
        Some(state) if state.id.is_some() => {
            // Refresh first so a Web ACL deleted out of band is recreated.
            let mut current = ResourceData::from_recorded(state);
            orch.read(&mut current)?;
            ResourceData::from_state(current.into_state(), desired)
        }
        _ => ResourceData::new(desired),
    };

    let result = orch.apply(&mut d);
    debug!("WebAclOrch stats: {:?}", orch.stats());

    // A create whose follow-up update failed still has an id to record.
    backend.save()?;
    let state = d.into_state();
    write_resource(resource, &state)?;
    result?;

    info!(
        "Applied {} ({})",
        orch.type_name(),
        state.id.as_deref().unwrap_or("-")
    );
    Ok(state)
}

/// Refreshes `resource` from the backend.
pub fn show(config: &WebAclOrchConfig, resource: &Path) -> Result<ResourceState> {
    let state = read_resource(resource)?.unwrap_or_default();
    let backend = open_backend(config)?;
    let orch = WebAclOrch::from_config(backend.api(), config);

    let mut d = ResourceData::from_recorded(state);
    orch.read(&mut d)?;

    let state = d.into_state();
    if state.id.is_none() {
        info!("{} is absent", orch.type_name());
    }
    write_resource(resource, &state)?;
    Ok(state)
}

/// Drains and deletes the Web ACL recorded in `resource`.
pub fn destroy(config: &WebAclOrchConfig, resource: &Path) -> Result<()> {
    let state = read_resource(resource)?.unwrap_or_default();
    let backend = open_backend(config)?;
    let orch = WebAclOrch::from_config(backend.api(), config);

    let mut d = ResourceData::from_recorded(state);
    orch.read(&mut d)?;
    if d.id().is_none() {
        info!("{} is already absent", orch.type_name());
        return write_resource(resource, &d.into_state());
    }

    let result = orch.delete(&mut d);
    backend.save()?;
    write_resource(resource, &d.into_state())?;
    result
}

fn open_backend(config: &WebAclOrchConfig) -> Result<LocalBackend> {
    LocalBackend::open(&config.backend.state_file, config.backend.scope.clone())
}
