//! Docker-proxied kinds: normalization and the swarm descriptor.
//!
//! Networks, configs and secrets are plain [`Crud`] handles over a proxied
//! [`ResourceKind`](crate::kinds::ResourceKind); only the projections of the
//! Docker `Spec` object live here.

use crate::crud::Crud;
use crate::error::Result;
use crate::fields;
use crate::kinds::SWARM;
use crate::record::{Record, get_nested};
use crate::transport::{Request, Transport};
use serde_json::Value;

/// Project `Spec.Name` to `Name` when `Name` is absent.
pub fn project_spec_name(record: &mut Record) {
    if record.contains_key(fields::swarm::NAME) {
        return;
    }
    if let Some(name) = get_nested(record, fields::swarm::SPEC_NAME).cloned() {
        record.insert(fields::swarm::NAME.to_string(), name);
    }
}

/// Swarm descriptors always take their name from `Spec.Name`.
pub fn project_swarm_name(record: &mut Record) {
    let name = get_nested(record, fields::swarm::SPEC_NAME)
        .cloned()
        .unwrap_or(Value::Null);
    record.insert(fields::swarm::NAME.to_string(), name);
}

/// Configs also expose `Spec.Data` as `Data` so stored content compares
/// against the desired payload.
pub fn project_config_spec(record: &mut Record) {
    project_spec_name(record);
    if record.contains_key(fields::config::DATA) {
        return;
    }
    if let Some(data) = get_nested(record, fields::swarm::SPEC_DATA).cloned() {
        record.insert(fields::config::DATA.to_string(), data);
    }
}

/// Read-only access to the swarm descriptor of an environment.
pub struct Swarm<'a> {
    crud: Crud<'a>,
}

impl<'a> Swarm<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            crud: Crud::new(transport, SWARM),
        }
    }

    /// GET `/endpoints/{id}/docker/swarm` and normalize.
    pub fn inspect(&self, environment_id: i64) -> Result<Record> {
        let scoped = self.crud.using_environment(environment_id);
        let path = scoped.base_path()?;
        log::debug!("Inspecting swarm of environment {}", environment_id);
        let value = scoped.transport().request(&Request::get(path))?;
        scoped.normalize(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_project_spec_name() {
        let mut network = record(json!({"Id": "n1", "Spec": {"Name": "from-spec"}}));
        project_spec_name(&mut network);
        assert_eq!(network["Name"], json!("from-spec"));

        let mut named = record(json!({"Name": "kept", "Spec": {"Name": "ignored"}}));
        project_spec_name(&mut named);
        assert_eq!(named["Name"], json!("kept"));
    }

    #[test]
    fn test_project_swarm_name_overrides() {
        let mut swarm = record(json!({"ID": "s1", "Name": "stale", "Spec": {"Name": "default"}}));
        project_swarm_name(&mut swarm);
        assert_eq!(swarm["Name"], json!("default"));
    }

    #[test]
    fn test_project_config_spec() {
        let mut config = record(json!({"ID": "c1", "Spec": {"Name": "app", "Data": "eA=="}}));
        project_config_spec(&mut config);
        assert_eq!(config["Name"], json!("app"));
        assert_eq!(config["Data"], json!("eA=="));
    }

    #[test]
    fn test_swarm_inspect_uses_scoped_environment() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoints/3/docker/swarm",
            json!({"ID": "abc", "Spec": {"Name": "default"}}),
        );

        let swarm = Swarm::new(&mock).inspect(3).unwrap();
        assert_eq!(swarm["ID"], json!("abc"));
        assert_eq!(swarm["Name"], json!("default"));
    }
}
