//! Docker networks: recreated on change with --force

use super::{fetch, id_of, require_name};
use crate::cli::{NetworkArgs, Presence};
use declarative::{ApplyContext, Outcome, Reconciler, needs_update};
use portainer::fields::network as f;
use portainer::kinds::NETWORK;
use portainer::record::{overlay, without};
use portainer::{BodyFormat, Crud, Error, ItemId, Query, Record, Transport};
use serde_json::Value;

pub struct NetworkReconciler<'a> {
    crud: Crud<'a>,
    args: NetworkArgs,
}

impl<'a> NetworkReconciler<'a> {
    pub fn new(transport: &'a dyn Transport, args: NetworkArgs) -> Self {
        let crud = Crud::new(transport, NETWORK);
        crud.set_environment(args.environment_id);
        Self { crud, args }
    }

    fn desired(&self) -> Record {
        let args = &self.args;
        let mut record = Record::new();
        if let Some(name) = &args.name {
            record.insert(f::NAME.into(), Value::from(name.as_str()));
        }
        record.insert(f::DRIVER.into(), Value::from(args.driver.as_str()));
        let optional = [
            (f::INTERNAL, args.internal.map(Value::from)),
            (f::ATTACHABLE, args.attachable.map(Value::from)),
            (f::SCOPE, args.scope.map(|s| Value::from(s.as_str()))),
            (f::INGRESS, args.ingress.map(Value::from)),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                record.insert(key.into(), value);
            }
        }
        record
    }

    fn create(&self, ctx: &ApplyContext, desired: Record) -> Result<Record, Error> {
        if !ctx.should_mutate() {
            return Ok(desired);
        }
        let name = require_name(self.args.name.as_deref(), "network")?;
        let created = self.crud.create(
            name,
            without(&desired, &[f::NAME]),
            BodyFormat::Json,
            &Query::new(),
        )?;
        Ok(overlay(&desired, &created))
    }
}

impl Reconciler for NetworkReconciler<'_> {
    type Error = Error;

    fn resource_key(&self) -> &'static str {
        "network"
    }

    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        let current = fetch(
            &self.crud,
            self.args.id.clone().map(ItemId::from),
            self.args.name.as_deref(),
        )?;

        if self.args.state == Presence::Absent {
            let Some(network) = current else {
                return Ok(Outcome::unchanged("Network does not exists"));
            };
            if ctx.should_mutate() {
                self.crud
                    .delete_by_id(&id_of(&self.crud, &network)?, &Query::new())?;
            }
            return Ok(Outcome::changed("Network deleted")
                .with_before(network.clone())
                .with_after(network));
        }

        let desired = self.desired();
        let Some(network) = current else {
            let after = self.create(ctx, desired)?;
            return Ok(Outcome::changed("Network created.").with_after(after));
        };

        let changes = needs_update(&network, &desired, &[]);
        if changes.is_empty() {
            return Ok(Outcome::unchanged("Network already exists.")
                .with_before(network.clone())
                .with_after(network));
        }

        if !self.args.force {
            return Ok(Outcome::unchanged("Network already exists. Update skipped.")
                .with_before(network.clone())
                .with_after(network)
                .warn(
                    "The content of the network was not updated. In order to recreate the network use force: true.",
                ));
        }

        log::info!("Recreating network to apply: {}", changes.summary());
        if ctx.should_mutate() {
            self.crud
                .delete_by_id(&id_of(&self.crud, &network)?, &Query::new())?;
        }
        let after = self.create(ctx, desired)?;
        Ok(Outcome::changed("Network updated.")
            .with_before(network)
            .with_after(after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{NetworkDriver, NetworkScope};
    use declarative::execute;
    use portainer::transport::{MockResponse, MockTransport};
    use serde_json::json;

    fn overlay_args(force: bool) -> NetworkArgs {
        NetworkArgs {
            environment_id: 1,
            name: Some("backend".into()),
            driver: NetworkDriver::Overlay,
            scope: Some(NetworkScope::Swarm),
            attachable: Some(true),
            force,
            ..Default::default()
        }
    }

    #[test]
    fn test_create() {
        let mock = MockTransport::new();
        mock.on("GET /endpoints/1/docker/networks", json!([]));
        mock.on("POST /endpoints/1/docker/networks/create", json!({"Id": "n1"}));

        let report = execute(
            &mut NetworkReconciler::new(&mock, overlay_args(false)),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Network created.");
        assert_eq!(report.resource["Id"], json!("n1"));
        let sent = mock.calls_to("POST /endpoints/1/docker/networks/create")[0]
            .body
            .to_value();
        assert_eq!(
            sent,
            Some(json!({
                "Name": "backend", "Driver": "overlay", "Attachable": true, "Scope": "swarm"
            }))
        );
    }

    #[test]
    fn test_matching_network_unchanged() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoints/1/docker/networks",
            json!([{
                "Id": "n1", "Name": "backend", "Driver": "overlay", "Scope": "swarm",
                "Attachable": true, "Internal": false
            }]),
        );

        let report = execute(
            &mut NetworkReconciler::new(&mock, overlay_args(false)),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(!report.changed);
        assert_eq!(report.message, "Network already exists.");
    }

    #[test]
    fn test_drift_without_force_is_skipped() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoints/1/docker/networks",
            json!([{"Id": "n1", "Name": "backend", "Driver": "bridge", "Scope": "local"}]),
        );

        let report = execute(
            &mut NetworkReconciler::new(&mock, overlay_args(false)),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(!report.changed);
        assert_eq!(report.message, "Network already exists. Update skipped.");
        assert_eq!(report.warnings.len(), 1);
        assert!(mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_drift_with_force_recreates() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoints/1/docker/networks",
            json!([{"Id": "n1", "Name": "backend", "Driver": "bridge", "Scope": "local"}]),
        );
        mock.on("DELETE /endpoints/1/docker/networks/n1", MockResponse::Empty);
        mock.on("POST /endpoints/1/docker/networks/create", json!({"Id": "n2"}));

        let report = execute(
            &mut NetworkReconciler::new(&mock, overlay_args(true)),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Network updated.");
        assert_eq!(report.resource["Id"], json!("n2"));
    }

    #[test]
    fn test_delete_by_id() {
        let mock = MockTransport::new();
        mock.on("GET /endpoints/1/docker/networks/n1", json!({"Id": "n1", "Name": "backend"}));
        mock.on("DELETE /endpoints/1/docker/networks/n1", MockResponse::Empty);

        let args = NetworkArgs {
            environment_id: 1,
            id: Some("n1".into()),
            state: Presence::Absent,
            ..Default::default()
        };
        let report = execute(
            &mut NetworkReconciler::new(&mock, args),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Network deleted");
    }
}
