//! Environments: lifecycle, group/tag membership and heartbeat waits

use super::{on_missing, refs_value, require_name, resolve_refs};
use crate::cli::{EnvironmentArgs, EnvironmentState};
use declarative::{ApplyContext, Outcome, Reconciler, needs_update};
use portainer::fields::environment as f;
use portainer::kinds::{GROUP, TAG};
use portainer::record::{drop_nulls, overlay, restrict, without};
use portainer::{Crud, Environments, Error, Record, Resolved, Transport};
use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};

/// Only sent on creation.
const CREATE_ONLY: [&str; 2] = [f::CREATION_TYPE, f::EDGE_TUNNEL_SERVER_ADDRESS];

/// Ignored until an edge agent has checked in.
const EDGE_AGENT_KEYS: [&str; 2] = [f::URL, f::TLS];

/// Keys an update may carry.
const WRITABLE: [&str; 8] = [
    f::NAME,
    f::CREATION_TYPE,
    f::URL,
    f::TLS,
    f::EDGE_CHECKIN_INTERVAL,
    f::EDGE_TUNNEL_SERVER_ADDRESS,
    f::GROUP_ID,
    f::TAG_IDS,
];

pub struct EnvironmentReconciler<'a> {
    environments: Environments<'a>,
    groups: Crud<'a>,
    tags: Crud<'a>,
    args: EnvironmentArgs,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl<'a> EnvironmentReconciler<'a> {
    pub fn new(transport: &'a dyn Transport, args: EnvironmentArgs) -> Self {
        Self {
            environments: Environments::new(transport),
            groups: Crud::new(transport, GROUP),
            tags: Crud::new(transport, TAG),
            wait_timeout: Duration::from_secs(args.wait_timeout),
            poll_interval: Duration::from_secs(args.poll_interval),
            args,
        }
    }

    /// Override the heartbeat poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn label(&self, environment: Option<&Record>) -> String {
        environment
            .and_then(|env| env.get(f::NAME))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.args.name.clone())
            .or_else(|| self.args.id.map(|id| id.to_string()))
            .unwrap_or_default()
    }

    fn current(&self) -> Result<Option<Record>, Error> {
        if let Some(id) = self.args.id {
            return match self.environments.get_by_id(id) {
                Ok(env) => Ok(Some(env)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(e),
            };
        }
        match &self.args.name {
            Some(name) => self.environments.validate_single_item(name, "retrieve"),
            None => Ok(None),
        }
    }

    /// Group and tags, resolving (and possibly creating) them by name.
    fn references(
        &self,
        dry_run: bool,
    ) -> Result<(Option<Resolved>, Option<Vec<Resolved>>), Error> {
        let group = match &self.args.group {
            Some(group) => {
                let policy = on_missing(self.args.create_group, "--create-group");
                self.groups.resolve_name_to_id(group, policy, dry_run)?
            }
            None => None,
        };

        let tags = if self.args.tags.is_empty() {
            None
        } else {
            let policy = on_missing(self.args.create_tags, "--create-tags");
            Some(resolve_refs(&self.tags, &self.args.tags, policy, dry_run)?)
        };

        Ok((group, tags))
    }

    fn requested(&self, group: Option<Resolved>, tags: Option<Vec<Resolved>>) -> Record {
        let args = &self.args;
        let mut record = Record::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                record.insert(key.to_string(), value);
            }
        };
        put(f::NAME, args.name.as_deref().map(Value::from));
        put(f::CREATION_TYPE, args.creation_type.map(Value::from));
        put(f::URL, args.url.as_deref().map(Value::from));
        put(f::TLS, args.tls.map(Value::from));
        put(f::EDGE_CHECKIN_INTERVAL, args.edge_checkin_interval.map(Value::from));
        put(
            f::EDGE_TUNNEL_SERVER_ADDRESS,
            args.edge_tunnel_server_address.as_deref().map(Value::from),
        );
        put(f::GROUP_ID, group.as_ref().map(Resolved::to_value));
        put(f::TAG_IDS, tags.as_deref().map(refs_value));
        record
    }

    fn environment_id(environment: &Record) -> Result<i64, Error> {
        environment
            .get(f::ID)
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::InvalidResponse(format!("environment record has no {}", f::ID)))
    }

    fn ensure_present(
        &self,
        ctx: &ApplyContext,
        current: Option<Record>,
    ) -> Result<Outcome, Error> {
        let (group, tags) = self.references(ctx.dry_run)?;
        let requested = self.requested(group, tags);

        let Some(environment) = current else {
            let name = require_name(self.args.name.as_deref(), "environment")?;
            let after = if ctx.should_mutate() {
                let mut data = without(&requested, &[f::NAME]);
                if let Some(group_id) = data.remove(f::GROUP_ID) {
                    data.insert(f::GROUP_ID_FORM_DATA.into(), group_id);
                }
                self.environments.create(name, data)?
            } else {
                requested
            };
            return Ok(Outcome::changed("Environment created").with_after(after));
        };

        let name = self.label(Some(&environment));
        let mut excluded = CREATE_ONLY.to_vec();
        let mut warnings = Vec::new();
        let heartbeat = environment
            .get(f::HEARTBEAT)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !heartbeat {
            warnings.push(format!(
                "Portainer environment {name} is not yet activated. Some keys related to edge Agent will not be updated."
            ));
            excluded.extend(EDGE_AGENT_KEYS);
        }

        let desired = without(
            &drop_nulls(overlay(&environment, &without(&requested, &excluded))),
            &excluded,
        );
        let changes = needs_update(&environment, &desired, &[]);

        let outcome = if changes.is_empty() {
            Outcome::unchanged(format!(
                "Environment {name} already exists with correct configuration"
            ))
            .with_before(environment.clone())
            .with_after(environment)
        } else {
            let after = if ctx.should_mutate() {
                let id = Self::environment_id(&environment)?;
                self.environments
                    .update(id, restrict(&desired, &WRITABLE))?
            } else {
                desired
            };
            Outcome::changed(format!("Environment {name} updated: {}", changes.summary()))
                .with_before(environment)
                .with_after(after)
        };
        Ok(warnings.into_iter().fold(outcome, Outcome::warn))
    }

    fn ensure_absent(&self, ctx: &ApplyContext, current: Option<Record>) -> Result<Outcome, Error> {
        let Some(environment) = current else {
            return Ok(Outcome::unchanged(format!(
                "Environment {} does not exist",
                self.label(None)
            )));
        };
        if ctx.should_mutate() {
            self.environments
                .delete(Self::environment_id(&environment)?)?;
        }
        Ok(
            Outcome::changed(format!("Environment {} deleted", self.label(Some(&environment))))
                .with_before(environment.clone())
                .with_after(environment),
        )
    }

    fn ensure_healthy(
        &self,
        ctx: &ApplyContext,
        current: Option<Record>,
    ) -> Result<Outcome, Error> {
        let Some(environment) = current else {
            return Err(Error::failed(format!(
                "Environment {} does not exist",
                self.label(None)
            )));
        };
        let name = self.label(Some(&environment));

        if !ctx.should_mutate() {
            let heartbeat = environment
                .get(f::HEARTBEAT)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let message = if heartbeat {
                format!("Environment {name} is healthy")
            } else {
                format!("Environment {name} has not checked in yet")
            };
            return Ok(Outcome::unchanged(message).with_after(environment));
        }

        let healthy = self.wait_for_heartbeat(Self::environment_id(&environment)?)?;
        Ok(Outcome::unchanged(format!("Environment {name} is healthy")).with_after(healthy))
    }

    /// Poll until the environment reports a heartbeat or the timeout passes.
    fn wait_for_heartbeat(&self, id: i64) -> Result<Record, Error> {
        let start = Instant::now();
        loop {
            let environment = self.environments.get_by_id(id)?;
            if environment
                .get(f::HEARTBEAT)
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                return Ok(environment);
            }

            log::debug!("Environment {} has no heartbeat yet", id);
            thread::sleep(self.poll_interval);

            if start.elapsed() > self.wait_timeout {
                return Err(Error::failed(format!(
                    "Environment {} failed to achieve a healthy status.",
                    self.label(Some(&environment))
                )));
            }
        }
    }
}

impl Reconciler for EnvironmentReconciler<'_> {
    type Error = Error;

    fn resource_key(&self) -> &'static str {
        "environment"
    }

    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        if self.args.creation_type == Some(f::TYPE_EDGE_AGENT) && self.args.url.is_none() {
            return Err(Error::Validation(
                "creation_type is 4 but the following are missing: url".into(),
            ));
        }
        if self.args.id.is_none() && self.args.name.is_none() {
            return Err(Error::Validation("one of the following is required: id, name".into()));
        }

        let current = self.current()?;
        match self.args.state {
            EnvironmentState::Present => self.ensure_present(ctx, current),
            EnvironmentState::Absent => self.ensure_absent(ctx, current),
            EnvironmentState::Healthy => self.ensure_healthy(ctx, current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::execute;
    use portainer::transport::{Body, MockResponse, MockTransport, Part};
    use serde_json::json;

    fn named(name: &str) -> EnvironmentArgs {
        EnvironmentArgs {
            name: Some(name.into()),
            wait_timeout: 30,
            poll_interval: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_with_group_and_duplicate_tags() {
        let mock = MockTransport::new();
        mock.on("GET /endpoints", json!([]));
        mock.on("GET /endpoint_groups", json!([{"Id": 3, "Name": "edge"}]));
        mock.on("GET /tags", json!([{"ID": 1, "Name": "a"}, {"ID": 2, "Name": "b"}]));
        mock.on("POST /endpoints", json!({"Id": 7, "Name": "site", "Type": 1}));

        let args = EnvironmentArgs {
            group: Some("edge".into()),
            tags: vec!["a".into(), "b".into(), "a".into()],
            creation_type: Some(1),
            ..named("site")
        };
        let report = execute(
            &mut EnvironmentReconciler::new(&mock, args),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Environment created");
        let calls = mock.calls_to("POST /endpoints");
        let Body::Multipart(form) = &calls[0].body else {
            panic!("expected multipart body");
        };
        assert_eq!(form.get("Name"), Some(&Part::Text("site".into())));
        assert_eq!(form.get("GroupID"), Some(&Part::Text("3".into())));
        assert_eq!(form.get("TagIds"), Some(&Part::Text("[1,2]".into())));
        assert_eq!(form.get("EndpointCreationType"), Some(&Part::Text("1".into())));
    }

    #[test]
    fn test_inactive_edge_agent_skips_url_with_warning() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoints",
            json!([{"Id": 7, "Name": "site", "Type": 4, "Heartbeat": false, "URL": "old"}]),
        );

        let args = EnvironmentArgs {
            url: Some("tcp://new:9001".into()),
            ..named("site")
        };
        let report = execute(
            &mut EnvironmentReconciler::new(&mock, args),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(!report.changed);
        assert_eq!(
            report.warnings,
            vec![
                "Portainer environment site is not yet activated. Some keys related to edge Agent will not be updated."
                    .to_string()
            ]
        );
        assert!(mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_update_sends_writable_keys_only() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoints",
            json!([{
                "Id": 7, "Name": "site", "Type": 1, "Heartbeat": true, "GroupId": 1, "Snapshots": []
            }]),
        );
        mock.on(
            "GET /endpoint_groups",
            json!([{"Id": 3, "Name": "edge"}]),
        );
        mock.on("PUT /endpoints/7", json!({"Id": 7, "Name": "site", "GroupId": 3}));

        let args = EnvironmentArgs {
            group: Some("edge".into()),
            ..named("site")
        };
        let report = execute(
            &mut EnvironmentReconciler::new(&mock, args),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Environment site updated: GroupId");
        let sent = mock.calls_to("PUT /endpoints/7")[0].body.to_value();
        assert_eq!(sent, Some(json!({"Name": "site", "GroupId": 3})));
    }

    #[test]
    fn test_missing_group_without_create_flag() {
        let mock = MockTransport::new();
        mock.on("GET /endpoints", json!([]));
        mock.on("GET /endpoint_groups", json!([]));

        let args = EnvironmentArgs {
            group: Some("prod".into()),
            ..named("site")
        };
        let err = execute(
            &mut EnvironmentReconciler::new(&mock, args),
            &ApplyContext::default(),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Group 'prod' does not exist. Use --create-group=true to create it automatically."
        );
    }

    #[test]
    fn test_wait_for_heartbeat_polls_until_healthy() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoints",
            json!([{"Id": 7, "Name": "site", "Type": 1, "Heartbeat": false}]),
        );
        mock.on_sequence(
            "GET /endpoints/7",
            vec![
                MockResponse::Json(json!({"Id": 7, "Name": "site", "Heartbeat": false})),
                MockResponse::Json(json!({"Id": 7, "Name": "site", "Heartbeat": false})),
                MockResponse::Json(json!({"Id": 7, "Name": "site", "Heartbeat": true})),
            ],
        );

        let args = EnvironmentArgs {
            state: EnvironmentState::Healthy,
            ..named("site")
        };
        let mut reconciler =
            EnvironmentReconciler::new(&mock, args).with_poll_interval(Duration::ZERO);
        let report = execute(&mut reconciler, &ApplyContext::default()).unwrap();

        assert!(!report.changed);
        assert_eq!(report.message, "Environment site is healthy");
        assert_eq!(mock.call_count("GET /endpoints/7"), 3);
    }

    #[test]
    fn test_wait_for_heartbeat_times_out() {
        let mock = MockTransport::new();
        mock.on("GET /endpoints/7", json!({"Id": 7, "Name": "site", "Heartbeat": false}));

        let args = EnvironmentArgs {
            id: Some(7),
            name: None,
            state: EnvironmentState::Healthy,
            wait_timeout: 0,
            poll_interval: 0,
            ..Default::default()
        };
        let mut reconciler =
            EnvironmentReconciler::new(&mock, args).with_poll_interval(Duration::from_millis(2));
        let err = execute(&mut reconciler, &ApplyContext::default()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Environment site failed to achieve a healthy status."
        );
    }

    #[test]
    fn test_healthy_requires_existing_environment() {
        let mock = MockTransport::new();
        mock.on("GET /endpoints", json!([]));

        let args = EnvironmentArgs {
            state: EnvironmentState::Healthy,
            ..named("ghost")
        };
        let err = execute(
            &mut EnvironmentReconciler::new(&mock, args),
            &ApplyContext::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Environment ghost does not exist");
    }

    #[test]
    fn test_dry_run_never_mutates_or_polls() {
        let mock = MockTransport::new();
        mock.on("GET /endpoints", json!([]));
        mock.on("GET /tags", json!([]));

        let args = EnvironmentArgs {
            tags: vec!["new".into()],
            create_tags: true,
            ..named("site")
        };
        let report = execute(
            &mut EnvironmentReconciler::new(&mock, args),
            &ApplyContext::check(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.resource, json!({"Name": "site", "TagIds": ["new"]}));
        assert!(mock.mutating_calls().is_empty());
    }

    fn regrouped() -> EnvironmentArgs {
        EnvironmentArgs {
            group: Some("new".into()),
            create_group: true,
            ..named("site")
        }
    }

    fn existing_site(mock: &MockTransport) {
        mock.on(
            "GET /endpoints",
            json!([{"Id": 7, "Name": "site", "Type": 1, "Heartbeat": true, "GroupId": 1}]),
        );
        mock.on("GET /endpoint_groups", json!([{"Id": 1, "Name": "Unassigned"}]));
    }

    #[test]
    fn test_dry_run_group_creation_matches_real_run() {
        let mock = MockTransport::new();
        existing_site(&mock);
        mock.on("POST /endpoint_groups", json!({"Id": 4, "Name": "new"}));
        mock.on("PUT /endpoints/7", json!({"Id": 7, "Name": "site", "GroupId": 4}));
        let real = execute(
            &mut EnvironmentReconciler::new(&mock, regrouped()),
            &ApplyContext::default(),
        )
        .unwrap();

        let dry_mock = MockTransport::new();
        existing_site(&dry_mock);
        let dry = execute(
            &mut EnvironmentReconciler::new(&dry_mock, regrouped()),
            &ApplyContext::check(),
        )
        .unwrap();

        assert!(real.changed);
        assert_eq!(real.message, "Environment site updated: GroupId");
        assert_eq!(dry.changed, real.changed);
        assert_eq!(dry.message, real.message);
        assert_eq!(dry.resource["GroupId"], json!("new"));
        assert!(dry_mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_dry_run_tag_creation_matches_real_run() {
        let tagged = || EnvironmentArgs {
            tags: vec!["edge".into()],
            create_tags: true,
            ..named("site")
        };
        let site = json!([{"Id": 7, "Name": "site", "Type": 1, "Heartbeat": true, "TagIds": []}]);

        let mock = MockTransport::new();
        mock.on("GET /endpoints", site.clone());
        mock.on("GET /tags", json!([]));
        mock.on("POST /tags", json!({"ID": 3, "Name": "edge"}));
        mock.on("PUT /endpoints/7", json!({"Id": 7, "Name": "site", "TagIds": [3]}));
        let real = execute(
            &mut EnvironmentReconciler::new(&mock, tagged()),
            &ApplyContext::default(),
        )
        .unwrap();

        let dry_mock = MockTransport::new();
        dry_mock.on("GET /endpoints", site);
        dry_mock.on("GET /tags", json!([]));
        let dry = execute(
            &mut EnvironmentReconciler::new(&dry_mock, tagged()),
            &ApplyContext::check(),
        )
        .unwrap();

        assert_eq!(real.message, "Environment site updated: TagIds");
        assert_eq!(dry.changed, real.changed);
        assert_eq!(dry.message, real.message);
        assert_eq!(dry.resource["TagIds"], json!(["edge"]));
        assert!(dry_mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_delete() {
        let mock = MockTransport::new();
        mock.on("GET /endpoints/7", json!({"Id": 7, "Name": "site", "Type": 1}));
        mock.on("DELETE /endpoints/7", MockResponse::Empty);

        let args = EnvironmentArgs {
            id: Some(7),
            state: EnvironmentState::Absent,
            ..Default::default()
        };
        let report = execute(
            &mut EnvironmentReconciler::new(&mock, args),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Environment site deleted");
        assert_eq!(mock.call_count("DELETE /endpoints/7"), 1);
    }
}
