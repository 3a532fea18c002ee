//! Environment groups: name, description and tag membership

use super::{fetch, id_of, on_missing, refs_value, require_name, resolve_refs};
use crate::cli::{GroupArgs, Presence};
use declarative::{ApplyContext, Outcome, Reconciler, needs_update};
use portainer::fields::group as f;
use portainer::kinds::{GROUP, TAG};
use portainer::record::{drop_nulls, overlay};
use portainer::{BodyFormat, Crud, Error, ItemId, Query, Record, Resolved, Transport};
use serde_json::Value;

pub struct GroupReconciler<'a> {
    crud: Crud<'a>,
    tags: Crud<'a>,
    args: GroupArgs,
}

impl<'a> GroupReconciler<'a> {
    pub fn new(transport: &'a dyn Transport, args: GroupArgs) -> Self {
        Self {
            crud: Crud::new(transport, GROUP),
            tags: Crud::new(transport, TAG),
            args,
        }
    }

    /// Tags from `--tag-ids`, or from resolving `--tags`.
    fn tag_refs(&self, dry_run: bool) -> Result<Option<Vec<Resolved>>, Error> {
        if !self.args.tag_ids.is_empty() {
            let refs = self
                .args
                .tag_ids
                .iter()
                .map(|&id| Resolved::Id(ItemId::Int(id)))
                .collect();
            return Ok(Some(refs));
        }
        if self.args.tags.is_empty() {
            return Ok(None);
        }
        let policy = on_missing(self.args.create_tags, "--create-tags");
        resolve_refs(&self.tags, &self.args.tags, policy, dry_run).map(Some)
    }

    /// Current group overlaid with the requested fields.
    fn desired(&self, current: &Record, tags: Option<Vec<Resolved>>) -> Record {
        let mut requested = Record::new();
        if let Some(name) = &self.args.name {
            requested.insert(f::NAME.into(), Value::from(name.as_str()));
        }
        if let Some(description) = &self.args.description {
            requested.insert(f::DESCRIPTION.into(), Value::from(description.as_str()));
        }
        if let Some(tags) = tags {
            requested.insert(f::TAG_IDS.into(), refs_value(&tags));
        }
        drop_nulls(overlay(current, &requested))
    }
}

impl Reconciler for GroupReconciler<'_> {
    type Error = Error;

    fn resource_key(&self) -> &'static str {
        "group"
    }

    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        let current = fetch(
            &self.crud,
            self.args.id.map(ItemId::Int),
            self.args.name.as_deref(),
        )?;

        match (self.args.state, current) {
            (Presence::Present, Some(group)) => {
                let desired = self.desired(&group, self.tag_refs(ctx.dry_run)?);
                let changes = needs_update(&group, &desired, &[]);
                if changes.is_empty() {
                    return Ok(Outcome::unchanged("Group already exists with correct configuration")
                        .with_before(group.clone())
                        .with_after(group));
                }

                let after = if ctx.should_mutate() {
                    let id = id_of(&self.crud, &group)?;
                    self.crud.update(&id, desired, &Query::new())?
                } else {
                    desired
                };
                Ok(Outcome::changed(format!("Group updated: {}", changes.summary()))
                    .with_before(group)
                    .with_after(after))
            }
            (Presence::Present, None) => {
                let name = require_name(self.args.name.as_deref(), "group")?;
                let desired = self.desired(&Record::new(), self.tag_refs(ctx.dry_run)?);
                let after = if ctx.should_mutate() {
                    self.crud
                        .create(name, desired, BodyFormat::Json, &Query::new())?
                } else {
                    desired
                };
                Ok(Outcome::changed("Group created").with_after(after))
            }
            (Presence::Absent, Some(group)) => {
                if ctx.should_mutate() {
                    let id = id_of(&self.crud, &group)?;
                    self.crud.delete_by_id(&id, &Query::new())?;
                }
                Ok(Outcome::changed("Group deleted")
                    .with_before(group.clone())
                    .with_after(group))
            }
            (Presence::Absent, None) => Ok(Outcome::unchanged("Group does not exist")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::execute;
    use portainer::transport::MockTransport;
    use serde_json::json;

    fn prod(description: Option<&str>) -> GroupArgs {
        GroupArgs {
            name: Some("prod".into()),
            description: description.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_unchanged_when_matching() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoint_groups",
            json!([{"Id": 2, "Name": "prod", "Description": "d", "TagIDs": []}]),
        );

        let report = execute(
            &mut GroupReconciler::new(&mock, prod(Some("d"))),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(!report.changed);
        assert_eq!(report.message, "Group already exists with correct configuration");
        assert!(mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_update_sends_merged_record() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoint_groups",
            json!([{"Id": 2, "Name": "prod", "Description": "old", "TagIDs": [1]}]),
        );
        mock.on(
            "PUT /endpoint_groups/2",
            json!({"Id": 2, "Name": "prod", "Description": "new", "TagIDs": [1]}),
        );

        let report = execute(
            &mut GroupReconciler::new(&mock, prod(Some("new"))),
            &ApplyContext::default().with_diff(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Group updated: Description");
        let sent = mock.calls_to("PUT /endpoint_groups/2")[0].body.to_value();
        assert_eq!(
            sent,
            Some(json!({"Id": 2, "Name": "prod", "Description": "new", "TagIDs": [1]}))
        );
        let diff = report.diff.unwrap();
        assert_eq!(diff.before["Description"], json!("old"));
        assert_eq!(diff.after["Description"], json!("new"));
    }

    #[test]
    fn test_create_resolves_and_creates_tags() {
        let mock = MockTransport::new();
        mock.on("GET /endpoint_groups", json!([]));
        mock.on("GET /tags", json!([{"ID": 1, "Name": "a"}]));
        mock.on("POST /tags", json!({"ID": 2, "Name": "b"}));
        mock.on("POST /endpoint_groups", json!({"Id": 9, "Name": "prod", "TagIDs": [1, 2]}));

        let group_args = GroupArgs {
            tags: vec!["a".into(), "b".into(), "a".into()],
            create_tags: true,
            ..prod(None)
        };
        let report = execute(
            &mut GroupReconciler::new(&mock, group_args),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Group created");
        let sent = mock.calls_to("POST /endpoint_groups")[0].body.to_value();
        assert_eq!(sent, Some(json!({"Name": "prod", "TagIDs": [1, 2]})));
    }

    #[test]
    fn test_missing_tag_without_create_flag_fails() {
        let mock = MockTransport::new();
        mock.on("GET /endpoint_groups", json!([]));
        mock.on("GET /tags", json!([]));

        let group_args = GroupArgs {
            tags: vec!["edge".into()],
            ..prod(None)
        };
        let err = execute(
            &mut GroupReconciler::new(&mock, group_args),
            &ApplyContext::default(),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Tag 'edge' does not exist. Use --create-tags=true to create it automatically."
        );
        assert!(mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_dry_run_update_reports_desired() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoint_groups",
            json!([{"Id": 2, "Name": "prod", "Description": "old"}]),
        );

        let report = execute(
            &mut GroupReconciler::new(&mock, prod(Some("new"))),
            &ApplyContext::check(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.resource["Description"], json!("new"));
        assert!(mock.mutating_calls().is_empty());
    }

    fn tagged_prod() -> GroupArgs {
        GroupArgs {
            tags: vec!["a".into(), "new".into()],
            create_tags: true,
            ..prod(None)
        }
    }

    fn existing_prod(mock: &MockTransport) {
        mock.on(
            "GET /endpoint_groups",
            json!([{"Id": 2, "Name": "prod", "TagIDs": [1]}]),
        );
        mock.on("GET /tags", json!([{"ID": 1, "Name": "a"}]));
    }

    #[test]
    fn test_dry_run_tag_creation_matches_real_run() {
        let mock = MockTransport::new();
        existing_prod(&mock);
        mock.on("POST /tags", json!({"ID": 5, "Name": "new"}));
        mock.on(
            "PUT /endpoint_groups/2",
            json!({"Id": 2, "Name": "prod", "TagIDs": [1, 5]}),
        );
        let real = execute(
            &mut GroupReconciler::new(&mock, tagged_prod()),
            &ApplyContext::default(),
        )
        .unwrap();

        let dry_mock = MockTransport::new();
        existing_prod(&dry_mock);
        let dry = execute(
            &mut GroupReconciler::new(&dry_mock, tagged_prod()),
            &ApplyContext::check(),
        )
        .unwrap();

        assert!(real.changed);
        assert_eq!(dry.changed, real.changed);
        assert_eq!(dry.message, real.message);
        assert_eq!(dry.message, "Group updated: TagIDs");
        assert_eq!(dry.resource["TagIDs"], json!([1, "new"]));
        assert!(dry_mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_dry_run_create_keeps_pending_tags() {
        let mock = MockTransport::new();
        mock.on("GET /endpoint_groups", json!([]));
        mock.on("GET /tags", json!([{"ID": 1, "Name": "a"}]));

        let report = execute(
            &mut GroupReconciler::new(&mock, tagged_prod()),
            &ApplyContext::check(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.resource, json!({"Name": "prod", "TagIDs": [1, "new"]}));
        assert!(mock.mutating_calls().is_empty());
    }
}
