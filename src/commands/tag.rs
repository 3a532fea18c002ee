//! Tags: present/absent by name or id

use super::{fetch, id_of, require_name};
use crate::cli::{Presence, TagArgs};
use declarative::{ApplyContext, Outcome, Reconciler};
use portainer::fields::tag as f;
use portainer::kinds::TAG;
use portainer::{BodyFormat, Crud, Error, ItemId, Query, Record, Transport};
use serde_json::Value;

pub struct TagReconciler<'a> {
    crud: Crud<'a>,
    args: TagArgs,
}

impl<'a> TagReconciler<'a> {
    pub fn new(transport: &'a dyn Transport, args: TagArgs) -> Self {
        Self {
            crud: Crud::new(transport, TAG),
            args,
        }
    }

    fn desired(&self) -> Record {
        let mut record = Record::new();
        if let Some(name) = &self.args.name {
            record.insert(f::NAME.into(), Value::from(name.as_str()));
        }
        record
    }
}

impl Reconciler for TagReconciler<'_> {
    type Error = Error;

    fn resource_key(&self) -> &'static str {
        "tag"
    }

    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        let current = fetch(
            &self.crud,
            self.args.id.map(ItemId::Int),
            self.args.name.as_deref(),
        )?;

        match (self.args.state, current) {
            (Presence::Present, Some(tag)) => Ok(Outcome::unchanged("Tag already exists")
                .with_before(tag.clone())
                .with_after(tag)),
            (Presence::Present, None) => {
                let name = require_name(self.args.name.as_deref(), "tag")?;
                let after = if ctx.should_mutate() {
                    self.crud
                        .create(name, Record::new(), BodyFormat::Json, &Query::new())?
                } else {
                    self.desired()
                };
                Ok(Outcome::changed("Tag created").with_after(after))
            }
            (Presence::Absent, Some(tag)) => {
                if ctx.should_mutate() {
                    let id = id_of(&self.crud, &tag)?;
                    self.crud.delete_by_id(&id, &Query::new())?;
                }
                Ok(Outcome::changed("Tag deleted").with_before(tag.clone()).with_after(tag))
            }
            (Presence::Absent, None) => {
                Ok(Outcome::unchanged("Tag does not exist").with_after(self.desired()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::execute;
    use portainer::transport::{MockResponse, MockTransport};
    use serde_json::json;

    fn args(name: &str, state: Presence) -> TagArgs {
        TagArgs {
            name: Some(name.into()),
            id: None,
            state,
        }
    }

    #[test]
    fn test_create_then_idempotent() {
        let mock = MockTransport::new();
        mock.on_sequence(
            "GET /tags",
            vec![
                MockResponse::Json(json!([])),
                MockResponse::Json(json!([{"ID": 4, "Name": "prod"}])),
            ],
        );
        mock.on("POST /tags", json!({"ID": 4, "Name": "prod"}));

        let first = execute(
            &mut TagReconciler::new(&mock, args("prod", Presence::Present)),
            &ApplyContext::default(),
        )
        .unwrap();
        assert!(first.changed);
        assert_eq!(first.message, "Tag created");
        assert_eq!(first.resource, json!({"ID": 4, "Name": "prod"}));

        let second = execute(
            &mut TagReconciler::new(&mock, args("prod", Presence::Present)),
            &ApplyContext::default(),
        )
        .unwrap();
        assert!(!second.changed);
        assert_eq!(second.message, "Tag already exists");
        assert_eq!(mock.call_count("POST /tags"), 1);
    }

    #[test]
    fn test_dry_run_create_makes_no_mutating_calls() {
        let mock = MockTransport::new();
        mock.on("GET /tags", json!([]));

        let report = execute(
            &mut TagReconciler::new(&mock, args("prod", Presence::Present)),
            &ApplyContext::check(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.resource, json!({"Name": "prod"}));
        assert!(mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_delete_by_id() {
        let mock = MockTransport::new();
        mock.on("GET /tags/4", json!({"ID": 4, "Name": "prod"}));
        mock.on("DELETE /tags/4", MockResponse::Empty);

        let tag_args = TagArgs {
            name: None,
            id: Some(4),
            state: Presence::Absent,
        };
        let report = execute(
            &mut TagReconciler::new(&mock, tag_args),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(report.changed);
        assert_eq!(report.message, "Tag deleted");
        assert_eq!(mock.call_count("DELETE /tags/4"), 1);
    }

    #[test]
    fn test_absent_when_missing() {
        let mock = MockTransport::new();
        mock.on("GET /tags", json!([]));

        let report = execute(
            &mut TagReconciler::new(&mock, args("gone", Presence::Absent)),
            &ApplyContext::default(),
        )
        .unwrap();

        assert!(!report.changed);
        assert_eq!(report.message, "Tag does not exist");
        assert!(mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_duplicate_names_fail_with_ids() {
        let mock = MockTransport::new();
        mock.on(
            "GET /tags",
            json!([{"ID": 1, "Name": "dup"}, {"ID": 2, "Name": "dup"}]),
        );

        let err = execute(
            &mut TagReconciler::new(&mock, args("dup", Presence::Present)),
            &ApplyContext::default(),
        )
        .unwrap_err();

        assert_eq!(err.context()["duplicate_ids"], json!([1, 2]));
        assert!(mock.mutating_calls().is_empty());
    }
}
