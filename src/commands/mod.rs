//! Per-kind orchestrators
//!
//! Every subcommand is a [`Reconciler`](declarative::Reconciler) over one
//! resource kind; [`run`] builds it from its arguments and executes it.

pub mod config;
pub mod environment;
pub mod environment_info;
pub mod group;
pub mod network;
pub mod secret;
pub mod stack;
pub mod tag;

use crate::cli::ResourceCommand;
use declarative::{ApplyContext, Report, execute};
use portainer::record::record_id;
use portainer::{Crud, ItemId, OnMissing, Query, Record, Resolved, Result, Transport};
use serde_json::Value;

/// Reconcile the resource described by `command`
pub fn run(
    transport: &dyn Transport,
    command: ResourceCommand,
    ctx: &ApplyContext,
) -> Result<Report> {
    match command {
        ResourceCommand::Tag(args) => execute(&mut tag::TagReconciler::new(transport, args), ctx),
        ResourceCommand::Group(args) => {
            execute(&mut group::GroupReconciler::new(transport, args), ctx)
        }
        ResourceCommand::Environment(args) => execute(
            &mut environment::EnvironmentReconciler::new(transport, args),
            ctx,
        ),
        ResourceCommand::EnvironmentInfo(args) => execute(
            &mut environment_info::EnvironmentInfo::new(transport, args),
            ctx,
        ),
        ResourceCommand::Stack(args) => {
            execute(&mut stack::StackReconciler::new(transport, args), ctx)
        }
        ResourceCommand::Network(args) => {
            execute(&mut network::NetworkReconciler::new(transport, args), ctx)
        }
        ResourceCommand::Config(args) => {
            execute(&mut config::ConfigReconciler::new(transport, args), ctx)
        }
        ResourceCommand::Secret(args) => {
            execute(&mut secret::SecretReconciler::new(transport, args), ctx)
        }
    }
}

/// Fetch a record by id when one is given, otherwise by its unique name.
///
/// An unknown id or name is `Ok(None)`.
pub(crate) fn fetch(
    crud: &Crud<'_>,
    id: Option<ItemId>,
    name: Option<&str>,
) -> Result<Option<Record>> {
    if let Some(id) = id {
        return match crud.get_by_id(&id) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        };
    }
    match name {
        Some(name) => crud.validate_single_item(name, "retrieve", &Query::new(), &[]),
        None => Ok(None),
    }
}

/// Id of a fetched record
pub(crate) fn id_of(crud: &Crud<'_>, record: &Record) -> Result<ItemId> {
    let kind = crud.kind();
    record_id(record, kind.id_field).ok_or_else(|| {
        portainer::Error::InvalidResponse(format!("{} record has no {}", kind.label, kind.id_field))
    })
}

/// Name required to create a record
pub(crate) fn require_name<'n>(name: Option<&'n str>, kind: &str) -> Result<&'n str> {
    name.filter(|n| !n.is_empty())
        .ok_or_else(|| portainer::Error::Validation(format!("name is required to create a {kind}")))
}

/// Creation policy for referenced names
pub(crate) fn on_missing(create: bool, flag: &'static str) -> OnMissing {
    if create { OnMissing::Create } else { OnMissing::Fail { flag } }
}

/// Resolve referenced names, deduplicated in request order.
///
/// Skipped lookups are left out; dry-run creations stay as
/// [`Resolved::Pending`].
pub(crate) fn resolve_refs(
    crud: &Crud<'_>,
    names: &[String],
    policy: OnMissing,
    dry_run: bool,
) -> Result<Vec<Resolved>> {
    let mut refs = Vec::new();
    for name in names {
        if let Some(resolved) = crud.resolve_name_to_id(name, policy, dry_run)?
            && !refs.contains(&resolved)
        {
            refs.push(resolved);
        }
    }
    Ok(refs)
}

/// Integer ids of resolved references; pending ones have none yet.
pub(crate) fn int_ids(refs: &[Resolved]) -> Vec<i64> {
    refs.iter()
        .filter_map(|r| r.id().and_then(ItemId::as_int))
        .collect()
}

/// Reference list as sent in a payload
pub(crate) fn refs_value(refs: &[Resolved]) -> Value {
    Value::Array(refs.iter().map(Resolved::to_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portainer::kinds::TAG;
    use portainer::transport::MockTransport;
    use serde_json::json;

    #[test]
    fn test_resolve_refs_dedupes_in_order() {
        let mock = MockTransport::new();
        mock.on(
            "GET /tags",
            json!([{"ID": 2, "Name": "b"}, {"ID": 1, "Name": "a"}]),
        );
        let crud = Crud::new(&mock, TAG);

        let names = vec!["b".to_string(), "a".to_string(), "b".to_string(), "c".to_string()];
        let refs = resolve_refs(&crud, &names, OnMissing::Skip, false).unwrap();
        assert_eq!(int_ids(&refs), vec![2, 1]);
    }

    #[test]
    fn test_resolve_refs_keeps_pending_creations() {
        let mock = MockTransport::new();
        mock.on("GET /tags", json!([{"ID": 1, "Name": "a"}]));
        let crud = Crud::new(&mock, TAG);

        let names = vec!["a".to_string(), "new".to_string(), "new".to_string()];
        let refs = resolve_refs(&crud, &names, OnMissing::Create, true).unwrap();

        assert_eq!(refs_value(&refs), json!([1, "new"]));
        assert_eq!(int_ids(&refs), vec![1]);
        assert!(mock.mutating_calls().is_empty());
    }

    #[test]
    fn test_fetch_by_id_and_name() {
        let mock = MockTransport::new();
        mock.on_status("GET /tags/9", 404, "");
        mock.on("GET /tags", json!([{"ID": 3, "Name": "prod"}]));
        let crud = Crud::new(&mock, TAG);

        assert_eq!(fetch(&crud, Some(ItemId::Int(9)), Some("prod")).unwrap(), None);
        let found = fetch(&crud, None, Some("prod")).unwrap().unwrap();
        assert_eq!(id_of(&crud, &found).unwrap(), ItemId::Int(3));
        assert_eq!(fetch(&crud, None, None).unwrap(), None);
    }

    #[test]
    fn test_require_name() {
        assert_eq!(require_name(Some("x"), "tag").unwrap(), "x");
        assert_eq!(
            require_name(Some(""), "tag").unwrap_err().to_string(),
            "name is required to create a tag"
        );
        assert!(require_name(None, "group").is_err());
    }
}
