//! Generic CRUD resource.
//!
//! One [`Crud`] handle serves every resource kind; the kind's
//! [`ResourceKind`] descriptor supplies paths, field names and
//! normalization. Docker-proxied kinds additionally need a target
//! environment, held as explicit state on the handle.

use crate::error::{Error, Result};
use crate::kinds::{CreateRoute, ResourceKind, UpdateRoute};
use crate::record::{ItemId, Record, into_record, kind_of, record_id};
use crate::transport::{Body, BodyFormat, Method, Query, Request, Transport};
use serde_json::Value;
use std::cell::Cell;
use std::ops::Deref;

/// What `resolve_name_to_id` does when the name is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// Return `None`.
    Skip,
    /// Create a bare record with only the name set.
    Create,
    /// Fail, pointing the operator at the flag that enables creation.
    Fail { flag: &'static str },
}

/// A referenced name after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The record exists, or was just created.
    Id(ItemId),
    /// The record would be created; only seen in dry-run mode.
    Pending(String),
}

impl Resolved {
    pub fn id(&self) -> Option<&ItemId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Pending(_) => None,
        }
    }

    /// JSON form for payloads. A pending name stands in for the id it will get.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Id(id) => id.to_value(),
            Self::Pending(name) => Value::from(name.as_str()),
        }
    }
}

/// Local equality filter applied after the name match.
pub type Filter<'f> = (&'f str, Value);

/// CRUD handle for one resource kind.
pub struct Crud<'a> {
    transport: &'a dyn Transport,
    kind: ResourceKind,
    environment: Cell<Option<i64>>,
}

impl<'a> Crud<'a> {
    pub fn new(transport: &'a dyn Transport, kind: ResourceKind) -> Self {
        Self {
            transport,
            kind,
            environment: Cell::new(None),
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn transport(&self) -> &'a dyn Transport {
        self.transport
    }

    /// Set the proxy target environment.
    pub fn set_environment(&self, environment_id: i64) {
        self.environment.set(Some(environment_id));
    }

    pub fn environment(&self) -> Option<i64> {
        self.environment.get()
    }

    /// Redirect the proxy target until the returned guard is dropped.
    pub fn using_environment(&self, environment_id: i64) -> EnvironmentGuard<'_, 'a> {
        let previous = self.environment.replace(Some(environment_id));
        EnvironmentGuard {
            crud: self,
            previous,
        }
    }

    /// Collection path, resolved through the proxy for Docker kinds.
    pub fn base_path(&self) -> Result<String> {
        if !self.kind.proxied {
            return Ok(self.kind.path.to_string());
        }
        match self.environment.get() {
            Some(id) => Ok(format!("/endpoints/{id}/docker{}", self.kind.path)),
            None => Err(Error::ProxyTargetUnset {
                resource: self.kind.label.to_string(),
            }),
        }
    }

    pub fn item_path(&self, id: &ItemId) -> Result<String> {
        Ok(format!("{}/{id}", self.base_path()?))
    }

    fn create_path(&self) -> Result<String> {
        let base = self.base_path()?;
        Ok(match self.kind.create_route {
            CreateRoute::Base => base,
            CreateRoute::Suffix(suffix) => format!("{base}{suffix}"),
        })
    }

    fn update_route(&self, id: &ItemId) -> Result<(Method, String)> {
        let item = self.item_path(id)?;
        Ok(match self.kind.update_route {
            UpdateRoute::Item => (Method::Put, item),
            UpdateRoute::ItemSuffix(suffix) => (Method::Post, format!("{item}{suffix}")),
        })
    }

    /// Normalize a single-record response. An empty body is an empty record.
    pub fn normalize(&self, value: Option<Value>) -> Result<Record> {
        let mut record = match value {
            Some(value) => into_record(value)?,
            None => Record::new(),
        };
        if !record.is_empty() {
            (self.kind.normalize)(&mut record);
        }
        Ok(record)
    }

    fn normalize_list(&self, value: Option<Value>) -> Result<Vec<Record>> {
        match value {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| {
                    let mut record = into_record(item)?;
                    (self.kind.normalize)(&mut record);
                    Ok(record)
                })
                .collect(),
            Some(other) => Err(Error::InvalidResponse(format!(
                "expected a list of {}s, got {}",
                self.kind.label,
                kind_of(&other)
            ))),
        }
    }

    fn not_found(&self, name: impl ToString) -> Error {
        Error::ItemNotExists {
            resource: self.kind.label.to_string(),
            name: name.to_string(),
        }
    }

    /// Fetch one record by id.
    pub fn get_by_id(&self, id: &ItemId) -> Result<Record> {
        let request = Request::get(self.item_path(id)?);
        let value = match self.transport.request(&request) {
            Ok(value) => value,
            Err(Error::Api { status: 404, .. }) => return Err(self.not_found(id)),
            Err(e) => return Err(e),
        };
        let record = self.normalize(value)?;
        if record.is_empty() {
            return Err(self.not_found(id));
        }
        Ok(record)
    }

    /// Fetch the collection, optionally filtered server-side.
    pub fn list(&self, query: &Query) -> Result<Vec<Record>> {
        let request = Request::get(self.base_path()?).with_query(query.clone());
        self.normalize_list(self.transport.request(&request)?)
    }

    /// Fetch the single record with this exact name.
    ///
    /// # Errors
    ///
    /// `ItemNotExists` when nothing matches, `MultipleItemsReturned` with
    /// every matching id (in remote order) when more than one does.
    pub fn get_by_name(&self, name: &str, query: &Query, filters: &[Filter<'_>]) -> Result<Record> {
        if name.is_empty() {
            return Err(Error::Validation("Name should not be empty".into()));
        }

        let mut matches: Vec<Record> = self
            .list(query)?
            .into_iter()
            .filter(|item| item.get(self.kind.name_field).and_then(Value::as_str) == Some(name))
            .filter(|item| filters.iter().all(|(key, value)| item.get(*key) == Some(value)))
            .collect();

        match matches.len() {
            0 => Err(self.not_found(name)),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::MultipleItemsReturned {
                resource: self.kind.label.to_string(),
                name: name.to_string(),
                operation: "operate on".to_string(),
                ids: matches
                    .iter()
                    .filter_map(|item| record_id(item, self.kind.id_field))
                    .collect(),
            }),
        }
    }

    /// Like [`Crud::get_by_name`], but "not found" is `Ok(None)`.
    pub fn validate_single_item(
        &self,
        name: &str,
        operation: &str,
        query: &Query,
        filters: &[Filter<'_>],
    ) -> Result<Option<Record>> {
        match self.get_by_name(name, query, filters) {
            Ok(record) => Ok(Some(record)),
            Err(Error::ItemNotExists { .. }) => Ok(None),
            Err(Error::MultipleItemsReturned {
                resource,
                name,
                ids,
                ..
            }) => Err(Error::MultipleItemsReturned {
                resource,
                name,
                operation: operation.to_string(),
                ids,
            }),
            Err(e) => Err(e),
        }
    }

    /// POST `{name_field: name, ..extra}` to the create route.
    pub fn create(
        &self,
        name: &str,
        extra: Record,
        format: BodyFormat,
        query: &Query,
    ) -> Result<Record> {
        if name.is_empty() {
            return Err(Error::Validation("Name should not be empty".into()));
        }
        let mut payload = Record::new();
        payload.insert(self.kind.name_field.to_string(), Value::from(name));
        payload.extend(extra);

        self.create_at(&self.create_path()?, format.encode(payload), query)
    }

    /// POST a body to an explicit create route.
    pub fn create_at(&self, path: &str, body: Body, query: &Query) -> Result<Record> {
        log::info!("Creating {} at {}", self.kind.label, path);
        let request = Request::post(path).with_query(query.clone()).with_body(body);
        self.normalize(self.transport.request(&request)?)
    }

    /// Send the change-set to the update route.
    pub fn update(&self, id: &ItemId, changes: Record, query: &Query) -> Result<Record> {
        let (method, path) = self.update_route(id)?;
        self.update_at(&path, method, Body::json(changes), query)
    }

    /// Send a body to an explicit update route.
    pub fn update_at(
        &self,
        path: &str,
        method: Method,
        body: Body,
        query: &Query,
    ) -> Result<Record> {
        log::info!("Updating {} at {}", self.kind.label, path);
        let request = Request::new(method, path)
            .with_query(query.clone())
            .with_body(body);
        self.normalize(self.transport.request(&request)?)
    }

    /// DELETE one record. Fails if the id does not exist remotely.
    pub fn delete_by_id(&self, id: &ItemId, query: &Query) -> Result<()> {
        let path = self.item_path(id)?;
        log::info!("Deleting {} at {}", self.kind.label, path);
        self.transport
            .request(&Request::delete(path).with_query(query.clone()))?;
        Ok(())
    }

    /// Resolve a name to its single record, then DELETE it.
    pub fn delete_by_name(&self, name: &str) -> Result<()> {
        let record = self.get_by_name(name, &Query::new(), &[])?;
        let id = record_id(&record, self.kind.id_field).ok_or_else(|| {
            let kind = &self.kind;
            Error::InvalidResponse(format!("{} '{name}' has no {}", kind.label, kind.id_field))
        })?;
        self.delete_by_id(&id, &Query::new())
    }

    /// Turn a name into an id, creating the record on demand.
    ///
    /// In dry-run mode nothing is created and an unknown name yields
    /// [`Resolved::Pending`], so callers still see the reference change.
    pub fn resolve_name_to_id(
        &self,
        name: &str,
        on_missing: OnMissing,
        dry_run: bool,
    ) -> Result<Option<Resolved>> {
        let record = match self.validate_single_item(name, "retrieve", &Query::new(), &[])? {
            Some(record) => record,
            None => match on_missing {
                OnMissing::Skip => return Ok(None),
                OnMissing::Fail { flag } => {
                    return Err(Error::failed(format!(
                        "{} '{name}' does not exist. Use {flag}=true to create it automatically.",
                        self.kind.title()
                    )));
                }
                OnMissing::Create if dry_run => {
                    log::info!("Would create {} '{}'", self.kind.label, name);
                    return Ok(Some(Resolved::Pending(name.to_string())));
                }
                OnMissing::Create => {
                    self.create(name, Record::new(), BodyFormat::Json, &Query::new())?
                }
            },
        };

        Ok(record_id(&record, self.kind.id_field).map(Resolved::Id))
    }
}

/// Restores the previous proxy target when dropped.
pub struct EnvironmentGuard<'c, 'a> {
    crud: &'c Crud<'a>,
    previous: Option<i64>,
}

impl<'a> Deref for EnvironmentGuard<'_, 'a> {
    type Target = Crud<'a>;

    fn deref(&self) -> &Self::Target {
        self.crud
    }
}

impl Drop for EnvironmentGuard<'_, '_> {
    fn drop(&mut self) {
        self.crud.environment.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{CONFIG, GROUP, NETWORK, TAG};
    use crate::transport::MockTransport;
    use serde_json::json;

    #[test]
    fn test_get_by_name_exact_match() {
        let mock = MockTransport::new();
        mock.on("GET /tags", json!([{"ID": 1, "Name": "prod"}, {"ID": 2, "Name": "production"}]));
        let crud = Crud::new(&mock, TAG);

        let tag = crud.get_by_name("prod", &Query::new(), &[]).unwrap();
        assert_eq!(tag["ID"], json!(1));
    }

    #[test]
    fn test_get_by_name_missing_and_empty() {
        let mock = MockTransport::new();
        mock.on("GET /tags", json!([]));
        let crud = Crud::new(&mock, TAG);

        assert!(matches!(
            crud.get_by_name("prod", &Query::new(), &[]),
            Err(Error::ItemNotExists { .. })
        ));
        assert!(matches!(
            crud.get_by_name("", &Query::new(), &[]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_get_by_name_reports_all_duplicates_in_remote_order() {
        let mock = MockTransport::new();
        mock.on(
            "GET /tags",
            json!([
                {"ID": 7, "Name": "dup"},
                {"ID": 3, "Name": "other"},
                {"ID": 2, "Name": "dup"},
                {"ID": 9, "Name": "dup"}
            ]),
        );
        let crud = Crud::new(&mock, TAG);

        match crud.get_by_name("dup", &Query::new(), &[]) {
            Err(Error::MultipleItemsReturned { ids, .. }) => {
                assert_eq!(ids, vec![ItemId::Int(7), ItemId::Int(2), ItemId::Int(9)]);
            }
            other => panic!("expected MultipleItemsReturned, got {other:?}"),
        }
    }

    #[test]
    fn test_get_by_name_local_filters() {
        let mock = MockTransport::new();
        mock.on(
            "GET /stacks",
            json!([
                {"Id": 1, "Name": "web", "EndpointId": 1},
                {"Id": 2, "Name": "web", "EndpointId": 2}
            ]),
        );
        let crud = Crud::new(&mock, crate::kinds::STACK);

        let stack = crud
            .get_by_name("web", &Query::new(), &[("EndpointId", json!(2))])
            .unwrap();
        assert_eq!(stack["Id"], json!(2));
    }

    #[test]
    fn test_validate_single_item() {
        let mock = MockTransport::new();
        mock.on(
            "GET /endpoint_groups",
            json!([{"Id": 1, "Name": "a"}, {"Id": 2, "Name": "a"}]),
        );
        let crud = Crud::new(&mock, GROUP);

        assert_eq!(
            crud.validate_single_item("missing", "retrieve", &Query::new(), &[])
                .unwrap(),
            None
        );
        let err = crud
            .validate_single_item("a", "delete", &Query::new(), &[])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot delete group: Multiple groups found with name 'a'. Please use the Portainer UI to remove duplicates."
        );
    }

    #[test]
    fn test_get_by_id_not_found() {
        let mock = MockTransport::new();
        mock.on_status("GET /tags/5", 404, "");
        mock.on("GET /tags/6", crate::transport::MockResponse::Empty);
        let crud = Crud::new(&mock, TAG);

        assert!(crud.get_by_id(&ItemId::Int(5)).unwrap_err().is_not_found());
        assert!(crud.get_by_id(&ItemId::Int(6)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_get_by_id_other_errors_propagate() {
        let mock = MockTransport::new();
        mock.on_status("GET /tags/5", 500, "boom");
        let crud = Crud::new(&mock, TAG);

        assert!(matches!(
            crud.get_by_id(&ItemId::Int(5)),
            Err(Error::Api { status: 500, .. })
        ));
    }

    #[test]
    fn test_create_sends_name_and_extra() {
        let mock = MockTransport::new();
        mock.on("POST /endpoint_groups", json!({"Id": 4, "Name": "g"}));
        let crud = Crud::new(&mock, GROUP);

        let mut extra = Record::new();
        extra.insert("Description".into(), json!("d"));
        let created = crud
            .create("g", extra, BodyFormat::Json, &Query::new())
            .unwrap();

        assert_eq!(created["Id"], json!(4));
        let calls = mock.calls_to("POST /endpoint_groups");
        assert_eq!(
            calls[0].body.to_value(),
            Some(json!({"Name": "g", "Description": "d"}))
        );
    }

    #[test]
    fn test_update_and_delete_routes() {
        let mock = MockTransport::new();
        mock.on("PUT /endpoint_groups/4", json!({"Id": 4, "Name": "g2"}));
        mock.on("DELETE /endpoint_groups/4", crate::transport::MockResponse::Empty);
        let crud = Crud::new(&mock, GROUP);

        let mut changes = Record::new();
        changes.insert("Name".into(), json!("g2"));
        let updated = crud.update(&ItemId::Int(4), changes, &Query::new()).unwrap();
        crud.delete_by_id(&ItemId::Int(4), &Query::new()).unwrap();

        assert_eq!(updated["Name"], json!("g2"));
        assert_eq!(mock.mutating_calls().len(), 2);
    }

    #[test]
    fn test_delete_by_name() {
        let mock = MockTransport::new();
        mock.on("GET /tags", json!([{"ID": 3, "Name": "old"}]));
        mock.on("DELETE /tags/3", crate::transport::MockResponse::Empty);
        let crud = Crud::new(&mock, TAG);

        crud.delete_by_name("old").unwrap();
        assert_eq!(mock.call_count("DELETE /tags/3"), 1);
    }

    #[test]
    fn test_resolve_name_to_id() {
        let mock = MockTransport::new();
        mock.on("GET /tags", json!([{"ID": 3, "Name": "known"}]));
        mock.on("POST /tags", json!({"ID": 8, "Name": "new"}));
        let crud = Crud::new(&mock, TAG);

        assert_eq!(
            crud.resolve_name_to_id("known", OnMissing::Fail { flag: "--create-tags" }, false)
                .unwrap(),
            Some(Resolved::Id(ItemId::Int(3)))
        );
        assert_eq!(
            crud.resolve_name_to_id("new", OnMissing::Skip, false).unwrap(),
            None
        );
        let pending = crud
            .resolve_name_to_id("new", OnMissing::Create, true)
            .unwrap()
            .unwrap();
        assert_eq!(pending, Resolved::Pending("new".into()));
        assert_eq!(pending.id(), None);
        assert_eq!(pending.to_value(), json!("new"));
        assert_eq!(mock.call_count("POST /tags"), 0);
        assert_eq!(
            crud.resolve_name_to_id("new", OnMissing::Create, false).unwrap(),
            Some(Resolved::Id(ItemId::Int(8)))
        );
        assert_eq!(mock.call_count("POST /tags"), 1);
    }

    #[test]
    fn test_resolve_name_to_id_fail_message() {
        let mock = MockTransport::new();
        mock.on("GET /endpoint_groups", json!([]));
        let crud = Crud::new(&mock, GROUP);

        let err = crud
            .resolve_name_to_id("prod", OnMissing::Fail { flag: "--create-group" }, false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Group 'prod' does not exist. Use --create-group=true to create it automatically."
        );
    }

    #[test]
    fn test_proxied_kind_requires_environment() {
        let mock = MockTransport::new();
        let crud = Crud::new(&mock, NETWORK);

        assert!(matches!(
            crud.list(&Query::new()),
            Err(Error::ProxyTargetUnset { .. })
        ));
        assert!(mock.calls().is_empty());

        crud.set_environment(2);
        assert_eq!(crud.base_path().unwrap(), "/endpoints/2/docker/networks");
    }

    #[test]
    fn test_using_environment_restores_previous_target() {
        let mock = MockTransport::new();
        let crud = Crud::new(&mock, CONFIG);
        crud.set_environment(1);

        {
            let scoped = crud.using_environment(5);
            assert_eq!(scoped.base_path().unwrap(), "/endpoints/5/docker/configs");
        }
        assert_eq!(crud.environment(), Some(1));

        let failing = || -> Result<()> {
            let scoped = crud.using_environment(9);
            scoped.get_by_id(&ItemId::from("abc"))?;
            Ok(())
        };
        assert!(failing().is_err());
        assert_eq!(crud.environment(), Some(1));
    }

    #[test]
    fn test_docker_create_route_and_normalization() {
        let mock = MockTransport::new();
        mock.on("POST /endpoints/1/docker/configs/create", json!({"ID": "c1"}));
        mock.on(
            "GET /endpoints/1/docker/configs",
            json!([{"ID": "c1", "Spec": {"Name": "app", "Data": "YQ=="}}]),
        );
        let crud = Crud::new(&mock, CONFIG);
        crud.set_environment(1);

        let created = crud
            .create("app", Record::new(), BodyFormat::Json, &Query::new())
            .unwrap();
        assert_eq!(created["ID"], json!("c1"));

        let found = crud.get_by_name("app", &Query::new(), &[]).unwrap();
        assert_eq!(found["Name"], json!("app"));
        assert_eq!(found["Data"], json!("YQ=="));
    }

    #[test]
    fn test_list_rejects_non_list() {
        let mock = MockTransport::new();
        mock.on("GET /tags", json!({"oops": true}));
        let crud = Crud::new(&mock, TAG);

        assert!(matches!(
            crud.list(&Query::new()),
            Err(Error::InvalidResponse(_))
        ));
    }
}
