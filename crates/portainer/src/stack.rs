//! Stack adapter.
//!
//! Stack routes depend on the stack type and source, so this wraps the
//! generic [`Crud`] handle with the route matrix and the lifecycle calls
//! (`start`, `stop`, `file`).

use crate::crud::Crud;
use crate::error::{Error, Result};
use crate::fields::stack as f;
use crate::kinds::STACK;
use crate::record::{ItemId, Record, get_nested};
use crate::transport::{Body, Method, Query, Request, Transport};
use serde_json::Value;
use std::fmt;

/// Deployment target of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackType {
    Swarm,
    Standalone,
}

impl StackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swarm => "swarm",
            Self::Standalone => "standalone",
        }
    }

    /// Map the API's `Type` code (1 swarm, 2 standalone).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Swarm),
            2 => Some(Self::Standalone),
            _ => None,
        }
    }
}

impl fmt::Display for StackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the compose definition comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSource {
    File,
    Repository,
}

impl StackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Repository => "repository",
        }
    }
}

impl fmt::Display for StackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type and source of a stack; selects its routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flavor {
    pub stack_type: StackType,
    pub source: StackSource,
}

impl Flavor {
    pub fn new(stack_type: StackType, source: StackSource) -> Self {
        Self { stack_type, source }
    }

    /// Infer the flavor of an existing stack from its normalized record.
    pub fn infer(record: &Record) -> Option<Self> {
        let stack_type = record
            .get(f::TYPE)
            .and_then(Value::as_i64)
            .and_then(StackType::from_code)?;
        let source = match record.get(f::REPOSITORY_URL) {
            Some(Value::String(url)) if !url.is_empty() => StackSource::Repository,
            _ => StackSource::File,
        };
        Some(Self::new(stack_type, source))
    }

    fn is_swarm_repository(self) -> bool {
        self.stack_type == StackType::Swarm && self.source == StackSource::Repository
    }

    pub fn create_path(self) -> String {
        format!("{}/create/{}/{}", STACK.path, self.stack_type, self.source)
    }

    pub fn update_route(self, id: &ItemId) -> (Method, String) {
        if self.is_swarm_repository() {
            (Method::Post, format!("{}/{id}/git", STACK.path))
        } else {
            (Method::Put, format!("{}/{id}", STACK.path))
        }
    }

    /// Only swarm repository stacks have a dedicated redeploy route.
    pub fn redeploy_route(self, id: &ItemId) -> Option<(Method, String)> {
        self.is_swarm_repository()
            .then(|| (Method::Put, format!("{}/{id}/git/redeploy", STACK.path)))
    }
}

/// Flatten `GitConfig` into the write-side repository fields.
pub fn flatten_git_config(record: &mut Record) {
    let Some(Value::Object(git)) = record.remove(f::GIT_CONFIG) else {
        return;
    };
    let nested = |path: &str| get_nested(&git, path).cloned().unwrap_or(Value::Null);

    let authenticated = git
        .get(f::GIT_AUTHENTICATION)
        .is_some_and(|auth| !auth.is_null());
    record.insert(f::REPOSITORY_AUTHENTICATION.into(), Value::Bool(authenticated));
    record.insert(f::REPOSITORY_AUTHORIZATION_TYPE.into(), nested(f::GIT_AUTH_TYPE));
    record.insert(f::REPOSITORY_REFERENCE_NAME.into(), nested(f::GIT_REFERENCE_NAME));
    record.insert(f::REPOSITORY_USERNAME.into(), nested(f::GIT_USERNAME));
    record.insert(f::TLS_SKIP_VERIFY.into(), nested(f::GIT_TLS_SKIP_VERIFY));

    let fallbacks = [
        (f::REPOSITORY_URL, f::GIT_URL),
        (f::COMPOSE_FILE, f::GIT_CONFIG_FILE_PATH),
    ];
    for (target, source) in fallbacks {
        let unset = record.get(target).is_none_or(|v| v.is_null() || v == "");
        if unset {
            record.insert(target.into(), nested(source));
        }
    }
}

fn endpoint_query(endpoint_id: Option<i64>) -> Query {
    match endpoint_id {
        Some(id) => Query::new().with(f::ENDPOINT_ID_QUERY, id),
        None => Query::new(),
    }
}

/// Stack access through the route matrix.
pub struct Stacks<'a> {
    crud: Crud<'a>,
}

impl<'a> Stacks<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            crud: Crud::new(transport, STACK),
        }
    }

    pub fn crud(&self) -> &Crud<'a> {
        &self.crud
    }

    pub fn get_by_id(&self, id: i64) -> Result<Record> {
        self.crud.get_by_id(&ItemId::Int(id))
    }

    /// Find a stack by name within a swarm and/or an environment.
    ///
    /// The swarm id is filtered server-side, the environment locally.
    pub fn lookup(
        &self,
        name: &str,
        swarm_id: Option<&str>,
        endpoint_id: Option<i64>,
    ) -> Result<Option<Record>> {
        let mut query = Query::new();
        if let Some(swarm_id) = swarm_id {
            let mut filter = Record::new();
            filter.insert(f::SWARM_ID.to_string(), Value::from(swarm_id));
            query.push(f::FILTERS_QUERY, Value::Object(filter).to_string());
        }
        let filters: Vec<(&str, Value)> = endpoint_id
            .map(|id| (f::ENDPOINT_ID, Value::from(id)))
            .into_iter()
            .collect();

        self.crud
            .validate_single_item(name, "retrieve", &query, &filters)
    }

    pub fn create(&self, flavor: Flavor, body: Body, endpoint_id: Option<i64>) -> Result<Record> {
        self.crud
            .create_at(&flavor.create_path(), body, &endpoint_query(endpoint_id))
    }

    pub fn update(
        &self,
        flavor: Flavor,
        id: i64,
        data: Record,
        endpoint_id: Option<i64>,
    ) -> Result<Record> {
        let (method, path) = flavor.update_route(&ItemId::Int(id));
        self.crud
            .update_at(&path, method, Body::json(data), &endpoint_query(endpoint_id))
    }

    /// Redeploy; degrades to a plain update outside swarm repository stacks.
    pub fn redeploy(
        &self,
        flavor: Flavor,
        id: i64,
        data: Record,
        endpoint_id: Option<i64>,
    ) -> Result<Record> {
        match flavor.redeploy_route(&ItemId::Int(id)) {
            Some((method, path)) => {
                self.crud
                    .update_at(&path, method, Body::json(data), &endpoint_query(endpoint_id))
            }
            None => self.update(flavor, id, data, endpoint_id),
        }
    }

    pub fn delete(&self, id: i64, endpoint_id: Option<i64>) -> Result<()> {
        self.crud
            .delete_by_id(&ItemId::Int(id), &endpoint_query(endpoint_id))
    }

    pub fn start(&self, id: i64, endpoint_id: Option<i64>) -> Result<Record> {
        self.lifecycle(id, "start", endpoint_id)
    }

    pub fn stop(&self, id: i64, endpoint_id: Option<i64>) -> Result<Record> {
        self.lifecycle(id, "stop", endpoint_id)
    }

    fn lifecycle(&self, id: i64, action: &str, endpoint_id: Option<i64>) -> Result<Record> {
        let path = format!("{}/{id}/{action}", STACK.path);
        log::info!("Sending {} to stack {}", action, id);
        let request = Request::post(path).with_query(endpoint_query(endpoint_id));
        self.crud
            .normalize(self.crud.transport().request(&request)?)
    }

    /// Current compose file of a stack.
    pub fn file_content(&self, id: i64) -> Result<String> {
        let path = format!("{}/{id}/file", STACK.path);
        let value = self.crud.transport().request(&Request::get(path))?;
        value
            .as_ref()
            .and_then(|v| v.get(f::FILE_CONTENT))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::InvalidResponse(format!("stack {id} file has no {}", f::FILE_CONTENT))
            })
    }
}
