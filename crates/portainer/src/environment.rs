//! Environment adapter.
//!
//! Wraps the generic [`Crud`] handle with TLS flattening, multipart
//! creation, filtered listing and swarm enrichment of edge agents.

use crate::crud::Crud;
use crate::docker::Swarm;
use crate::error::Result;
use crate::fields::environment as f;
use crate::kinds::ENVIRONMENT;
use crate::record::{ItemId, Record};
use crate::transport::{BodyFormat, Query, Transport};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// Move the TLS fields out of the nested `TLSConfig` object.
///
/// GET returns them nested while POST and PUT take them flat, so reads are
/// flattened before they are compared with a desired record.
pub fn flatten_tls_config(record: &mut Record) {
    let Some(Value::Object(tls)) = record.remove(f::TLS_CONFIG) else {
        return;
    };
    for key in f::TLS_FIELDS {
        if let Some(value) = tls.get(key) {
            record.insert(key.to_string(), value.clone());
        }
    }
}

/// Server-side filters for listing environments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentFilter {
    pub name: Option<String>,
    pub group_ids: Vec<i64>,
    pub tag_ids: Vec<i64>,
}

impl EnvironmentFilter {
    /// Query sent to `GET /endpoints`. Snapshots are always excluded.
    pub fn to_query(&self) -> Query {
        let mut query = Query::new()
            .with(f::EXCLUDE_SNAPSHOTS, true)
            .with(f::EXCLUDE_SNAPSHOT_RAW, true);
        for id in &self.group_ids {
            query.push(format!("{}[]", f::GROUP_IDS_QUERY), *id);
        }
        for id in &self.tag_ids {
            query.push(format!("{}[]", f::TAG_IDS_QUERY), *id);
        }
        if let Some(name) = &self.name {
            query.push(f::NAME_QUERY, name.as_str());
        }
        query
    }
}

/// Environment access with swarm enrichment.
pub struct Environments<'a> {
    crud: Crud<'a>,
    swarm: Swarm<'a>,
    swarms: RefCell<HashMap<i64, Record>>,
}

impl<'a> Environments<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            crud: Crud::new(transport, ENVIRONMENT),
            swarm: Swarm::new(transport),
            swarms: RefCell::new(HashMap::new()),
        }
    }

    pub fn crud(&self) -> &Crud<'a> {
        &self.crud
    }

    /// Attach the swarm descriptor to edge agents that have checked in.
    fn enrich(&self, mut record: Record) -> Result<Record> {
        let is_edge_agent = record.get(f::TYPE).and_then(Value::as_i64) == Some(f::TYPE_EDGE_AGENT);
        let heartbeat = record
            .get(f::HEARTBEAT)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let id = record.get(f::ID).and_then(Value::as_i64);

        if let (true, true, Some(id)) = (is_edge_agent, heartbeat, id) {
            let swarm = self.swarm_info(id)?;
            record.insert(f::SWARM.to_string(), Value::Object(swarm));
        }
        Ok(record)
    }

    /// Swarm descriptor of an environment, memoized per id.
    pub fn swarm_info(&self, environment_id: i64) -> Result<Record> {
        if let Some(cached) = self.swarms.borrow().get(&environment_id) {
            return Ok(cached.clone());
        }
        let swarm = self.swarm.inspect(environment_id)?;
        self.swarms
            .borrow_mut()
            .insert(environment_id, swarm.clone());
        Ok(swarm)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Record> {
        let record = self.crud.get_by_id(&ItemId::Int(id))?;
        self.enrich(record)
    }

    pub fn validate_single_item(&self, name: &str, operation: &str) -> Result<Option<Record>> {
        match self
            .crud
            .validate_single_item(name, operation, &Query::new(), &[])?
        {
            Some(record) => Ok(Some(self.enrich(record)?)),
            None => Ok(None),
        }
    }

    /// List environments matching the filter.
    pub fn list_filtered(&self, filter: &EnvironmentFilter) -> Result<Vec<Record>> {
        self.crud
            .list(&filter.to_query())?
            .into_iter()
            .map(|record| self.enrich(record))
            .collect()
    }

    /// Create with a multipart body; `TagIds` travels JSON-encoded.
    pub fn create(&self, name: &str, mut data: Record) -> Result<Record> {
        if let Some(tags) = data.get(f::TAG_IDS).filter(|v| v.is_array()) {
            let encoded = serde_json::to_string(tags)?;
            data.insert(f::TAG_IDS.to_string(), Value::String(encoded));
        }
        let record = self
            .crud
            .create(name, data, BodyFormat::FormData, &Query::new())?;
        self.enrich(record)
    }

    pub fn update(&self, id: i64, changes: Record) -> Result<Record> {
        let record = self
            .crud
            .update(&ItemId::Int(id), changes, &Query::new())?;
        self.enrich(record)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.crud.delete_by_id(&ItemId::Int(id), &Query::new())
    }
}
