//! Stack requests scoped by the tracked identity

use super::tracker::StackTracker;
use portainer::fields::stack as f;
use portainer::transport::Form;
use portainer::{Body, BodyFormat, Flavor, Record, Result, Stacks, Transport};
use serde_json::Value;

const STACK_FILE_MIME: &str = "application/x-yaml";

pub struct StackRepository<'a> {
    stacks: Stacks<'a>,
}

impl<'a> StackRepository<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            stacks: Stacks::new(transport),
        }
    }

    /// Look the stack up by id, or by name within its swarm or environment.
    pub fn find(&self, tracker: &StackTracker) -> Result<Option<Record>> {
        if let Some(id) = tracker.stack_id {
            return match self.stacks.get_by_id(id) {
                Ok(record) => Ok(Some(record)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(e),
            };
        }
        let Some(name) = tracker.name.as_deref() else {
            return Ok(None);
        };
        self.stacks
            .lookup(name, tracker.swarm_id.as_deref(), tracker.endpoint_id)
    }

    pub fn file_content(&self, id: i64) -> Result<String> {
        self.stacks.file_content(id)
    }

    pub fn create(
        &self,
        flavor: Flavor,
        format: BodyFormat,
        data: Record,
        stack_file: Option<&str>,
        endpoint_id: Option<i64>,
    ) -> Result<Record> {
        let body = match format {
            BodyFormat::Json => Body::json(data),
            BodyFormat::FormData => Body::Multipart(multipart(&data, stack_file)),
        };
        self.stacks.create(flavor, body, endpoint_id)
    }

    pub fn update(
        &self,
        flavor: Flavor,
        id: i64,
        data: Record,
        endpoint_id: Option<i64>,
    ) -> Result<Record> {
        self.stacks.update(flavor, id, data, endpoint_id)
    }

    pub fn redeploy(
        &self,
        flavor: Flavor,
        id: i64,
        data: Record,
        endpoint_id: Option<i64>,
    ) -> Result<Record> {
        self.stacks.redeploy(flavor, id, data, endpoint_id)
    }

    pub fn delete(&self, id: i64, endpoint_id: Option<i64>) -> Result<()> {
        self.stacks.delete(id, endpoint_id)
    }

    pub fn start(&self, id: i64, endpoint_id: Option<i64>) -> Result<Record> {
        self.stacks.start(id, endpoint_id)
    }

    pub fn stop(&self, id: i64, endpoint_id: Option<i64>) -> Result<Record> {
        self.stacks.stop(id, endpoint_id)
    }
}

/// Form-data create payload. `Env` travels as a JSON string and the
/// compose file as a file part.
fn multipart(data: &Record, stack_file: Option<&str>) -> Form {
    let mut form = Form::new();
    for (key, value) in data {
        match key.as_str() {
            f::FILE => {}
            f::ENV => form.push_value(key, &Value::from(value.to_string())),
            _ => form.push_value(key, value),
        }
    }
    match stack_file {
        Some(content) => form.file(f::FILE, f::FILE, content.as_bytes().to_vec(), STACK_FILE_MIME),
        None => form,
    }
}
