//! Typed view of a stack record

use portainer::Record;
use portainer::fields::stack as f;
use serde_json::Value;

/// `Status` of a running stack.
pub const RUNNING: i64 = 1;
/// `Status` of a stopped stack.
pub const STOPPED: i64 = 2;

const MASK: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Name,
    Env,
    Prune,
    PullImages,
    AdditionalFiles,
    AutoUpdate,
    ComposeFile,
    RepAuthentication,
    RepPassword,
    RepRefsName,
    RepUrl,
    RepUsername,
    SwarmId,
    EndpointId,
    TlsSkipVerify,
    Status,
}

/// Record key to field. Swarm and environment ids are listed under both
/// their JSON and their form/query spelling.
const FIELDS: [(&str, Field); 19] = [
    (f::ID, Field::Id),
    (f::NAME, Field::Name),
    (f::ENV, Field::Env),
    (f::PRUNE, Field::Prune),
    (f::PULL_IMAGE, Field::PullImages),
    (f::ADDITIONAL_FILES, Field::AdditionalFiles),
    (f::AUTO_UPDATE, Field::AutoUpdate),
    (f::COMPOSE_FILE, Field::ComposeFile),
    (f::REPOSITORY_AUTHENTICATION, Field::RepAuthentication),
    (f::REPOSITORY_PASSWORD, Field::RepPassword),
    (f::REPOSITORY_REFERENCE_NAME, Field::RepRefsName),
    (f::REPOSITORY_URL, Field::RepUrl),
    (f::REPOSITORY_USERNAME, Field::RepUsername),
    (f::SWARM_ID, Field::SwarmId),
    (f::SWARM_ID_FORM_DATA, Field::SwarmId),
    (f::ENDPOINT_ID, Field::EndpointId),
    (f::ENDPOINT_ID_QUERY, Field::EndpointId),
    (f::TLS_SKIP_VERIFY, Field::TlsSkipVerify),
    (f::STATUS, Field::Status),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub env: Option<Value>,
    pub prune: Option<bool>,
    pub pull_images: Option<bool>,
    pub additional_files: Option<Value>,
    pub autoupdate: Option<Value>,
    pub compose_file: Option<String>,
    pub rep_authentication: Option<bool>,
    pub rep_password: Option<String>,
    pub rep_refs_name: Option<String>,
    pub rep_url: Option<String>,
    pub rep_username: Option<String>,
    pub swarm_id: Option<String>,
    pub endpoint_id: Option<i64>,
    pub tls_skip_verify: Option<bool>,
    pub status: Option<i64>,
}

impl Stack {
    pub fn from_record(record: &Record) -> Self {
        let mut stack = Self::default();
        stack.update_from_record(record);
        stack
    }

    /// Copy every known key; unknown keys are ignored.
    pub fn update_from_record(&mut self, record: &Record) {
        for (key, value) in record {
            if let Some((_, field)) = FIELDS.iter().find(|(k, _)| k == key) {
                self.set(*field, value);
            }
        }
    }

    /// Record view for reports, with the repository password masked.
    pub fn to_record(&self) -> Record {
        let mut record = self.raw_record();
        if record.contains_key(f::REPOSITORY_PASSWORD) {
            record.insert(f::REPOSITORY_PASSWORD.into(), Value::from(MASK));
        }
        record
    }

    /// Every set field under every key mapped to it.
    pub fn raw_record(&self) -> Record {
        FIELDS
            .iter()
            .filter_map(|(key, field)| self.get(*field).map(|value| ((*key).to_string(), value)))
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.status == Some(RUNNING)
    }

    pub fn is_stopped(&self) -> bool {
        self.status == Some(STOPPED)
    }

    fn get(&self, field: Field) -> Option<Value> {
        match field {
            Field::Id => self.id.map(Value::from),
            Field::Name => self.name.clone().map(Value::from),
            Field::Env => self.env.clone(),
            Field::Prune => self.prune.map(Value::from),
            Field::PullImages => self.pull_images.map(Value::from),
            Field::AdditionalFiles => self.additional_files.clone(),
            Field::AutoUpdate => self.autoupdate.clone(),
            Field::ComposeFile => self.compose_file.clone().map(Value::from),
            Field::RepAuthentication => self.rep_authentication.map(Value::from),
            Field::RepPassword => self.rep_password.clone().map(Value::from),
            Field::RepRefsName => self.rep_refs_name.clone().map(Value::from),
            Field::RepUrl => self.rep_url.clone().map(Value::from),
            Field::RepUsername => self.rep_username.clone().map(Value::from),
            Field::SwarmId => self.swarm_id.clone().map(Value::from),
            Field::EndpointId => self.endpoint_id.map(Value::from),
            Field::TlsSkipVerify => self.tls_skip_verify.map(Value::from),
            Field::Status => self.status.map(Value::from),
        }
    }

    fn set(&mut self, field: Field, value: &Value) {
        let text = || value.as_str().filter(|s| !s.is_empty()).map(str::to_string);
        let json = || (!value.is_null()).then(|| value.clone());
        match field {
            Field::Id => self.id = value.as_i64(),
            Field::Name => self.name = text(),
            Field::Env => self.env = json(),
            Field::Prune => self.prune = value.as_bool(),
            Field::PullImages => self.pull_images = value.as_bool(),
            Field::AdditionalFiles => self.additional_files = json(),
            Field::AutoUpdate => self.autoupdate = json(),
            Field::ComposeFile => self.compose_file = text(),
            Field::RepAuthentication => self.rep_authentication = value.as_bool(),
            Field::RepPassword => self.rep_password = text(),
            Field::RepRefsName => self.rep_refs_name = text(),
            Field::RepUrl => self.rep_url = text(),
            Field::RepUsername => self.rep_username = text(),
            Field::SwarmId => self.swarm_id = text(),
            Field::EndpointId => self.endpoint_id = value.as_i64(),
            Field::TlsSkipVerify => self.tls_skip_verify = value.as_bool(),
            Field::Status => self.status = value.as_i64(),
        }
    }
}
