//! Action payloads: desired values overlaid on the fetched stack

use super::profile::StackProfile;
use super::tracker::StackTracker;
use crate::cli::StackArgs;
use crate::content::{self, FileRole};
use portainer::fields::stack as f;
use portainer::record::{drop_nulls, restrict};
use portainer::{Record, Result};
use serde_json::{Value, json};

pub struct StackDataBuilder {
    args: StackArgs,
    stack_file: Option<String>,
}

impl StackDataBuilder {
    pub fn new(args: StackArgs) -> Self {
        Self {
            args,
            stack_file: None,
        }
    }

    pub fn args(&self) -> &StackArgs {
        &self.args
    }

    pub fn create_data(
        &mut self,
        profile: &StackProfile,
        tracker: &StackTracker,
    ) -> Result<Record> {
        self.data_for(&profile.create_keys, tracker)
    }

    pub fn update_data(
        &mut self,
        profile: &StackProfile,
        tracker: &StackTracker,
    ) -> Result<Record> {
        self.data_for(&profile.update_keys, tracker)
    }

    pub fn redeploy_data(
        &mut self,
        profile: &StackProfile,
        tracker: &StackTracker,
    ) -> Result<Record> {
        self.data_for(&profile.redeploy_keys, tracker)
    }

    /// Fetched stack as compared against update data, including the
    /// deployed compose file when one was fetched.
    pub fn current(tracker: &StackTracker) -> Record {
        let mut record = tracker.old_stack.raw_record();
        if let Some(remote) = &tracker.remote_file {
            record.insert(f::FILE_CONTENT.into(), Value::from(remote.as_str()));
        }
        record
    }

    /// Local compose file, read and validated on first use.
    pub fn stack_file(&mut self) -> Result<Option<&str>> {
        if self.stack_file.is_none()
            && let Some(path) = &self.args.file
        {
            self.stack_file = Some(content::read_text(path, FileRole::STACK)?);
        }
        Ok(self.stack_file.as_deref())
    }

    /// Fetched values restricted to `keys`, overlaid with every desired
    /// value that is set.
    fn data_for(&mut self, keys: &[&'static str], tracker: &StackTracker) -> Result<Record> {
        let mut data = restrict(&Self::current(tracker), keys);
        for key in keys {
            if let Some(value) = self.desired(key, tracker)? {
                data.insert((*key).to_string(), value);
            }
        }
        Ok(drop_nulls(data))
    }

    fn desired(&mut self, key: &str, tracker: &StackTracker) -> Result<Option<Value>> {
        match key {
            f::FILE => {
                self.stack_file()?;
                let path = self.args.file.as_ref();
                return Ok(path.map(|path| Value::from(path.display().to_string())));
            }
            f::FILE_CONTENT => return Ok(self.stack_file()?.map(Value::from)),
            _ => {}
        }

        let args = &self.args;
        let text = |value: &Option<String>| value.as_deref().map(Value::from);

        let value = match key {
            f::NAME => text(&tracker.name),
            f::ENV if !args.env.is_empty() => Some(Value::Array(
                args.env
                    .iter()
                    .map(|var| json!({"name": var.name, "value": var.value}))
                    .collect(),
            )),
            f::PRUNE => args.prune.map(Value::from),
            f::PULL_IMAGE => args.pull_images.map(Value::from),
            f::ADDITIONAL_FILES if !args.additional_files.is_empty() => {
                Some(Value::from(args.additional_files.clone()))
            }
            f::AUTO_UPDATE => args.autoupdate.clone(),
            f::COMPOSE_FILE => text(&args.compose_file),
            f::REPOSITORY_AUTHENTICATION => args.repository_authentication.map(Value::from),
            f::REPOSITORY_PASSWORD => text(&args.repository_password),
            f::REPOSITORY_REFERENCE_NAME => text(&args.refs_name),
            f::REPOSITORY_URL => text(&args.repository_url),
            f::REPOSITORY_USERNAME => text(&args.repository_username),
            f::SWARM_ID | f::SWARM_ID_FORM_DATA => text(&tracker.swarm_id),
            f::TLS_SKIP_VERIFY => args.tls_skip_verify.map(Value::from),
            _ => None,
        };
        Ok(value)
    }
}
