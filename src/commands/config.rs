//! Swarm configs: base64 payloads, recreated on change with --force

use super::{fetch, id_of, require_name};
use crate::cli::{ConfigArgs, Presence};
use crate::content::{self, FileRole};
use base64::{Engine as _, engine::general_purpose};
use declarative::{ApplyContext, Outcome, Reconciler, needs_update};
use portainer::fields::config as f;
use portainer::kinds::CONFIG;
use portainer::record::{overlay, without};
use portainer::{BodyFormat, Crud, Error, ItemId, Query, Record, Transport};
use serde_json::Value;
use std::path::Path;

/// Base64 payload from inline content or a file.
///
/// Content flagged as already encoded is passed through unchanged.
pub(crate) fn encoded_payload(
    file: Option<&Path>,
    content: Option<&str>,
    already_encoded: bool,
) -> Result<Option<String>, Error> {
    let raw = match (file, content) {
        (Some(path), _) => content::read_text(path, FileRole::PAYLOAD)?,
        (None, Some(content)) => content.to_string(),
        (None, None) => return Ok(None),
    };
    if already_encoded {
        return Ok(Some(raw));
    }
    Ok(Some(general_purpose::STANDARD.encode(raw.as_bytes())))
}

pub struct ConfigReconciler<'a> {
    crud: Crud<'a>,
    args: ConfigArgs,
}

impl<'a> ConfigReconciler<'a> {
    pub fn new(transport: &'a dyn Transport, args: ConfigArgs) -> Self {
        let crud = Crud::new(transport, CONFIG);
        crud.set_environment(args.environment_id);
        Self { crud, args }
    }

    fn desired(&self) -> Result<Record, Error> {
        let mut record = Record::new();
        if let Some(name) = &self.args.name {
            record.insert(f::NAME.into(), Value::from(name.as_str()));
        }
        let data = encoded_payload(
            self.args.file.as_deref(),
            self.args.content.as_deref(),
            self.args.b64_encoded,
        )?;
        if let Some(data) = data {
            record.insert(f::DATA.into(), Value::from(data));
        }
        Ok(record)
    }

    fn create(&self, ctx: &ApplyContext, desired: Record) -> Result<Value, Error> {
        if !ctx.should_mutate() {
            return Ok(Value::Object(desired));
        }
        let name = require_name(self.args.name.as_deref(), "config")?;
        let payload = without(&desired, &[f::NAME]);
        let created = self
            .crud
            .create(name, payload, BodyFormat::Json, &Query::new())?;
        Ok(Value::Object(overlay(&desired, &created)))
    }
}

impl Reconciler for ConfigReconciler<'_> {
    type Error = Error;

    fn resource_key(&self) -> &'static str {
        "config"
    }

    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        let current = fetch(
            &self.crud,
            self.args.id.clone().map(ItemId::from),
            self.args.name.as_deref(),
        )?;

        if self.args.state == Presence::Absent {
            let Some(config) = current else {
                return Ok(Outcome::unchanged("Config does not exists"));
            };
            if ctx.should_mutate() {
                self.crud
                    .delete_by_id(&id_of(&self.crud, &config)?, &Query::new())?;
            }
            return Ok(Outcome::changed("Config deleted")
                .with_before(config.clone())
                .with_after(config));
        }

        let desired = self.desired()?;
        if !desired.contains_key(f::DATA) {
            return Err(Error::Validation(
                "state is present but any of the following are missing: file, content".into(),
            ));
        }

        let Some(config) = current else {
            let after = self.create(ctx, desired)?;
            return Ok(Outcome::changed("Config created.").with_after(after));
        };

        if needs_update(&config, &desired, &[]).is_empty() {
            return Ok(Outcome::unchanged("Config already exists.")
                .with_before(config.clone())
                .with_after(config));
        }

        if !self.args.force {
            return Ok(Outcome::unchanged("Config already exists. Update skipped.")
                .with_before(config.clone())
                .with_after(config)
                .warn(
                    "The content of the config was not updated. In order to recreate the config use force: true.",
                ));
        }

        if ctx.should_mutate() {
            self.crud
                .delete_by_id(&id_of(&self.crud, &config)?, &Query::new())?;
        }
        let after = self.create(ctx, desired)?;
        Ok(Outcome::changed("Config updated.")
            .with_before(config)
            .with_after(after))
    }
}
