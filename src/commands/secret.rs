//! Swarm secrets: write-only payloads, recreated only with --force

use super::config::encoded_payload;
use super::{fetch, id_of, require_name};
use crate::cli::{Presence, SecretArgs};
use declarative::{ApplyContext, Outcome, Reconciler};
use portainer::fields::secret as f;
use portainer::kinds::SECRET;
use portainer::record::{overlay, without};
use portainer::{BodyFormat, Crud, Error, ItemId, Query, Record, Transport};
use serde_json::Value;

/// Stand-in for secret data in reports.
const MASK: &str = "***";

pub struct SecretReconciler<'a> {
    crud: Crud<'a>,
    args: SecretArgs,
}

impl<'a> SecretReconciler<'a> {
    pub fn new(transport: &'a dyn Transport, args: SecretArgs) -> Self {
        let crud = Crud::new(transport, SECRET);
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

    fn create(&self, ctx: &ApplyContext, desired: Record) -> Result<Record, Error> {
        let after = if ctx.should_mutate() {
            let name = require_name(self.args.name.as_deref(), "secret")?;
            let created = self.crud.create(
                name,
                without(&desired, &[f::NAME]),
                BodyFormat::Json,
                &Query::new(),
            )?;
            overlay(&desired, &created)
        } else {
            desired
        };
        Ok(masked(after))
    }
}

fn masked(mut record: Record) -> Record {
    if record.contains_key(f::DATA) {
        record.insert(f::DATA.into(), Value::from(MASK));
    }
    record
}

impl Reconciler for SecretReconciler<'_> {
    type Error = Error;

    fn resource_key(&self) -> &'static str {
        "secret"
    }

    fn diff_skip_fields(&self) -> &[&'static str] {
        &[f::DATA]
    }

    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        let current = fetch(
            &self.crud,
            self.args.id.clone().map(ItemId::from),
            self.args.name.as_deref(),
        )?;

        if self.args.state == Presence::Absent {
            let Some(secret) = current else {
                return Ok(Outcome::unchanged("Secret does not exists"));
            };
            if ctx.should_mutate() {
                self.crud
                    .delete_by_id(&id_of(&self.crud, &secret)?, &Query::new())?;
            }
            return Ok(Outcome::changed("Secret deleted")
                .with_before(secret.clone())
                .with_after(secret));
        }

        let desired = self.desired()?;
        if !desired.contains_key(f::DATA) {
            return Err(Error::Validation(
                "state is present but any of the following are missing: file, content".into(),
            ));
        }

        // Docker never returns secret data, so existing secrets cannot be compared.
        match current {
            None => {
                let after = self.create(ctx, desired)?;
                Ok(Outcome::changed("Secret created.").with_after(after))
            }
            Some(secret) if !self.args.force => {
                Ok(Outcome::unchanged("Secret already exists. Update skipped.")
                    .with_before(secret.clone())
                    .with_after(secret)
                    .warn(
                        "The content of the secret was not updated. In order to recreate the secret use force: true.",
                    ))
            }
            Some(secret) => {
                if ctx.should_mutate() {
                    self.crud
                        .delete_by_id(&id_of(&self.crud, &secret)?, &Query::new())?;
                }
                let after = self.create(ctx, desired)?;
                Ok(Outcome::changed("Secret updated.")
                    .with_before(secret)
                    .with_after(after))
            }
        }
    }
}
