//! Stacks: file or repository sourced, swarm or standalone
//!
//! The reconciler is split along the way a stack request is handled:
//! [`profile`] picks the keys each action sends, [`validator`] checks the
//! arguments before any request, [`tracker`] holds the identity and the
//! before/after state, [`builder`] assembles payloads and [`repository`]
//! issues the requests.

mod builder;
mod model;
mod profile;
mod repository;
mod tracker;
mod validator;

use super::require_name;
use crate::cli::{StackArgs, StackState};
use builder::StackDataBuilder;
use declarative::{ApplyContext, Outcome, Reconciler, needs_update};
use portainer::fields::stack as f;
use portainer::record::drop_nulls;
use portainer::{BodyFormat, Error, Flavor, Record, StackSource, Transport};
use profile::StackProfile;
use repository::StackRepository;
use serde_json::Value;
use tracker::StackTracker;
use validator::StackValidator;

pub struct StackReconciler<'a> {
    repository: StackRepository<'a>,
    profile: StackProfile,
    tracker: StackTracker,
    data: StackDataBuilder,
}

impl<'a> StackReconciler<'a> {
    pub fn new(transport: &'a dyn Transport, args: StackArgs) -> Self {
        Self {
            repository: StackRepository::new(transport),
            profile: StackProfile::identity(),
            tracker: StackTracker::new(&args),
            data: StackDataBuilder::new(args),
        }
    }

    fn state(&self) -> StackState {
        self.data.args().state
    }

    fn flavor(&self) -> Result<Flavor, Error> {
        self.profile
            .flavor
            .ok_or_else(|| Error::Validation("stack type and source are required".into()))
    }

    fn stack_id(&self) -> Result<i64, Error> {
        self.tracker
            .stack
            .id
            .ok_or_else(|| Error::InvalidResponse("stack record has no Id".into()))
    }

    /// Fetch the stack and pick up everything it tells about itself.
    fn load(&mut self) -> Result<(), Error> {
        let Some(record) = self.repository.find(&self.tracker)? else {
            return Ok(());
        };
        self.tracker.load(&record);

        if self.profile.flavor.is_none()
            && let Some(flavor) = Flavor::infer(&record)
        {
            log::debug!(
                "Stack {} inferred as {} {}",
                self.stack_id()?,
                flavor.stack_type,
                flavor.source
            );
            self.profile = StackProfile::for_flavor(flavor);
        }

        let compares_file = matches!(self.state(), StackState::Present | StackState::Redeployed);
        let file_sourced = self
            .profile
            .flavor
            .is_some_and(|flavor| flavor.source == StackSource::File);
        if compares_file && file_sourced {
            self.tracker.remote_file = Some(self.repository.file_content(self.stack_id()?)?);
        }
        Ok(())
    }

    fn ensure_present(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        if !self.tracker.exists() {
            let name = require_name(self.tracker.name.as_deref(), "stack")?.to_string();
            let data = self.data.create_data(&self.profile, &self.tracker)?;
            if ctx.should_mutate() {
                let flavor = self.flavor()?;
                log::info!("Creating {} {} stack {}", flavor.stack_type, flavor.source, name);
                let stack_file = match self.profile.body_format {
                    BodyFormat::FormData => self.data.stack_file()?,
                    BodyFormat::Json => None,
                };
                let created = self.repository.create(
                    flavor,
                    self.profile.body_format,
                    data,
                    stack_file,
                    self.tracker.endpoint_id,
                )?;
                self.tracker.update_state(&created);
            }
            return Ok(Outcome::changed("Stack created."));
        }

        let desired = self.data.update_data(&self.profile, &self.tracker)?;
        let changes = needs_update(
            &StackDataBuilder::current(&self.tracker),
            &desired,
            &self.profile.skip_fields,
        );
        let password_refresh = self.profile.is_repository() && self.data.args().update_password;
        if changes.is_empty() && !password_refresh {
            return Ok(Outcome::unchanged("Stack already exists with correct configuration."));
        }

        if !changes.is_empty() {
            log::info!("Stack {} differs: {}", self.stack_id()?, changes.summary());
        }
        if ctx.should_mutate() {
            let updated = self.repository.update(
                self.flavor()?,
                self.stack_id()?,
                desired,
                self.tracker.endpoint_id,
            )?;
            self.tracker.update_state(&updated);
        } else {
            self.tracker.update_state(changes.as_record());
        }
        Ok(Outcome::changed("Stack updated."))
    }

    fn ensure_absent(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        if !self.tracker.exists() {
            return Ok(Outcome::unchanged("Stack does not exist"));
        }
        if ctx.should_mutate() {
            self.repository
                .delete(self.stack_id()?, self.tracker.endpoint_id)?;
        }
        Ok(Outcome::changed("Stack deleted"))
    }

    fn ensure_redeployed(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        if !self.tracker.exists() {
            return Err(Error::failed("Cannot redeploy an inexistent stack."));
        }
        if ctx.should_mutate() {
            let (flavor, id) = (self.flavor()?, self.stack_id()?);
            let redeployed = if self.profile.is_repository() {
                let data = self.data.redeploy_data(&self.profile, &self.tracker)?;
                self.repository
                    .redeploy(flavor, id, data, self.tracker.endpoint_id)?
            } else {
                let data = self.data.update_data(&self.profile, &self.tracker)?;
                self.repository
                    .update(flavor, id, data, self.tracker.endpoint_id)?
            };
            self.tracker.update_state(&redeployed);
        }
        Ok(Outcome::changed("Stack redeployed."))
    }

    fn ensure_started(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        if !self.tracker.exists() {
            return Err(Error::failed("Cannot start a non-existent stack."));
        }
        if self.tracker.stack.is_running() {
            return Ok(Outcome::unchanged("Stack is already running"));
        }
        if ctx.should_mutate() {
            let started = self
                .repository
                .start(self.stack_id()?, self.tracker.endpoint_id)?;
            self.tracker.update_state(&started);
        }
        Ok(Outcome::changed("Stack started"))
    }

    fn ensure_stopped(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        if !self.tracker.exists() {
            return Err(Error::failed("Cannot stop a non-existent stack."));
        }
        if self.tracker.stack.is_stopped() {
            return Ok(Outcome::unchanged("Stack is not running"));
        }
        if ctx.should_mutate() {
            let stopped = self
                .repository
                .stop(self.stack_id()?, self.tracker.endpoint_id)?;
            self.tracker.update_state(&stopped);
        }
        Ok(Outcome::changed("Stack stopped"))
    }

    /// Tracked stack, or what would have been created when nothing is tracked.
    fn output(&mut self) -> Result<Record, Error> {
        let record = self.tracker.stack.to_record();
        if !record.is_empty() {
            return Ok(record);
        }

        let mut synthesized = Record::new();
        synthesized.insert(f::ID.into(), self.tracker.stack_id.map_or(Value::Null, Value::from));
        synthesized.insert(
            f::ENDPOINT_ID.into(),
            self.tracker.endpoint_id.map_or(Value::Null, Value::from),
        );
        synthesized.insert(
            f::SWARM_ID.into(),
            self.tracker
                .swarm_id
                .as_deref()
                .map_or(Value::Null, Value::from),
        );
        synthesized.extend(self.data.create_data(&self.profile, &self.tracker)?);
        Ok(drop_nulls(synthesized))
    }
}

impl Reconciler for StackReconciler<'_> {
    type Error = Error;

    fn resource_key(&self) -> &'static str {
        "stack"
    }

    fn diff_skip_fields(&self) -> &[&'static str] {
        &self.profile.skip_fields
    }

    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        let args = self.data.args();
        self.profile =
            StackProfile::new(args.stack_type.map(Into::into), args.source.map(Into::into))?;
        StackValidator::new(self.data.args(), &self.tracker, &self.profile).validate()?;

        self.load()?;

        let outcome = match self.state() {
            StackState::Present => self.ensure_present(ctx)?,
            StackState::Absent => self.ensure_absent(ctx)?,
            StackState::Redeployed => self.ensure_redeployed(ctx)?,
            StackState::Started => self.ensure_started(ctx)?,
            StackState::Stopped => self.ensure_stopped(ctx)?,
        };

        let after = self.output()?;
        Ok(outcome
            .with_before(self.tracker.old_stack.to_record())
            .with_after(after))
    }
}
