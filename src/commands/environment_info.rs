//! Read-only environment listing

use super::{int_ids, resolve_refs};
use crate::cli::EnvironmentInfoArgs;
use declarative::{ApplyContext, Outcome, Reconciler};
use portainer::kinds::{GROUP, TAG};
use portainer::{Crud, EnvironmentFilter, Environments, Error, OnMissing, Transport};
use serde_json::Value;

pub struct EnvironmentInfo<'a> {
    environments: Environments<'a>,
    groups: Crud<'a>,
    tags: Crud<'a>,
    args: EnvironmentInfoArgs,
}

impl<'a> EnvironmentInfo<'a> {
    pub fn new(transport: &'a dyn Transport, args: EnvironmentInfoArgs) -> Self {
        Self {
            environments: Environments::new(transport),
            groups: Crud::new(transport, GROUP),
            tags: Crud::new(transport, TAG),
            args,
        }
    }

    /// Unknown group and tag names are ignored.
    fn filter(&self, dry_run: bool) -> Result<EnvironmentFilter, Error> {
        Ok(EnvironmentFilter {
            name: self.args.name.clone(),
            group_ids: int_ids(&resolve_refs(
                &self.groups,
                &self.args.groups,
                OnMissing::Skip,
                dry_run,
            )?),
            tag_ids: int_ids(&resolve_refs(&self.tags, &self.args.tags, OnMissing::Skip, dry_run)?),
        })
    }
}

impl Reconciler for EnvironmentInfo<'_> {
    type Error = Error;

    fn resource_key(&self) -> &'static str {
        "results"
    }

    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Error> {
        let args = &self.args;
        let results = if let Some(id) = args.id {
            vec![self.environments.get_by_id(id)?]
        } else if args.name.is_some() || !args.groups.is_empty() || !args.tags.is_empty() {
            self.environments
                .list_filtered(&self.filter(ctx.dry_run)?)?
        } else {
            return Err(Error::Validation(
                "one of the following is required: id, name, groups, tags".into(),
            ));
        };

        let results: Vec<Value> = results.into_iter().map(Value::Object).collect();
        Ok(Outcome::unchanged("Environments successfully retrieved!").with_after(results))
    }
}
