//! Argument checks that run before any request

use super::profile::{Identity, StackProfile};
use super::tracker::StackTracker;
use crate::cli::{StackArgs, StackState};
use portainer::{Error, StackSource, StackType};

pub struct StackValidator<'a> {
    args: &'a StackArgs,
    tracker: &'a StackTracker,
    profile: &'a StackProfile,
}

impl<'a> StackValidator<'a> {
    pub fn new(args: &'a StackArgs, tracker: &'a StackTracker, profile: &'a StackProfile) -> Self {
        Self {
            args,
            tracker,
            profile,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.present_requirements()?;
        self.new_stack_requirements()?;
        self.source_requirements()?;
        self.identity_requirements()
    }

    fn stack_type(&self) -> Option<StackType> {
        self.profile.flavor.map(|flavor| flavor.stack_type)
    }

    /// Whether the identity given could match an existing stack.
    fn maybe_exists(&self) -> bool {
        let t = self.tracker;
        let has_id = t.stack_id.is_some();
        let has_name = t.name.is_some();
        let has_endpoint = t.endpoint_id.is_some();
        let has_swarm = t.swarm_id.is_some();

        match self.stack_type() {
            Some(StackType::Swarm) => has_id || (has_name && (has_endpoint || has_swarm)),
            Some(StackType::Standalone) => has_id || (has_name && has_endpoint),
            None => false,
        }
    }

    fn present_requirements(&self) -> Result<(), Error> {
        if self.args.state != StackState::Present {
            return Ok(());
        }
        if self.profile.flavor.is_none() {
            return Err(Error::Validation(
                "state is present but all of the following are missing: type, source".into(),
            ));
        }
        if self.tracker.stack_id.is_none() && self.tracker.name.is_none() {
            return Err(Error::Validation(
                "state is present but any of the following are missing: stack_id, name".into(),
            ));
        }
        Ok(())
    }

    fn new_stack_requirements(&self) -> Result<(), Error> {
        if self.args.state != StackState::Present || self.maybe_exists() {
            return Ok(());
        }

        match self.stack_type() {
            Some(StackType::Standalone) if self.tracker.endpoint_id.is_none() => {
                Err(Error::Validation(
                    "Provide 'endpoint_id' when creating new standalone stacks.".into(),
                ))
            }
            Some(StackType::Swarm) => {
                let mut missing = Vec::new();
                if self.tracker.endpoint_id.is_none() {
                    missing.push("endpoint_id");
                }
                if self.tracker.swarm_id.is_none() {
                    missing.push("swarm_id");
                }
                if missing.is_empty() {
                    return Ok(());
                }
                Err(Error::Validation(format!(
                    "Provide {} when creating new swarm stacks.",
                    missing.join(" and ")
                )))
            }
            _ => Ok(()),
        }
    }

    fn source_requirements(&self) -> Result<(), Error> {
        if self.args.state != StackState::Present {
            return Ok(());
        }
        let args = self.args;

        match self.profile.flavor.map(|flavor| flavor.source) {
            Some(StackSource::File) if args.file.is_none() => {
                Err(Error::Validation("Provide 'file' for file-based stacks.".into()))
            }
            Some(StackSource::Repository) => {
                if !self.maybe_exists() {
                    let required = [
                        ("repository_url", args.repository_url.is_some()),
                        ("compose_file", args.compose_file.is_some()),
                        ("refs_name", args.refs_name.is_some()),
                        ("repository_authentication", args.repository_authentication.is_some()),
                    ];
                    let missing: Vec<&str> = required
                        .iter()
                        .filter(|(_, given)| !given)
                        .map(|(name, _)| *name)
                        .collect();
                    if !missing.is_empty() {
                        return Err(Error::Validation(format!(
                            "Provide {} for repository-based stacks.",
                            missing.join(", ")
                        )));
                    }
                }

                let given =
                    |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
                let has_credentials =
                    given(&args.repository_username) && given(&args.repository_password);
                if args.repository_authentication == Some(true) && !has_credentials {
                    return Err(Error::Validation(
                        "Provide 'repository_username' and 'repository_password' when repository_authentication is True."
                            .into(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn identity_requirements(&self) -> Result<(), Error> {
        let combinations = self.profile.required_one_of;
        if combinations.is_empty() {
            return Ok(());
        }

        let given = |identity: &Identity| match identity {
            Identity::StackId => self.tracker.stack_id.is_some(),
            Identity::Name => self.tracker.name.is_some(),
            Identity::EndpointId => self.tracker.endpoint_id.is_some(),
            Identity::SwarmId => self.tracker.swarm_id.is_some(),
        };
        if combinations.iter().any(|combination| combination.iter().all(given)) {
            return Ok(());
        }

        let accepted: Vec<String> = combinations
            .iter()
            .map(|combination| {
                combination
                    .iter()
                    .map(|identity| identity.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ")
            })
            .collect();
        Err(Error::Validation(format!(
            "Provide one of the required field combinations: {}",
            accepted.join(" or ")
        )))
    }
}
