//! Per-flavor key sets: what each action sends and what change detection skips

use portainer::fields::stack as f;
use portainer::{BodyFormat, Error, Flavor, StackSource, StackType};

/// Identity argument named in a required combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    StackId,
    Name,
    EndpointId,
    SwarmId,
}

impl Identity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StackId => "stack_id",
            Self::Name => "name",
            Self::EndpointId => "endpoint_id",
            Self::SwarmId => "swarm_id",
        }
    }
}

/// Combinations accepted when a stack is addressed without type and source.
const IDENTITY_COMBINATIONS: &[&[Identity]] = &[
    &[Identity::StackId],
    &[Identity::Name, Identity::EndpointId],
    &[Identity::Name, Identity::SwarmId],
];

const REPOSITORY_SETTINGS: [&str; 6] = [
    f::AUTO_UPDATE,
    f::REPOSITORY_AUTHENTICATION,
    f::REPOSITORY_PASSWORD,
    f::REPOSITORY_REFERENCE_NAME,
    f::REPOSITORY_USERNAME,
    f::TLS_SKIP_VERIFY,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackProfile {
    pub flavor: Option<Flavor>,
    pub create_keys: Vec<&'static str>,
    pub update_keys: Vec<&'static str>,
    pub redeploy_keys: Vec<&'static str>,
    pub body_format: BodyFormat,
    pub skip_fields: Vec<&'static str>,
    pub required_one_of: &'static [&'static [Identity]],
}

impl StackProfile {
    /// Profile for a requested type and source.
    ///
    /// Neither given addresses an existing stack by identity only; exactly
    /// one given is rejected.
    pub fn new(stack_type: Option<StackType>, source: Option<StackSource>) -> Result<Self, Error> {
        match (stack_type, source) {
            (Some(stack_type), Some(source)) => {
                Ok(Self::for_flavor(Flavor::new(stack_type, source)))
            }
            (None, None) => Ok(Self::identity()),
            (stack_type, source) => Err(Error::Validation(format!(
                "Unsupported stack configuration: type={} source={}",
                stack_type.map_or("none", |t| t.as_str()),
                source.map_or("none", |s| s.as_str()),
            ))),
        }
    }

    /// Stack addressed by identity only; nothing is sent until its flavor
    /// is known.
    pub fn identity() -> Self {
        Self {
            flavor: None,
            create_keys: Vec::new(),
            update_keys: Vec::new(),
            redeploy_keys: Vec::new(),
            body_format: BodyFormat::Json,
            skip_fields: f::BOOKKEEPING.to_vec(),
            required_one_of: IDENTITY_COMBINATIONS,
        }
    }

    pub fn for_flavor(flavor: Flavor) -> Self {
        let swarm = flavor.stack_type == StackType::Swarm;
        let mut skip_fields = f::BOOKKEEPING.to_vec();

        match flavor.source {
            StackSource::File => {
                let mut create_keys = vec![f::NAME, f::ENV, f::FILE];
                if swarm {
                    create_keys.push(f::SWARM_ID_FORM_DATA);
                }
                skip_fields.push(f::FILE);
                Self {
                    flavor: Some(flavor),
                    create_keys,
                    update_keys: vec![f::ENV, f::PRUNE, f::PULL_IMAGE, f::FILE_CONTENT],
                    redeploy_keys: Vec::new(),
                    body_format: BodyFormat::FormData,
                    skip_fields,
                    required_one_of: &[],
                }
            }
            StackSource::Repository => {
                let mut create_keys = vec![
                    f::NAME,
                    f::ADDITIONAL_FILES,
                    f::COMPOSE_FILE,
                    f::REPOSITORY_URL,
                    f::ENV,
                    f::PRUNE,
                ];
                create_keys.extend(REPOSITORY_SETTINGS);
                if swarm {
                    create_keys.push(f::SWARM_ID);
                }

                let mut update_keys = vec![f::ENV, f::PRUNE];
                update_keys.extend(REPOSITORY_SETTINGS);
                update_keys.push(f::REPOSITORY_AUTHORIZATION_TYPE);

                let mut redeploy_keys = update_keys.clone();
                redeploy_keys.push(f::PULL_IMAGE);

                skip_fields.push(f::REPOSITORY_PASSWORD);
                Self {
                    flavor: Some(flavor),
                    create_keys,
                    update_keys,
                    redeploy_keys,
                    body_format: BodyFormat::Json,
                    skip_fields,
                    required_one_of: &[],
                }
            }
        }
    }

    pub fn is_repository(&self) -> bool {
        self.flavor
            .is_some_and(|flavor| flavor.source == StackSource::Repository)
    }
}
