//! Resource kind descriptors.
//!
//! Each managed kind is a small capability descriptor composed into the
//! generic [`Crud`](crate::crud::Crud) handle: where it lives, which fields
//! carry its name and id, how its create and update routes are shaped, and
//! how read shapes are normalized into write shapes.

use crate::fields;
use crate::record::Record;
use crate::{docker, environment, stack};

/// Shape of the create route relative to the base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateRoute {
    /// POST `{base}`.
    Base,
    /// POST `{base}{suffix}`.
    Suffix(&'static str),
}

/// Shape of the update route relative to the item path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRoute {
    /// PUT `{base}/{id}`.
    Item,
    /// POST `{base}/{id}{suffix}`.
    ItemSuffix(&'static str),
}

/// Capability descriptor of one resource kind.
#[derive(Debug, Clone, Copy)]
pub struct ResourceKind {
    /// Label used in messages ("tag", "swarm config", ...).
    pub label: &'static str,
    /// Collection path, or the Docker subpath for proxied kinds.
    pub path: &'static str,
    pub name_field: &'static str,
    pub id_field: &'static str,
    /// Reached through `/endpoints/{id}/docker`.
    pub proxied: bool,
    pub create_route: CreateRoute,
    pub update_route: UpdateRoute,
    /// Applied to every record read or returned by a write.
    pub normalize: fn(&mut Record),
}

impl ResourceKind {
    /// Label with its first letter uppercased.
    pub fn title(&self) -> String {
        let mut chars = self.label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

fn identity(_: &mut Record) {}

pub const TAG: ResourceKind = ResourceKind {
    label: "tag",
    path: "/tags",
    name_field: fields::tag::NAME,
    id_field: fields::tag::ID,
    proxied: false,
    create_route: CreateRoute::Base,
    update_route: UpdateRoute::Item,
    normalize: identity,
};

pub const GROUP: ResourceKind = ResourceKind {
    label: "group",
    path: "/endpoint_groups",
    name_field: fields::group::NAME,
    id_field: fields::group::ID,
    proxied: false,
    create_route: CreateRoute::Base,
    update_route: UpdateRoute::Item,
    normalize: identity,
};

pub const ENVIRONMENT: ResourceKind = ResourceKind {
    label: "environment",
    path: "/endpoints",
    name_field: fields::environment::NAME,
    id_field: fields::environment::ID,
    proxied: false,
    create_route: CreateRoute::Base,
    update_route: UpdateRoute::Item,
    normalize: environment::flatten_tls_config,
};

/// Stack routes depend on type and source; see [`crate::stack::Stacks`].
pub const STACK: ResourceKind = ResourceKind {
    label: "stack",
    path: "/stacks",
    name_field: fields::stack::NAME,
    id_field: fields::stack::ID,
    proxied: false,
    create_route: CreateRoute::Base,
    update_route: UpdateRoute::Item,
    normalize: stack::flatten_git_config,
};

pub const SWARM: ResourceKind = ResourceKind {
    label: "swarm",
    path: "/swarm",
    name_field: fields::swarm::NAME,
    id_field: fields::swarm::ID,
    proxied: true,
    create_route: CreateRoute::Suffix("/create"),
    update_route: UpdateRoute::ItemSuffix("/update"),
    normalize: docker::project_swarm_name,
};

pub const CONFIG: ResourceKind = ResourceKind {
    label: "swarm config",
    path: "/configs",
    name_field: fields::config::NAME,
    id_field: fields::config::ID,
    proxied: true,
    create_route: CreateRoute::Suffix("/create"),
    update_route: UpdateRoute::ItemSuffix("/update"),
    normalize: docker::project_config_spec,
};

pub const SECRET: ResourceKind = ResourceKind {
    label: "swarm secret",
    path: "/secrets",
    name_field: fields::secret::NAME,
    id_field: fields::secret::ID,
    proxied: true,
    create_route: CreateRoute::Suffix("/create"),
    update_route: UpdateRoute::ItemSuffix("/update"),
    normalize: docker::project_spec_name,
};

pub const NETWORK: ResourceKind = ResourceKind {
    label: "docker network",
    path: "/networks",
    name_field: fields::network::NAME,
    id_field: fields::network::ID,
    proxied: true,
    create_route: CreateRoute::Suffix("/create"),
    update_route: UpdateRoute::ItemSuffix("/update"),
    normalize: docker::project_spec_name,
};
