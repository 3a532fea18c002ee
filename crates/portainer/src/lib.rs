//! # portainer
//!
//! Blocking client for the Portainer management API.
//!
//! This crate provides:
//! - A [`Transport`] abstraction with a live ureq backend and an in-memory mock
//! - A generic [`Crud`] resource configured by [`ResourceKind`] descriptors
//! - Adapters for kinds whose behavior needs more than a descriptor:
//!   environments, stacks and the swarm descriptor
//!
//! ## Example
//!
//! ```no_run
//! use portainer::kinds::TAG;
//! use portainer::transport::{Query, http::HttpTransport};
//! use portainer::Crud;
//! use std::time::Duration;
//!
//! let timeout = Duration::from_secs(30);
//! let transport = HttpTransport::new("https://portainer:9443", "ptr_token", timeout, false);
//! transport.ping().expect("portainer not reachable");
//!
//! let tags = Crud::new(&transport, TAG);
//! for tag in tags.list(&Query::new()).expect("listing failed") {
//!     println!("{}", tag["Name"]);
//! }
//! ```
//!
//! ## Docker-proxied kinds
//!
//! Networks, configs, secrets and the swarm descriptor live behind
//! `/endpoints/{id}/docker`. Set the target once with
//! [`Crud::set_environment`], or redirect it for a scope with
//! [`Crud::using_environment`].

pub mod crud;
pub mod docker;
pub mod environment;
pub mod error;
pub mod fields;
pub mod kinds;
pub mod record;
pub mod stack;
pub mod transport;

pub use crud::{Crud, EnvironmentGuard, OnMissing, Resolved};
pub use docker::Swarm;
pub use environment::{EnvironmentFilter, Environments};
pub use error::{Error, ErrorCategory, Result};
pub use kinds::ResourceKind;
pub use record::{ItemId, Record};
pub use stack::{Flavor, StackSource, StackType, Stacks};
pub use transport::{Body, BodyFormat, Method, Query, Request, Transport};
