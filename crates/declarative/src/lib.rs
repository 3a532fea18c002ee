//! # Declarative
//!
//! A framework for idempotent reconciliation of remote resources.
//!
//! This crate provides the core abstractions for comparing a desired
//! resource description with its current remote representation, converging
//! the two, and reporting what changed.
//!
//! ## Core Concepts
//!
//! - **Record**: a JSON object in write shape, the unit of comparison
//! - **ChangeSet**: fields whose desired value differs from the existing one
//! - **Diff**: a before/after view of a record for display
//! - **Reconciler**: a resource kind that knows how to converge itself
//! - **Report**: the serializable result of one run
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{needs_update, ApplyContext, Outcome, Reconciler, execute};
//!
//! let changes = needs_update(&existing, &desired, &["UpdateDate"]);
//! if changes.is_empty() {
//!     println!("nothing to do");
//! } else {
//!     println!("would update: {}", changes.summary());
//! }
//!
//! let report = execute(&mut my_reconciler, &ApplyContext::new(false, true))?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```
//!
//! Comparison is deliberately dumb: no coercion, no reordering. Adapters are
//! expected to normalize read shapes into write shapes before records reach
//! [`needs_update`].

pub mod context;
pub mod diff;
pub mod executor;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::ApplyContext;
pub use diff::{ChangeSet, Diff, Record, build_diff, needs_update};
pub use executor::execute;
pub use resource::Reconciler;
pub use types::{Outcome, Report};
