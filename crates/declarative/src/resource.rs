//! Reconciler trait for declarative state management
//!
//! A reconciler owns one desired resource description and knows how to
//! converge the remote state towards it.

use crate::context::ApplyContext;
use crate::types::Outcome;

/// Core trait for declarative resources
///
/// Every managed resource kind implements this trait, which provides:
/// - Identity (the key its representation is reported under)
/// - Convergence (reconcile)
/// - Diff configuration (fields hidden from before/after views)
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, Outcome, Reconciler};
///
/// struct Marker { exists: bool }
///
/// impl Reconciler for Marker {
///     type Error = std::io::Error;
///
///     fn resource_key(&self) -> &'static str {
///         "marker"
///     }
///
///     fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Self::Error> {
///         if self.exists {
///             return Ok(Outcome::unchanged("Marker already exists"));
///         }
///         if ctx.should_mutate() {
///             self.exists = true;
///         }
///         Ok(Outcome::changed("Marker created"))
///     }
/// }
/// ```
pub trait Reconciler {
    /// Error raised by fatal conditions
    type Error;

    /// Key under which the resource is reported ("environment", "stack", ...)
    fn resource_key(&self) -> &'static str;

    /// Fields stripped from both sides of a before/after diff
    fn diff_skip_fields(&self) -> &[&'static str] {
        &[]
    }

    /// Converge the remote state towards the desired state
    ///
    /// Implementations must:
    /// 1. Fetch the current state (refusing ambiguous name lookups)
    /// 2. Respect `ctx.dry_run` (no create/update/delete calls)
    /// 3. Report the same `changed` flag a real run would
    /// 4. Return the live record, or the payload that would have been sent
    fn reconcile(&mut self, ctx: &ApplyContext) -> Result<Outcome, Self::Error>;
}
