//! Execution engine - runs a reconciler and assembles its report

use crate::context::ApplyContext;
use crate::diff::build_diff;
use crate::resource::Reconciler;
use crate::types::Report;

/// Run a reconciler with the given context
///
/// Warnings are forwarded to the `log` facade as they are collected in the
/// report. When `ctx.diff` is set, the report carries a before/after view
/// computed with the reconciler's skip fields.
///
/// # Errors
///
/// Propagates the reconciler's fatal error unchanged.
pub fn execute<R: Reconciler + ?Sized>(
    reconciler: &mut R,
    ctx: &ApplyContext,
) -> Result<Report, R::Error> {
    let resource_key = reconciler.resource_key();
    log::debug!(
        "Reconciling {} (dry_run={}, diff={})",
        resource_key,
        ctx.dry_run,
        ctx.diff
    );

    let outcome = reconciler.reconcile(ctx)?;

    for warning in &outcome.warnings {
        log::warn!("{}", warning);
    }

    let diff = ctx.diff.then(|| {
        build_diff(
            Some(&outcome.before),
            outcome.after.as_object(),
            reconciler.diff_skip_fields(),
        )
    });

    log::info!(
        "{}: {} (changed={})",
        resource_key,
        outcome.message,
        outcome.changed
    );

    Ok(Report {
        changed: outcome.changed,
        message: outcome.message,
        resource_key,
        resource: outcome.after,
        diff,
        warnings: outcome.warnings,
    })
}
