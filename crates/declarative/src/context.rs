//! Apply context shared by every reconciliation run

/// Context passed to reconcile operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyContext {
    /// Whether this is a dry run (compute and report, never mutate)
    pub dry_run: bool,
    /// Whether to attach a before/after diff to the report
    pub diff: bool,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(dry_run: bool, diff: bool) -> Self {
        Self { dry_run, diff }
    }

    /// Context for a dry run
    pub fn check() -> Self {
        Self {
            dry_run: true,
            diff: false,
        }
    }

    /// Same context with diff output enabled
    pub fn with_diff(self) -> Self {
        Self { diff: true, ..self }
    }

    /// Whether mutating calls should be issued
    pub fn should_mutate(&self) -> bool {
        !self.dry_run
    }
}
