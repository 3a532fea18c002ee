//! Identity and before/after state of the stack being reconciled

use super::model::Stack;
use crate::cli::StackArgs;
use portainer::Record;

/// Identity arguments are back-filled from the fetched stack, so a stack
/// found by id can be updated or deleted without repeating its name,
/// environment or swarm.
#[derive(Debug, Clone, Default)]
pub struct StackTracker {
    pub name: Option<String>,
    pub stack_id: Option<i64>,
    pub endpoint_id: Option<i64>,
    pub swarm_id: Option<String>,
    /// Stack as it is after the run.
    pub stack: Stack,
    /// Stack as it was fetched.
    pub old_stack: Stack,
    /// Compose file currently deployed, for file stacks.
    pub remote_file: Option<String>,
}

impl StackTracker {
    pub fn new(args: &StackArgs) -> Self {
        Self {
            name: args.name.clone(),
            stack_id: args.id,
            endpoint_id: args.environment_id,
            swarm_id: args.swarm_id.clone(),
            ..Default::default()
        }
    }

    /// Fold a response or a change-set into the tracked stack.
    pub fn update_state(&mut self, record: &Record) {
        self.stack.update_from_record(record);
        let Some(id) = self.stack.id else {
            return;
        };
        if self.endpoint_id.is_none() {
            self.endpoint_id = self.stack.endpoint_id;
        }
        if self.swarm_id.is_none() {
            self.swarm_id = self.stack.swarm_id.clone();
        }
        if self.name.is_none() {
            self.name = self.stack.name.clone();
        }
        self.stack_id.get_or_insert(id);
    }

    /// Record the fetched stack as both the current and the old state.
    pub fn load(&mut self, record: &Record) {
        self.update_state(record);
        self.old_stack = Stack::from_record(record);
    }

    pub fn exists(&self) -> bool {
        self.stack.id.is_some()
    }
}
