//! Change detection and before/after diffs for JSON records
//!
//! Both functions are pure: they never reorder, coerce or normalize values.
//! Callers must hand in records that already share one representation
//! (read shapes flattened into write shapes, ids sorted, and so on).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object as returned by, or sent to, a remote API
pub type Record = Map<String, Value>;

/// Fields whose desired value differs from the existing value
///
/// Keeps the order in which fields appear in the desired record, so that
/// messages like "updated: URL, GroupId" are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Record,
}

impl ChangeSet {
    /// Check if there is nothing to change
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed fields
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Names of the changed fields
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Comma separated list of changed fields
    pub fn summary(&self) -> String {
        self.keys().collect::<Vec<_>>().join(", ")
    }

    /// Desired value of a changed field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.changes.get(key)
    }

    /// Check if a field changed
    pub fn contains(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    /// Borrow the changes as a record
    pub fn as_record(&self) -> &Record {
        &self.changes
    }

    /// Consume into a record
    pub fn into_record(self) -> Record {
        self.changes
    }
}

/// Compute the change-set between an existing and a desired record
///
/// Every key of `desired` that is not listed in `skip_fields` is compared
/// with the same key of `existing`. A key missing from `existing` counts as
/// different. Desired `null` values never show up in the change-set.
pub fn needs_update(existing: &Record, desired: &Record, skip_fields: &[&str]) -> ChangeSet {
    let changes = desired
        .iter()
        .filter(|(key, _)| !skip_fields.contains(&key.as_str()))
        .filter(|(_, value)| !value.is_null())
        .filter(|(key, value)| existing.get(key.as_str()) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    ChangeSet { changes }
}

/// Before/after pair for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub before: Record,
    pub after: Record,
}

impl Diff {
    /// Check if both sides are identical
    pub fn is_empty(&self) -> bool {
        self.before == self.after
    }
}

/// Build a before/after view of a record
///
/// `after` starts from a copy of `before` overlaid with `after`, so fields
/// that an operation did not touch appear unchanged on both sides. Fields in
/// `skip_fields` are stripped from both sides. Missing inputs count as empty
/// records.
pub fn build_diff(before: Option<&Record>, after: Option<&Record>, skip_fields: &[&str]) -> Diff {
    let mut merged = before.cloned().unwrap_or_default();
    if let Some(after) = after {
        for (key, value) in after {
            merged.insert(key.clone(), value.clone());
        }
    }

    Diff {
        before: strip(before.cloned().unwrap_or_default(), skip_fields),
        after: strip(merged, skip_fields),
    }
}

fn strip(mut record: Record, skip_fields: &[&str]) -> Record {
    for key in skip_fields {
        record.remove(*key);
    }
    record
}
