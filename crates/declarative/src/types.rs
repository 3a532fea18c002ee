//! Core types for declarative reconciliation

use crate::diff::{Diff, Record};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Result of reconciling one resource, before it is turned into a report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Whether the remote state was (or in a dry run, would be) changed
    pub changed: bool,
    /// Human-readable summary
    pub message: String,
    /// Representation before the operation (empty when absent)
    pub before: Record,
    /// Representation after the operation: the live record when one exists,
    /// otherwise the payload that was (or would have been) sent
    pub after: Value,
    /// Non-fatal conditions worth surfacing to the operator
    pub warnings: Vec<String>,
}

impl Outcome {
    /// Outcome that changed the remote state
    pub fn changed(message: impl Into<String>) -> Self {
        Self {
            changed: true,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Outcome that left the remote state as it was
    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            changed: false,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set the pre-operation representation
    pub fn with_before(mut self, before: Record) -> Self {
        self.before = before;
        self
    }

    /// Set the post-operation representation
    pub fn with_after(mut self, after: impl Into<Value>) -> Self {
        self.after = after.into();
        self
    }

    /// Attach a warning
    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Final, serializable result of one reconciliation run
///
/// Serializes as `{changed, message, <resource_key>: resource, diff?, warnings?}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub changed: bool,
    pub message: String,
    /// Key under which the resource representation is reported ("stack", "tag", ...)
    pub resource_key: &'static str,
    pub resource: Value,
    pub diff: Option<Diff>,
    pub warnings: Vec<String>,
}

impl Report {
    /// Render the report as a JSON value
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("changed", &self.changed)?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry(self.resource_key, &self.resource)?;
        if let Some(diff) = &self.diff {
            map.serialize_entry("diff", diff)?;
        }
        if !self.warnings.is_empty() {
            map.serialize_entry("warnings", &self.warnings)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_builders() {
        let outcome = Outcome::changed("Tag created")
            .with_after(json!({"Name": "prod"}))
            .warn("careful");

        assert!(outcome.changed);
        assert_eq!(outcome.message, "Tag created");
        assert_eq!(outcome.after, json!({"Name": "prod"}));
        assert_eq!(outcome.warnings, vec!["careful".to_string()]);
        assert!(outcome.before.is_empty());
    }

    #[test]
    fn test_report_serializes_under_resource_key() {
        let report = Report {
            changed: true,
            message: "Config created.".into(),
            resource_key: "config",
            resource: json!({"ID": 1, "Name": "test_config"}),
            diff: None,
            warnings: Vec::new(),
        };

        assert_eq!(
            report.to_json(),
            json!({
                "changed": true,
                "message": "Config created.",
                "config": {"ID": 1, "Name": "test_config"}
            })
        );
    }

    #[test]
    fn test_report_includes_diff_and_warnings_when_present() {
        let report = Report {
            changed: false,
            message: "skipped".into(),
            resource_key: "network",
            resource: json!({}),
            diff: Some(Diff::default()),
            warnings: vec!["use force".into()],
        };

        let value = report.to_json();
        assert_eq!(value["diff"], json!({"before": {}, "after": {}}));
        assert_eq!(value["warnings"], json!(["use force"]));
    }
}
