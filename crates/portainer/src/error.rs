//! Error types for Portainer operations.
//!
//! Errors are categorized so the binary can decide how to report them and
//! which context (status, body, duplicate ids) belongs in the failure payload.

use crate::record::ItemId;
use serde_json::{Map, Value, json};
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for Portainer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of Portainer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The API answered with an error, or could not be reached.
    Api,
    /// A lookup found nothing.
    NotFound,
    /// A lookup by name found more than one record.
    Ambiguous,
    /// Inputs do not form a valid request.
    Validation,
    /// A local file could not be used as content.
    Content,
    /// The client was used without required context.
    Configuration,
    /// The operation itself cannot succeed in the current remote state.
    Operation,
}

impl ErrorCategory {
    /// Whether callers may treat this as "resource absent".
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Api => "Portainer API error",
            Self::NotFound => "Resource not found",
            Self::Ambiguous => "Ambiguous resource name",
            Self::Validation => "Invalid arguments",
            Self::Content => "Unusable content",
            Self::Configuration => "Missing configuration",
            Self::Operation => "Operation failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Api => "Check the Portainer URL, API token and the response body",
            Self::NotFound => "Verify the resource name or id",
            Self::Ambiguous => {
                "Remove duplicates in the Portainer UI or address the resource by id"
            }
            Self::Validation => "Check the required argument combinations",
            Self::Content => "Check that the file exists, is readable and contains text",
            Self::Configuration => "Provide the environment id for environment-scoped resources",
            Self::Operation => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to Portainer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered with a status outside 200/201/204.
    #[error("API request failed: HTTP {status} for {method} {url}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
        /// Requested URL.
        url: String,
        /// HTTP method.
        method: String,
        /// Request payload, if any.
        data: Option<Value>,
    },

    /// Connection-level failure.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The reachability check failed.
    #[error("Portainer server not reachable: {message}")]
    Unreachable {
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        /// Failure description.
        message: String,
        /// Response body, when the server answered.
        body: String,
    },

    /// A lookup found nothing.
    #[error("{resource} '{name}' does not exist.")]
    ItemNotExists {
        /// Resource label.
        resource: String,
        /// Name or id that was looked up.
        name: String,
    },

    /// A lookup by name found more than one record.
    #[error(
        "Cannot {operation} {resource}: Multiple {resource}s found with name '{name}'. Please use the Portainer UI to remove duplicates."
    )]
    MultipleItemsReturned {
        /// Resource label.
        resource: String,
        /// Name that was looked up.
        name: String,
        /// Operation that was refused.
        operation: String,
        /// Ids of every matching record, in remote order.
        ids: Vec<ItemId>,
    },

    /// Inputs do not form a valid request.
    #[error("{0}")]
    Validation(String),

    /// A local file could not be used as content.
    #[error("{message}")]
    Content {
        /// Offending path.
        path: PathBuf,
        /// Full message naming the path.
        message: String,
    },

    /// A Docker-proxied resource was used without a target environment.
    #[error(
        "environment id must be set to use {resource}: pass --environment-id or scope the call with using_environment"
    )]
    ProxyTargetUnset {
        /// Resource label.
        resource: String,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Fatal orchestration outcome.
    #[error("{0}")]
    Failed(String),
}

impl Error {
    /// Create a content error for a path.
    pub fn content(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Content {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a fatal orchestration error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Api { .. } => ErrorCategory::Api,
            Error::Transport(_) => ErrorCategory::Api,
            Error::Unreachable { .. } => ErrorCategory::Api,
            Error::ItemNotExists { .. } => ErrorCategory::NotFound,
            Error::MultipleItemsReturned { .. } => ErrorCategory::Ambiguous,
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Content { .. } => ErrorCategory::Content,
            Error::ProxyTargetUnset { .. } => ErrorCategory::Configuration,
            Error::InvalidResponse(_) => ErrorCategory::Api,
            Error::Failed(_) => ErrorCategory::Operation,
        }
    }

    /// Whether this error means "the resource does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category().is_recoverable()
    }

    /// Extra fields for the failure payload.
    ///
    /// Ambiguous lookups carry `duplicate_ids`; API errors carry the status,
    /// body, URL, method and payload of the failed request.
    #[must_use]
    pub fn context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        match self {
            Error::Api {
                status,
                body,
                url,
                method,
                data,
            } => {
                context.insert("status".into(), json!(status));
                context.insert("body".into(), json!(body));
                context.insert("url".into(), json!(url));
                context.insert("method".into(), json!(method));
                context.insert("data".into(), data.clone().unwrap_or(Value::Null));
            }
            Error::Unreachable { status, body, .. } => {
                context.insert("status".into(), json!(status));
                context.insert("body".into(), json!(body));
            }
            Error::MultipleItemsReturned { ids, .. } => {
                context.insert("duplicate_ids".into(), json!(ids));
            }
            _ => {}
        }
        context
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Transport(format!("HTTP {code}")),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_recoverable() {
        assert!(ErrorCategory::NotFound.is_recoverable());
        assert!(!ErrorCategory::Api.is_recoverable());
        assert!(!ErrorCategory::Ambiguous.is_recoverable());
        assert!(!ErrorCategory::Validation.is_recoverable());
        assert!(!ErrorCategory::Content.is_recoverable());
        assert!(!ErrorCategory::Configuration.is_recoverable());
        assert!(!ErrorCategory::Operation.is_recoverable());
    }

    #[test]
    fn test_error_category_description_and_advice() {
        assert!(!ErrorCategory::Api.description().is_empty());
        assert!(!ErrorCategory::Ambiguous.advice().is_empty());
        assert!(format!("{}", ErrorCategory::NotFound).contains("not found"));
    }

    #[test]
    fn test_multiple_items_message_and_context() {
        let err = Error::MultipleItemsReturned {
            resource: "tag".into(),
            name: "test_tag".into(),
            operation: "retrieve".into(),
            ids: vec![ItemId::Int(1), ItemId::Int(2)],
        };

        assert_eq!(
            err.to_string(),
            "Cannot retrieve tag: Multiple tags found with name 'test_tag'. Please use the Portainer UI to remove duplicates."
        );
        assert_eq!(err.category(), ErrorCategory::Ambiguous);
        assert_eq!(err.context()["duplicate_ids"], json!([1, 2]));
    }

    #[test]
    fn test_api_error_context() {
        let err = Error::Api {
            status: 409,
            body: "conflict".into(),
            url: "http://p/api/tags".into(),
            method: "POST".into(),
            data: Some(json!({"Name": "x"})),
        };

        let context = err.context();
        assert_eq!(context["status"], json!(409));
        assert_eq!(context["body"], json!("conflict"));
        assert_eq!(context["method"], json!("POST"));
        assert_eq!(context["data"], json!({"Name": "x"}));
        assert!(err.to_string().contains("409"));
    }

    #[test]
    fn test_item_not_exists_is_not_found() {
        let err = Error::ItemNotExists {
            resource: "group".into(),
            name: "prod".into(),
        };
        assert!(err.is_not_found());
        assert!(err.context().is_empty());
    }

    #[test]
    fn test_content_error_display() {
        let err = Error::content("/tmp/x", "File is empty: /tmp/x");
        assert_eq!(err.to_string(), "File is empty: /tmp/x");
        assert_eq!(err.category(), ErrorCategory::Content);
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_str::<Value>("{").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }
}
