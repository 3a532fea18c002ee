//! Transport trait and request types.
//!
//! This module provides the [`Transport`] trait and the request model shared
//! by its implementations. The primary implementation is
//! [`http::HttpTransport`], which talks to a live Portainer instance.
//!
//! # Testing
//!
//! Use [`MockTransport`] for testing without network access:
//!
//! ```
//! use portainer::transport::{MockTransport, Request, Transport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new();
//! mock.on("GET /tags", json!([{"ID": 1, "Name": "prod"}]));
//!
//! let tags = mock.request(&Request::get("/tags")).unwrap();
//! assert_eq!(tags, Some(json!([{"ID": 1, "Name": "prod"}])));
//! assert_eq!(mock.call_count("GET /tags"), 1);
//! ```

pub mod http;
mod mock;
pub mod multipart;

pub use mock::{MockResponse, MockTransport};
pub use multipart::{Form, Part};

use crate::error::Result;
use crate::record::Record;
use serde_json::Value;
use std::fmt;

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    /// Whether requests with this method change remote state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered query parameters; keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Booleans become `true`/`false`, strings are kept
    /// verbatim, anything else is JSON-encoded. Nulls are skipped.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let text = match value {
            Value::Null => return,
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        };
        self.pairs.push((key.into(), text));
    }

    /// Builder form of [`Query::push`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    /// First value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for a key, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(Form),
}

impl Body {
    /// JSON body from a record.
    pub fn json(record: Record) -> Self {
        Self::Json(Value::Object(record))
    }

    /// Payload as JSON, for error reports and test assertions.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Json(value) => Some(value.clone()),
            Self::Multipart(form) => Some(form.to_value()),
        }
    }
}

/// Encoding used for create payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyFormat {
    #[default]
    Json,
    FormData,
}

impl BodyFormat {
    /// Encode a record in this format.
    pub fn encode(self, record: Record) -> Body {
        match self {
            Self::Json => Body::json(record),
            Self::FormData => Body::Multipart(Form::from_record(&record)),
        }
    }
}

/// One API request. `path` is relative to the `/api` root.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Query,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Query::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// `"METHOD /path"`, the key used for logging and mock routing.
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Transport trait for issuing API requests.
///
/// This abstraction allows swapping the live HTTP client for an in-memory
/// one in tests.
pub trait Transport: Send + Sync {
    /// Issue one request.
    ///
    /// Returns `None` when a successful response has an empty body.
    ///
    /// # Errors
    ///
    /// Returns `Error::Api` for any status other than 200, 201 or 204, and
    /// `Error::Transport` when the request could not be sent.
    fn request(&self, request: &Request) -> Result<Option<Value>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn request(&self, request: &Request) -> Result<Option<Value>> {
        (**self).request(request)
    }
}

/// Statuses the API uses for success.
pub const SUCCESS_STATUSES: [u16; 3] = [200, 201, 204];

/// Parse a response body; blank bodies are `None`.
pub(crate) fn parse_body(body: &str) -> Result<Option<Value>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(body)?))
}
