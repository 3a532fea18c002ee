//! In-memory transport for tests.

use super::{Request, SUCCESS_STATUSES, Transport, parse_body};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Canned response.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// 200 with a JSON body.
    Json(Value),
    /// 204 with no body.
    Empty,
    /// Arbitrary status and raw body.
    Status { status: u16, body: String },
}

impl From<Value> for MockResponse {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone)]
enum Registration {
    /// Reused for every call.
    Always(MockResponse),
    /// Consumed in order.
    Queue(VecDeque<MockResponse>),
}

/// Mock transport for testing without network access.
///
/// Responses are registered by `"METHOD /path"` or by `/path` alone; the
/// method-qualified registration wins. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<String, Registration>>>,
    calls: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Create a new empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `route` with the same response.
    pub fn on(&self, route: &str, response: impl Into<MockResponse>) {
        lock(&self.routes).insert(route.to_string(), Registration::Always(response.into()));
    }

    /// Answer successive calls to `route` with `responses`, in order.
    pub fn on_sequence(&self, route: &str, responses: Vec<MockResponse>) {
        lock(&self.routes).insert(route.to_string(), Registration::Queue(responses.into()));
    }

    /// Answer every call to `route` with an error status.
    pub fn on_status(&self, route: &str, status: u16, body: &str) {
        self.on(
            route,
            MockResponse::Status {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Every recorded request, in order.
    pub fn calls(&self) -> Vec<Request> {
        lock(&self.calls).clone()
    }

    /// Recorded requests matching `"METHOD /path"`.
    pub fn calls_to(&self, route: &str) -> Vec<Request> {
        lock(&self.calls)
            .iter()
            .filter(|r| r.route() == route)
            .cloned()
            .collect()
    }

    /// Number of requests matching `"METHOD /path"`.
    pub fn call_count(&self, route: &str) -> usize {
        self.calls_to(route).len()
    }

    /// Recorded requests that would change remote state.
    pub fn mutating_calls(&self) -> Vec<Request> {
        lock(&self.calls)
            .iter()
            .filter(|r| r.method.is_mutating())
            .cloned()
            .collect()
    }

    fn next_response(&self, request: &Request) -> Result<MockResponse> {
        let mut routes = lock(&self.routes);
        let qualified = request.route();
        let key = if routes.contains_key(&qualified) {
            qualified
        } else if routes.contains_key(&request.path) {
            request.path.clone()
        } else {
            return Err(Error::Transport(format!(
                "mock transport has no response for {}",
                request.route()
            )));
        };

        match routes.get_mut(&key) {
            Some(Registration::Always(response)) => Ok(response.clone()),
            Some(Registration::Queue(queue)) => queue.pop_front().ok_or_else(|| {
                Error::Transport(format!("mock responses exhausted for {}", request.route()))
            }),
            None => Err(Error::Transport(format!(
                "mock transport has no response for {}",
                request.route()
            ))),
        }
    }
}

impl Transport for MockTransport {
    fn request(&self, request: &Request) -> Result<Option<Value>> {
        lock(&self.calls).push(request.clone());

        match self.next_response(request)? {
            MockResponse::Json(value) => Ok(Some(value)),
            MockResponse::Empty => Ok(None),
            MockResponse::Status { status, body } if SUCCESS_STATUSES.contains(&status) => {
                parse_body(&body)
            }
            MockResponse::Status { status, body } => Err(Error::Api {
                status,
                body,
                url: request.path.clone(),
                method: request.method.to_string(),
                data: request.body.to_value(),
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
