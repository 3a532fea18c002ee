//! Live HTTP transport.
//!
//! This module provides [`HttpTransport`], a blocking client for the
//! Portainer REST API authenticated with a static API key.

use super::{Body, Method, Query, Request, SUCCESS_STATUSES, Transport, parse_body};
use crate::error::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use ureq::http::Response;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking transport backed by ureq.
///
/// # Example
///
/// ```no_run
/// use portainer::transport::http::HttpTransport;
/// use std::time::Duration;
///
/// let timeout = Duration::from_secs(30);
/// let transport = HttpTransport::new("https://portainer:9443", "ptr_token", timeout, false);
/// transport.ping().expect("portainer not reachable");
/// ```
pub struct HttpTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Server URL without trailing slash.
    base_url: String,
    /// Value of the `X-API-Key` header.
    token: String,
}

impl HttpTransport {
    /// Create a transport.
    ///
    /// `insecure` disables TLS certificate verification.
    #[must_use]
    pub fn new(base_url: &str, token: &str, timeout: Duration, insecure: bool) -> Self {
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(insecure)
            .build();

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .tls_config(tls)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Get the server URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL of an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Check that the server answers `GET /system/status` with 200.
    pub fn ping(&self) -> Result<()> {
        let url = self.url("/system/status");
        log::debug!("GET {}", url);

        let mut response = self
            .prepare(self.agent.get(&url), &Query::new())
            .call()
            .map_err(|e| Error::Unreachable {
                status: None,
                message: e.to_string(),
                body: String::new(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(Error::Unreachable {
                status: Some(status),
                message: format!("HTTP {status}"),
                body,
            });
        }
        Ok(())
    }

    /// Attach authentication, cache headers and query parameters.
    fn prepare<B>(
        &self,
        builder: ureq::RequestBuilder<B>,
        query: &Query,
    ) -> ureq::RequestBuilder<B> {
        let mut builder = builder
            .header("X-API-Key", &self.token)
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache");
        for (key, value) in query.pairs() {
            builder = builder.query(key, value);
        }
        builder
    }

    fn send(
        &self,
        builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
        body: &Body,
    ) -> std::result::Result<Response<ureq::Body>, ureq::Error> {
        match body {
            Body::Empty => builder.send_empty(),
            Body::Json(value) => builder
                .header("Content-Type", "application/json")
                .send_json(value),
            Body::Multipart(form) => {
                let (bytes, content_type) = form.encode();
                builder
                    .header("Content-Type", content_type)
                    .send(&bytes[..])
            }
        }
    }
}

impl Transport for HttpTransport {
    fn request(&self, request: &Request) -> Result<Option<Value>> {
        let url = self.url(&request.path);
        log::debug!("{} {}", request.method, url);

        let result = match request.method {
            Method::Get => self.prepare(self.agent.get(&url), &request.query).call(),
            Method::Delete => self.prepare(self.agent.delete(&url), &request.query).call(),
            Method::Post => {
                self.send(self.prepare(self.agent.post(&url), &request.query), &request.body)
            }
            Method::Put => {
                self.send(self.prepare(self.agent.put(&url), &request.query), &request.body)
            }
        };

        let mut response =
            result.map_err(|e| Error::Transport(format!("{} {}: {}", request.method, url, e)))?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::trace!("{} {} -> {}", request.method, url, status);

        if !SUCCESS_STATUSES.contains(&status) {
            return Err(Error::Api {
                status,
                body,
                url,
                method: request.method.to_string(),
                data: request.body.to_value(),
            });
        }

        parse_body(&body)
    }
}
