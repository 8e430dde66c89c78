//! Call options, the normalized request descriptor, and result shapes.

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;

/// Per-call retriable-error predicate.
///
/// Receives the classified failure and the descriptor of the call it
/// belongs to; returning `false` terminates the call immediately.
pub type RetryPredicate = Arc<dyn Fn(&TransportError, &RequestDescriptor) -> bool + Send + Sync>;

/// Caller-facing options bag for one call.
///
/// Everything the caller can say about a request: target, headers, body,
/// timeout, desired return shape, and per-call retry overrides. Fields not
/// set fall back to the executor's defaults.
#[derive(Clone, Default)]
pub struct CallParams {
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Overall per-attempt timeout; one underlying timer covers both
    /// connect and full response, so this also caps the connect window.
    pub timeout: Option<Duration>,
    /// `true` returns the full response; `false` (default) the body only.
    pub resolve_with_full_response: bool,
    pub max_connect_retries: Option<usize>,
    pub max_request_retries: Option<usize>,
    pub max_connect_timeout: Option<Duration>,
    pub connect_timeout_increment: Option<Duration>,
    pub is_retriable: Option<RetryPredicate>,
    pub connect_strategy: Option<crate::policy::ConnectTimeoutStrategy>,
    /// Accepted for forward compatibility; never forwarded to the transport.
    pub reporting: Option<serde_json::Value>,
}

impl CallParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::try_from(name).context("Invalid header name")?;
        let value = HeaderValue::try_from(value).context("Invalid header value")?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `body` as JSON and sets the `content-type` header.
    pub fn json_body<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body).context("Failed to serialize JSON body")?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Requests the full response (status, headers, body) instead of the
    /// body alone.
    pub fn full_response(mut self) -> Self {
        self.resolve_with_full_response = true;
        self
    }

    pub fn max_connect_retries(mut self, retries: usize) -> Self {
        self.max_connect_retries = Some(retries);
        self
    }

    pub fn max_request_retries(mut self, retries: usize) -> Self {
        self.max_request_retries = Some(retries);
        self
    }

    pub fn max_connect_timeout(mut self, timeout: Duration) -> Self {
        self.max_connect_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout_increment(mut self, increment: Duration) -> Self {
        self.connect_timeout_increment = Some(increment);
        self
    }

    /// Overrides the default retriable-error classification.
    pub fn retriable_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&TransportError, &RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        self.is_retriable = Some(Arc::new(predicate));
        self
    }

    /// Overrides the connect-window escalation strategy. The function
    /// receives `(attempt, increment, cap)` with `attempt` 1-indexed.
    pub fn connect_timeout_strategy<F>(mut self, strategy: F) -> Self
    where
        F: Fn(usize, Duration, Duration) -> Duration + Send + Sync + 'static,
    {
        self.connect_strategy = Some(Arc::new(strategy));
        self
    }

    pub fn reporting(mut self, reporting: serde_json::Value) -> Self {
        self.reporting = Some(reporting);
        self
    }
}

/// The normalized outbound request for one call.
///
/// Built fresh at call entry and never mutated across attempts; every
/// physical attempt sends exactly this.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    /// Always uppercase.
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Overall per-attempt timeout covering connect and full response.
    pub timeout: Option<Duration>,
    /// TLS certificate verification, always on.
    pub verify_tls: bool,
    /// Transparent response decompression, always on.
    pub gzip: bool,
}

impl RequestDescriptor {
    /// Normalizes the caller's params into the outbound descriptor.
    /// `reporting` and the retry-control fields are stripped here; TLS
    /// verification and compression are forced on.
    pub(crate) fn build(method: Method, params: &CallParams) -> Self {
        Self {
            method,
            url: params.url.clone(),
            headers: params.headers.clone(),
            query: params.query.clone(),
            body: params.body.clone(),
            timeout: params.timeout,
            verify_tls: true,
            gzip: true,
        }
    }
}

/// One completed HTTP exchange with a success status.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Shape of a successful call, per `CallParams::resolve_with_full_response`.
#[derive(Clone, Debug)]
pub enum CallResult {
    /// The response body alone (the default shape).
    Body(Vec<u8>),
    /// The full response: status, headers and body.
    Full(HttpResponse),
}

impl CallResult {
    /// The response body, whichever shape was requested.
    pub fn into_body(self) -> Vec<u8> {
        match self {
            CallResult::Body(body) => body,
            CallResult::Full(response) => response.body,
        }
    }

    pub fn as_full(&self) -> Option<&HttpResponse> {
        match self {
            CallResult::Full(response) => Some(response),
            CallResult::Body(_) => None,
        }
    }

    pub fn into_full(self) -> Option<HttpResponse> {
        match self {
            CallResult::Full(response) => Some(response),
            CallResult::Body(_) => None,
        }
    }
}
