//! The request executor: verb API, split retry budgets, connect-timeout
//! escalation.

use anyhow::{Result, anyhow};
use log::{debug, error, warn};
use reqwest::Method;

use crate::error::TransportError;
use crate::policy::RetryPolicy;
use crate::request::{CallParams, CallResult, RequestDescriptor};
use crate::transport::Transport;

/// Issues outbound HTTP calls through an injected [`Transport`], retrying
/// connect-phase and request-phase failures on independent budgets.
///
/// Connect failures (the handshake never completed) and request failures
/// (the server was reached but the exchange failed) are different failure
/// domains: the former gets fast retries with a growing connect window,
/// the latter a bounded number of straight retries gated by the retriable
/// predicate. The executor holds no per-call state, so any number of calls
/// may run concurrently; attempts within one call are strictly sequential.
pub struct RequestExecutor<T: Transport> {
    transport: T,
    defaults: RetryPolicy,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            defaults: RetryPolicy::default(),
        }
    }

    /// Creates an executor whose per-call fallbacks are `defaults` instead
    /// of the crate defaults.
    pub fn with_defaults(transport: T, defaults: RetryPolicy) -> Self {
        Self {
            transport,
            defaults,
        }
    }

    pub async fn get(&self, params: CallParams) -> Result<CallResult> {
        self.call(Method::GET, params).await
    }

    pub async fn post(&self, params: CallParams) -> Result<CallResult> {
        self.call(Method::POST, params).await
    }

    pub async fn put(&self, params: CallParams) -> Result<CallResult> {
        self.call(Method::PUT, params).await
    }

    pub async fn patch(&self, params: CallParams) -> Result<CallResult> {
        self.call(Method::PATCH, params).await
    }

    pub async fn delete(&self, params: CallParams) -> Result<CallResult> {
        self.call(Method::DELETE, params).await
    }

    pub async fn head(&self, params: CallParams) -> Result<CallResult> {
        self.call(Method::HEAD, params).await
    }

    /// Generic entry point: `verb` is case-insensitive and normalized to
    /// uppercase.
    #[tracing::instrument(skip(self, params))]
    pub async fn method(&self, verb: &str, params: CallParams) -> Result<CallResult> {
        let method = Method::from_bytes(verb.to_ascii_uppercase().as_bytes())
            .map_err(|_| anyhow!("Invalid HTTP method: {verb}"))?;
        self.call(method, params).await
    }

    #[tracing::instrument(skip(self, method, params), fields(method = %method, url = %params.url))]
    async fn call(&self, method: Method, params: CallParams) -> Result<CallResult> {
        let full_response = params.resolve_with_full_response;
        let policy = RetryPolicy::resolve(&self.defaults, &params);
        let descriptor = RequestDescriptor::build(method, &params);

        let mut connect_attempts = 0usize;
        let mut request_attempts = 0usize;
        let mut last_error: Option<TransportError> = None;

        while connect_attempts < policy.max_connect_retries
            && request_attempts < policy.max_request_retries
        {
            let connect_timeout =
                policy.connect_timeout_for(connect_attempts + 1, descriptor.timeout);

            match self.transport.send(&descriptor, connect_timeout).await {
                Ok(response) => {
                    debug!(
                        "{} {} succeeded with {}",
                        descriptor.method, descriptor.url, response.status
                    );
                    return Ok(if full_response {
                        CallResult::Full(response)
                    } else {
                        CallResult::Body(response.body)
                    });
                }
                Err(failure) => {
                    if failure.is_connect_timeout() {
                        connect_attempts += 1;
                        if connect_attempts < policy.max_connect_retries {
                            warn!(
                                "Failed connect attempt #{} for {}, retrying...",
                                connect_attempts, descriptor.url
                            );
                        } else {
                            warn!(
                                "Failed final connect attempt #{} for {}",
                                connect_attempts, descriptor.url
                            );
                        }
                    } else {
                        if !(policy.is_retriable)(&failure, &descriptor) {
                            last_error = Some(failure);
                            break;
                        }
                        request_attempts += 1;
                        if request_attempts < policy.max_request_retries {
                            warn!(
                                "Failed request attempt #{} for {}, retrying...",
                                request_attempts, descriptor.url
                            );
                        } else {
                            warn!(
                                "Failed final request attempt #{} for {}",
                                request_attempts, descriptor.url
                            );
                        }
                    }
                    last_error = Some(failure);
                }
            }
        }

        if connect_attempts >= policy.max_connect_retries {
            error!(
                "Failed to connect to {} in {} attempts",
                descriptor.url, policy.max_connect_retries
            );
        }

        // The caller sees exactly what the final attempt produced.
        Err(match last_error {
            Some(failure) => anyhow::Error::from(failure),
            None => anyhow!(
                "{} {}: retry budget allows no attempts",
                descriptor.method,
                descriptor.url
            ),
        })
    }
}
