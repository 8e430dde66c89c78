//! The transport seam: one physical HTTP exchange per call.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{HttpResponse, RequestDescriptor};

/// A capability to perform one HTTP exchange.
///
/// `connect_timeout` bounds the connection handshake for this attempt
/// only; the implementation must abort the in-flight connection when the
/// window elapses and report [`TransportError::ConnectTimeout`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        connect_timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Production transport over `reqwest`.
#[derive(Clone, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, descriptor), fields(url = %descriptor.url))]
    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        connect_timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        // reqwest pins the connect deadline to the client, and the deadline
        // differs per attempt, so each attempt gets its own client. The
        // connect timer aborts the in-flight handshake when it fires and is
        // inert once the socket is connected.
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .danger_accept_invalid_certs(!descriptor.verify_tls)
            .gzip(descriptor.gzip)
            .build()
            .map_err(|e| TransportError::Transport(e.to_string()))?;

        let mut request = client
            .request(descriptor.method.clone(), &descriptor.url)
            .headers(descriptor.headers.clone());
        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            request = request.body(body.clone());
        }
        if let Some(timeout) = descriptor.timeout {
            request = request.timeout(timeout);
        }

        debug!(
            "{} {} (connect window {}ms)",
            descriptor.method,
            descriptor.url,
            connect_timeout.as_millis()
        );

        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error(e, connect_timeout))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Transport(e.to_string()))?
            .to_vec();

        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                headers,
                body,
            });
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Maps a `reqwest` send failure into the taxonomy: an expired connect
/// window becomes `ConnectTimeout`, everything else is a generic transport
/// failure.
fn classify_send_error(error: reqwest::Error, connect_timeout: Duration) -> TransportError {
    if error.is_connect() && error.is_timeout() {
        TransportError::ConnectTimeout {
            timeout: connect_timeout,
        }
    } else {
        TransportError::Transport(error.to_string())
    }
}
