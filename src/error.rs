//! Failure taxonomy for a single HTTP exchange.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Failure of one physical transport attempt.
///
/// The retry loop classifies on this: `ConnectTimeout` consumes the
/// connect-retry budget, everything else goes through the retriable
/// predicate and consumes the request-retry budget.
#[derive(Debug)]
pub enum TransportError {
    /// The connection handshake did not complete within the window
    /// allotted to this attempt.
    ConnectTimeout {
        /// The connect window that elapsed.
        timeout: Duration,
    },
    /// The exchange completed but the server answered a non-success status.
    Status {
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
    },
    /// Any other transport-level failure (DNS, reset, TLS, body read).
    Transport(String),
}

impl TransportError {
    /// Status code carried by the error, if the exchange completed.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_connect_timeout(&self) -> bool {
        matches!(self, TransportError::ConnectTimeout { .. })
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::ConnectTimeout { timeout } => {
                write!(
                    f,
                    "Socket timed out without establishing a connection (waited {}ms)",
                    timeout.as_millis()
                )
            }
            TransportError::Status { status, .. } => {
                write!(f, "HTTP status {}", status)
            }
            TransportError::Transport(msg) => {
                write!(f, "Transport error: {}", msg)
            }
        }
    }
}

impl std::error::Error for TransportError {}
