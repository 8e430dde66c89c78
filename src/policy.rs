//! Retry budgets, connect-timeout escalation and retriable-error
//! classification.

use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{CallParams, RequestDescriptor, RetryPredicate};

/// Maximum connect-phase attempts per call.
pub const DEFAULT_MAX_CONNECT_RETRIES: usize = 5;

/// Maximum request-phase attempts per call.
pub const DEFAULT_MAX_REQUEST_RETRIES: usize = 5;

/// Ceiling on the per-attempt connect window.
pub const DEFAULT_MAX_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Connect-window growth per attempt.
pub const DEFAULT_CONNECT_TIMEOUT_INCREMENT: Duration = Duration::from_millis(200);

/// Pluggable connect-window computation: `(attempt, increment, cap)` to the
/// window for that attempt. `attempt` is 1-indexed.
pub type ConnectTimeoutStrategy = Arc<dyn Fn(usize, Duration, Duration) -> Duration + Send + Sync>;

/// Resolved retry policy for one call: the executor's defaults with any
/// per-call overrides applied.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_connect_retries: usize,
    pub max_request_retries: usize,
    pub max_connect_timeout: Duration,
    pub connect_timeout_increment: Duration,
    pub is_retriable: RetryPredicate,
    pub connect_strategy: ConnectTimeoutStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_connect_retries: DEFAULT_MAX_CONNECT_RETRIES,
            max_request_retries: DEFAULT_MAX_REQUEST_RETRIES,
            max_connect_timeout: DEFAULT_MAX_CONNECT_TIMEOUT,
            connect_timeout_increment: DEFAULT_CONNECT_TIMEOUT_INCREMENT,
            is_retriable: Arc::new(default_is_retriable),
            connect_strategy: Arc::new(connect_timeout_for),
        }
    }
}

impl RetryPolicy {
    /// Merges per-call overrides over `defaults`.
    pub(crate) fn resolve(defaults: &RetryPolicy, params: &CallParams) -> RetryPolicy {
        RetryPolicy {
            max_connect_retries: params
                .max_connect_retries
                .unwrap_or(defaults.max_connect_retries),
            max_request_retries: params
                .max_request_retries
                .unwrap_or(defaults.max_request_retries),
            max_connect_timeout: params
                .max_connect_timeout
                .unwrap_or(defaults.max_connect_timeout),
            connect_timeout_increment: params
                .connect_timeout_increment
                .unwrap_or(defaults.connect_timeout_increment),
            is_retriable: params
                .is_retriable
                .clone()
                .unwrap_or_else(|| defaults.is_retriable.clone()),
            connect_strategy: params
                .connect_strategy
                .clone()
                .unwrap_or_else(|| defaults.connect_strategy.clone()),
        }
    }

    /// Connect window for a 1-indexed attempt. When an overall timeout is
    /// set it bounds the ceiling too, since one underlying timer covers
    /// both connect and full response.
    pub fn connect_timeout_for(&self, attempt: usize, overall_timeout: Option<Duration>) -> Duration {
        let cap = match overall_timeout {
            Some(timeout) => self.max_connect_timeout.min(timeout),
            None => self.max_connect_timeout,
        };
        (self.connect_strategy)(attempt, self.connect_timeout_increment, cap)
    }
}

/// Escalation strategy: attempt `n` (1-indexed) waits `min(n * increment, max)`
/// for the handshake. Early attempts fail fast, later attempts get more
/// patience, capped at the ceiling.
pub fn connect_timeout_for(attempt: usize, increment: Duration, max: Duration) -> Duration {
    increment
        .saturating_mul(attempt.min(u32::MAX as usize) as u32)
        .min(max)
}

/// Default classification: retriable iff the error carries HTTP 429, 503
/// or 504. Errors with no status code (connect refused, DNS, reset) are
/// not retriable under this predicate; callers override it to change that.
pub fn default_is_retriable(error: &TransportError, _descriptor: &RequestDescriptor) -> bool {
    matches!(
        error.status(),
        Some(
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use reqwest::header::HeaderMap;

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::build(Method::GET, &CallParams::new("https://example.com"))
    }

    fn status_error(status: StatusCode) -> TransportError {
        TransportError::Status {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    #[test]
    fn test_escalation_exact_formula() {
        let increment = Duration::from_millis(200);
        let max = Duration::from_millis(1000);

        assert_eq!(
            connect_timeout_for(1, increment, max),
            Duration::from_millis(200)
        );
        assert_eq!(
            connect_timeout_for(3, increment, max),
            Duration::from_millis(600)
        );
        assert_eq!(
            connect_timeout_for(5, increment, max),
            Duration::from_millis(1000)
        );
        // Capped beyond the ceiling
        assert_eq!(
            connect_timeout_for(20, increment, max),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_escalation_monotone_and_capped() {
        let increment = Duration::from_millis(200);
        let max = Duration::from_millis(1000);

        let mut previous = Duration::ZERO;
        for attempt in 1..=50 {
            let timeout = connect_timeout_for(attempt, increment, max);
            assert!(timeout >= previous);
            assert!(timeout <= max);
            previous = timeout;
        }
    }

    #[test]
    fn test_overall_timeout_bounds_connect_window() {
        let policy = RetryPolicy::default();

        // Without an overall timeout the ceiling is the configured max
        assert_eq!(
            policy.connect_timeout_for(5, None),
            Duration::from_millis(1000)
        );
        // An overall timeout below the ceiling becomes the effective cap
        assert_eq!(
            policy.connect_timeout_for(5, Some(Duration::from_millis(300))),
            Duration::from_millis(300)
        );
        // ...but does not raise it
        assert_eq!(
            policy.connect_timeout_for(1, Some(Duration::from_millis(5000))),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_default_is_retriable_status_set() {
        let d = descriptor();

        assert!(default_is_retriable(
            &status_error(StatusCode::TOO_MANY_REQUESTS),
            &d
        ));
        assert!(default_is_retriable(
            &status_error(StatusCode::SERVICE_UNAVAILABLE),
            &d
        ));
        assert!(default_is_retriable(
            &status_error(StatusCode::GATEWAY_TIMEOUT),
            &d
        ));

        assert!(!default_is_retriable(
            &status_error(StatusCode::INTERNAL_SERVER_ERROR),
            &d
        ));
        assert!(!default_is_retriable(
            &status_error(StatusCode::NOT_FOUND),
            &d
        ));
    }

    #[test]
    fn test_default_is_retriable_without_status() {
        let d = descriptor();

        // Pure network-layer failures carry no status code and are
        // terminal under the default predicate.
        assert!(!default_is_retriable(
            &TransportError::Transport("dns lookup failed".to_string()),
            &d
        ));
        assert!(!default_is_retriable(
            &TransportError::ConnectTimeout {
                timeout: Duration::from_millis(200)
            },
            &d
        ));
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let defaults = RetryPolicy::default();
        let params = CallParams::new("https://example.com")
            .max_connect_retries(2)
            .max_connect_timeout(Duration::from_millis(500));

        let resolved = RetryPolicy::resolve(&defaults, &params);
        assert_eq!(resolved.max_connect_retries, 2);
        assert_eq!(resolved.max_connect_timeout, Duration::from_millis(500));
        // Untouched fields keep the defaults
        assert_eq!(resolved.max_request_retries, DEFAULT_MAX_REQUEST_RETRIES);
        assert_eq!(
            resolved.connect_timeout_increment,
            DEFAULT_CONNECT_TIMEOUT_INCREMENT
        );
    }

    #[test]
    fn test_resolve_keeps_custom_strategy() {
        let defaults = RetryPolicy::default();
        // A flat strategy ignores the attempt number entirely.
        let params = CallParams::new("https://example.com")
            .connect_timeout_strategy(|_, _, cap| cap);

        let resolved = RetryPolicy::resolve(&defaults, &params);
        assert_eq!(
            resolved.connect_timeout_for(1, None),
            DEFAULT_MAX_CONNECT_TIMEOUT
        );
        assert_eq!(
            resolved.connect_timeout_for(7, None),
            DEFAULT_MAX_CONNECT_TIMEOUT
        );
    }

    #[test]
    fn test_resolve_keeps_custom_predicate() {
        let defaults = RetryPolicy::default();
        let params =
            CallParams::new("https://example.com").retriable_when(|error, _| error.status().is_none());

        let resolved = RetryPolicy::resolve(&defaults, &params);
        let d = descriptor();
        assert!((resolved.is_retriable)(
            &TransportError::Transport("reset".to_string()),
            &d
        ));
        assert!(!(resolved.is_retriable)(
            &status_error(StatusCode::SERVICE_UNAVAILABLE),
            &d
        ));
    }
}
