//! `outcall` issues outbound HTTP calls with independent retry budgets for
//! connect-phase and request-phase failures.
//!
//! A call goes through [`RequestExecutor`]: the caller's [`CallParams`] are
//! normalized into an immutable [`RequestDescriptor`], then the injected
//! [`Transport`] performs physical attempts until one succeeds, a failure
//! classifies as non-retriable, or a budget runs out. Connect timeouts get
//! an escalating per-attempt window (`min(n * increment, cap)`); completed
//! exchanges that fail are retried only when the [`RetryPolicy`] predicate
//! says so (by default on HTTP 429, 503 and 504).
//!
//! ```no_run
//! use outcall::{CallParams, ReqwestTransport, RequestExecutor};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let executor = RequestExecutor::new(ReqwestTransport::new());
//! let body = executor
//!     .get(CallParams::new("https://example.com/api/items"))
//!     .await?
//!     .into_body();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod executor;
pub mod policy;
pub mod request;
pub mod transport;

pub use error::TransportError;
pub use executor::RequestExecutor;
pub use policy::{
    ConnectTimeoutStrategy, DEFAULT_CONNECT_TIMEOUT_INCREMENT, DEFAULT_MAX_CONNECT_RETRIES,
    DEFAULT_MAX_CONNECT_TIMEOUT, DEFAULT_MAX_REQUEST_RETRIES, RetryPolicy, connect_timeout_for,
    default_is_retriable,
};
pub use request::{CallParams, CallResult, HttpResponse, RequestDescriptor, RetryPredicate};
pub use transport::{ReqwestTransport, Transport};
