//! Shared upstream access layer.
//!
//! Every connector goes through [`UpstreamClient`], which composes a TTL
//! cache, a per-scope token-bucket rate limiter, a retry policy and an
//! [`HttpTransport`]:
//!
//! cache lookup → rate limit → fetch (with retry) → cache store → return

pub mod cache;
pub mod client;
pub mod rate_limit;
pub mod retry;
pub mod transport;

pub use cache::TtlCache;
pub use client::{Request, UpstreamClient};
pub use rate_limit::{RateLimiter, RateLimiters, Scope};
pub use retry::{is_retryable, RetryPolicy};
pub use transport::{HttpTransport, RawResponse, ReqwestTransport};

/// Browser-like user agent; several providers reject obvious bots.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Errors raised while talking to an upstream provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The upstream answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection refused/reset, DNS failure and other transport-level IO.
    #[error("connection error: {0}")]
    Connection(String),

    /// The body could not be decoded (invalid JSON, invalid UTF-8).
    #[error("{upstream} returned invalid data: {detail}")]
    Decode { upstream: String, detail: String },

    /// A request that could not be built locally (bad URL, bad parameter).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
