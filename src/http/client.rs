//! Request orchestrator.
//!
//! `UpstreamClient` owns the cache, the per-scope limiters and the retry
//! policy, and is shared by every connector through an `Arc`.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::cache::{cache_key, TtlCache};
use super::rate_limit::{RateLimiters, Scope};
use super::retry::RetryPolicy;
use super::transport::{HttpTransport, RawResponse, ReqwestTransport};
use super::FetchError;
use crate::config::AppConfig;

/// Error bodies are truncated to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One logical upstream GET.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub scope: Scope,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub ttl: Duration,
    /// Overrides the client's attempt budget (1 = single try).
    pub max_attempts: Option<u32>,
}

impl Request {
    /// A request cached for 120 seconds unless overridden.
    pub fn new(scope: Scope, url: impl Into<String>) -> Self {
        Self {
            scope,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            ttl: Duration::from_secs(120),
            max_attempts: None,
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Add `key` only when `value` is present.
    pub fn opt_param<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl_secs(self, secs: u64) -> Self {
        self.ttl(Duration::from_secs(secs))
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// URL with the query string appended, parameters in insertion order.
    pub fn full_url(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        let query: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, sep, query.join("&"))
    }

    pub fn cache_key(&self) -> String {
        cache_key(self.scope.as_str(), &self.url, &self.params)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct UpstreamClient {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<TtlCache>,
    limiters: Arc<RateLimiters>,
    retry: RetryPolicy,
    ttl_overrides: HashMap<Scope, Duration>,
}

impl UpstreamClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<TtlCache>,
        limiters: Arc<RateLimiters>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            cache,
            limiters,
            retry,
            ttl_overrides: HashMap::new(),
        }
    }

    /// Fresh cache, default limiters and retry policy around `transport`.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(
            transport,
            Arc::new(TtlCache::new()),
            Arc::new(RateLimiters::default()),
            RetryPolicy::default(),
        )
    }

    /// Production client built from application settings.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::with_settings(
            Duration::from_secs(cfg.http.timeout_secs),
            &cfg.http.user_agent,
        )?;
        let mut client = Self::new(
            Arc::new(transport),
            Arc::new(TtlCache::new()),
            Arc::new(RateLimiters::new(&cfg.rate_limits)),
            cfg.retry.policy(),
        );
        client.ttl_overrides = cfg.cache.ttl_overrides();
        Ok(client)
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn ttl_for(&self, req: &Request) -> Duration {
        self.ttl_overrides.get(&req.scope).copied().unwrap_or(req.ttl)
    }

    /// Cached JSON for `req`, fetching (rate limited, with retry) on a miss.
    pub async fn get_json(&self, req: &Request) -> Result<Value, FetchError> {
        let key = req.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            debug!(scope = %req.scope, url = %req.url, "cache hit");
            return Ok(hit);
        }

        let raw = self.fetch(req).await?;
        let value: Value = serde_json::from_slice(&raw.body).map_err(|e| FetchError::Decode {
            upstream: req.scope.to_string(),
            detail: e.to_string(),
        })?;

        self.store(key, value.clone(), self.ttl_for(req));
        Ok(value)
    }

    /// Same pipeline as `get_json` for HTML, XML and other text bodies.
    pub async fn get_text(&self, req: &Request) -> Result<String, FetchError> {
        let key = format!("text:{}", req.cache_key());
        if let Some(Value::String(hit)) = self.cache.get(&key) {
            debug!(scope = %req.scope, url = %req.url, "cache hit");
            return Ok(hit);
        }

        let raw = self.fetch(req).await?;
        let text = String::from_utf8(raw.body).map_err(|e| FetchError::Decode {
            upstream: req.scope.to_string(),
            detail: e.to_string(),
        })?;

        self.store(key, Value::String(text.clone()), self.ttl_for(req));
        Ok(text)
    }

    /// Cache `placeholder` under `req`'s key so that a failing resource is
    /// not requested again until `ttl` elapses.
    pub fn remember_failure(&self, req: &Request, placeholder: Value, ttl: Duration) {
        debug!(scope = %req.scope, url = %req.url, ttl_secs = ttl.as_secs(), "negative cache");
        self.cache.set(req.cache_key(), placeholder, ttl);
    }

    fn store(&self, key: String, value: Value, ttl: Duration) {
        if !ttl.is_zero() {
            self.cache.set(key, value, ttl);
        }
    }

    /// Rate-limited fetch with retry. The limiter is acquired before every
    /// attempt; non-2xx responses become `FetchError::Status`.
    async fn fetch(&self, req: &Request) -> Result<RawResponse, FetchError> {
        let url = req.full_url();
        let policy = match req.max_attempts {
            Some(n) => self.retry.with_max_attempts(n),
            None => self.retry.clone(),
        };

        let url = url.as_str();
        policy
            .execute(move |attempt| async move {
                self.limiters.acquire(req.scope).await;
                debug!(scope = %req.scope, url, attempt, "upstream GET");
                let resp = self.transport.get(url, &req.headers).await?;
                if resp.is_success() {
                    Ok(resp)
                } else {
                    Err(FetchError::Status {
                        status: resp.status,
                        body: resp.text().chars().take(MAX_ERROR_BODY_CHARS).collect(),
                    })
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::MockHttpTransport;
    use mockall::predicate::*;
    use serde_json::json;

    fn client(mock: MockHttpTransport) -> UpstreamClient {
        UpstreamClient::with_transport(Arc::new(mock))
    }

    #[test]
    fn test_full_url_encodes_params() {
        let req = Request::new(Scope::Espn, "https://x/scoreboard")
            .param("dates", "20250101")
            .param("q", "a b");
        assert_eq!(req.full_url(), "https://x/scoreboard?dates=20250101&q=a%20b");

        let req = Request::new(Scope::Espn, "https://x/summary?event=1").param("lang", "en");
        assert_eq!(req.full_url(), "https://x/summary?event=1&lang=en");
    }

    #[test]
    fn test_opt_param_skips_none() {
        let req = Request::new(Scope::Kalshi, "https://k").opt_param::<i64>("limit", None);
        assert!(req.params.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_transport() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"events": []}"#)));
        let client = client(mock);
        let req = Request::new(Scope::Espn, "https://x/scoreboard");

        let first = client.get_json(&req).await.unwrap();
        let second = client.get_json(&req).await.unwrap();
        assert_eq!(first, json!({"events": []}));
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_attempted_once() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .with(eq("https://x/missing"), always())
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(404, "nope")));
        let err = client(mock)
            .get_json(&Request::new(Scope::Espn, "https://x/missing"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_retried_until_budget_spent() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(3)
            .returning(|_, _| Ok(RawResponse::new(503, "busy")));
        let err = client(mock)
            .get_json(&Request::new(Scope::Espn, "https://x/a"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 503,
                body: "busy".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_override_uses_single_attempt() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Err(FetchError::Connection("reset".into())));
        let req = Request::new(Scope::Espn, "https://x/a").max_attempts(1);
        assert!(client(mock).get_json(&req).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_is_decode_error_and_not_cached() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(2)
            .returning(|_, _| Ok(RawResponse::new(200, "<html>")));
        let client = client(mock);
        let req = Request::new(Scope::Fpl, "https://x/bootstrap");
        for _ in 0..2 {
            let err = client.get_json(&req).await.unwrap_err();
            assert!(matches!(err, FetchError::Decode { .. }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_remember_failure_serves_placeholder() {
        let mock = MockHttpTransport::new();
        let client = client(mock);
        let req = Request::new(Scope::Espn, "https://x/summary").param("event", "1");
        client.remember_failure(&req, json!({}), Duration::from_secs(60));
        assert_eq!(client.get_json(&req).await.unwrap(), json!({}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_text_caches_body() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, "<rss></rss>")));
        let client = client(mock);
        let req = Request::new(Scope::News, "https://feed");
        assert_eq!(client.get_text(&req).await.unwrap(), "<rss></rss>");
        assert_eq!(client.get_text(&req).await.unwrap(), "<rss></rss>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_not_cached() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(2)
            .returning(|_, _| Ok(RawResponse::new(200, "[]")));
        let client = client(mock);
        let req = Request::new(Scope::Kalshi, "https://k/status").ttl(Duration::ZERO);
        client.get_json(&req).await.unwrap();
        client.get_json(&req).await.unwrap();
    }
}
