//! In-memory transport for integration testing.
//!
//! Routes are matched by URL substring in registration order. Every request
//! is recorded so tests can assert on call counts and URLs.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use sports_skills::http::{FetchError, HttpTransport, RawResponse};

#[derive(Clone)]
struct Route {
    pattern: String,
    status: u16,
    body: String,
}

/// A deterministic `HttpTransport` with canned responses.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
    /// If set, every request fails with this error.
    force_error: Arc<Mutex<Option<FetchError>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any URL containing `pattern` with `status` and `body`.
    pub fn route(self, pattern: &str, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().push(Route {
            pattern: pattern.to_string(),
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn set_error(&self, err: FetchError) {
        *self.force_error.lock().unwrap() = Some(err);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.contains(pattern))
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(
        &self,
        url: &str,
        _headers: &[(String, String)],
    ) -> Result<RawResponse, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if let Some(err) = self.force_error.lock().unwrap().clone() {
            return Err(err);
        }
        let routes = self.routes.lock().unwrap();
        Ok(match routes.iter().find(|r| url.contains(&r.pattern)) {
            Some(r) => RawResponse::new(r.status, r.body.clone()),
            None => RawResponse::new(404, format!("no route for {url}")),
        })
    }
}
