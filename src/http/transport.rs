//! HTTP transport seam.
//!
//! The transport returns every HTTP status as data; turning non-2xx into
//! errors is the orchestrator's job. Only network-level failures are `Err`.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::Client;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, trace};

use super::{FetchError, DEFAULT_USER_AGENT};

/// Default per-request timeout (seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Status and decoded body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_encoding: Option<String>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            content_encoding: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` with extra request headers.
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<RawResponse, FetchError>;
}

/// Inflate a gzip body. Upstreams occasionally mislabel plain bodies, so a
/// body that fails to decode is returned unchanged.
pub fn decode_body(body: Vec<u8>, content_encoding: Option<&str>) -> Vec<u8> {
    let is_gzip = content_encoding
        .map(|e| e.eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);
    if !is_gzip {
        return body;
    }
    let mut decoded = Vec::new();
    match GzDecoder::new(body.as_slice()).read_to_end(&mut decoded) {
        Ok(_) => decoded,
        Err(e) => {
            debug!(error = %e, "gzip decode failed, using raw body");
            body
        }
    }
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// Production transport. Automatic decompression is disabled so that
/// `decode_body` controls the gzip fallback.
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if err.is_builder() {
        FetchError::InvalidRequest(err.to_string())
    } else {
        FetchError::Connection(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<RawResponse, FetchError> {
        trace!(url, "GET");
        let mut request = self.http.get(url).header("Accept-Encoding", "gzip");
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let content_encoding = response
            .headers()
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(RawResponse {
            status,
            body: decode_body(bytes.to_vec(), content_encoding.as_deref()),
            content_encoding,
        })
    }
}
