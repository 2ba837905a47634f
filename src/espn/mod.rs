//! ESPN endpoint helpers shared by every ESPN-backed connector.
//!
//! ESPN exposes the same data through several hosts with different shapes:
//! the site API (scoreboards, teams, news), the web API (standings, game
//! summaries), the core API (stats, futures, leaders, linked by `$ref`) and
//! the common v3 API (athlete overviews). All of them share one rate-limit
//! scope.

pub mod normalize;
pub mod plays;
pub mod shape;

use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::http::{FetchError, Request, Scope, UpstreamClient};
use crate::json;

pub const SITE_BASE: &str = "https://site.api.espn.com/apis/site/v2/sports";
pub const WEB_BASE: &str = "https://site.web.api.espn.com/apis/v2/sports";
pub const SUMMARY_BASE: &str = "https://site.web.api.espn.com/apis/site/v2/sports";
pub const CORE_BASE: &str = "https://sports.core.api.espn.com/v2/sports";
pub const COMMON_BASE: &str = "https://site.web.api.espn.com/apis/common/v3/sports";

const SITE_TTL_SECS: u64 = 120;
const WEB_TTL_SECS: u64 = 300;
const SUMMARY_TTL_SECS: u64 = 300;
const CORE_TTL_SECS: u64 = 300;
const REF_TTL_SECS: u64 = 3600;
const NEGATIVE_TTL_SECS: u64 = 60;

/// Stable status string for an ESPN status name (`STATUS_FINAL` → `closed`).
/// Unknown names pass through unchanged.
pub fn map_status(name: &str) -> String {
    let mapped = match name {
        "STATUS_SCHEDULED" => "not_started",
        "STATUS_IN_PROGRESS" => "live",
        "STATUS_HALFTIME" => "halftime",
        "STATUS_FINAL" | "STATUS_FULL_TIME" => "closed",
        "STATUS_POSTPONED" => "postponed",
        "STATUS_CANCELED" => "cancelled",
        "STATUS_SUSPENDED" => "suspended",
        "STATUS_END_PERIOD" => "period_break",
        "STATUS_DELAYED" | "STATUS_RAIN_DELAY" => "delayed",
        "STATUS_FIRST_HALF" => "1st_half",
        "STATUS_SECOND_HALF" => "2nd_half",
        "STATUS_PLAY_COMPLETE" => "round_complete",
        other => other,
    };
    mapped.to_string()
}

/// Typed access to the ESPN hosts.
#[derive(Clone)]
pub struct EspnApi {
    client: Arc<UpstreamClient>,
}

impl EspnApi {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    fn with_params(req: Request, params: &[(&str, String)]) -> Request {
        params.iter().fold(req, |r, (k, v)| r.param(k, v))
    }

    /// Site API: `{SITE_BASE}/{sport_path}/{resource}`.
    pub async fn site(
        &self,
        sport_path: &str,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let req = Request::new(Scope::Espn, format!("{SITE_BASE}/{sport_path}/{resource}"))
            .ttl_secs(SITE_TTL_SECS);
        self.client.get_json(&Self::with_params(req, params)).await
    }

    /// Site API with a single attempt, for optional supplementary data.
    pub async fn site_once(
        &self,
        sport_path: &str,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let req = Request::new(Scope::Espn, format!("{SITE_BASE}/{sport_path}/{resource}"))
            .ttl_secs(SITE_TTL_SECS)
            .max_attempts(1);
        self.client.get_json(&Self::with_params(req, params)).await
    }

    /// Web API: standings and season lists.
    pub async fn web(
        &self,
        sport_path: &str,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let req = Request::new(Scope::Espn, format!("{WEB_BASE}/{sport_path}/{resource}"))
            .ttl_secs(WEB_TTL_SECS);
        self.client.get_json(&Self::with_params(req, params)).await
    }

    /// Game summary, or `None` when the event cannot be fetched. Failures are
    /// remembered for a minute so a bad event id is not retried per call.
    pub async fn summary(&self, sport_path: &str, event_id: &str) -> Option<Value> {
        self.summary_with(sport_path, event_id, None).await
    }

    /// Single-attempt summary, for finding which league an event belongs to.
    pub async fn summary_once(&self, sport_path: &str, event_id: &str) -> Option<Value> {
        self.summary_with(sport_path, event_id, Some(1)).await
    }

    async fn summary_with(
        &self,
        sport_path: &str,
        event_id: &str,
        attempts: Option<u32>,
    ) -> Option<Value> {
        if event_id.is_empty() {
            return None;
        }
        let mut req = Request::new(Scope::Espn, format!("{SUMMARY_BASE}/{sport_path}/summary"))
            .param("event", event_id)
            .ttl_secs(SUMMARY_TTL_SECS);
        if let Some(n) = attempts {
            req = req.max_attempts(n);
        }
        match self.client.get_json(&req).await {
            Ok(data) if json::is_truthy(&data) => Some(data),
            Ok(_) => None,
            Err(e) => {
                debug!(sport_path, event_id, error = %e, "ESPN summary unavailable");
                self.client
                    .remember_failure(&req, json!({}), Duration::from_secs(NEGATIVE_TTL_SECS));
                None
            }
        }
    }

    /// Core API: `{CORE_BASE}/{sport}/leagues/{league}/{resource_path}`.
    pub async fn core(&self, sport_path: &str, resource_path: &str) -> Result<Value, FetchError> {
        let (sport, league) = sport_path.split_once('/').ok_or_else(|| {
            FetchError::InvalidRequest(format!("Unknown sport path for core API: {sport_path}"))
        })?;
        self.core_url(&format!("{CORE_BASE}/{sport}/leagues/{league}/{resource_path}"))
            .await
    }

    /// Core API by absolute URL (used for `$ref` links).
    pub async fn core_url(&self, url: &str) -> Result<Value, FetchError> {
        let req = Request::new(Scope::Espn, url).ttl_secs(CORE_TTL_SECS);
        self.client.get_json(&req).await
    }

    /// Core API by absolute URL with a single attempt, for lookups that walk
    /// back through candidate URLs until one has data.
    pub async fn core_once(&self, url: &str) -> Result<Value, FetchError> {
        let req = Request::new(Scope::Espn, url)
            .ttl_secs(CORE_TTL_SECS)
            .max_attempts(1);
        self.client.get_json(&req).await
    }

    /// Common v3 API: athlete overviews and bios.
    pub async fn common(
        &self,
        sport_path: &str,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let req = Request::new(Scope::Espn, format!("{COMMON_BASE}/{sport_path}/{resource}"))
            .ttl_secs(WEB_TTL_SECS);
        self.client.get_json(&Self::with_params(req, params)).await
    }

    /// Display name behind an athlete or team `$ref`, or `""` on any failure.
    pub async fn resolve_ref(&self, url: &str) -> String {
        if url.is_empty() {
            return String::new();
        }
        let req = Request::new(Scope::Espn, url).ttl_secs(REF_TTL_SECS);
        match self.client.get_json(&req).await {
            Ok(data) => json::first_text(&data, &["displayName", "fullName", "name"]),
            Err(e) => {
                debug!(url, error = %e, "ESPN $ref lookup failed");
                self.client
                    .remember_failure(&req, json!({}), Duration::from_secs(NEGATIVE_TTL_SECS));
                String::new()
            }
        }
    }

    /// Resolve several `$ref`s concurrently into a url → name map.
    pub async fn resolve_refs(&self, urls: Vec<String>) -> HashMap<String, String> {
        let mut unique = urls;
        unique.sort();
        unique.dedup();
        let names = join_all(unique.iter().map(|u| self.resolve_ref(u))).await;
        unique.into_iter().zip(names).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{MockHttpTransport, RawResponse};

    fn api(mock: MockHttpTransport) -> EspnApi {
        EspnApi::new(Arc::new(UpstreamClient::with_transport(Arc::new(mock))))
    }

    #[test]
    fn test_status_map() {
        assert_eq!(map_status("STATUS_FINAL"), "closed");
        assert_eq!(map_status("STATUS_FULL_TIME"), "closed");
        assert_eq!(map_status("STATUS_RAIN_DELAY"), "delayed");
        assert_eq!(map_status("STATUS_SOMETHING_NEW"), "STATUS_SOMETHING_NEW");
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_failure_is_negative_cached() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(404, "")));
        let api = api(mock);
        assert!(api.summary("football/nfl", "999").await.is_none());
        // Served from the negative cache, no second request.
        assert!(api.summary("football/nfl", "999").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_empty_event_id_skips_network() {
        let api = api(MockHttpTransport::new());
        assert!(api.summary("football/nfl", "").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_ref_prefers_display_name() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"fullName":"F","displayName":"D"}"#)));
        let api = api(mock);
        assert_eq!(api.resolve_ref("https://core/athletes/1").await, "D");
        assert_eq!(api.resolve_ref("https://core/athletes/1").await, "D");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_ref_failure_is_empty() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(404, "")));
        assert_eq!(api(mock).resolve_ref("https://core/teams/1").await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_core_builds_league_url() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| {
                url.starts_with(CORE_BASE)
                    && url.ends_with("/basketball/leagues/nba/seasons/2025/futures")
            })
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"items":[]}"#)));
        let data = api(mock).core("basketball/nba", "seasons/2025/futures").await.unwrap();
        assert_eq!(data, json!({"items": []}));
    }
}
