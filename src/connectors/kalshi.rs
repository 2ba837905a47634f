//! Kalshi integration.
//!
//! Read-only access to the public Trade API v2: exchange status, series,
//! events, markets, trades and candlesticks. No authentication.
//!
//! Trade API: https://api.elections.kalshi.com/trade-api/v2

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{unknown_command, CommandSpec, Connector, Module, Params};
use crate::http::{Request, Scope, UpstreamClient};
use crate::json::{array, at, text_at};
use crate::types::{Outcome, SkillsError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const BASE_URL: &str = "https://api.elections.kalshi.com/trade-api/v2";
const DEFAULT_LIMIT: i64 = 100;
const MAX_PAGE_LIMIT: i64 = 200;
const MAX_TRADES_LIMIT: i64 = 1000;

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("get_exchange_status", "Whether trading is active", &[], &[]),
    CommandSpec::new("get_exchange_schedule", "Exchange operating hours", &[], &[]),
    CommandSpec::new(
        "get_series_list",
        "All series (leagues, recurring events)",
        &[],
        &["category", "tags"],
    ),
    CommandSpec::new("get_series", "One series", &["series_ticker"], &[]),
    CommandSpec::new(
        "get_events",
        "Events, optionally with nested markets",
        &[],
        &["limit", "cursor", "status", "series_ticker", "with_nested_markets"],
    ),
    CommandSpec::new(
        "get_event",
        "One event and its markets",
        &["event_ticker"],
        &["with_nested_markets"],
    ),
    CommandSpec::new(
        "get_markets",
        "Markets filtered by event, series, status or tickers",
        &[],
        &["limit", "cursor", "event_ticker", "series_ticker", "status", "tickers"],
    ),
    CommandSpec::new("get_market", "One market", &["ticker"], &[]),
    CommandSpec::new(
        "get_trades",
        "Recent trades",
        &[],
        &["limit", "cursor", "ticker", "min_ts", "max_ts"],
    ),
    CommandSpec::new(
        "get_market_candlesticks",
        "OHLC candlesticks for a market (interval 1, 60 or 1440 minutes)",
        &["series_ticker", "ticker", "start_ts", "end_ts", "period_interval"],
        &[],
    ),
    CommandSpec::new("get_sports_filters", "Sports filter categories (leagues, teams)", &[], &[]),
];

type Query = Vec<(&'static str, String)>;

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct KalshiConnector {
    client: Arc<UpstreamClient>,
}

impl KalshiConnector {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    async fn get(&self, endpoint: &str, query: Query, ttl_secs: u64) -> Result<Value, SkillsError> {
        let req = query
            .into_iter()
            .fold(Request::new(Scope::Kalshi, format!("{BASE_URL}{endpoint}")), |r, (k, v)| {
                r.param(k, v)
            })
            .header("Accept", "application/json")
            .ttl_secs(ttl_secs);
        Ok(self.client.get_json(&req).await?)
    }

    fn page_limit(params: &Params, max: i64) -> Result<String, SkillsError> {
        Ok(params.int_or("limit", DEFAULT_LIMIT)?.clamp(1, max).to_string())
    }

    fn push_str(query: &mut Query, params: &Params, key: &'static str) {
        if let Some(v) = params.str(key) {
            query.push((key, v));
        }
    }

    fn nested_markets(query: &mut Query, params: &Params) {
        if params.flag("with_nested_markets").unwrap_or(false) {
            query.push(("with_nested_markets", "true".to_string()));
        }
    }

    async fn exchange_status(&self) -> Result<Outcome, SkillsError> {
        let data = self.get("/exchange/status", Query::new(), 30).await?;
        Ok(Outcome::ok_with(data, "Exchange status retrieved"))
    }

    async fn exchange_schedule(&self) -> Result<Outcome, SkillsError> {
        let data = self.get("/exchange/schedule", Query::new(), 3600).await?;
        Ok(Outcome::ok_with(data, "Exchange schedule retrieved"))
    }

    async fn series_list(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let mut q = Query::new();
        Self::push_str(&mut q, params, "category");
        Self::push_str(&mut q, params, "tags");
        let data = self.get("/series", q, 600).await?;
        let series = array(&data, &["series"]);
        Ok(Outcome::ok_with(
            json!({"series": series, "count": series.len()}),
            format!("Retrieved {} series", series.len()),
        ))
    }

    async fn series(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let ticker = params.require("series_ticker")?;
        let data = self.get(&format!("/series/{ticker}"), Query::new(), 300).await?;
        let series = match at(&data, &["series"]) {
            Value::Null => data.clone(),
            s => s.clone(),
        };
        Ok(Outcome::ok_with(series, format!("Retrieved series: {ticker}")))
    }

    async fn events(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let mut q: Query = vec![("limit", Self::page_limit(params, MAX_PAGE_LIMIT)?)];
        Self::push_str(&mut q, params, "cursor");
        Self::push_str(&mut q, params, "status");
        Self::push_str(&mut q, params, "series_ticker");
        Self::nested_markets(&mut q, params);
        let data = self.get("/events", q, 60).await?;
        let events = array(&data, &["events"]);
        Ok(Outcome::ok_with(
            json!({
                "events": events,
                "count": events.len(),
                "cursor": text_at(&data, &["cursor"]),
            }),
            format!("Retrieved {} events", events.len()),
        ))
    }

    async fn event(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let ticker = params.require("event_ticker")?;
        let mut q = Query::new();
        Self::nested_markets(&mut q, params);
        let data = self.get(&format!("/events/{ticker}"), q, 60).await?;
        Ok(Outcome::ok_with(
            json!({
                "event": match at(&data, &["event"]) {
                    Value::Null => json!({}),
                    e => e.clone(),
                },
                "markets": array(&data, &["markets"]),
            }),
            format!("Retrieved event: {ticker}"),
        ))
    }

    async fn markets(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let mut q: Query = vec![("limit", Self::page_limit(params, MAX_PAGE_LIMIT)?)];
        for key in ["cursor", "event_ticker", "series_ticker", "status", "tickers"] {
            Self::push_str(&mut q, params, key);
        }
        let data = self.get("/markets", q, 60).await?;
        let markets = array(&data, &["markets"]);
        Ok(Outcome::ok_with(
            json!({
                "markets": markets,
                "count": markets.len(),
                "cursor": text_at(&data, &["cursor"]),
            }),
            format!("Retrieved {} markets", markets.len()),
        ))
    }

    async fn market(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let ticker = params.require("ticker")?;
        let data = self.get(&format!("/markets/{ticker}"), Query::new(), 60).await?;
        let market = match at(&data, &["market"]) {
            Value::Null => data.clone(),
            m => m.clone(),
        };
        Ok(Outcome::ok_with(market, format!("Retrieved market: {ticker}")))
    }

    async fn trades(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let mut q: Query = vec![("limit", Self::page_limit(params, MAX_TRADES_LIMIT)?)];
        Self::push_str(&mut q, params, "cursor");
        Self::push_str(&mut q, params, "ticker");
        for key in ["min_ts", "max_ts"] {
            if let Some(ts) = params.int(key)? {
                q.push((key, ts.to_string()));
            }
        }
        let data = self.get("/markets/trades", q, 30).await?;
        let trades = array(&data, &["trades"]);
        Ok(Outcome::ok_with(
            json!({
                "trades": trades,
                "count": trades.len(),
                "cursor": text_at(&data, &["cursor"]),
            }),
            format!("Retrieved {} trades", trades.len()),
        ))
    }

    async fn candlesticks(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let series = params.require("series_ticker")?;
        let ticker = params.require("ticker")?;
        let mut q = Query::new();
        for key in ["start_ts", "end_ts", "period_interval"] {
            let value = params
                .int(key)?
                .ok_or_else(|| SkillsError::MissingParams(vec![key.to_string()]))?;
            q.push((key, value.to_string()));
        }
        let data = self
            .get(&format!("/series/{series}/markets/{ticker}/candlesticks"), q, 60)
            .await?;
        let candles = array(&data, &["candlesticks"]);
        Ok(Outcome::ok_with(
            json!({
                "ticker": ticker,
                "candlesticks": candles,
                "count": candles.len(),
            }),
            format!("Retrieved {} candlesticks", candles.len()),
        ))
    }

    async fn sports_filters(&self) -> Result<Outcome, SkillsError> {
        let data = self.get("/search/filters_by_sport", Query::new(), 3600).await?;
        Ok(Outcome::ok_with(data, "Sports filters retrieved"))
    }
}

#[async_trait]
impl Connector for KalshiConnector {
    fn module(&self) -> Module {
        Module::Kalshi
    }

    async fn call(&self, command: &str, params: &Params) -> Outcome {
        let result = match command {
            "get_exchange_status" => self.exchange_status().await,
            "get_exchange_schedule" => self.exchange_schedule().await,
            "get_series_list" => self.series_list(params).await,
            "get_series" => self.series(params).await,
            "get_events" => self.events(params).await,
            "get_event" => self.event(params).await,
            "get_markets" => self.markets(params).await,
            "get_market" => self.market(params).await,
            "get_trades" => self.trades(params).await,
            "get_market_candlesticks" => self.candlesticks(params).await,
            "get_sports_filters" => self.sports_filters().await,
            _ => return unknown_command(Module::Kalshi, command),
        };
        result.unwrap_or_else(Outcome::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{MockHttpTransport, RawResponse};

    fn kalshi(mock: MockHttpTransport) -> KalshiConnector {
        KalshiConnector::new(Arc::new(UpstreamClient::with_transport(Arc::new(mock))))
    }

    #[tokio::test]
    async fn test_markets_clamps_limit_and_passes_filters() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, headers| {
                url.to_string()
                    == format!("{BASE_URL}/markets?limit=200&series_ticker=KXNBA")
                    && headers.iter().any(|(k, v)| k == "Accept" && v == "application/json")
            })
            .times(1)
            .returning(|_, _| {
                Ok(RawResponse::new(
                    200,
                    r#"{"markets":[{"ticker":"A"},{"ticker":"B"}],"cursor":"next"}"#,
                ))
            });
        let env = kalshi(mock)
            .call(
                "get_markets",
                &Params::new().with("limit", 5000).with("series_ticker", "KXNBA"),
            )
            .await
            .into_envelope();
        assert!(env.status, "{}", env.message);
        assert_eq!(env.data["count"], json!(2));
        assert_eq!(env.data["cursor"], json!("next"));
        assert_eq!(env.message, "Retrieved 2 markets");
    }

    #[tokio::test]
    async fn test_market_unwraps_envelope_key() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| {
                Ok(RawResponse::new(200, r#"{"market":{"ticker":"KX-1","yes_bid":42}}"#))
            });
        let env = kalshi(mock)
            .call("get_market", &Params::new().with("ticker", "KX-1"))
            .await
            .into_envelope();
        assert_eq!(env.data["yes_bid"], json!(42));
    }

    #[tokio::test]
    async fn test_upstream_error_becomes_failure() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(404, r#"{"error":"not found"}"#)));
        let env = kalshi(mock)
            .call("get_series", &Params::new().with("series_ticker", "NOPE"))
            .await
            .into_envelope();
        assert!(!env.status);
        assert!(env.message.starts_with("API error: HTTP 404"));
    }

    #[tokio::test]
    async fn test_candlesticks_reject_non_numeric_timestamps() {
        let env = kalshi(MockHttpTransport::new())
            .call(
                "get_market_candlesticks",
                &Params::new()
                    .with("series_ticker", "S")
                    .with("ticker", "T")
                    .with("start_ts", "yesterday")
                    .with("end_ts", 2)
                    .with("period_interval", 60),
            )
            .await
            .into_envelope();
        assert!(!env.status);
        assert!(env.message.contains("--start_ts"));
    }
}
