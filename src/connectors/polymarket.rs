//! Polymarket integration.
//!
//! Uses the Gamma API for market and event discovery and the CLOB API for
//! prices, order books and price history. Both are read without auth.
//!
//! Gamma API: https://gamma-api.polymarket.com
//! CLOB API: https://clob.polymarket.com

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::{unknown_command, CommandSpec, Connector, Module, Params};
use crate::http::{Request, Scope, UpstreamClient};
use crate::json::{array, as_f64, at, is_truthy, text, text_at};
use crate::types::{Outcome, SkillsError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";
pub const CLOB_API_URL: &str = "https://clob.polymarket.com";
/// Gamma tag for the sports category.
const SPORTS_TAG_ID: i64 = 1;
const GAMMA_TTL_SECS: u64 = 120;
const CLOB_TTL_SECS: u64 = 30;
const MAX_BATCH_TOKENS: usize = 20;

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "get_sports_markets",
        "Active sports prediction markets",
        &[],
        &[
            "limit",
            "offset",
            "sports_market_types",
            "game_id",
            "active",
            "closed",
            "order",
            "ascending",
            "tag_id",
        ],
    ),
    CommandSpec::new(
        "get_sports_events",
        "Sports events, each grouping related markets",
        &[],
        &["limit", "offset", "active", "closed", "order", "ascending", "series_id", "tag_id"],
    ),
    CommandSpec::new(
        "get_series",
        "Series (leagues, recurring event groups)",
        &[],
        &["limit", "offset"],
    ),
    CommandSpec::new(
        "get_market_details",
        "One market by id or slug",
        &[],
        &["market_id", "slug"],
    ),
    CommandSpec::new(
        "get_event_details",
        "One event and its markets by id or slug",
        &[],
        &["event_id", "slug"],
    ),
    CommandSpec::new(
        "get_market_prices",
        "Midpoint, buy and sell prices for one token, or midpoints for several",
        &[],
        &["token_id", "token_ids"],
    ),
    CommandSpec::new("get_order_book", "Full order book for a token", &["token_id"], &[]),
    CommandSpec::new("get_sports_market_types", "Valid sports market types", &[], &[]),
    CommandSpec::new(
        "search_markets",
        "Find sports markets by keyword",
        &[],
        &["query", "sports_market_types", "tag_id", "limit"],
    ),
    CommandSpec::new(
        "get_price_history",
        "Historical prices for a token (interval 1d, 1w, 1m or max)",
        &["token_id"],
        &["interval", "fidelity"],
    ),
    CommandSpec::new(
        "get_last_trade_price",
        "Most recent trade price for a token",
        &["token_id"],
        &[],
    ),
];

type Query = Vec<(&'static str, String)>;

// ---------------------------------------------------------------------------
// Gamma API response types
// ---------------------------------------------------------------------------

/// Gamma market. Several list fields arrive as JSON-encoded strings,
/// e.g. `outcomePrices: "[\"0.65\",\"0.35\"]"`, so they are kept as raw
/// values and decoded with [`parse_json_field`].
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct GammaMarket {
    id: Value,
    question: Option<String>,
    description: Option<String>,
    slug: Option<String>,
    active: Option<bool>,
    closed: Option<bool>,
    outcomes: Value,
    outcome_prices: Value,
    clob_token_ids: Value,
    volume: Value,
    #[serde(rename = "volume24hr")]
    volume_24h: Value,
    liquidity: Value,
    competitive: Value,
    spread: Value,
    start_date: Option<String>,
    end_date: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    events: Option<Vec<Value>>,
    sports_market_type: Option<String>,
    game_id: Value,
    tags: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct GammaEvent {
    id: Value,
    title: Option<String>,
    description: Option<String>,
    slug: Option<String>,
    active: Option<bool>,
    closed: Option<bool>,
    start_date: Option<String>,
    end_date: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    volume: Value,
    liquidity: Value,
    competitive: Value,
    markets: Option<Vec<Value>>,
    tags: Option<Vec<Value>>,
    series_id: Value,
}

// ---------------------------------------------------------------------------
// Normalized shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, PartialEq)]
pub struct MarketOutcome {
    pub name: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clob_token_id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub description: String,
    pub slug: String,
    pub status: &'static str,
    pub outcomes: Vec<MarketOutcome>,
    pub volume: f64,
    pub volume_24h: f64,
    pub liquidity: f64,
    pub competitive: Value,
    pub spread: f64,
    pub start_date: String,
    pub end_date: String,
    pub created_at: String,
    pub updated_at: String,
    pub event_id: String,
    pub sports_market_type: String,
    pub game_id: String,
    pub clob_token_ids: Vec<Value>,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub status: &'static str,
    pub start_date: String,
    pub end_date: String,
    pub created_at: String,
    pub updated_at: String,
    pub volume: f64,
    pub liquidity: f64,
    pub competitive: Value,
    pub market_count: usize,
    pub markets: Vec<Market>,
    pub tags: Vec<String>,
    pub series_id: String,
}

/// Decode a field that may be a JSON-encoded list or already a list.
/// Anything else reads as empty.
pub fn parse_json_field(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn status(active: Option<bool>, closed: Option<bool>) -> &'static str {
    let closed = closed.unwrap_or(false);
    if active.unwrap_or(false) && !closed {
        "active"
    } else if closed {
        "closed"
    } else {
        "inactive"
    }
}

fn number(value: &Value) -> f64 {
    as_f64(value).unwrap_or(0.0)
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn tag_labels(tags: Option<Vec<Value>>) -> Vec<String> {
    tags.unwrap_or_default()
        .iter()
        .map(|t| if t.is_object() { text_at(t, &["label"]) } else { text(t) })
        .collect()
}

fn decode<T: DeserializeOwned + Default>(raw: &Value) -> T {
    serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
        warn!(error = %e, "Unexpected Gamma payload shape");
        T::default()
    })
}

pub fn normalize_market(raw: &Value) -> Market {
    let m: GammaMarket = decode(raw);
    let clob_token_ids = parse_json_field(&m.clob_token_ids);
    let prices: Vec<Option<f64>> = parse_json_field(&m.outcome_prices).iter().map(as_f64).collect();

    let outcomes = parse_json_field(&m.outcomes)
        .into_iter()
        .enumerate()
        .map(|(i, name)| MarketOutcome {
            name,
            price: prices.get(i).copied().flatten().map(round4),
            clob_token_id: clob_token_ids.get(i).cloned(),
        })
        .collect();

    let event_id = m
        .events
        .as_deref()
        .and_then(|events| events.first())
        .map(|e| text_at(e, &["id"]))
        .unwrap_or_default();

    Market {
        id: text(&m.id),
        question: m.question.unwrap_or_default(),
        description: m.description.unwrap_or_default(),
        slug: m.slug.unwrap_or_default(),
        status: status(m.active, m.closed),
        outcomes,
        volume: number(&m.volume),
        volume_24h: number(&m.volume_24h),
        liquidity: number(&m.liquidity),
        competitive: if m.competitive.is_null() { json!(0) } else { m.competitive },
        spread: number(&m.spread),
        start_date: m.start_date.unwrap_or_default(),
        end_date: m.end_date.unwrap_or_default(),
        created_at: m.created_at.unwrap_or_default(),
        updated_at: m.updated_at.unwrap_or_default(),
        event_id,
        sports_market_type: m.sports_market_type.unwrap_or_default(),
        game_id: text(&m.game_id),
        clob_token_ids,
        tags: tag_labels(m.tags),
    }
}

pub fn normalize_event(raw: &Value) -> Event {
    let e: GammaEvent = decode(raw);
    let markets: Vec<Market> = e.markets.unwrap_or_default().iter().map(normalize_market).collect();
    Event {
        id: text(&e.id),
        title: e.title.unwrap_or_default(),
        description: e.description.unwrap_or_default(),
        slug: e.slug.unwrap_or_default(),
        status: status(e.active, e.closed),
        start_date: e.start_date.unwrap_or_default(),
        end_date: e.end_date.unwrap_or_default(),
        created_at: e.created_at.unwrap_or_default(),
        updated_at: e.updated_at.unwrap_or_default(),
        volume: number(&e.volume),
        liquidity: number(&e.liquidity),
        competitive: if e.competitive.is_null() { json!(0) } else { e.competitive },
        market_count: markets.len(),
        markets,
        tags: tag_labels(e.tags),
        series_id: text(&e.series_id),
    }
}

/// Gamma list endpoints answer with a bare array or an object keyed by
/// the collection name.
fn listing<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    match data {
        Value::Array(items) => items.as_slice(),
        other => array(other, &[key]),
    }
}

fn level(entry: &Value) -> Value {
    json!({
        "price": number(at(entry, &["price"])),
        "size": number(at(entry, &["size"])),
    })
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct PolymarketConnector {
    client: Arc<UpstreamClient>,
}

impl PolymarketConnector {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    async fn get(
        &self,
        scope: Scope,
        url: String,
        query: Query,
        ttl_secs: u64,
    ) -> Result<Value, SkillsError> {
        let req = query
            .into_iter()
            .fold(Request::new(scope, url), |r, (k, v)| r.param(k, v))
            .header("Accept", "application/json")
            .ttl_secs(ttl_secs);
        Ok(self.client.get_json(&req).await?)
    }

    async fn gamma(
        &self,
        endpoint: &str,
        query: Query,
        ttl_secs: u64,
    ) -> Result<Value, SkillsError> {
        self.get(Scope::PolymarketGamma, format!("{GAMMA_API_URL}{endpoint}"), query, ttl_secs)
            .await
    }

    async fn clob(
        &self,
        endpoint: &str,
        query: Query,
        ttl_secs: u64,
    ) -> Result<Value, SkillsError> {
        self.get(Scope::PolymarketClob, format!("{CLOB_API_URL}{endpoint}"), query, ttl_secs)
            .await
    }

    /// Shared filters of the market and event listings.
    fn listing_query(params: &Params) -> Result<Query, SkillsError> {
        let flag = |key: &str, default: bool| params.flag(key).unwrap_or(default).to_string();
        Ok(vec![
            ("tag_id", params.int_or("tag_id", SPORTS_TAG_ID)?.to_string()),
            ("limit", params.int_or("limit", 50)?.clamp(1, 100).to_string()),
            ("offset", params.int_or("offset", 0)?.max(0).to_string()),
            ("active", flag("active", true)),
            ("closed", flag("closed", false)),
            ("order", params.str_or("order", "volume")),
            ("ascending", flag("ascending", false)),
        ])
    }

    async fn sports_markets(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let mut q = Self::listing_query(params)?;
        let offset = params.int_or("offset", 0)?.max(0);
        for key in ["sports_market_types", "game_id"] {
            if let Some(v) = params.str(key) {
                q.push((key, v));
            }
        }
        let data = self.gamma("/markets", q, GAMMA_TTL_SECS).await?;
        let markets: Vec<Market> = listing(&data, "markets").iter().map(normalize_market).collect();
        let count = markets.len();
        Ok(Outcome::ok_with(
            json!({"markets": markets, "count": count, "offset": offset}),
            format!("Retrieved {count} sports markets"),
        ))
    }

    async fn sports_events(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let mut q = Self::listing_query(params)?;
        let offset = params.int_or("offset", 0)?.max(0);
        if let Some(series) = params.str("series_id") {
            q.push(("series_id", series));
        }
        let data = self.gamma("/events", q, GAMMA_TTL_SECS).await?;
        let events: Vec<Event> = listing(&data, "events").iter().map(normalize_event).collect();
        let count = events.len();
        Ok(Outcome::ok_with(
            json!({"events": events, "count": count, "offset": offset}),
            format!("Retrieved {count} sports events"),
        ))
    }

    async fn series(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let q: Query = vec![
            ("limit", params.int_or("limit", 100)?.clamp(1, 200).to_string()),
            ("offset", params.int_or("offset", 0)?.max(0).to_string()),
        ];
        let data = self.gamma("/series", q, 600).await?;
        let series: Vec<Value> = listing(&data, "series")
            .iter()
            .map(|s| {
                json!({
                    "id": text_at(s, &["id"]),
                    "title": text_at(s, &["title"]),
                    "slug": text_at(s, &["slug"]),
                    "description": text_at(s, &["description"]),
                    "image": text_at(s, &["image"]),
                    "created_at": text_at(s, &["createdAt"]),
                    "updated_at": text_at(s, &["updatedAt"]),
                })
            })
            .collect();
        Ok(Outcome::ok_with(
            json!({"series": series, "count": series.len()}),
            format!("Retrieved {} series", series.len()),
        ))
    }

    /// Gamma path segment for an id-or-slug lookup; the slug wins.
    fn id_or_slug(params: &Params, id_key: &str) -> Result<String, SkillsError> {
        params.str("slug").or_else(|| params.str(id_key)).ok_or_else(|| {
            SkillsError::InvalidInput(format!("Either {id_key} or slug is required"))
        })
    }

    async fn market_details(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let key = Self::id_or_slug(params, "market_id")?;
        let data = self.gamma(&format!("/markets/{key}"), Query::new(), 60).await?;
        if !is_truthy(at(&data, &["id"])) {
            return Err(SkillsError::NoData(format!("Market not found: {key}")));
        }
        let market = normalize_market(&data);
        let message = format!("Retrieved market: {}", market.question);
        Ok(Outcome::ok_with(market, message))
    }

    async fn event_details(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let key = Self::id_or_slug(params, "event_id")?;
        let data = self.gamma(&format!("/events/{key}"), Query::new(), 60).await?;
        if !is_truthy(at(&data, &["id"])) {
            return Err(SkillsError::NoData(format!("Event not found: {key}")));
        }
        let event = normalize_event(&data);
        let message = format!("Retrieved event: {}", event.title);
        Ok(Outcome::ok_with(event, message))
    }

    async fn midpoint(&self, token_id: &str) -> Result<f64, SkillsError> {
        let data = self
            .clob("/midpoint", vec![("token_id", token_id.to_string())], CLOB_TTL_SECS)
            .await?;
        Ok(number(at(&data, &["mid"])))
    }

    /// Buy or sell price; unavailable sides read as `None`.
    async fn side_price(&self, token_id: &str, side: &str) -> Option<f64> {
        let q: Query = vec![("token_id", token_id.to_string()), ("side", side.to_string())];
        match self.clob("/price", q, CLOB_TTL_SECS).await {
            Ok(data) => Some(number(at(&data, &["price"]))),
            Err(e) => {
                warn!(token_id, side, error = %e, "Polymarket side price unavailable");
                None
            }
        }
    }

    async fn market_prices(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let token_ids = params.list("token_ids");
        if token_ids.is_empty() {
            let token_id = params.str("token_id").ok_or_else(|| {
                SkillsError::InvalidInput("Either token_id or token_ids is required".into())
            })?;
            let midpoint = self.midpoint(&token_id).await?;
            let (buy, sell) = tokio::join!(
                self.side_price(&token_id, "BUY"),
                self.side_price(&token_id, "SELL")
            );
            return Ok(Outcome::ok_with(
                json!({
                    "token_id": token_id,
                    "midpoint": midpoint,
                    "buy_price": buy,
                    "sell_price": sell,
                }),
                "Price data retrieved",
            ));
        }

        let batch: Vec<&String> = token_ids.iter().take(MAX_BATCH_TOKENS).collect();
        let mids = join_all(batch.iter().map(|t| self.midpoint(t))).await;
        let prices: Vec<Value> = batch
            .into_iter()
            .zip(mids)
            .filter_map(|(token_id, mid)| {
                mid.ok().map(|m| json!({"token_id": token_id, "midpoint": m}))
            })
            .collect();
        Ok(Outcome::ok_with(
            json!({"prices": prices, "count": prices.len()}),
            format!("Retrieved prices for {} tokens", prices.len()),
        ))
    }

    async fn order_book(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let token_id = params.require("token_id")?;
        let data = self
            .clob("/book", vec![("token_id", token_id.clone())], CLOB_TTL_SECS)
            .await?;
        let bids = array(&data, &["bids"]);
        let asks = array(&data, &["asks"]);
        let best = |side: &[Value]| side.first().map(|l| number(at(l, &["price"]))).unwrap_or(0.0);
        let (best_bid, best_ask) = (best(bids), best(asks));
        let spread = (best_bid > 0.0 && best_ask > 0.0).then(|| round4(best_ask - best_bid));
        Ok(Outcome::ok_with(
            json!({
                "token_id": token_id,
                "bids": bids.iter().map(level).collect::<Vec<_>>(),
                "asks": asks.iter().map(level).collect::<Vec<_>>(),
                "best_bid": best_bid,
                "best_ask": best_ask,
                "spread": spread,
                "bid_depth": bids.len(),
                "ask_depth": asks.len(),
            }),
            format!("Order book retrieved ({} bids, {} asks)", bids.len(), asks.len()),
        ))
    }

    async fn sports_market_types(&self) -> Result<Outcome, SkillsError> {
        let data = self.gamma("/sports/market-types", Query::new(), 3600).await?;
        Ok(Outcome::ok_with(data, "Sports market types retrieved"))
    }

    /// Keyword search over the highest-volume sports events. Gamma's own
    /// search endpoint requires auth.
    async fn search_markets(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let query = params.str_or("query", "").to_lowercase();
        let limit = params.int_or("limit", 20)?.clamp(1, 50) as usize;
        let market_type = params.str("sports_market_types");
        let q: Query = vec![
            ("tag_id", params.int_or("tag_id", SPORTS_TAG_ID)?.to_string()),
            ("limit", (limit * 2).min(100).to_string()),
            ("active", "true".to_string()),
            ("closed", "false".to_string()),
            ("order", "volume".to_string()),
            ("ascending", "false".to_string()),
        ];
        let data = self.gamma("/events", q, 60).await?;

        let matches = |e: &Value| {
            query.is_empty()
                || ["title", "description", "slug"]
                    .iter()
                    .any(|k| text_at(e, &[k]).to_lowercase().contains(&query))
        };
        let markets: Vec<Market> = listing(&data, "events")
            .iter()
            .filter(|e| matches(e))
            .take(limit)
            .flat_map(|e| array(e, &["markets"]).iter())
            .filter(|m| match &market_type {
                Some(t) => text_at(m, &["sportsMarketType"]) == *t,
                None => true,
            })
            .take(limit)
            .map(normalize_market)
            .collect();

        let count = markets.len();
        let label = if query.is_empty() { "(all sports)".to_string() } else { query };
        Ok(Outcome::ok_with(
            json!({"markets": markets, "count": count, "query": label}),
            format!("Found {count} markets"),
        ))
    }

    async fn price_history(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let token_id = params.require("token_id")?;
        let q: Query = vec![
            ("market", token_id.clone()),
            ("interval", params.str_or("interval", "max")),
            ("fidelity", params.int_or("fidelity", 120)?.to_string()),
        ];
        let data = self.clob("/prices-history", q, 60).await?;
        let history = listing(&data, "history").to_vec();
        Ok(Outcome::ok_with(
            json!({"history": history, "count": history.len(), "token_id": token_id}),
            format!("Retrieved {} price data points", history.len()),
        ))
    }

    async fn last_trade_price(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let token_id = params.require("token_id")?;
        let data = self
            .clob("/last-trade-price", vec![("token_id", token_id.clone())], 15)
            .await?;
        let shown = match text_at(&data, &["price"]) {
            p if p.is_empty() => "N/A".to_string(),
            p => p,
        };
        Ok(Outcome::ok_with(
            json!({
                "token_id": token_id,
                "price": number(at(&data, &["price"])),
                "side": text_at(&data, &["side"]),
            }),
            format!("Last trade price: {shown}"),
        ))
    }
}

#[async_trait]
impl Connector for PolymarketConnector {
    fn module(&self) -> Module {
        Module::Polymarket
    }

    async fn call(&self, command: &str, params: &Params) -> Outcome {
        let result = match command {
            "get_sports_markets" => self.sports_markets(params).await,
            "get_sports_events" => self.sports_events(params).await,
            "get_series" => self.series(params).await,
            "get_market_details" => self.market_details(params).await,
            "get_event_details" => self.event_details(params).await,
            "get_market_prices" => self.market_prices(params).await,
            "get_order_book" => self.order_book(params).await,
            "get_sports_market_types" => self.sports_market_types().await,
            "search_markets" => self.search_markets(params).await,
            "get_price_history" => self.price_history(params).await,
            "get_last_trade_price" => self.last_trade_price(params).await,
            _ => return unknown_command(Module::Polymarket, command),
        };
        result.unwrap_or_else(Outcome::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{MockHttpTransport, RawResponse};

    fn polymarket(mock: MockHttpTransport) -> PolymarketConnector {
        PolymarketConnector::new(Arc::new(UpstreamClient::with_transport(Arc::new(mock))))
    }

    #[test]
    fn test_normalize_market_decodes_string_fields() {
        let raw = json!({
            "id": "512",
            "question": "Lakers vs Celtics",
            "active": true,
            "closed": false,
            "outcomes": "[\"Lakers\",\"Celtics\"]",
            "outcomePrices": "[\"0.61234\",\"0.38766\"]",
            "clobTokenIds": "[\"tok-a\",\"tok-b\"]",
            "volume": "15000.5",
            "volume24hr": 1200,
            "events": [{"id": "77"}],
            "tags": [{"label": "NBA"}, "Sports"],
            "sportsMarketType": "moneyline"
        });
        let m = normalize_market(&raw);
        assert_eq!(m.id, "512");
        assert_eq!(m.status, "active");
        assert_eq!(m.outcomes.len(), 2);
        assert_eq!(m.outcomes[0].price, Some(0.6123));
        assert_eq!(m.outcomes[1].clob_token_id, Some(json!("tok-b")));
        assert_eq!(m.volume, 15000.5);
        assert_eq!(m.volume_24h, 1200.0);
        assert_eq!(m.event_id, "77");
        assert_eq!(m.tags, vec!["NBA", "Sports"]);
        assert_eq!(m.competitive, json!(0));
    }

    #[test]
    fn test_parse_json_field_tolerates_garbage() {
        assert_eq!(parse_json_field(&json!("not json")), Vec::<Value>::new());
        assert_eq!(parse_json_field(&json!(["a"])), vec![json!("a")]);
        assert_eq!(parse_json_field(&Value::Null), Vec::<Value>::new());
    }

    #[test]
    fn test_status_closed_wins_over_active() {
        assert_eq!(status(Some(true), Some(true)), "closed");
        assert_eq!(status(None, None), "inactive");
    }

    #[tokio::test]
    async fn test_market_details_requires_id_or_slug() {
        let env = polymarket(MockHttpTransport::new())
            .call("get_market_details", &Params::new())
            .await
            .into_envelope();
        assert!(!env.status);
        assert_eq!(env.message, "Either market_id or slug is required");
    }

    #[tokio::test]
    async fn test_market_details_prefers_slug() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| url.to_string() == format!("{GAMMA_API_URL}/markets/lakers-celtics"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"id":"9","question":"Who wins?"}"#)));
        let env = polymarket(mock)
            .call(
                "get_market_details",
                &Params::new().with("market_id", "9").with("slug", "lakers-celtics"),
            )
            .await
            .into_envelope();
        assert!(env.status, "{}", env.message);
        assert_eq!(env.message, "Retrieved market: Who wins?");
    }

    #[tokio::test]
    async fn test_sports_markets_defaults_query() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| {
                url.starts_with("https://gamma-api.polymarket.com/markets?")
                    && url.contains("tag_id=1")
                    && url.contains("limit=100")
                    && url.contains("active=true")
                    && url.contains("closed=false")
                    && url.contains("order=volume")
            })
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"[{"id":"1"},{"id":"2"}]"#)));
        let env = polymarket(mock)
            .call("get_sports_markets", &Params::new().with("limit", 500))
            .await
            .into_envelope();
        assert_eq!(env.data["count"], json!(2));
        assert_eq!(env.message, "Retrieved 2 sports markets");
    }

    #[tokio::test]
    async fn test_order_book_spread() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get().times(1).returning(|_, _| {
            Ok(RawResponse::new(
                200,
                r#"{"bids":[{"price":"0.45","size":"100"}],
                    "asks":[{"price":"0.48","size":"50"},{"price":"0.5","size":"10"}]}"#,
            ))
        });
        let env = polymarket(mock)
            .call("get_order_book", &Params::new().with("token_id", "tok"))
            .await
            .into_envelope();
        assert_eq!(env.data["spread"], json!(0.03));
        assert_eq!(env.data["ask_depth"], json!(2));
        assert_eq!(env.message, "Order book retrieved (1 bids, 2 asks)");
    }

    #[tokio::test]
    async fn test_single_price_survives_missing_side() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get().times(3).returning(|url, _| {
            if url.contains("/midpoint") {
                Ok(RawResponse::new(200, r#"{"mid":"0.52"}"#))
            } else if url.contains("side=BUY") {
                Ok(RawResponse::new(200, r#"{"price":"0.53"}"#))
            } else {
                Ok(RawResponse::new(404, "no orders"))
            }
        });
        let env = polymarket(mock)
            .call("get_market_prices", &Params::new().with("token_id", "tok"))
            .await
            .into_envelope();
        assert!(env.status, "{}", env.message);
        assert_eq!(env.data["midpoint"], json!(0.52));
        assert_eq!(env.data["buy_price"], json!(0.53));
        assert!(env.data["sell_price"].is_null());
    }

    #[tokio::test]
    async fn test_search_filters_by_keyword_and_type() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get().times(1).returning(|_, _| {
            Ok(RawResponse::new(
                200,
                r#"[
                    {"title":"Lakers vs Celtics","markets":[
                        {"id":"1","sportsMarketType":"moneyline"},
                        {"id":"2","sportsMarketType":"totals"}]},
                    {"title":"Arsenal vs Spurs",
                     "markets":[{"id":"3","sportsMarketType":"moneyline"}]}
                ]"#,
            ))
        });
        let env = polymarket(mock)
            .call(
                "search_markets",
                &Params::new().with("query", "LAKERS").with("sports_market_types", "moneyline"),
            )
            .await
            .into_envelope();
        assert_eq!(env.data["count"], json!(1));
        assert_eq!(env.data["markets"][0]["id"], json!("1"));
        assert_eq!(env.data["query"], json!("lakers"));
    }
}
