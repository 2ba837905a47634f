//! Transfermarkt `ceapi` JSON: market value history and transfer records.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::http::{Request, Scope, UpstreamClient};
use crate::json::{array, at, first_text, text_at};

pub const BASE_URL: &str = "https://www.transfermarkt.com";
const TTL_SECS: u64 = 86_400;
const NEGATIVE_TTL_SECS: u64 = 60;
/// Cap on player ids looked up by one transfers call.
pub const MAX_PLAYERS: usize = 50;

pub fn market_value(entry: &Value) -> Value {
    json!({
        "value": match at(entry, &["y"]) {
            Value::Null => json!(0),
            v => v.clone(),
        },
        "currency": "EUR",
        "date": text_at(entry, &["datum_mw"]),
        "formatted": text_at(entry, &["mw"]),
        "age": text_at(entry, &["age"]),
        "club": text_at(entry, &["verein"]),
    })
}

fn club(side: &Value) -> Value {
    json!({
        "name": text_at(side, &["clubName"]),
        "image": first_text(side, &["clubImage", "clubEmblem-1x"]),
    })
}

pub fn transfer(t: &Value, tm_player_id: &str) -> Value {
    json!({
        "player_tm_id": tm_player_id,
        "date": first_text(t, &["dateUnformatted", "date"]),
        "season": text_at(t, &["season"]),
        "from_team": club(at(t, &["from"])),
        "to_team": club(at(t, &["to"])),
        "fee": text_at(t, &["fee"]),
        "market_value": text_at(t, &["marketValue"]),
    })
}

/// Market value points, under either key the API has used.
pub fn value_points(data: &Value) -> &[Value] {
    match array(data, &["list"]) {
        [] => array(data, &["marketValueDevelopment"]),
        list => list,
    }
}

pub fn transfer_records(data: &Value) -> &[Value] {
    match array(data, &["transfers"]) {
        [] => array(data, &["transferHistory"]),
        list => list,
    }
}

/// Whether a transfer dated `date` (`YYYY-...`) falls within a year of
/// `season_year`. Undated or unparseable records are kept.
pub fn near_season(date: &str, season_year: i32) -> bool {
    match date.get(..4).and_then(|y| y.parse::<i32>().ok()) {
        Some(y) => (y - season_year).abs() <= 1,
        None => true,
    }
}

#[derive(Clone)]
pub struct TransfermarktApi {
    client: Arc<UpstreamClient>,
}

impl TransfermarktApi {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    async fn fetch(&self, path: &str) -> Option<Value> {
        let req = Request::new(Scope::Transfermarkt, format!("{BASE_URL}{path}"))
            .header("Accept", "application/json")
            .ttl_secs(TTL_SECS);
        match self.client.get_json(&req).await {
            Ok(v) if v.is_object() => Some(v),
            Ok(_) => None,
            Err(e) => {
                debug!(path, error = %e, "Transfermarkt request failed");
                self.client
                    .remember_failure(&req, Value::Null, Duration::from_secs(NEGATIVE_TTL_SECS));
                None
            }
        }
    }

    pub async fn market_values(&self, tm_player_id: &str) -> Option<Value> {
        self.fetch(&format!("/ceapi/marketValueDevelopment/graph/{tm_player_id}"))
            .await
    }

    pub async fn transfer_history(&self, tm_player_id: &str) -> Option<Value> {
        self.fetch(&format!("/ceapi/transferHistory/list/{tm_player_id}"))
            .await
    }
}
