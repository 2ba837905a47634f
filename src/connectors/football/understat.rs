//! Understat expected-goals data for the five big European leagues.
//!
//! Shots and rosters come from the AJAX endpoints; `match_info` is still
//! only embedded in the match page as `JSON.parse('...')` with `\xNN`
//! escapes.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

use super::leagues::{names_match, normalize_name};
use super::normalize::MatchContext;
use crate::http::{Request, Scope, UpstreamClient};
use crate::json::{array, as_f64, at, text, text_at};

pub const BASE_URL: &str = "https://understat.com";
const NEGATIVE_TTL_SECS: u64 = 60;

fn hex_escape() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\x([0-9a-fA-F]{2})").ok()).as_ref()
}

/// Decode a hex-escaped JSON literal (`\x7B\x22id\x22...`).
pub fn decode_json(raw: &str) -> Option<Value> {
    let decoded = hex_escape()?.replace_all(raw, |caps: &regex::Captures<'_>| {
        u8::from_str_radix(&caps[1], 16)
            .map(|b| (b as char).to_string())
            .unwrap_or_default()
    });
    serde_json::from_str(&decoded).ok()
}

/// Value of `var <name> = JSON.parse('...')` in an Understat page.
pub fn extract_var(html: &str, name: &str) -> Option<Value> {
    let pattern = format!(r"(?s)var\s+{}\s*=\s*JSON\.parse\('(.+?)'\)", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(html)?;
    decode_json(caps.get(1)?.as_str())
}

fn num(v: &Value) -> f64 {
    as_f64(v).unwrap_or(0.0)
}

fn int(v: &Value) -> i64 {
    as_f64(v).map(|f| f as i64).unwrap_or(0)
}

fn round_to(x: f64, places: i32) -> f64 {
    let m = 10f64.powi(places);
    (x * m).round() / m
}

const SIDES: [(&str, &str); 2] = [("h", "home"), ("a", "away")];

/// Team xG totals and the shot list, ordered by minute. Totals fall back
/// to `match_info` when there are no shots.
pub fn normalize_xg(shots: &Value, match_info: &Value) -> Value {
    let home = array(shots, &["h"]);
    let away = array(shots, &["a"]);
    let total = |side: &[Value]| side.iter().map(|s| num(at(s, &["xG"]))).sum::<f64>();
    let (mut home_xg, mut away_xg) = (total(home), total(away));
    if home.is_empty() && away.is_empty() && !match_info.is_null() {
        home_xg = num(at(match_info, &["h_xg"]));
        away_xg = num(at(match_info, &["a_xg"]));
    }

    let teams: Vec<Value> = if match_info.as_object().map_or(true, |o| o.is_empty()) {
        Vec::new()
    } else {
        SIDES
            .iter()
            .map(|(side, qualifier)| {
                let xg = if *side == "h" { home_xg } else { away_xg };
                json!({
                    "team": {
                        "id": text_at(match_info, &[*side]),
                        "name": text_at(match_info, &[format!("team_{side}").as_str()]),
                    },
                    "qualifier": qualifier,
                    "xg": round_to(xg, 3),
                })
            })
            .collect()
    };

    let mut all: Vec<&Value> = home.iter().chain(away.iter()).collect();
    all.sort_by_key(|s| int(at(s, &["minute"])));
    let shots: Vec<Value> = all
        .into_iter()
        .map(|s| {
            json!({
                "id": text_at(s, &["id"]),
                "minute": int(at(s, &["minute"])),
                "result": text_at(s, &["result"]),
                "xg": round_to(num(at(s, &["xG"])), 4),
                "player": {"id": text_at(s, &["player_id"]), "name": text_at(s, &["player"])},
                "assist": text_at(s, &["player_assisted"]),
                "situation": text_at(s, &["situation"]),
                "shot_type": text_at(s, &["shotType"]),
                "last_action": text_at(s, &["lastAction"]),
                "coordinates": {"x": num(at(s, &["X"])), "y": num(at(s, &["Y"]))},
                "qualifier": if text_at(s, &["h_a"]) == "h" { "home" } else { "away" },
            })
        })
        .collect();

    json!({"teams": teams, "shots": shots})
}

/// Per-player xG, xA and xGChain per side, in lineup order.
pub fn normalize_players(rosters: &Value, match_info: &Value) -> Vec<Value> {
    SIDES
        .iter()
        .filter_map(|(side, qualifier)| {
            let roster = at(rosters, &[*side]).as_object()?;
            let mut players: Vec<Value> = roster
                .iter()
                .map(|(pid, p)| {
                    let id = match text_at(p, &["player_id"]) {
                        s if s.is_empty() => pid.clone(),
                        s => s,
                    };
                    let order = match at(p, &["positionOrder"]) {
                        Value::Null => 99,
                        v => int(v),
                    };
                    json!({
                        "id": id,
                        "name": text_at(p, &["player"]),
                        "position_order": order,
                        "minutes": int(at(p, &["time"])),
                        "goals": int(at(p, &["goals"])),
                        "own_goals": int(at(p, &["own_goals"])),
                        "assists": int(at(p, &["assists"])),
                        "shots": int(at(p, &["shots"])),
                        "key_passes": int(at(p, &["key_passes"])),
                        "xg": round_to(num(at(p, &["xG"])), 3),
                        "xa": round_to(num(at(p, &["xA"])), 3),
                        "xg_chain": round_to(num(at(p, &["xGChain"])), 3),
                        "xg_buildup": round_to(num(at(p, &["xGBuildup"])), 3),
                        "yellow_card": int(at(p, &["yellow_card"])),
                        "red_card": int(at(p, &["red_card"])),
                    })
                })
                .collect();
            if players.is_empty() {
                return None;
            }
            players.sort_by_key(|p| p["position_order"].as_i64().unwrap_or(99));
            Some(json!({
                "team": {
                    "id": text_at(match_info, &[*side]),
                    "name": text_at(match_info, &[format!("team_{side}").as_str()]),
                },
                "qualifier": qualifier,
                "players": players,
            }))
        })
        .collect()
}

/// Copy Understat xG columns onto ESPN player statistics, matching teams
/// by side and players by name.
pub fn merge_player_xg(espn_teams: &mut [Value], understat_teams: &[Value]) {
    for team in espn_teams.iter_mut() {
        let qualifier = text_at(team, &["qualifier"]);
        let Some(ut) = understat_teams
            .iter()
            .find(|u| text_at(u, &["qualifier"]) == qualifier)
        else {
            continue;
        };
        let candidates = array(ut, &["players"]);
        let Some(players) = team.get_mut("players").and_then(Value::as_array_mut) else {
            continue;
        };
        for player in players.iter_mut() {
            let name = text_at(player, &["name"]).to_lowercase();
            let found = candidates
                .iter()
                .find(|u| text_at(u, &["name"]).to_lowercase() == name)
                .or_else(|| candidates.iter().find(|u| names_match(&name, &text_at(u, &["name"]))));
            let (Some(found), Some(stats)) = (found, player.get_mut("statistics")) else {
                continue;
            };
            for key in ["xg", "xa", "xg_chain", "xg_buildup", "key_passes"] {
                stats[key] = Value::String(text(at(found, &[key])));
            }
        }
    }
}

/// Shots, rosters and match info for one Understat match.
#[derive(Debug, Clone, Default)]
pub struct MatchData {
    pub shots: Value,
    pub rosters: Value,
    pub match_info: Value,
}

/// Understat AJAX and page access through the shared client.
#[derive(Clone)]
pub struct UnderstatApi {
    client: Arc<UpstreamClient>,
}

impl UnderstatApi {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    async fn ajax(&self, path: &str, ttl_secs: u64) -> Option<Value> {
        let req = Request::new(Scope::Understat, format!("{BASE_URL}{path}"))
            .header("X-Requested-With", "XMLHttpRequest")
            .ttl_secs(ttl_secs);
        match self.client.get_json(&req).await {
            Ok(v) if !v.is_null() => Some(v),
            Ok(_) => None,
            Err(e) => {
                debug!(path, error = %e, "Understat request failed");
                self.client
                    .remember_failure(&req, Value::Null, Duration::from_secs(NEGATIVE_TTL_SECS));
                None
            }
        }
    }

    async fn match_page(&self, match_id: &str) -> Option<String> {
        let req =
            Request::new(Scope::Understat, format!("{BASE_URL}/match/{match_id}")).ttl_secs(600);
        match self.client.get_text(&req).await {
            Ok(html) => Some(html),
            Err(e) => {
                debug!(match_id, error = %e, "Understat match page unavailable");
                None
            }
        }
    }

    /// Understat match id for an ESPN match, by kickoff date and home team.
    pub async fn find_match_id(&self, ctx: &MatchContext) -> Option<String> {
        let league = ctx.competition.and_then(|c| c.understat)?;
        if ctx.date.is_empty() || ctx.home_team.is_empty() || ctx.season_year.is_empty() {
            return None;
        }
        let data = self
            .ajax(&format!("/getLeagueData/{league}/{}", ctx.season_year), 3600)
            .await?;
        let found = array(&data, &["dates"]).iter().find(|m| {
            text_at(m, &["datetime"]).starts_with(&ctx.date)
                && names_match(&ctx.home_team, &text_at(m, &["h", "title"]))
        });
        match found {
            Some(m) => Some(text_at(m, &["id"])),
            None => {
                debug!(
                    league,
                    date = %ctx.date,
                    home = %normalize_name(&ctx.home_team),
                    "No Understat match for fixture"
                );
                None
            }
        }
    }

    pub async fn match_data(&self, match_id: &str) -> Option<MatchData> {
        if match_id.is_empty() {
            return None;
        }
        let api = self.ajax(&format!("/getMatchData/{match_id}"), 300).await;
        let match_info = self
            .match_page(match_id)
            .await
            .and_then(|html| extract_var(&html, "match_info"))
            .unwrap_or_else(|| json!({}));
        let api = api.unwrap_or_else(|| json!({}));
        let pick = |key: &str, empty: Value| match at(&api, &[key]) {
            Value::Null => empty,
            v => v.clone(),
        };
        Some(MatchData {
            shots: pick("shots", json!({"h": [], "a": []})),
            rosters: pick("rosters", json!({"h": {}, "a": {}})),
            match_info,
        })
    }
}
