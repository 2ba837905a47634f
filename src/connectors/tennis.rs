//! Tennis: ATP and WTA tournaments, calendars, rankings, player profiles and
//! news from ESPN.
//!
//! Tournaments nest matches inside draw groupings (men's singles, women's
//! doubles, ...). A competitor is either one athlete or a doubles pair.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::debug;

use super::{unknown_command, CommandSpec, Connector, Module, Params};
use crate::espn::{map_status, shape, EspnApi, CORE_BASE};
use crate::json::{array, at, first_text, is_truthy, or_empty, text_at};
use crate::types::{Outcome, SkillsError};

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("get_scoreboard", "Active tournaments with matches", &["tour"], &["date"]),
    CommandSpec::new("get_calendar", "Season tournament calendar", &["tour"], &["year"]),
    CommandSpec::new("get_rankings", "Current singles rankings", &["tour"], &["limit"]),
    CommandSpec::new("get_player_info", "Player profile", &["player_id"], &[]),
    CommandSpec::new("get_news", "Tour news", &["tour"], &[]),
];

const DEFAULT_RANKINGS_LIMIT: i64 = 50;
/// Rankings publish weekly and occasionally lag; look back this many weeks.
const RANKINGS_LOOKBACK_WEEKS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tour {
    Atp,
    Wta,
}

impl Tour {
    pub fn parse(raw: &str) -> Result<Tour, SkillsError> {
        match raw.trim().to_lowercase().as_str() {
            "atp" => Ok(Tour::Atp),
            "wta" => Ok(Tour::Wta),
            _ => Err(SkillsError::InvalidInput(format!(
                "Invalid tour '{raw}'. Must be 'atp' or 'wta'."
            ))),
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            Tour::Atp => "atp",
            Tour::Wta => "wta",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Tour::Atp => "ATP",
            Tour::Wta => "WTA",
        }
    }

    fn sport_path(&self) -> &'static str {
        match self {
            Tour::Atp => "tennis/atp",
            Tour::Wta => "tennis/wta",
        }
    }

    fn ranking_id(&self) -> u32 {
        match self {
            Tour::Atp => 1,
            Tour::Wta => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Shaping
// ---------------------------------------------------------------------------

fn set_scores(comp: &Value) -> Vec<i64> {
    array(comp, &["linescores"])
        .iter()
        .map(|s| crate::json::as_f64(at(s, &["value"])).map(|v| v as i64).unwrap_or(0))
        .collect()
}

fn competitor(comp: &Value) -> Value {
    let seed = at(comp, &["curatedRank", "current"]).clone();
    if text_at(comp, &["type"]) == "team" {
        let athletes = array(comp, &["roster", "athletes"]);
        let country = athletes
            .iter()
            .map(|a| text_at(a, &["flag", "alt"]))
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(" / ");
        return json!({
            "type": "doubles",
            "name": text_at(comp, &["roster", "displayName"]),
            "country": country,
            "seed": seed,
            "winner": is_truthy(at(comp, &["winner"])),
            "set_scores": set_scores(comp),
            "serving": is_truthy(at(comp, &["possession"])),
            "athletes": athletes
                .iter()
                .map(|a| json!({
                    "name": text_at(a, &["displayName"]),
                    "country": text_at(a, &["flag", "alt"]),
                }))
                .collect::<Vec<_>>(),
        });
    }
    let athlete = at(comp, &["athlete"]);
    json!({
        "type": "singles",
        "name": text_at(athlete, &["displayName"]),
        "country": text_at(athlete, &["flag", "alt"]),
        "seed": seed,
        "winner": is_truthy(at(comp, &["winner"])),
        "set_scores": set_scores(comp),
        "serving": is_truthy(at(comp, &["possession"])),
    })
}

fn tennis_match(c: &Value) -> Value {
    let status = at(c, &["status"]);
    json!({
        "id": text_at(c, &["id"]),
        "date": first_text(c, &["date", "startDate"]),
        "status": map_status(&text_at(status, &["type", "name"])),
        "status_detail": first_text(at(status, &["type"]), &["shortDetail", "detail"]),
        "round": text_at(c, &["round", "displayName"]),
        "draw": text_at(c, &["type", "text"]),
        "court": text_at(c, &["venue", "court"]),
        "result": array(c, &["notes"]).first().map(|n| text_at(n, &["text"])).unwrap_or_default(),
        "competitors": array(c, &["competitors"]).iter().map(competitor).collect::<Vec<_>>(),
        "sets_played": at(status, &["period"]).as_i64().unwrap_or(0),
    })
}

/// A tournament, optionally with its draws and matches.
pub fn tournament(ev: &Value, include_matches: bool) -> Value {
    let venue = at(ev, &["venue"]);
    let mut out = json!({
        "id": text_at(ev, &["id"]),
        "name": text_at(ev, &["name"]),
        "short_name": text_at(ev, &["shortName"]),
        "start_date": text_at(ev, &["date"]),
        "end_date": text_at(ev, &["endDate"]),
        "venue": first_text(venue, &["displayName", "fullName"]),
        "major": is_truthy(at(ev, &["major"])),
        "status": map_status(&text_at(ev, &["status", "type", "name"])),
        "status_detail": text_at(ev, &["status", "type", "shortDetail"]),
    });

    let winners: Vec<Value> = array(ev, &["previousWinners"])
        .iter()
        .map(|w| json!({
            "year": or_empty(w, &["season"]),
            "name": text_at(w, &["athlete", "displayName"]),
        }))
        .collect();
    if !winners.is_empty() {
        out["previous_winners"] = json!(winners);
    }

    if include_matches {
        let draws: Vec<Value> = array(ev, &["groupings"])
            .iter()
            .filter_map(|g| {
                let matches: Vec<Value> =
                    array(g, &["competitions"]).iter().map(tennis_match).collect();
                (!matches.is_empty()).then(|| json!({
                    "name": text_at(g, &["grouping", "displayName"]),
                    "slug": text_at(g, &["grouping", "slug"]),
                    "count": matches.len(),
                    "matches": matches,
                }))
            })
            .collect();
        out["draws"] = json!(draws);
    }
    out
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct TennisConnector {
    espn: EspnApi,
}

impl TennisConnector {
    pub fn new(espn: EspnApi) -> Self {
        Self { espn }
    }

    async fn scoreboard(&self, params: &Params) -> Result<Value, SkillsError> {
        let tour = Tour::parse(&params.require("tour")?)?;
        let mut q = Vec::new();
        if let Some(date) = params.str("date") {
            q.push(("dates", date.replace('-', "")));
        }
        let data = self.espn.site(tour.sport_path(), "scoreboard", &q).await?;
        let tournaments: Vec<Value> =
            array(&data, &["events"]).iter().map(|e| tournament(e, true)).collect();
        Ok(json!({
            "tour": tour.label(),
            "count": tournaments.len(),
            "tournaments": tournaments,
        }))
    }

    async fn calendar(&self, params: &Params) -> Result<Value, SkillsError> {
        let tour = Tour::parse(&params.require("tour")?)?;
        let year = params.int_or("year", Utc::now().year() as i64)?;
        let data = self
            .espn
            .site(tour.sport_path(), "scoreboard", &[("dates", year.to_string())])
            .await?;
        let tournaments: Vec<Value> =
            array(&data, &["events"]).iter().map(|e| tournament(e, false)).collect();
        Ok(json!({
            "tour": tour.label(),
            "year": year,
            "count": tournaments.len(),
            "tournaments": tournaments,
        }))
    }

    /// Walks back from the current ISO week until a week has ranks.
    async fn rankings_at(
        &self,
        tour: Tour,
        limit: usize,
        today: NaiveDate,
    ) -> Result<Value, SkillsError> {
        let year = today.year();
        let week = today.iso_week().week();
        let mut found = None;
        for offset in 0..RANKINGS_LOOKBACK_WEEKS {
            let Some(w) = week.checked_sub(offset).filter(|w| *w >= 1) else {
                break;
            };
            let url = format!(
                "{CORE_BASE}/tennis/leagues/{}/seasons/{year}/types/2/weeks/{w}/rankings/{}",
                tour.slug(),
                tour.ranking_id()
            );
            match self.espn.core_once(&url).await {
                Ok(data) if !array(&data, &["ranks"]).is_empty() => {
                    found = Some(data);
                    break;
                }
                Ok(_) => debug!(tour = tour.slug(), week = w, "No ranks published"),
                Err(e) => debug!(tour = tour.slug(), week = w, error = %e, "Rankings fetch failed"),
            }
        }
        let data = found.ok_or_else(|| {
            SkillsError::NoData(format!("No {} rankings available for {year}", tour.label()))
        })?;

        let ranks: Vec<&Value> = array(&data, &["ranks"]).iter().take(limit).collect();
        let refs: Vec<String> = ranks
            .iter()
            .filter(|r| first_text(at(r, &["athlete"]), &["displayName", "fullName"]).is_empty())
            .map(|r| text_at(r, &["athlete", "$ref"]))
            .filter(|r| !r.is_empty())
            .collect();
        let names = self.espn.resolve_refs(refs).await;

        let entries: Vec<Value> = ranks
            .iter()
            .map(|r| {
                let athlete = at(r, &["athlete"]);
                let mut name = first_text(athlete, &["displayName", "fullName"]);
                if name.is_empty() {
                    name = names
                        .get(&text_at(athlete, &["$ref"]))
                        .cloned()
                        .unwrap_or_default();
                }
                json!({
                    "rank": or_empty(r, &["current"]),
                    "previous_rank": or_empty(r, &["previous"]),
                    "name": name,
                    "points": at(r, &["points"]).as_f64().unwrap_or(0.0),
                    "trend": text_at(r, &["trend"]),
                })
            })
            .collect();

        Ok(json!({
            "tour": tour.label(),
            "headline": text_at(&data, &["headline"]),
            "count": entries.len(),
            "rankings": entries,
        }))
    }

    async fn rankings(&self, params: &Params) -> Result<Value, SkillsError> {
        let tour = Tour::parse(&params.require("tour")?)?;
        let limit = params.int_or("limit", DEFAULT_RANKINGS_LIMIT)?.max(1) as usize;
        self.rankings_at(tour, limit, Utc::now().date_naive()).await
    }

    async fn player_info(&self, params: &Params) -> Result<Value, SkillsError> {
        let player_id = params.require("player_id")?;
        let data = self
            .espn
            .core_url(&format!("{CORE_BASE}/tennis/athletes/{player_id}"))
            .await?;
        let mut out = json!({
            "id": text_at(&data, &["id"]),
            "name": first_text(&data, &["displayName", "fullName"]),
            "first_name": text_at(&data, &["firstName"]),
            "last_name": text_at(&data, &["lastName"]),
            "country": text_at(&data, &["birthPlace", "country"]),
            "birthplace": text_at(&data, &["birthPlace", "summary"]),
            "date_of_birth": text_at(&data, &["dateOfBirth"]),
            "age": or_empty(&data, &["age"]),
            "height": text_at(&data, &["displayHeight"]),
            "weight": text_at(&data, &["displayWeight"]),
            "hand": text_at(&data, &["hand", "displayValue"]),
            "active": at(&data, &["active"]).as_bool().unwrap_or(true),
            "debut_year": or_empty(&data, &["debutYear"]),
            "experience_years": or_empty(&data, &["experience", "years"]),
        });
        let card = array(&data, &["links"]).iter().find(|l| {
            array(l, &["rel"]).iter().any(|r| r.as_str() == Some("playercard"))
        });
        if let Some(link) = card {
            out["espn_url"] = json!(text_at(link, &["href"]));
        }
        Ok(out)
    }

    async fn news(&self, params: &Params) -> Result<Value, SkillsError> {
        let tour = Tour::parse(&params.require("tour")?)?;
        let data = self.espn.site(tour.sport_path(), "news", &[]).await?;
        let mut out = shape::news(&data);
        out["tour"] = json!(tour.label());
        Ok(out)
    }
}

#[async_trait]
impl Connector for TennisConnector {
    fn module(&self) -> Module {
        Module::Tennis
    }

    async fn call(&self, command: &str, params: &Params) -> Outcome {
        let result = match command {
            "get_scoreboard" => self.scoreboard(params).await,
            "get_calendar" => self.calendar(params).await,
            "get_rankings" => self.rankings(params).await,
            "get_player_info" => self.player_info(params).await,
            "get_news" => self.news(params).await,
            _ => return unknown_command(Module::Tennis, command),
        };
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{MockHttpTransport, RawResponse};
    use crate::http::UpstreamClient;
    use std::sync::Arc;

    fn tennis(mock: MockHttpTransport) -> TennisConnector {
        TennisConnector::new(EspnApi::new(Arc::new(UpstreamClient::with_transport(Arc::new(mock)))))
    }

    #[test]
    fn test_doubles_competitor() {
        let comp = json!({
            "type": "team",
            "winner": true,
            "roster": {"displayName": "A / B", "athletes": [
                {"displayName": "A", "flag": {"alt": "ESP"}},
                {"displayName": "B", "flag": {"alt": "ARG"}}
            ]},
            "linescores": [{"value": 6.0}, {"value": 4.0}]
        });
        let out = competitor(&comp);
        assert_eq!(out["type"], json!("doubles"));
        assert_eq!(out["country"], json!("ESP / ARG"));
        assert_eq!(out["set_scores"], json!([6, 4]));
        assert_eq!(out["athletes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_calendar_tournament_omits_draws() {
        let ev = json!({"id": "1", "name": "Wimbledon", "major": true, "groupings": [
            {"grouping": {"displayName": "Men's Singles"}, "competitions": [{"id": "m1"}]}
        ]});
        assert!(tournament(&ev, false).get("draws").is_none());
        let full = tournament(&ev, true);
        assert_eq!(full["draws"][0]["count"], json!(1));
        assert_eq!(full["major"], json!(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rankings_walk_back_to_published_week() {
        let mut mock = MockHttpTransport::new();
        // 2026-03-11 is ISO week 11.
        mock.expect_get()
            .withf(|url, _| url.contains("/weeks/11/"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"ranks":[]}"#)));
        mock.expect_get()
            .withf(|url, _| url.contains("/weeks/10/"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(500, "")));
        mock.expect_get()
            .withf(|url, _| url.contains("/weeks/9/rankings/2"))
            .times(1)
            .returning(|_, _| {
                Ok(RawResponse::new(
                    200,
                    r#"{"headline":"WTA Rankings","ranks":[
                        {"current":1,"previous":1,"points":9000,"athlete":{"displayName":"One"}},
                        {"current":2,"previous":3,"points":8000,
                         "athlete":{"displayName":"Two"}}]}"#,
                ))
            });
        let date = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        let out = tennis(mock).rankings_at(Tour::Wta, 1, date).await.unwrap();
        assert_eq!(out["count"], json!(1));
        assert_eq!(out["rankings"][0]["name"], json!("One"));
        assert_eq!(out["tour"], json!("WTA"));
    }

    #[tokio::test]
    async fn test_invalid_tour_is_failure() {
        let env = tennis(MockHttpTransport::new())
            .call("get_news", &Params::new().with("tour", "itf"))
            .await
            .into_envelope();
        assert!(!env.status);
        assert_eq!(env.message, "Invalid tour 'itf'. Must be 'atp' or 'wta'.");
    }
}
