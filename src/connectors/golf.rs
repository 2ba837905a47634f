//! Golf: PGA Tour, LPGA and DP World Tour leaderboards, calendars, golfer
//! profiles and news from ESPN.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::{json, Value};
use tracing::debug;

use super::{unknown_command, CommandSpec, Connector, Module, Params};
use crate::espn::{map_status, shape, EspnApi};
use crate::json::{array, at, first, first_text, or_empty, text, text_at};
use crate::types::{Outcome, SkillsError};

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "get_leaderboard",
        "Leaderboard of the current or most recent tournament",
        &["tour"],
        &[],
    ),
    CommandSpec::new("get_schedule", "Season tournament calendar", &["tour"], &["year"]),
    CommandSpec::new("get_player_info", "Golfer profile", &["player_id"], &["tour"]),
    CommandSpec::new("get_news", "Tour news", &["tour"], &[]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tour {
    Pga,
    Lpga,
    Eur,
}

impl Tour {
    pub fn parse(raw: &str) -> Result<Tour, SkillsError> {
        match raw.trim().to_lowercase().as_str() {
            "pga" => Ok(Tour::Pga),
            "lpga" => Ok(Tour::Lpga),
            "eur" => Ok(Tour::Eur),
            other => Err(SkillsError::InvalidInput(format!(
                "Invalid tour '{other}'. Use 'pga', 'lpga', or 'eur' (DP World Tour)."
            ))),
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Tour::Pga => "pga",
            Tour::Lpga => "lpga",
            Tour::Eur => "eur",
        }
    }

    pub fn sport_path(&self) -> &'static str {
        match self {
            Tour::Pga => "golf/pga",
            Tour::Lpga => "golf/lpga",
            Tour::Eur => "golf/eur",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tour::Pga => "PGA Tour",
            Tour::Lpga => "LPGA Tour",
            Tour::Eur => "DP World Tour",
        }
    }
}

fn golfer(competitor: &Value) -> Value {
    let athlete = at(competitor, &["athlete"]);
    let rounds: Vec<Value> = array(competitor, &["linescores"])
        .iter()
        .filter(|ls| matches!(at(ls, &["period"]).as_i64(), Some(1..=4)))
        .map(|ls| {
            json!({
                "round": at(ls, &["period"]).clone(),
                "strokes": crate::json::as_f64(at(ls, &["value"])).map(|v| v as i64),
                "score": text_at(ls, &["displayValue"]),
            })
        })
        .collect();
    json!({
        "position": or_empty(competitor, &["order"]),
        "id": text_at(competitor, &["id"]),
        "name": first_text(athlete, &["displayName", "fullName"]),
        "country": text_at(athlete, &["flag", "alt"]),
        "score": or_empty(competitor, &["score"]),
        "rounds": rounds,
    })
}

fn venue(ev: &Value, comp: &Value) -> Value {
    let courses = array(ev, &["courses"]);
    if let Some(course) = courses.first() {
        return json!({
            "name": first_text(course, &["name", "fullName"]),
            "city": text_at(course, &["address", "city"]),
            "state": text_at(course, &["address", "state"]),
            "country": text_at(course, &["address", "country"]),
        });
    }
    let v = at(comp, &["venue"]);
    json!({
        "name": text_at(v, &["fullName"]),
        "city": text_at(v, &["address", "city"]),
    })
}

/// A tournament with its leaderboard ordered by position.
pub fn tournament(ev: &Value) -> Value {
    let comp = first(ev, &["competitions"]);
    let status = match at(comp, &["status"]) {
        Value::Null => at(ev, &["status"]),
        s => s,
    };

    let mut competitors: Vec<&Value> = array(comp, &["competitors"]).iter().collect();
    competitors.sort_by_key(|c| at(c, &["order"]).as_i64().unwrap_or(999));
    let leaderboard: Vec<Value> = competitors.into_iter().map(golfer).collect();

    let broadcasts: Vec<Value> = array(comp, &["broadcasts"])
        .iter()
        .flat_map(|b| array(b, &["names"]).iter().cloned())
        .collect();

    let start = match text_at(ev, &["date"]) {
        s if s.is_empty() => text_at(comp, &["date"]),
        s => s,
    };

    json!({
        "id": text_at(ev, &["id"]),
        "name": text_at(ev, &["name"]),
        "short_name": text_at(ev, &["shortName"]),
        "status": map_status(&text_at(status, &["type", "name"])),
        "status_detail": text_at(status, &["type", "shortDetail"]),
        "current_round": at(status, &["period"]).as_i64().unwrap_or(0),
        "start_date": start,
        "end_date": text_at(ev, &["endDate"]),
        "venue": venue(ev, comp),
        "broadcasts": broadcasts,
        "field_size": leaderboard.len(),
        "leaderboard": leaderboard,
    })
}

pub struct GolfConnector {
    espn: EspnApi,
}

impl GolfConnector {
    pub fn new(espn: EspnApi) -> Self {
        Self { espn }
    }

    async fn leaderboard(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let tour = Tour::parse(&params.require("tour")?)?;
        let data = self.espn.site(tour.sport_path(), "scoreboard", &[]).await?;
        Ok(match array(&data, &["events"]).first() {
            Some(ev) => Outcome::ok(json!({
                "tour": tour.display_name(),
                "tournament": tournament(ev),
            })),
            None => Outcome::ok_with(
                json!({"tour": tour.display_name(), "tournament": null}),
                "No active tournament right now.",
            ),
        })
    }

    /// Calendar entries when ESPN provides them, otherwise the events.
    async fn schedule(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let tour = Tour::parse(&params.require("tour")?)?;
        let year = params.int_or("year", Utc::now().year() as i64)?;
        let data = self
            .espn
            .site(tour.sport_path(), "scoreboard", &[("dates", year.to_string())])
            .await?;

        let mut tournaments: Vec<Value> = array(&data, &["leagues"])
            .iter()
            .flat_map(|l| array(l, &["calendar"]).iter())
            .map(|cal| {
                json!({
                    "id": text_at(cal, &["id"]),
                    "name": first_text(cal, &["label", "name"]),
                    "start_date": first_text(cal, &["startDate", "date"]),
                    "end_date": text_at(cal, &["endDate"]),
                })
            })
            .collect();
        if tournaments.is_empty() {
            tournaments = array(&data, &["events"])
                .iter()
                .map(|ev| {
                    json!({
                        "id": text_at(ev, &["id"]),
                        "name": text_at(ev, &["name"]),
                        "start_date": text_at(ev, &["date"]),
                        "end_date": text_at(ev, &["endDate"]),
                    })
                })
                .collect();
        }

        Ok(Outcome::ok(json!({
            "tour": tour.display_name(),
            "season": match at(&data, &["season", "year"]) {
                Value::Null => json!(year),
                y => y.clone(),
            },
            "count": tournaments.len(),
            "tournaments": tournaments,
        })))
    }

    /// ESPN has no LPGA profiles, so the requested tour is tried first and
    /// the PGA and DP World tours after it.
    async fn player_info(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let player_id = params.require("player_id")?;
        let tour = params
            .str("tour")
            .and_then(|t| Tour::parse(&t).ok())
            .unwrap_or(Tour::Pga);
        let mut order = vec![tour];
        order.extend([Tour::Pga, Tour::Eur].into_iter().filter(|t| *t != tour));

        let mut last_err = None;
        for t in order {
            match self
                .espn
                .common(t.sport_path(), &format!("athletes/{player_id}"), &[])
                .await
            {
                Ok(data) => return Ok(Outcome::ok(player(&data, &player_id))),
                Err(e) => {
                    debug!(
                        player_id = %player_id,
                        tour = t.slug(),
                        error = %e,
                        "Golfer lookup failed"
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(match last_err {
            Some(e) => e.into(),
            None => SkillsError::NoData(format!("Player {player_id} not found")),
        })
    }

    async fn news(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let tour = Tour::parse(&params.require("tour")?)?;
        let data = self.espn.site(tour.sport_path(), "news", &[]).await?;
        let mut out = shape::news(&data);
        out["tour"] = json!(tour.display_name());
        Ok(Outcome::ok(out))
    }
}

fn player(data: &Value, player_id: &str) -> Value {
    let athlete = match at(data, &["athlete"]) {
        Value::Null => data,
        a => a,
    };
    let birthplace = match at(athlete, &["birthPlace"]) {
        Value::Object(_) => {
            let parts: Vec<String> = ["city", "state", "country"]
                .iter()
                .map(|k| text_at(athlete, &["birthPlace", k]))
                .filter(|s| !s.is_empty())
                .collect();
            parts.join(", ")
        }
        _ => String::new(),
    };
    let college = match at(athlete, &["college"]) {
        Value::Object(_) => text_at(athlete, &["college", "name"]),
        other => text(other),
    };
    let status = match at(athlete, &["status"]) {
        Value::Object(_) => first_text(at(athlete, &["status"]), &["type", "name"]),
        other => text(other),
    };
    let id = match text_at(athlete, &["id"]) {
        s if s.is_empty() => player_id.to_string(),
        s => s,
    };
    json!({
        "id": id,
        "name": first_text(athlete, &["displayName", "fullName"]),
        "age": or_empty(athlete, &["age"]),
        "date_of_birth": text_at(athlete, &["dateOfBirth"]),
        "citizenship": text_at(athlete, &["citizenship"]),
        "birthplace": birthplace,
        "height": text_at(athlete, &["displayHeight"]),
        "weight": text_at(athlete, &["displayWeight"]),
        "turned_pro": or_empty(athlete, &["turnedPro"]),
        "college": college,
        "headshot": text_at(athlete, &["headshot", "href"]),
        "status": status,
        "link": format!("https://www.espn.com/golf/player/_/id/{player_id}"),
    })
}

#[async_trait]
impl Connector for GolfConnector {
    fn module(&self) -> Module {
        Module::Golf
    }

    async fn call(&self, command: &str, params: &Params) -> Outcome {
        let result = match command {
            "get_leaderboard" => self.leaderboard(params).await,
            "get_schedule" => self.schedule(params).await,
            "get_player_info" => self.player_info(params).await,
            "get_news" => self.news(params).await,
            _ => return unknown_command(Module::Golf, command),
        };
        result.unwrap_or_else(Outcome::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{MockHttpTransport, RawResponse};
    use crate::http::UpstreamClient;
    use std::sync::Arc;

    fn golf(mock: MockHttpTransport) -> GolfConnector {
        GolfConnector::new(EspnApi::new(Arc::new(UpstreamClient::with_transport(Arc::new(mock)))))
    }

    #[test]
    fn test_tour_validation() {
        assert_eq!(Tour::parse(" PGA ").unwrap(), Tour::Pga);
        let err = Tour::parse("senior").unwrap_err();
        assert!(err.to_string().contains("Invalid tour 'senior'"));
    }

    #[test]
    fn test_tournament_sorts_leaderboard_and_skips_playoff_rounds() {
        let ev = json!({
            "id": "1", "name": "The Open",
            "competitions": [{
                "status": {"period": 4, "type": {"name": "STATUS_PLAY_COMPLETE"}},
                "competitors": [
                    {"id": "b", "order": 2, "athlete": {"displayName": "B"}},
                    {"id": "a", "order": 1, "athlete": {"displayName": "A", "flag": {"alt": "USA"}},
                     "linescores": [{"period": 1, "value": 68.0, "displayValue": "-3"},
                                    {"period": 5, "value": 4.0}]}
                ]
            }]
        });
        let t = tournament(&ev);
        assert_eq!(t["status"], json!("round_complete"));
        assert_eq!(t["current_round"], json!(4));
        assert_eq!(t["leaderboard"][0]["name"], json!("A"));
        assert_eq!(t["leaderboard"][0]["rounds"].as_array().unwrap().len(), 1);
        assert_eq!(t["leaderboard"][0]["rounds"][0]["strokes"], json!(68));
        assert_eq!(t["field_size"], json!(2));
    }

    #[tokio::test]
    async fn test_leaderboard_without_events() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"events":[]}"#)));
        let env = golf(mock)
            .call("get_leaderboard", &Params::new().with("tour", "lpga"))
            .await
            .into_envelope();
        assert!(env.status);
        assert_eq!(env.data["tour"], json!("LPGA Tour"));
        assert!(env.data["tournament"].is_null());
        assert_eq!(env.message, "No active tournament right now.");
    }

    #[tokio::test]
    async fn test_player_info_falls_back_across_tours() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| url.contains("/golf/lpga/athletes/99"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(404, "")));
        mock.expect_get()
            .withf(|url, _| url.contains("/golf/pga/athletes/99"))
            .times(1)
            .returning(|_, _| {
                Ok(RawResponse::new(
                    200,
                    r#"{"athlete":{"id":"99","displayName":"Golfer",
                        "birthPlace":{"city":"Perth","country":"Australia"}}}"#,
                ))
            });
        let env = golf(mock)
            .call(
                "get_player_info",
                &Params::new().with("player_id", "99").with("tour", "lpga"),
            )
            .await
            .into_envelope();
        assert!(env.status, "{}", env.message);
        assert_eq!(env.data["name"], json!("Golfer"));
        assert_eq!(env.data["birthplace"], json!("Perth, Australia"));
    }
}
