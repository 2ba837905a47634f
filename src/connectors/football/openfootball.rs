//! openfootball/football.json season files.
//!
//! A community archive of fixtures and full-time scores, used when ESPN
//! returns nothing for a season. Matches carry team names only, so ids are
//! empty and standings are computed from results.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::leagues::{Competition, SeasonLayout};
use crate::http::{Request, Scope, UpstreamClient};
use crate::json::{array, at, text_at};

pub const BASE_URL: &str = "https://raw.githubusercontent.com/openfootball/football.json/master";
pub const SOURCE: &str = "openfootball";
const SEASON_TTL_SECS: u64 = 3600;
const NEGATIVE_TTL_SECS: u64 = 300;

/// Season file for a competition, e.g. `2024-25/en.1.json` or `2025/mls.json`.
pub fn season_url(c: &Competition, year: i32) -> Option<String> {
    let archive = c.openfootball?;
    let folder = match archive.layout {
        SeasonLayout::SplitYear => format!("{year}-{:02}", (year + 1).rem_euclid(100)),
        SeasonLayout::CalendarYear => year.to_string(),
    };
    Some(format!("{BASE_URL}/{folder}/{}.json", archive.file))
}

/// Season year a match date falls in. Split-year seasons start in July.
pub fn season_year(c: &Competition, date: NaiveDate) -> Option<i32> {
    let archive = c.openfootball?;
    Some(match archive.layout {
        SeasonLayout::SplitYear if date.month() < 7 => date.year() - 1,
        _ => date.year(),
    })
}

/// Full-time score, when the match has been played.
fn full_time(m: &Value) -> Option<(i64, i64)> {
    match array(m, &["score", "ft"]) {
        [home, away] => Some((home.as_i64()?, away.as_i64()?)),
        _ => None,
    }
}

fn team_brief(name: &str) -> Value {
    json!({"id": "", "name": name, "short_name": "", "abbreviation": "", "crest": ""})
}

/// One match in the same shape as an ESPN-sourced event.
pub fn event(m: &Value, c: &Competition, year: i32) -> Value {
    let score = full_time(m);
    let (hs, as_) = score.unwrap_or((0, 0));
    let date = text_at(m, &["date"]);
    let time = text_at(m, &["time"]);
    let start_time = if date.is_empty() || time.is_empty() {
        date
    } else {
        format!("{date}T{time}:00Z")
    };
    json!({
        "id": "",
        "status": if score.is_some() { "closed" } else { "not_started" },
        "start_time": start_time,
        "round_name": text_at(m, &["round"]),
        "competition": {"id": c.slug, "name": c.name},
        "season": {"id": c.season_id(year), "year": year.to_string()},
        "venue": {"id": "", "name": "", "city": "", "country": ""},
        "competitors": [
            {"team": team_brief(&text_at(m, &["team1"])), "qualifier": "home", "score": hs},
            {"team": team_brief(&text_at(m, &["team2"])), "qualifier": "away", "score": as_},
        ],
        "scores": {"home": hs, "away": as_},
        "odds": null,
        "source": SOURCE,
    })
}

pub fn schedule(data: &Value, c: &Competition, year: i32) -> Vec<Value> {
    array(data, &["matches"]).iter().map(|m| event(m, c, year)).collect()
}

/// Matches played on `date` (`YYYY-MM-DD`).
pub fn on_date(data: &Value, c: &Competition, year: i32, date: &str) -> Vec<Value> {
    array(data, &["matches"])
        .iter()
        .filter(|m| text_at(m, &["date"]) == date)
        .map(|m| event(m, c, year))
        .collect()
}

/// Distinct team names, sorted.
pub fn teams(data: &Value) -> Vec<Value> {
    let mut names: Vec<String> = array(data, &["matches"])
        .iter()
        .flat_map(|m| [text_at(m, &["team1"]), text_at(m, &["team2"])])
        .filter(|n| !n.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
        .iter()
        .map(|n| json!({"id": "", "name": n, "short_name": n, "abbreviation": "", "crest": ""}))
        .collect()
}

#[derive(Debug, Default, Serialize)]
struct Row {
    position: usize,
    team: Value,
    played: i64,
    won: i64,
    drawn: i64,
    lost: i64,
    goals_for: i64,
    goals_against: i64,
    goal_difference: i64,
    points: i64,
}

impl Row {
    fn record(&mut self, scored: i64, conceded: i64) {
        self.played += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        self.goal_difference = self.goals_for - self.goals_against;
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.won += 1;
                self.points += 3;
            }
            std::cmp::Ordering::Equal => {
                self.drawn += 1;
                self.points += 1;
            }
            std::cmp::Ordering::Less => self.lost += 1,
        }
    }
}

/// League table from played matches: three points a win, ordered by
/// points, goal difference, then goals scored.
pub fn standings(data: &Value) -> Result<Vec<Value>, serde_json::Error> {
    let mut names: Vec<String> = Vec::new();
    let mut rows: Vec<Row> = Vec::new();
    let mut row_of = |name: &str, rows: &mut Vec<Row>| -> usize {
        match names.iter().position(|n| n == name) {
            Some(i) => i,
            None => {
                names.push(name.to_string());
                rows.push(Row {
                    team: json!({"id": "", "name": name}),
                    ..Row::default()
                });
                rows.len() - 1
            }
        }
    };
    for m in array(data, &["matches"]) {
        let Some((g1, g2)) = full_time(m) else {
            continue;
        };
        let (home, away) = (text_at(m, &["team1"]), text_at(m, &["team2"]));
        if home.is_empty() || away.is_empty() {
            continue;
        }
        let h = row_of(&home, &mut rows);
        rows[h].record(g1, g2);
        let a = row_of(&away, &mut rows);
        rows[a].record(g2, g1);
    }
    rows.sort_by_key(|r| (Reverse(r.points), Reverse(r.goal_difference), Reverse(r.goals_for)));
    rows.iter_mut().enumerate().for_each(|(i, r)| r.position = i + 1);
    rows.iter().map(serde_json::to_value).collect()
}

/// Season files through the shared client. Misses are negatively cached.
#[derive(Clone)]
pub struct OpenFootballApi {
    client: Arc<UpstreamClient>,
}

impl OpenFootballApi {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    /// The season file, or `None` when the competition is not archived or
    /// the file is missing.
    pub async fn season(&self, c: &Competition, year: i32) -> Option<Value> {
        let url = season_url(c, year)?;
        let req = Request::new(Scope::OpenFootball, url).ttl_secs(SEASON_TTL_SECS);
        match self.client.get_json(&req).await {
            Ok(v) if !at(&v, &["matches"]).is_null() => Some(v),
            Ok(_) => None,
            Err(e) => {
                debug!(competition = c.slug, year, error = %e, "openfootball season unavailable");
                self.client
                    .remember_failure(&req, Value::Null, Duration::from_secs(NEGATIVE_TTL_SECS));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::football::leagues::by_slug;
    use crate::http::transport::{MockHttpTransport, RawResponse};

    const SEASON: &str = r#"{
        "name": "English Premier League 2024/25",
        "matches": [
            {"round": "Matchday 1", "date": "2024-08-16", "time": "20:00",
             "team1": "Manchester United FC", "team2": "Fulham FC", "score": {"ft": [1, 0]}},
            {"round": "Matchday 1", "date": "2024-08-17", "time": "12:30",
             "team1": "Ipswich Town FC", "team2": "Liverpool FC", "score": {"ft": [0, 2]}},
            {"round": "Matchday 2", "date": "2024-08-24",
             "team1": "Liverpool FC", "team2": "Fulham FC", "score": {"ft": [1, 1]}},
            {"round": "Matchday 3", "date": "2024-08-31", "time": "15:00",
             "team1": "Fulham FC", "team2": "Ipswich Town FC"}
        ]
    }"#;

    fn premier_league() -> &'static Competition {
        by_slug("premier-league").unwrap()
    }

    #[test]
    fn test_season_urls_by_layout() {
        assert_eq!(
            season_url(premier_league(), 2024).unwrap(),
            format!("{BASE_URL}/2024-25/en.1.json")
        );
        assert_eq!(
            season_url(premier_league(), 1999).unwrap(),
            format!("{BASE_URL}/1999-00/en.1.json")
        );
        assert_eq!(
            season_url(by_slug("mls").unwrap(), 2025).unwrap(),
            format!("{BASE_URL}/2025/mls.json")
        );
        assert!(season_url(by_slug("champions-league").unwrap(), 2024).is_none());
    }

    #[test]
    fn test_season_year_for_date() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(season_year(premier_league(), d(2025, 3, 1)), Some(2024));
        assert_eq!(season_year(premier_league(), d(2025, 8, 16)), Some(2025));
        assert_eq!(season_year(by_slug("mls").unwrap(), d(2025, 3, 1)), Some(2025));
    }

    #[test]
    fn test_event_shape() {
        let data: Value = serde_json::from_str(SEASON).unwrap();
        let events = schedule(&data, premier_league(), 2024);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["status"], json!("closed"));
        assert_eq!(events[0]["start_time"], json!("2024-08-16T20:00:00Z"));
        assert_eq!(events[0]["season"]["id"], json!("premier-league-2024"));
        assert_eq!(events[0]["competitors"][1]["team"]["name"], json!("Fulham FC"));
        assert_eq!(events[0]["scores"], json!({"home": 1, "away": 0}));
        assert_eq!(events[2]["start_time"], json!("2024-08-24"));
        assert_eq!(events[3]["status"], json!("not_started"));
        assert_eq!(events[3]["scores"], json!({"home": 0, "away": 0}));
    }

    #[test]
    fn test_standings_from_results() {
        let data: Value = serde_json::from_str(SEASON).unwrap();
        let table = standings(&data).unwrap();
        let names: Vec<&str> = table.iter().map(|r| r["team"]["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec!["Liverpool FC", "Manchester United FC", "Fulham FC", "Ipswich Town FC"]
        );
        assert_eq!(table[0]["points"], json!(4));
        assert_eq!(table[0]["goal_difference"], json!(2));
        assert_eq!(table[2]["played"], json!(2));
        assert_eq!(table[2]["drawn"], json!(1));
        assert_eq!(table[2]["lost"], json!(1));
        assert_eq!(table[3]["position"], json!(4));
    }

    #[test]
    fn test_teams_are_distinct_and_sorted() {
        let data: Value = serde_json::from_str(SEASON).unwrap();
        let names: Vec<Value> = teams(&data).iter().map(|t| t["name"].clone()).collect();
        assert_eq!(
            names,
            vec![
                json!("Fulham FC"),
                json!("Ipswich Town FC"),
                json!("Liverpool FC"),
                json!("Manchester United FC")
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_season_is_cached_as_none() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| url.ends_with("/2030-31/en.1.json"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(404, "404: Not Found")));
        let api = OpenFootballApi::new(Arc::new(UpstreamClient::with_transport(Arc::new(mock))));
        assert!(api.season(premier_league(), 2030).await.is_none());
        assert!(api.season(premier_league(), 2030).await.is_none());
    }
}
