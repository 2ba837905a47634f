//! ESPN soccer payloads: scoreboard events, standings, teams and the
//! summary sections (team stats, timeline, lineups, player stats).

use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::leagues::{by_espn, by_slug, Competition};
use crate::espn::map_status;
use crate::espn::normalize::normalize_odds;
use crate::json::{array, as_f64, at, first, first_text, text, text_at};

/// Status string for a soccer match. Unlisted statuses read as
/// `not_started`.
pub fn soccer_status(name: &str) -> String {
    match name {
        "STATUS_END_PERIOD" => "halftime".to_string(),
        "STATUS_SCHEDULED" | "STATUS_IN_PROGRESS" | "STATUS_HALFTIME" | "STATUS_FINAL"
        | "STATUS_FULL_TIME" | "STATUS_POSTPONED" | "STATUS_CANCELED" | "STATUS_SUSPENDED"
        | "STATUS_FIRST_HALF" | "STATUS_SECOND_HALF" => map_status(name),
        _ => "not_started".to_string(),
    }
}

/// Score as an integer; ESPN sends strings, numbers or `{value, displayValue}`.
pub fn parse_score(score: &Value) -> i64 {
    let raw = match score {
        Value::Object(_) => match at(score, &["value"]) {
            Value::Null => at(score, &["displayValue"]),
            v => v,
        },
        other => other,
    };
    as_f64(raw).map(|f| f as i64).unwrap_or(0)
}

fn logo(team: &Value) -> String {
    text_at(first(team, &["logos"]), &["href"])
}

fn team_brief(team: &Value) -> Value {
    json!({
        "id": text_at(team, &["id"]),
        "name": text_at(team, &["displayName"]),
        "short_name": text_at(team, &["shortDisplayName"]),
        "abbreviation": text_at(team, &["abbreviation"]),
    })
}

pub fn team(team: &Value) -> Value {
    json!({
        "id": text_at(team, &["id"]),
        "name": text_at(team, &["displayName"]),
        "short_name": text_at(team, &["shortDisplayName"]),
        "abbreviation": text_at(team, &["abbreviation"]),
        "crest": logo(team),
    })
}

fn competitor<'a>(comp: &'a Value, side: &str) -> &'a Value {
    static EMPTY: Value = Value::Null;
    array(comp, &["competitors"])
        .iter()
        .find(|c| text_at(c, &["homeAway"]) == side)
        .unwrap_or(&EMPTY)
}

/// Scoreboard or schedule event, tagged with its competition and season.
pub fn event(ev: &Value, competition: Option<&Competition>) -> Value {
    let comp = first(ev, &["competitions"]);
    let (home, away) = (competitor(comp, "home"), competitor(comp, "away"));
    let (hs, as_) = (parse_score(at(home, &["score"])), parse_score(at(away, &["score"])));
    let year = text_at(ev, &["season", "year"]);
    let slug = competition.map(|c| c.slug).unwrap_or("");
    let start_time = match text_at(comp, &["date"]) {
        s if s.is_empty() => text_at(ev, &["date"]),
        s => s,
    };
    let venue = at(comp, &["venue"]);

    json!({
        "id": text_at(ev, &["id"]),
        "status": soccer_status(&text_at(comp, &["status", "type", "name"])),
        "start_time": start_time,
        "round_name": text_at(ev, &["week", "text"]),
        "competition": {
            "id": slug,
            "name": competition.map(|c| c.name).unwrap_or(""),
        },
        "season": {
            "id": if year.is_empty() { String::new() } else { format!("{slug}-{year}") },
            "year": year,
        },
        "venue": {
            "id": text_at(venue, &["id"]),
            "name": text_at(venue, &["fullName"]),
            "city": text_at(venue, &["address", "city"]),
            "country": text_at(venue, &["address", "country"]),
        },
        "competitors": [
            {"team": team_brief(at(home, &["team"])), "qualifier": "home", "score": hs},
            {"team": team_brief(at(away, &["team"])), "qualifier": "away", "score": as_},
        ],
        "scores": {"home": hs, "away": as_},
        "odds": normalize_odds(array(comp, &["odds"])),
    })
}

/// Event rebuilt from a summary header, for event lookups by id.
pub fn event_from_summary(summary: &Value, event_id: &str) -> Value {
    let header = at(summary, &["header"]);
    let comp = first(header, &["competitions"]);
    let synthetic = json!({
        "id": event_id,
        "competitions": [comp],
        "season": at(header, &["season"]),
        "date": text_at(comp, &["date"]),
        "week": at(header, &["week"]),
    });
    let league = by_espn(&text_at(header, &["league", "slug"]));
    event(&synthetic, league)
}

/// Standings groups (one per table; several for cup group stages).
pub fn standings(data: &Value) -> Vec<Value> {
    array(data, &["children"])
        .iter()
        .map(|child| {
            let entries: Vec<Value> = array(child, &["standings", "entries"])
                .iter()
                .map(|entry| {
                    let stats: HashMap<String, i64> = array(entry, &["stats"])
                        .iter()
                        .map(|s| {
                            let v = as_f64(at(s, &["value"])).unwrap_or(0.0) as i64;
                            (text_at(s, &["name"]), v)
                        })
                        .collect();
                    let stat = |k: &str| stats.get(k).copied().unwrap_or(0);
                    json!({
                        "position": stat("rank"),
                        "team": team(at(entry, &["team"])),
                        "played": stat("gamesPlayed"),
                        "won": stat("wins"),
                        "drawn": stat("ties"),
                        "lost": stat("losses"),
                        "goals_for": stat("pointsFor"),
                        "goals_against": stat("pointsAgainst"),
                        "goal_difference": stat("pointDifferential"),
                        "points": stat("points"),
                    })
                })
                .collect();
            let name = match text_at(child, &["name"]) {
                n if n.is_empty() => "TOTAL".to_string(),
                n => n,
            };
            json!({"name": name, "type": "TOTAL", "entries": entries})
        })
        .collect()
}

/// Distinct teams listed in a standings response.
pub fn standings_teams(data: &Value) -> Vec<Value> {
    let mut seen = Vec::new();
    array(data, &["children"])
        .iter()
        .flat_map(|child| array(child, &["standings", "entries"]).iter())
        .map(|entry| at(entry, &["team"]))
        .filter(|t| {
            let id = text_at(t, &["id"]);
            if id.is_empty() || seen.contains(&id) {
                return false;
            }
            seen.push(id);
            true
        })
        .map(team)
        .collect()
}

// ---------------------------------------------------------------------------
// Summary sections
// ---------------------------------------------------------------------------

fn home_away(summary: &Value) -> HashMap<String, String> {
    array(first(at(summary, &["header"]), &["competitions"]), &["competitors"])
        .iter()
        .map(|c| (text_at(c, &["id"]), text_at(c, &["homeAway"])))
        .collect()
}

fn side_team(team: &Value) -> Value {
    json!({
        "id": text_at(team, &["id"]),
        "name": text_at(team, &["displayName"]),
        "abbreviation": text_at(team, &["abbreviation"]),
    })
}

const TEAM_STATS: &[(&str, &str)] = &[
    ("ball_possession", "possessionPct"),
    ("shots_total", "shotsTotal"),
    ("shots_on_target", "shotsOnTarget"),
    ("shots_off_target", "shotsOffTarget"),
    ("shots_blocked", "shotsBlocked"),
    ("corner_kicks", "wonCorners"),
    ("fouls", "foulsCommitted"),
    ("offsides", "offsides"),
    ("yellow_cards", "yellowCards"),
    ("red_cards", "redCards"),
    ("passes_total", "totalPasses"),
    ("passes_accurate", "completedPasses"),
    ("tackles", "tackles"),
    ("goalkeeper_saves", "saves"),
];

/// Team statistics from the boxscore.
pub fn team_statistics(summary: &Value) -> Vec<Value> {
    let sides = home_away(summary);
    array(summary, &["boxscore", "teams"])
        .iter()
        .map(|t| {
            let team = at(t, &["team"]);
            let raw: HashMap<String, String> = array(t, &["statistics"])
                .iter()
                .map(|s| (text_at(s, &["name"]), text_at(s, &["displayValue"])))
                .collect();
            let stats: Map<String, Value> = TEAM_STATS
                .iter()
                .map(|(key, espn)| {
                    let v = raw.get(*espn).cloned().unwrap_or_else(|| "0".to_string());
                    (key.to_string(), Value::String(v))
                })
                .collect();
            let id = text_at(team, &["id"]);
            json!({
                "team": side_team(team),
                "qualifier": sides.get(&id).cloned().unwrap_or_default(),
                "statistics": stats,
            })
        })
        .collect()
}

/// Timeline event type from ESPN's free-text label.
pub fn event_type(label: &str) -> String {
    let t = label.to_lowercase();
    let mapped = if t.contains("own goal") {
        "own_goal"
    } else if t.contains("penalty") && t.contains("goal") {
        "penalty_goal"
    } else if t.contains("penalty") && (t.contains("miss") || t.contains("saved")) {
        "penalty_missed"
    } else if t.contains("goal") {
        "goal"
    } else if t.contains("yellow") && t.contains("red") {
        "yellow_red_card"
    } else if t.contains("red") {
        "red_card"
    } else if t.contains("yellow") {
        "yellow_card"
    } else if t.contains("substitution") {
        "substitution"
    } else if t.is_empty() {
        "unknown"
    } else {
        return t;
    };
    mapped.to_string()
}

/// Minute from a clock label such as `45'+2'` or `90'`.
fn minute(clock: &str) -> i64 {
    clock
        .replace('\'', "")
        .replace('+', " ")
        .split_whitespace()
        .next()
        .and_then(|m| m.parse().ok())
        .unwrap_or(0)
}

fn person(a: &Value) -> Value {
    json!({"id": text_at(a, &["id"]), "name": text_at(a, &["displayName"])})
}

/// Key events ordered by minute. Falls back to the header details when
/// `keyEvents` is absent.
pub fn timeline(summary: &Value) -> Vec<Value> {
    let events = match array(summary, &["keyEvents"]) {
        [] => array(first(at(summary, &["header"]), &["competitions"]), &["details"]),
        evs => evs,
    };
    let mut out: Vec<Value> = events
        .iter()
        .map(|ev| {
            let label = match at(ev, &["type"]) {
                Value::Object(_) => text_at(ev, &["type", "text"]),
                other => text(other),
            };
            let kind = event_type(&label);
            let mut athletes: Vec<&Value> = array(ev, &["athletesInvolved"]).iter().collect();
            if athletes.is_empty() {
                athletes = array(ev, &["participants"])
                    .iter()
                    .map(|p| at(p, &["athlete"]))
                    .filter(|a| !a.is_null())
                    .collect();
            }
            let team = at(ev, &["team"]);
            let mut entry = json!({
                "id": first_text(ev, &["id", "sequenceNumber"]),
                "type": kind,
                "minute": minute(&text_at(ev, &["clock", "displayValue"])),
                "team": if team.is_null() {
                    Value::Null
                } else {
                    json!({
                        "id": text_at(team, &["id"]),
                        "name": first_text(team, &["displayName", "name"]),
                    })
                },
                "player": athletes.first().map(|a| person(a)).unwrap_or(Value::Null),
            });
            if kind == "substitution" && athletes.len() > 1 {
                entry["player_in"] = person(athletes[0]);
                entry["player_out"] = person(athletes[1]);
            }
            entry
        })
        .collect();
    out.sort_by_key(|e| e["minute"].as_i64().unwrap_or(0));
    out
}

/// Starting elevens, benches and formations.
pub fn lineups(summary: &Value) -> Vec<Value> {
    let sides = home_away(summary);
    let formations: HashMap<String, String> = array(summary, &["boxscore", "form"])
        .iter()
        .map(|f| (text_at(f, &["team", "id"]), text_at(f, &["formationSummary"])))
        .collect();
    array(summary, &["rosters"])
        .iter()
        .filter_map(|roster| {
            let team = at(roster, &["team"]);
            let id = text_at(team, &["id"]);
            let (starting, bench): (Vec<&Value>, Vec<&Value>) = array(roster, &["roster"])
                .iter()
                .partition(|p| at(p, &["starter"]).as_bool().unwrap_or(false));
            if starting.is_empty() && bench.is_empty() {
                return None;
            }
            let player = |p: &&Value| {
                let jersey = text_at(p, &["jersey"]);
                json!({
                    "id": text_at(p, &["athlete", "id"]),
                    "name": text_at(p, &["athlete", "displayName"]),
                    "position": text_at(p, &["position", "name"]),
                    "shirt_number": jersey.parse::<i64>().ok(),
                })
            };
            Some(json!({
                "team": side_team(team),
                "qualifier": sides.get(&id).cloned().unwrap_or_default(),
                "formation": formations.get(&id).cloned().unwrap_or_default(),
                "starting": starting.iter().map(player).collect::<Vec<_>>(),
                "bench": bench.iter().map(player).collect::<Vec<_>>(),
            }))
        })
        .collect()
}

/// Per-player match statistics from the summary rosters.
pub fn player_statistics(summary: &Value) -> Vec<Value> {
    let sides = home_away(summary);
    array(summary, &["rosters"])
        .iter()
        .filter_map(|roster| {
            let team = at(roster, &["team"]);
            let id = text_at(team, &["id"]);
            let players: Vec<Value> = array(roster, &["roster"])
                .iter()
                .map(|p| {
                    let stats: Map<String, Value> = array(p, &["stats"])
                        .iter()
                        .map(|s| {
                            let v = match at(s, &["value"]) {
                                Value::Null => at(s, &["displayValue"]).clone(),
                                v => v.clone(),
                            };
                            (text_at(s, &["name"]), v)
                        })
                        .collect();
                    json!({
                        "id": text_at(p, &["athlete", "id"]),
                        "name": text_at(p, &["athlete", "displayName"]),
                        "short_name": text_at(p, &["athlete", "shortName"]),
                        "position": text_at(p, &["position", "name"]),
                        "position_abbreviation": text_at(p, &["position", "abbreviation"]),
                        "shirt_number": text_at(p, &["jersey"]),
                        "starter": at(p, &["starter"]).as_bool().unwrap_or(false),
                        "subbed_in": at(p, &["subbedIn"]).as_bool().unwrap_or(false),
                        "subbed_out": at(p, &["subbedOut"]).as_bool().unwrap_or(false),
                        "sub_minute": at(p, &["subMinute"]),
                        "statistics": stats,
                    })
                })
                .collect();
            if players.is_empty() {
                return None;
            }
            Some(json!({
                "team": side_team(team),
                "qualifier": sides.get(&id).cloned().unwrap_or_default(),
                "players": players,
            }))
        })
        .collect()
}

/// Cross-provider identity of a match: date, teams and season year.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchContext {
    pub competition: Option<&'static Competition>,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub season_year: String,
}

impl MatchContext {
    pub fn from_summary(summary: &Value, espn_league: &str) -> Self {
        let header = at(summary, &["header"]);
        let comp = first(header, &["competitions"]);
        let name = |side: &str| text_at(competitor(comp, side), &["team", "displayName"]);
        let date: String = text_at(comp, &["date"]).chars().take(10).collect();
        Self {
            competition: by_espn(espn_league).or_else(|| by_slug(espn_league)),
            date,
            home_team: name("home"),
            away_team: name("away"),
            season_year: text_at(header, &["season", "year"]),
        }
    }
}
