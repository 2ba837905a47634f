//! Thin shaping of ESPN site/web payloads (events, standings, teams,
//! rosters, news, summaries, polls) into the connector output format.

use serde_json::{json, Map, Value};

use super::map_status;
use super::normalize::normalize_odds;
use crate::json::{array, at, first, first_text, or_empty, text, text_at};

fn team_ref(team: &Value) -> Value {
    json!({
        "id": text_at(team, &["id"]),
        "name": first_text(team, &["displayName", "name", "location"]),
        "abbreviation": text_at(team, &["abbreviation"]),
        "logo": first_logo(team),
    })
}

fn first_logo(team: &Value) -> String {
    let direct = text_at(team, &["logo"]);
    if !direct.is_empty() {
        return direct;
    }
    array(team, &["logos"])
        .first()
        .map(|l| text_at(l, &["href"]))
        .unwrap_or_default()
}

/// Scoreboard or schedule event.
pub fn event(ev: &Value) -> Value {
    let comp = first(ev, &["competitions"]);
    let status = match at(comp, &["status"]) {
        Value::Null => at(ev, &["status"]),
        s => s,
    };
    let status_name = text_at(status, &["type", "name"]);

    let competitors: Vec<Value> = array(comp, &["competitors"])
        .iter()
        .map(|c| {
            let record = array(c, &["records"])
                .first()
                .map(|r| text_at(r, &["summary"]))
                .unwrap_or_default();
            let score = match at(c, &["score"]) {
                Value::Null => json!("0"),
                Value::Object(o) => o.get("displayValue").cloned().unwrap_or(json!("0")),
                s => s.clone(),
            };
            let mut out = json!({
                "team": team_ref(at(c, &["team"])),
                "home_away": text_at(c, &["homeAway"]),
                "score": score,
                "period_scores": array(c, &["linescores"])
                    .iter()
                    .map(|p| crate::json::as_f64(at(p, &["value"])).map(|v| v as i64).unwrap_or(0))
                    .collect::<Vec<_>>(),
                "record": record,
                "winner": at(c, &["winner"]).as_bool().unwrap_or(false),
            });
            // College polls expose a curated rank; 99 means unranked.
            if let Some(rank) = at(c, &["curatedRank", "current"]).as_i64() {
                out["rank"] = if rank == 99 { Value::Null } else { json!(rank) };
            }
            out
        })
        .collect();

    let broadcasts: Vec<Value> = array(comp, &["broadcasts"])
        .iter()
        .flat_map(|b| array(b, &["names"]).iter().cloned())
        .collect();

    let start_time = match text_at(comp, &["date"]) {
        s if s.is_empty() => text_at(ev, &["date"]),
        s => s,
    };

    json!({
        "id": text_at(ev, &["id"]),
        "name": text_at(ev, &["name"]),
        "short_name": text_at(ev, &["shortName"]),
        "status": map_status(&status_name),
        "status_detail": text_at(status, &["type", "shortDetail"]),
        "start_time": start_time,
        "venue": {
            "name": text_at(comp, &["venue", "fullName"]),
            "city": text_at(comp, &["venue", "address", "city"]),
            "state": text_at(comp, &["venue", "address", "state"]),
        },
        "competitors": competitors,
        "odds": normalize_odds(array(comp, &["odds"])),
        "broadcasts": broadcasts,
        "week": at(ev, &["week", "number"]).clone(),
    })
}

/// Events plus the season/week headers of a scoreboard response.
pub fn scoreboard(data: &Value) -> Value {
    let events: Vec<Value> = array(data, &["events"]).iter().map(event).collect();
    json!({
        "events": events,
        "season": {
            "year": or_empty(data, &["season", "year"]),
            "type": or_empty(data, &["season", "type"]),
        },
        "week": {
            "number": or_empty(data, &["week", "number"]),
            "text": text_at(data, &["week", "text"]),
        },
        "count": events.len(),
    })
}

fn standings_entries(standings: &Value) -> Vec<Value> {
    array(standings, &["entries"])
        .iter()
        .map(|entry| {
            let mut stats = Map::new();
            for s in array(entry, &["stats"]) {
                let name = text_at(s, &["name"]);
                if name.is_empty() {
                    continue;
                }
                let value = match s.get("displayValue") {
                    Some(v) => v.clone(),
                    None => or_empty(s, &["value"]),
                };
                stats.insert(name, value);
            }
            let team = at(entry, &["team"]);
            let mut out = Map::new();
            out.insert(
                "team".into(),
                json!({
                    "id": text_at(team, &["id"]),
                    "name": text_at(team, &["displayName"]),
                    "abbreviation": text_at(team, &["abbreviation"]),
                    "logo": first_logo(team),
                }),
            );
            out.insert("stats".into(), Value::Object(stats));
            Value::Object(out)
        })
        .collect()
}

/// Standings grouped by conference and, where present, division.
pub fn standings(data: &Value) -> Value {
    let mut groups = Vec::new();
    for child in array(data, &["children"]) {
        let conference = first_text(child, &["name", "abbreviation"]);
        let divisions = array(child, &["children"]);
        if !divisions.is_empty() {
            for division in divisions {
                let entries = standings_entries(at(division, &["standings"]));
                if !entries.is_empty() {
                    groups.push(json!({
                        "conference": conference,
                        "division": text_at(division, &["name"]),
                        "entries": entries,
                    }));
                }
            }
        } else {
            let entries = standings_entries(at(child, &["standings"]));
            if !entries.is_empty() {
                groups.push(json!({
                    "conference": conference,
                    "division": "",
                    "entries": entries,
                }));
            }
        }
    }
    json!({
        "groups": groups,
        "season": or_empty(data, &["season", "year"]),
    })
}

fn team(wrapper: &Value) -> Value {
    let team = match at(wrapper, &["team"]) {
        Value::Null => wrapper,
        t => t,
    };
    json!({
        "id": text_at(team, &["id"]),
        "name": text_at(team, &["displayName"]),
        "abbreviation": text_at(team, &["abbreviation"]),
        "nickname": first_text(team, &["nickname", "shortDisplayName"]),
        "location": text_at(team, &["location"]),
        "color": text_at(team, &["color"]),
        "logo": first_logo(team),
        "is_active": at(team, &["isActive"]).as_bool().unwrap_or(true),
    })
}

/// `sports[].leagues[].teams[]` flattened.
pub fn teams(data: &Value) -> Value {
    let teams: Vec<Value> = array(data, &["sports"])
        .iter()
        .flat_map(|s| array(s, &["leagues"]).iter())
        .flat_map(|l| array(l, &["teams"]).iter())
        .map(team)
        .collect();
    json!({"count": teams.len(), "teams": teams})
}

fn athlete(a: &Value, default_position: &str) -> Value {
    let position = match text_at(a, &["position", "abbreviation"]) {
        p if p.is_empty() => default_position.to_string(),
        p => p,
    };
    let college = match at(a, &["college"]) {
        Value::Object(_) => text_at(a, &["college", "name"]),
        other => text(other),
    };
    json!({
        "id": text_at(a, &["id"]),
        "name": first_text(a, &["displayName", "fullName"]),
        "jersey": text_at(a, &["jersey"]),
        "position": position,
        "age": or_empty(a, &["age"]),
        "height": text_at(a, &["displayHeight"]),
        "weight": text_at(a, &["displayWeight"]),
        "experience": or_empty(a, &["experience", "years"]),
        "college": college,
        "status": text_at(a, &["status", "type"]),
    })
}

/// Roster athletes. Football rosters group athletes by position
/// (`athletes[].items[]`); other sports list them directly.
pub fn roster(data: &Value, team_id: &str) -> Value {
    let mut athletes = Vec::new();
    for entry in array(data, &["athletes"]) {
        if entry.get("items").is_some() {
            let group = text_at(entry, &["position"]);
            athletes.extend(array(entry, &["items"]).iter().map(|a| athlete(a, &group)));
        } else {
            athletes.push(athlete(entry, ""));
        }
    }
    let team = at(data, &["team"]);
    let id = match text_at(team, &["id"]) {
        s if s.is_empty() => team_id.to_string(),
        s => s,
    };
    json!({
        "team": {
            "id": id,
            "name": text_at(team, &["displayName"]),
            "abbreviation": text_at(team, &["abbreviation"]),
        },
        "count": athletes.len(),
        "athletes": athletes,
    })
}

/// News articles with their best link.
pub fn news(data: &Value) -> Value {
    let articles: Vec<Value> = array(data, &["articles"])
        .iter()
        .map(|a| {
            let link = match text_at(a, &["links", "web", "href"]) {
                s if s.is_empty() => text_at(a, &["links", "api", "self", "href"]),
                s => s,
            };
            let images: Vec<String> = array(a, &["images"])
                .iter()
                .take(1)
                .map(|i| text_at(i, &["url"]))
                .collect();
            json!({
                "headline": text_at(a, &["headline"]),
                "description": text_at(a, &["description"]),
                "published": text_at(a, &["published"]),
                "type": text_at(a, &["type"]),
                "premium": at(a, &["premium"]).as_bool().unwrap_or(false),
                "link": link,
                "images": images,
            })
        })
        .collect();
    json!({"count": articles.len(), "articles": articles})
}

/// Box score, scoring plays and leaders from a game summary.
pub fn game_summary(data: &Value) -> Value {
    let comp = first(data, &["header", "competitions"]);

    let competitors: Vec<Value> = array(comp, &["competitors"])
        .iter()
        .map(|c| {
            let team = match at(c, &["team"]) {
                Value::Array(_) => first(c, &["team"]),
                t => t,
            };
            json!({
                "team": team_ref(team),
                "home_away": text_at(c, &["homeAway"]),
                "score": match at(c, &["score"]) { Value::Null => json!("0"), s => s.clone() },
                "winner": at(c, &["winner"]).as_bool().unwrap_or(false),
                "record": or_empty(c, &["record"]),
                "linescores": array(c, &["linescores"])
                    .iter()
                    .map(|l| text_at(l, &["displayValue"]))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    let boxscore: Vec<Value> = array(data, &["boxscore", "teams"])
        .iter()
        .map(|bt| {
            let statistics: Vec<Value> = array(bt, &["statistics"])
                .iter()
                .map(|group| {
                    let labels: Vec<String> =
                        array(group, &["labels"]).iter().map(text).collect();
                    let zip = |values: &[Value]| -> Map<String, Value> {
                        labels
                            .iter()
                            .cloned()
                            .zip(values.iter().cloned())
                            .collect()
                    };
                    let athletes: Vec<Value> = array(group, &["athletes"])
                        .iter()
                        .map(|a| {
                            json!({
                                "name": text_at(a, &["athlete", "displayName"]),
                                "position": text_at(a, &["athlete", "position", "abbreviation"]),
                                "stats": zip(array(a, &["stats"])),
                            })
                        })
                        .collect();
                    let totals = zip(array(group, &["totals"]));
                    json!({
                        "category": text_at(group, &["name"]),
                        "labels": labels,
                        "athletes": athletes,
                        "totals": totals,
                    })
                })
                .collect();
            json!({
                "team": {
                    "id": text_at(bt, &["team", "id"]),
                    "name": text_at(bt, &["team", "displayName"]),
                    "abbreviation": text_at(bt, &["team", "abbreviation"]),
                },
                "statistics": statistics,
            })
        })
        .collect();

    let scoring_plays: Vec<Value> = array(data, &["scoringPlays"])
        .iter()
        .map(|sp| {
            json!({
                "period": or_empty(sp, &["period", "number"]),
                "clock": text_at(sp, &["clock", "displayValue"]),
                "type": text_at(sp, &["type", "text"]),
                "text": text_at(sp, &["text"]),
                "team": {
                    "id": text_at(sp, &["team", "id"]),
                    "name": first_text(at(sp, &["team"]), &["displayName", "name"]),
                    "abbreviation": text_at(sp, &["team", "abbreviation"]),
                },
                "home_score": or_empty(sp, &["homeScore"]),
                "away_score": or_empty(sp, &["awayScore"]),
            })
        })
        .collect();

    let leaders: Vec<Value> = array(data, &["leaders"])
        .iter()
        .map(|group| {
            let categories: Vec<Value> = array(group, &["leaders"])
                .iter()
                .map(|cat| {
                    let top = first(cat, &["leaders"]);
                    json!({
                        "category": first_text(cat, &["displayName", "name"]),
                        "leader": {
                            "name": text_at(top, &["athlete", "displayName"]),
                            "position": text_at(top, &["athlete", "position", "abbreviation"]),
                            "value": text_at(top, &["displayValue"]),
                        },
                    })
                })
                .collect();
            json!({
                "team": {
                    "id": text_at(group, &["team", "id"]),
                    "name": text_at(group, &["team", "displayName"]),
                },
                "categories": categories,
            })
        })
        .collect();

    json!({
        "game_info": {
            "id": text_at(data, &["header", "id"]),
            "status": map_status(&text_at(comp, &["status", "type", "name"])),
            "status_detail": text_at(comp, &["status", "type", "shortDetail"]),
            "venue": {
                "name": text_at(data, &["gameInfo", "venue", "fullName"]),
                "city": text_at(data, &["gameInfo", "venue", "address", "city"]),
            },
        },
        "competitors": competitors,
        "boxscore": boxscore,
        "scoring_plays": scoring_plays,
        "leaders": leaders,
    })
}

/// College polls (AP, Coaches, CFP).
pub fn rankings(data: &Value) -> Value {
    let polls: Vec<Value> = array(data, &["rankings"])
        .iter()
        .map(|poll| {
            let teams: Vec<Value> = array(poll, &["ranks"])
                .iter()
                .map(|entry| {
                    let team = at(entry, &["team"]);
                    json!({
                        "rank": or_empty(entry, &["current"]),
                        "previous_rank": or_empty(entry, &["previous"]),
                        "trend": text_at(entry, &["trend"]),
                        "team": first_text(team, &["nickname", "displayName", "location"]),
                        "team_id": text_at(team, &["id"]),
                        "abbreviation": text_at(team, &["abbreviation"]),
                        "record": text_at(entry, &["recordSummary"]),
                        "points": or_empty(entry, &["points"]),
                        "first_place_votes": at(entry, &["firstPlaceVotes"]).as_i64().unwrap_or(0),
                    })
                })
                .collect();
            json!({
                "name": first_text(poll, &["name", "shortName"]),
                "short_name": text_at(poll, &["shortName"]),
                "type": text_at(poll, &["type"]),
                "teams": teams,
            })
        })
        .collect();
    json!({
        "polls": polls,
        "season": or_empty(data, &["season", "year"]),
    })
}
