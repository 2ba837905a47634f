//! Fantasy Premier League bootstrap data: availability, scorers and
//! player profiles for the Premier League.

use serde_json::{json, Value};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use super::leagues::names_match;
use crate::json::{array, at, text, text_at};

pub const BOOTSTRAP_URL: &str = "https://fantasy.premierleague.com/api/bootstrap-static/";
pub const BOOTSTRAP_TTL_SECS: u64 = 900;
const MAX_LEADERS: usize = 30;

pub fn position(element_type: &Value) -> &'static str {
    match element_type.as_i64() {
        Some(1) => "Goalkeeper",
        Some(2) => "Defender",
        Some(3) => "Midfielder",
        Some(4) => "Forward",
        _ => "Unknown",
    }
}

/// Availability for an FPL status code; unknown codes pass through.
pub fn availability(code: &str) -> String {
    match code {
        "a" => "available",
        "d" => "doubtful",
        "i" => "injured",
        "s" => "suspended",
        "u" => "unavailable",
        "n" => "not_in_squad",
        other => other,
    }
    .to_string()
}

fn full_name(p: &Value) -> String {
    format!("{} {}", text_at(p, &["first_name"]), text_at(p, &["second_name"]))
        .trim()
        .to_string()
}

/// Public player id: the cross-season `code`, falling back to the FPL id.
fn public_id(v: &Value) -> String {
    match text_at(v, &["code"]) {
        s if s.is_empty() => text_at(v, &["id"]),
        s => s,
    }
}

fn int(v: &Value) -> i64 {
    v.as_i64().unwrap_or(0)
}

/// FPL team id → team object.
pub fn team_map(bootstrap: &Value) -> HashMap<String, &Value> {
    array(bootstrap, &["teams"])
        .iter()
        .map(|t| (text_at(t, &["id"]), t))
        .collect()
}

/// FPL-only fields attached to a player (form, cost, expected stats,
/// set-piece duties).
pub fn enrichment(p: &Value) -> Value {
    let or = |key: &str, default: Value| match at(p, &[key]) {
        Value::Null => default,
        v => v.clone(),
    };
    json!({
        "fpl_id": at(p, &["id"]),
        "code": at(p, &["code"]),
        "web_name": text_at(p, &["web_name"]),
        "status": availability(&match text_at(p, &["status"]) {
            s if s.is_empty() => "a".to_string(),
            s => s,
        }),
        "news": text_at(p, &["news"]),
        "chance_of_playing_this_round": at(p, &["chance_of_playing_this_round"]),
        "chance_of_playing_next_round": at(p, &["chance_of_playing_next_round"]),
        "form": or("form", json!("0.0")),
        "now_cost": at(p, &["now_cost"]),
        "selected_by_percent": or("selected_by_percent", json!("0.0")),
        "total_points": or("total_points", json!(0)),
        "points_per_game": or("points_per_game", json!("0.0")),
        "expected_goals": or("expected_goals", json!("0.00")),
        "expected_assists": or("expected_assists", json!("0.00")),
        "expected_goal_involvements": or("expected_goal_involvements", json!("0.00")),
        "expected_goals_conceded": or("expected_goals_conceded", json!("0.00")),
        "ict_index": or("ict_index", json!("0.0")),
        "influence": or("influence", json!("0.0")),
        "creativity": or("creativity", json!("0.0")),
        "threat": or("threat", json!("0.0")),
        "minutes": or("minutes", json!(0)),
        "goals_scored": or("goals_scored", json!(0)),
        "assists": or("assists", json!(0)),
        "clean_sheets": or("clean_sheets", json!(0)),
        "penalties_order": at(p, &["penalties_order"]),
        "corners_and_indirect_freekicks_order": at(p, &["corners_and_indirect_freekicks_order"]),
        "direct_freekicks_order": at(p, &["direct_freekicks_order"]),
    })
}

/// Player profile from an FPL element.
pub fn profile(p: &Value, teams: &HashMap<String, &Value>) -> Value {
    let team = teams.get(&text_at(p, &["team"])).copied().unwrap_or(&Value::Null);
    json!({
        "id": public_id(p),
        "name": full_name(p),
        "first_name": text_at(p, &["first_name"]),
        "last_name": text_at(p, &["second_name"]),
        "position": position(at(p, &["element_type"])),
        "shirt_number": at(p, &["squad_number"]),
        "team": {"id": public_id(team), "name": text_at(team, &["name"])},
        "fpl_data": enrichment(p),
    })
}

/// Element whose FPL id or code equals `id`.
pub fn find_player<'a>(bootstrap: &'a Value, id: &str) -> Option<&'a Value> {
    array(bootstrap, &["elements"])
        .iter()
        .find(|p| text_at(p, &["id"]) == id || text_at(p, &["code"]) == id)
}

/// Element whose full or web name matches `name`.
pub fn find_by_name<'a>(bootstrap: &'a Value, name: &str) -> Option<&'a Value> {
    let wanted = name.to_lowercase();
    let elements = array(bootstrap, &["elements"]);
    elements
        .iter()
        .find(|p| {
            full_name(p).to_lowercase() == wanted
                || text_at(p, &["web_name"]).to_lowercase() == wanted
        })
        .or_else(|| elements.iter().find(|p| names_match(&wanted, &full_name(p))))
}

/// Players flagged doubtful, injured, suspended or unavailable, grouped by
/// team name.
pub fn missing_players(bootstrap: &Value, season_id: &str) -> Value {
    let teams = team_map(bootstrap);
    let mut by_team: BTreeMap<String, (Value, Vec<Value>)> = BTreeMap::new();
    for p in array(bootstrap, &["elements"]) {
        let status = text_at(p, &["status"]);
        if !matches!(status.as_str(), "d" | "i" | "s" | "u" | "n") {
            continue;
        }
        let team_id = text(at(p, &["team"]));
        let team = teams.get(&team_id).copied().unwrap_or(&Value::Null);
        let name = match text_at(team, &["name"]) {
            n if n.is_empty() => "Unknown".to_string(),
            n => n,
        };
        let code = match text_at(team, &["code"]) {
            c if c.is_empty() => team_id.clone(),
            c => c,
        };
        let entry = by_team.entry(name.clone()).or_insert_with(|| {
            (
                json!({"id": code, "name": name, "short_name": text_at(team, &["short_name"])}),
                Vec::new(),
            )
        });
        entry.1.push(json!({
            "id": public_id(p),
            "name": full_name(p),
            "web_name": text_at(p, &["web_name"]),
            "position": position(at(p, &["element_type"])),
            "status": availability(&status),
            "news": text_at(p, &["news"]),
            "chance_of_playing_this_round": at(p, &["chance_of_playing_this_round"]),
            "chance_of_playing_next_round": at(p, &["chance_of_playing_next_round"]),
            "news_added": text_at(p, &["news_added"]),
        }));
    }
    let teams: Vec<Value> = by_team
        .into_values()
        .map(|(team, players)| json!({"team": team, "players": players}))
        .collect();
    json!({"season_id": season_id, "teams": teams})
}

/// Top scorers, ordered by goals then assists.
pub fn leaders(bootstrap: &Value) -> Vec<Value> {
    let teams = team_map(bootstrap);
    let mut scorers: Vec<&Value> = array(bootstrap, &["elements"])
        .iter()
        .filter(|p| int(at(p, &["goals_scored"])) > 0)
        .collect();
    scorers.sort_by_key(|p| {
        (Reverse(int(at(p, &["goals_scored"]))), Reverse(int(at(p, &["assists"]))))
    });
    scorers
        .into_iter()
        .take(MAX_LEADERS)
        .map(|p| {
            let team = teams.get(&text_at(p, &["team"])).copied().unwrap_or(&Value::Null);
            json!({
                "player": {
                    "id": public_id(p),
                    "name": full_name(p),
                    "first_name": text_at(p, &["first_name"]),
                    "last_name": text_at(p, &["second_name"]),
                    "position": position(at(p, &["element_type"])),
                },
                "team": {
                    "id": public_id(team),
                    "name": text_at(team, &["name"]),
                    "short_name": text_at(team, &["short_name"]),
                },
                "goals": int(at(p, &["goals_scored"])),
                "assists": int(at(p, &["assists"])),
                "played_matches": int(at(p, &["starts"])),
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn bootstrap() -> Value {
        json!({
            "teams": [
                {"id": 1, "code": 3, "name": "Arsenal", "short_name": "ARS"},
                {"id": 2, "code": 7, "name": "Aston Villa", "short_name": "AVL"}
            ],
            "elements": [
                {"id": 10, "code": 223340, "first_name": "Bukayo", "second_name": "Saka",
                 "web_name": "Saka", "team": 1, "element_type": 3, "status": "a",
                 "goals_scored": 6, "assists": 9, "starts": 20},
                {"id": 11, "code": 118748, "first_name": "Ollie", "second_name": "Watkins",
                 "web_name": "Watkins", "team": 2, "element_type": 4, "status": "d",
                 "news": "Knock - 75% chance of playing", "chance_of_playing_next_round": 75,
                 "goals_scored": 6, "assists": 2},
                {"id": 12, "code": 1, "first_name": "Ben", "second_name": "White",
                 "web_name": "White", "team": 1, "element_type": 2, "status": "i",
                 "goals_scored": 0}
            ]
        })
    }

    #[test]
    fn test_missing_players_grouped_and_sorted() {
        let out = missing_players(&bootstrap(), "premier-league-2025");
        let names: Vec<&str> = out["teams"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["team"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Arsenal", "Aston Villa"]);
        assert_eq!(out["teams"][0]["players"][0]["status"], json!("injured"));
        assert_eq!(out["teams"][0]["team"]["id"], json!("3"));
        assert_eq!(out["teams"][1]["players"][0]["chance_of_playing_next_round"], json!(75));
    }

    #[test]
    fn test_leaders_tiebreak_on_assists() {
        let out = leaders(&bootstrap());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["player"]["name"], json!("Bukayo Saka"));
        assert_eq!(out[1]["team"]["short_name"], json!("AVL"));
    }

    #[test]
    fn test_find_player_by_id_or_code() {
        let b = bootstrap();
        let web_name = |id: &str| find_player(&b, id).map(|p| text_at(p, &["web_name"]));
        assert_eq!(web_name("11"), Some("Watkins".into()));
        assert_eq!(web_name("223340"), Some("Saka".into()));
        assert!(find_player(&b, "999").is_none());
    }

    #[test]
    fn test_profile() {
        let b = bootstrap();
        let teams = team_map(&b);
        let p = profile(find_player(&b, "10").unwrap(), &teams);
        assert_eq!(p["id"], json!("223340"));
        assert_eq!(p["position"], json!("Midfielder"));
        assert_eq!(p["team"], json!({"id": "3", "name": "Arsenal"}));
        assert_eq!(p["fpl_data"]["status"], json!("available"));
    }

    #[test]
    fn test_availability_passthrough() {
        assert_eq!(availability("z"), "z");
    }
}
