//! Normalizers for ESPN odds, injuries, transactions, stats, futures, depth
//! charts and leaders.
//!
//! All functions are pure and total: missing input produces the empty shape
//! (`None` or a collection with `count: 0`), never an error. `$ref` names are
//! resolved beforehand by the caller and passed in as a url → name map.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::json::{self, array, at, first_text, is_truthy, or_empty, text_at};
use crate::types::HomeAway;

/// Default cap on books per futures market.
pub const DEFAULT_FUTURES_LIMIT: usize = 25;

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Odds {
    pub provider: String,
    pub details: Value,
    pub spread: Value,
    pub over_under: Value,
    pub favorite: Option<HomeAway>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moneyline: Option<Moneyline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread_line: Option<SpreadLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<TotalLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<OpeningLines>,
}

/// Two-way or three-way moneyline. `draw` is omitted for two-way markets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Moneyline {
    pub home: Value,
    pub away: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineOdds {
    pub line: Value,
    pub odds: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadLine {
    pub home: LineOdds,
    pub away: LineOdds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalLine {
    pub over: LineOdds,
    pub under: LineOdds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningSpread {
    pub home: Value,
    pub away: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningLines {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moneyline: Option<Moneyline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<OpeningSpread>,
    /// Opening total (over line).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Value>,
}

fn line_odds(market: &Value, side: &str, phase: &str) -> LineOdds {
    LineOdds {
        line: or_empty(market, &[side, phase, "line"]),
        odds: or_empty(market, &[side, phase, "odds"]),
    }
}

/// Present-and-truthy value at `path`.
fn truthy_at(value: &Value, path: &[&str]) -> Option<Value> {
    let v = at(value, path);
    is_truthy(v).then(|| v.clone())
}

/// Normalize a competition's `odds` array. Only the first provider entry is
/// used; `None` for an empty array.
pub fn normalize_odds(odds: &[Value]) -> Option<Odds> {
    let o = odds.first()?;
    let ml = at(o, &["moneyline"]);
    let ps = at(o, &["pointSpread"]);
    let tot = at(o, &["total"]);

    let favorite = if is_truthy(at(o, &["homeTeamOdds", "favorite"])) {
        Some(HomeAway::Home)
    } else if is_truthy(at(o, &["awayTeamOdds", "favorite"])) {
        Some(HomeAway::Away)
    } else {
        None
    };

    let moneyline = is_truthy(ml).then(|| Moneyline {
        home: or_empty(ml, &["home", "close", "odds"]),
        away: or_empty(ml, &["away", "close", "odds"]),
        draw: truthy_at(ml, &["draw", "close", "odds"]),
    });

    let spread_line = is_truthy(ps).then(|| SpreadLine {
        home: line_odds(ps, "home", "close"),
        away: line_odds(ps, "away", "close"),
    });

    let total = is_truthy(tot).then(|| TotalLine {
        over: line_odds(tot, "over", "close"),
        under: line_odds(tot, "under", "close"),
    });

    let open_ml_home = truthy_at(ml, &["home", "open", "odds"]);
    let open_ml_away = truthy_at(ml, &["away", "open", "odds"]);
    let open_spread_home = truthy_at(ps, &["home", "open", "line"]);
    let open_spread_away = truthy_at(ps, &["away", "open", "line"]);
    let open_total = truthy_at(tot, &["over", "open", "line"]);

    let has_open = open_ml_home.is_some()
        || open_ml_away.is_some()
        || open_spread_home.is_some()
        || open_total.is_some();

    let open = has_open.then(|| OpeningLines {
        moneyline: (open_ml_home.is_some() || open_ml_away.is_some()).then(|| Moneyline {
            home: open_ml_home.clone().unwrap_or_else(empty),
            away: open_ml_away.clone().unwrap_or_else(empty),
            draw: truthy_at(ml, &["draw", "open", "odds"]),
        }),
        spread: (open_spread_home.is_some() || open_spread_away.is_some()).then(|| {
            OpeningSpread {
                home: open_spread_home.clone().unwrap_or_else(empty),
                away: open_spread_away.clone().unwrap_or_else(empty),
            }
        }),
        total: open_total.clone(),
    });

    Some(Odds {
        provider: text_at(o, &["provider", "name"]),
        details: or_empty(o, &["details"]),
        spread: or_empty(o, &["spread"]),
        over_under: or_empty(o, &["overUnder"]),
        favorite,
        moneyline,
        spread_line,
        total,
        open,
    })
}

fn empty() -> Value {
    Value::String(String::new())
}

// ---------------------------------------------------------------------------
// Injuries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Injury {
    pub name: String,
    pub position: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
    pub side: String,
    pub return_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamInjuries {
    pub team: String,
    pub team_id: String,
    pub injuries: Vec<Injury>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjuryReport {
    pub teams: Vec<TeamInjuries>,
    pub count: usize,
}

pub fn normalize_injuries(data: &Value) -> InjuryReport {
    let teams: Vec<TeamInjuries> = array(data, &["injuries"])
        .iter()
        .map(|team| {
            let injuries: Vec<Injury> = array(team, &["injuries"])
                .iter()
                .map(|inj| Injury {
                    name: text_at(inj, &["athlete", "displayName"]),
                    position: text_at(inj, &["athlete", "position", "abbreviation"]),
                    status: text_at(inj, &["status"]),
                    kind: first_text(at(inj, &["type"]), &["description", "name"]),
                    detail: text_at(inj, &["details", "detail"]),
                    side: text_at(inj, &["details", "side"]),
                    return_date: text_at(inj, &["details", "returnDate"]),
                })
                .collect();
            TeamInjuries {
                team: text_at(team, &["displayName"]),
                team_id: text_at(team, &["id"]),
                count: injuries.len(),
                injuries,
            }
        })
        .collect();
    InjuryReport {
        count: teams.len(),
        teams,
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub date: String,
    pub team: String,
    pub team_abbreviation: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transactions {
    pub transactions: Vec<Transaction>,
    pub count: usize,
}

pub fn normalize_transactions(data: &Value) -> Transactions {
    let transactions: Vec<Transaction> = array(data, &["transactions"])
        .iter()
        .map(|txn| Transaction {
            date: text_at(txn, &["date"]),
            team: text_at(txn, &["team", "displayName"]),
            team_abbreviation: text_at(txn, &["team", "abbreviation"]),
            description: text_at(txn, &["description"]),
        })
        .collect();
    Transactions {
        count: transactions.len(),
        transactions,
    }
}

// ---------------------------------------------------------------------------
// Core API statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    pub name: String,
    pub display_name: String,
    pub abbreviation: String,
    pub value: Value,
    pub display_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_game: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_game_display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCategory {
    pub name: String,
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreStats {
    pub categories: Vec<StatCategory>,
    pub count: usize,
}

/// Team and player statistics share this shape.
pub fn normalize_core_stats(data: &Value) -> CoreStats {
    let categories: Vec<StatCategory> = array(data, &["splits", "categories"])
        .iter()
        .map(|cat| StatCategory {
            name: first_text(cat, &["displayName", "name"]),
            stats: array(cat, &["stats"]).iter().map(normalize_stat).collect(),
        })
        .collect();
    CoreStats {
        count: categories.len(),
        categories,
    }
}

fn normalize_stat(stat: &Value) -> Stat {
    let rank = stat.get("rank").cloned();
    let per_game = stat.get("perGameValue").cloned();
    Stat {
        name: text_at(stat, &["name"]),
        display_name: text_at(stat, &["displayName"]),
        abbreviation: text_at(stat, &["abbreviation"]),
        value: at(stat, &["value"]).clone(),
        display_value: text_at(stat, &["displayValue"]),
        rank_display: rank.as_ref().map(|_| text_at(stat, &["rankDisplayValue"])),
        rank,
        per_game_display: per_game
            .as_ref()
            .map(|_| text_at(stat, &["perGameDisplayValue"])),
        per_game,
    }
}

// ---------------------------------------------------------------------------
// Futures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuturesEntry {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuturesMarket {
    pub id: Value,
    pub name: String,
    pub entries: Vec<FuturesEntry>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Futures {
    pub futures: Vec<FuturesMarket>,
    pub count: usize,
}

/// The athlete `$ref` of a book, falling back to its team `$ref`.
fn book_ref(book: &Value) -> Option<String> {
    [["athlete", "$ref"], ["team", "$ref"]]
        .iter()
        .map(|path| text_at(book, path))
        .find(|r| !r.is_empty())
}

/// `$ref` URLs that `normalize_futures` will look up.
pub fn futures_refs(data: &Value, limit: usize) -> Vec<String> {
    array(data, &["items"])
        .iter()
        .flat_map(|item| array(item, &["futures"]).iter())
        .flat_map(|group| array(group, &["books"]).iter().take(limit))
        .filter_map(book_ref)
        .collect()
}

pub fn normalize_futures(data: &Value, limit: usize, names: &HashMap<String, String>) -> Futures {
    let futures: Vec<FuturesMarket> = array(data, &["items"])
        .iter()
        .map(|item| {
            let entries: Vec<FuturesEntry> = array(item, &["futures"])
                .iter()
                .flat_map(|group| array(group, &["books"]).iter().take(limit))
                .map(|book| FuturesEntry {
                    name: book_ref(book)
                        .and_then(|r| names.get(&r).cloned())
                        .unwrap_or_default(),
                    value: or_empty(book, &["value"]),
                })
                .collect();
            FuturesMarket {
                id: or_empty(item, &["id"]),
                name: first_text(item, &["displayName", "name"]),
                count: entries.len(),
                entries,
            }
        })
        .collect();
    Futures {
        count: futures.len(),
        futures,
    }
}

// ---------------------------------------------------------------------------
// Depth charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthAthlete {
    pub depth: usize,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthPosition {
    pub key: String,
    pub name: String,
    pub abbreviation: String,
    pub athletes: Vec<DepthAthlete>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthChart {
    pub name: String,
    pub positions: Vec<DepthPosition>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthCharts {
    pub charts: Vec<DepthChart>,
    pub count: usize,
}

/// Athletes are numbered by depth in input order, starting at 1.
pub fn normalize_depth_chart(data: &Value) -> DepthCharts {
    let charts: Vec<DepthChart> = array(data, &["depthchart"])
        .iter()
        .map(|chart| {
            let positions: Vec<DepthPosition> = chart
                .get("positions")
                .and_then(Value::as_object)
                .map(|positions| {
                    positions
                        .iter()
                        .map(|(key, pos)| depth_position(key, pos))
                        .collect()
                })
                .unwrap_or_default();
            DepthChart {
                name: text_at(chart, &["name"]),
                count: positions.len(),
                positions,
            }
        })
        .collect();
    DepthCharts {
        count: charts.len(),
        charts,
    }
}

fn depth_position(key: &str, pos: &Value) -> DepthPosition {
    let info = at(pos, &["position"]);
    let name = first_text(info, &["displayName", "name"]);
    let abbreviation = text_at(info, &["abbreviation"]);
    DepthPosition {
        key: key.to_string(),
        name: if name.is_empty() { key.to_string() } else { name },
        abbreviation: if abbreviation.is_empty() {
            key.to_uppercase()
        } else {
            abbreviation
        },
        athletes: array(pos, &["athletes"])
            .iter()
            .enumerate()
            .map(|(i, ath)| DepthAthlete {
                depth: i + 1,
                id: text_at(ath, &["id"]),
                name: text_at(ath, &["displayName"]),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Leaders (core API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leader {
    pub rank: Value,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderCategory {
    pub name: String,
    pub leaders: Vec<Leader>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaders {
    pub categories: Vec<LeaderCategory>,
    pub count: usize,
}

fn inline_athlete_name(leader: &Value) -> String {
    first_text(at(leader, &["athlete"]), &["displayName", "fullName"])
}

/// `$ref` URLs of leaders whose athlete name is not inline.
pub fn leader_refs(categories: &[Value]) -> Vec<String> {
    categories
        .iter()
        .flat_map(|cat| array(cat, &["leaders"]).iter())
        .filter(|leader| inline_athlete_name(leader).is_empty())
        .map(|leader| text_at(leader, &["athlete", "$ref"]))
        .filter(|r| !r.is_empty())
        .collect()
}

/// Whole numbers render without decimals, rates with three.
pub fn format_leader_value(leader: &Value) -> String {
    match at(leader, &["value"]) {
        Value::Null => text_at(leader, &["displayValue"]),
        raw => match json::as_f64(raw) {
            Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
            Some(v) => format!("{v:.3}"),
            None => text_at(leader, &["displayValue"]),
        },
    }
}

pub fn normalize_leaders(categories: &[Value], names: &HashMap<String, String>) -> Leaders {
    let categories: Vec<LeaderCategory> = categories
        .iter()
        .map(|cat| LeaderCategory {
            name: first_text(cat, &["displayName", "name"]),
            leaders: array(cat, &["leaders"])
                .iter()
                .map(|leader| {
                    let mut name = inline_athlete_name(leader);
                    if name.is_empty() {
                        let r = text_at(leader, &["athlete", "$ref"]);
                        name = names.get(&r).cloned().unwrap_or_default();
                    }
                    Leader {
                        rank: or_empty(leader, &["rank"]),
                        name,
                        value: format_leader_value(leader),
                    }
                })
                .collect(),
        })
        .collect();
    Leaders {
        count: categories.len(),
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_way_odds() -> Value {
        json!([{
            "provider": {"name": "DraftKings"},
            "details": "KC -3.5",
            "spread": -3.5,
            "overUnder": 47.5,
            "homeTeamOdds": {"favorite": true},
            "awayTeamOdds": {"favorite": false},
            "moneyline": {
                "home": {"close": {"odds": "-180"}, "open": {"odds": "-165"}},
                "away": {"close": {"odds": "+150"}, "open": {"odds": "+140"}}
            },
            "pointSpread": {
                "home": {"close": {"line": "-3.5", "odds": "-110"}, "open": {"line": "-3"}},
                "away": {"close": {"line": "+3.5", "odds": "-110"}, "open": {"line": "+3"}}
            },
            "total": {
                "over": {"close": {"line": "o47.5", "odds": "-110"}, "open": {"line": "o46.5"}},
                "under": {"close": {"line": "u47.5", "odds": "-110"}}
            }
        }, {
            "provider": {"name": "Ignored"}
        }])
    }

    #[test]
    fn test_odds_empty_is_none() {
        assert!(normalize_odds(&[]).is_none());
    }

    #[test]
    fn test_odds_home_favorite_and_closing_lines() {
        let raw = two_way_odds();
        let odds = normalize_odds(raw.as_array().unwrap()).unwrap();
        assert_eq!(odds.provider, "DraftKings");
        assert_eq!(odds.favorite, Some(HomeAway::Home));
        let ml = odds.moneyline.as_ref().unwrap();
        assert_eq!(ml.home, json!("-180"));
        assert_eq!(ml.away, json!("+150"));
        assert_eq!(odds.spread_line.as_ref().unwrap().home.line, json!("-3.5"));
        assert_eq!(odds.total.as_ref().unwrap().under.odds, json!("-110"));
    }

    #[test]
    fn test_odds_two_way_omits_draw_key() {
        let raw = two_way_odds();
        let v = serde_json::to_value(normalize_odds(raw.as_array().unwrap())).unwrap();
        assert!(v["moneyline"].get("draw").is_none());
        assert!(v["open"]["moneyline"].get("draw").is_none());
    }

    #[test]
    fn test_odds_three_way_includes_draw() {
        let raw = json!([{
            "moneyline": {
                "home": {"close": {"odds": "+120"}},
                "away": {"close": {"odds": "+210"}},
                "draw": {"close": {"odds": "+240"}, "open": {"odds": "+250"}}
            },
            "awayTeamOdds": {"favorite": false}
        }]);
        let v = serde_json::to_value(normalize_odds(raw.as_array().unwrap())).unwrap();
        assert_eq!(v["moneyline"]["draw"], json!("+240"));
        assert!(v["favorite"].is_null());
        // Draw alone does not create opening lines.
        assert!(v.get("open").is_none());
    }

    #[test]
    fn test_odds_away_favorite() {
        let raw = json!([{"homeTeamOdds": {}, "awayTeamOdds": {"favorite": true}}]);
        let odds = normalize_odds(raw.as_array().unwrap()).unwrap();
        assert_eq!(odds.favorite, Some(HomeAway::Away));
        assert!(odds.moneyline.is_none());
        assert_eq!(odds.details, json!(""));
    }

    #[test]
    fn test_odds_opening_lines() {
        let raw = two_way_odds();
        let odds = normalize_odds(raw.as_array().unwrap()).unwrap();
        let open = odds.open.unwrap();
        assert_eq!(open.moneyline.unwrap().home, json!("-165"));
        assert_eq!(
            open.spread.unwrap(),
            OpeningSpread {
                home: json!("-3"),
                away: json!("+3")
            }
        );
        assert_eq!(open.total, Some(json!("o46.5")));
    }

    #[test]
    fn test_injuries() {
        let data = json!({"injuries": [{
            "displayName": "Kansas City Chiefs",
            "id": 12,
            "injuries": [{
                "athlete": {"displayName": "A Player", "position": {"abbreviation": "WR"}},
                "status": "Questionable",
                "type": {"name": "INJURY_STATUS_QUESTIONABLE", "description": "questionable"},
                "details": {"detail": "Hamstring", "side": "Left", "returnDate": "2025-10-01"}
            }]
        }]});
        let report = normalize_injuries(&data);
        assert_eq!(report.count, 1);
        let team = &report.teams[0];
        assert_eq!(team.team_id, "12");
        assert_eq!(team.count, 1);
        assert_eq!(team.injuries[0].kind, "questionable");
        assert_eq!(team.injuries[0].side, "Left");
        let v = serde_json::to_value(&team.injuries[0]).unwrap();
        assert_eq!(v["type"], json!("questionable"));
    }

    #[test]
    fn test_empty_inputs_give_empty_collections() {
        let empty = json!({});
        assert_eq!(normalize_injuries(&empty).count, 0);
        assert_eq!(normalize_transactions(&empty).count, 0);
        assert_eq!(normalize_core_stats(&empty).count, 0);
        assert_eq!(normalize_futures(&empty, 25, &HashMap::new()).count, 0);
        assert_eq!(normalize_depth_chart(&empty).count, 0);
        assert_eq!(normalize_leaders(&[], &HashMap::new()).count, 0);
        assert!(normalize_transactions(&json!(null)).transactions.is_empty());
    }

    #[test]
    fn test_transactions() {
        let data = json!({"transactions": [{
            "date": "2025-09-01T00:00Z",
            "team": {"displayName": "Boston Celtics", "abbreviation": "BOS"},
            "description": "Signed G X."
        }]});
        let t = normalize_transactions(&data);
        assert_eq!(t.count, 1);
        assert_eq!(t.transactions[0].team_abbreviation, "BOS");
    }

    #[test]
    fn test_core_stats_optional_rank_and_per_game() {
        let data = json!({"splits": {"categories": [{
            "name": "offensive",
            "stats": [
                {"name": "points", "displayName": "Points", "value": 512.0, "displayValue": "512",
                 "rank": 3, "rankDisplayValue": "3rd",
                 "perGameValue": 28.4, "perGameDisplayValue": "28.4"},
                {"name": "yards", "value": 6000}
            ]
        }]}});
        let stats = normalize_core_stats(&data);
        assert_eq!(stats.categories[0].name, "offensive");
        let points = serde_json::to_value(&stats.categories[0].stats[0]).unwrap();
        assert_eq!(points["rank_display"], json!("3rd"));
        assert_eq!(points["per_game"], json!(28.4));
        let yards = serde_json::to_value(&stats.categories[0].stats[1]).unwrap();
        assert!(yards.get("rank").is_none());
        assert!(yards.get("per_game").is_none());
    }

    #[test]
    fn test_futures_limit_and_ref_names() {
        let books: Vec<Value> = (0..30)
            .map(|i| {
                json!({
                    "athlete": {"$ref": format!("https://core/athletes/{i}")},
                    "value": format!("+{}", 100 + i),
                })
            })
            .collect();
        let data = json!({"items": [{
            "id": 1, "displayName": "MVP",
            "futures": [{"books": books}]
        }, {
            "id": 2, "name": "Champion",
            "futures": [{"books": [{"team": {"$ref": "https://core/teams/9"}, "value": "+400"}]}]
        }]});

        let refs = futures_refs(&data, 25);
        assert_eq!(refs.len(), 26);

        let mut names = HashMap::new();
        names.insert("https://core/athletes/0".to_string(), "First".to_string());
        names.insert("https://core/teams/9".to_string(), "Team Nine".to_string());

        let futures = normalize_futures(&data, 25, &names);
        assert_eq!(futures.count, 2);
        assert_eq!(futures.futures[0].count, 25);
        assert_eq!(futures.futures[0].entries[0].name, "First");
        assert_eq!(futures.futures[0].entries[1].name, "");
        assert_eq!(futures.futures[1].name, "Champion");
        assert_eq!(futures.futures[1].entries[0].name, "Team Nine");
    }

    #[test]
    fn test_depth_chart_numbers_in_input_order() {
        let data = json!({"depthchart": [{
            "name": "Base 3WR 1TE",
            "positions": {
                "qb": {
                    "position": {"displayName": "Quarterback", "abbreviation": "QB"},
                    "athletes": [
                        {"id": 1, "displayName": "Starter"},
                        {"id": 2, "displayName": "Backup"}
                    ]
                },
                "lt": {"position": {}, "athletes": []}
            }
        }]});
        let charts = normalize_depth_chart(&data);
        let qb = &charts.charts[0].positions[0];
        assert_eq!(qb.key, "qb");
        assert_eq!(qb.athletes[0].depth, 1);
        assert_eq!(qb.athletes[0].name, "Starter");
        assert_eq!(qb.athletes[1].depth, 2);
        assert_eq!(qb.athletes[1].name, "Backup");

        let lt = &charts.charts[0].positions[1];
        assert_eq!(lt.abbreviation, "LT");
        assert_eq!(lt.name, "lt");
    }

    #[test]
    fn test_leader_value_formatting() {
        assert_eq!(format_leader_value(&json!({"value": 31.0})), "31");
        assert_eq!(format_leader_value(&json!({"value": 0.3125})), "0.312");
        assert_eq!(format_leader_value(&json!({"displayValue": "179-541"})), "179-541");
        assert_eq!(format_leader_value(&json!({"value": "n/a", "displayValue": "-"})), "-");
    }

    #[test]
    fn test_leaders_resolve_missing_names() {
        let cats = json!([{
            "displayName": "Passing Yards",
            "leaders": [
                {"rank": 1, "value": 4183.0, "athlete": {"$ref": "https://core/athletes/3"}},
                {"rank": 2, "value": 4000.0, "athlete": {"displayName": "Inline"}}
            ]
        }]);
        let cats = cats.as_array().unwrap();
        assert_eq!(leader_refs(cats), vec!["https://core/athletes/3".to_string()]);

        let mut names = HashMap::new();
        names.insert("https://core/athletes/3".to_string(), "Resolved".to_string());
        let leaders = normalize_leaders(cats, &names);
        assert_eq!(leaders.categories[0].leaders[0].name, "Resolved");
        assert_eq!(leaders.categories[0].leaders[0].value, "4183");
        assert_eq!(leaders.categories[0].leaders[1].name, "Inline");
    }
}
