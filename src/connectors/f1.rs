//! Formula 1 from the Jolpica (Ergast-compatible) API: calendar, race
//! results, championship tables, drivers, teams and pit stops.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{unknown_command, CommandSpec, Connector, Module, Params};
use crate::http::{Request, Scope, UpstreamClient};
use crate::json::{array, as_f64, at, first, text_at};
use crate::types::{Outcome, SkillsError};

pub const BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";
const SCHEDULE_TTL_SECS: u64 = 3600;
const RESULTS_TTL_SECS: u64 = 600;
const PAGE_LIMIT: u32 = 100;

/// Pit-lane times outside this window are drive-throughs, red flags or
/// timing glitches.
const PIT_WINDOW_SECS: (f64, f64) = (15.0, 60.0);

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("get_race_schedule", "Season calendar", &["year"], &[]),
    CommandSpec::new(
        "get_race_results",
        "Classification of a Grand Prix",
        &["year", "event"],
        &[],
    ),
    CommandSpec::new(
        "get_championship_standings",
        "Driver and constructor championship tables",
        &["year"],
        &[],
    ),
    CommandSpec::new("get_driver_info", "Drivers of a season", &["year"], &["driver"]),
    CommandSpec::new("get_team_info", "Teams of a season with their drivers", &["year"], &["team"]),
    CommandSpec::new(
        "get_pit_stops",
        "Pit stop durations of a Grand Prix with team averages",
        &["year", "event"],
        &["driver"],
    ),
];

fn full_name(driver: &Value) -> String {
    format!("{} {}", text_at(driver, &["givenName"]), text_at(driver, &["familyName"]))
        .trim()
        .to_string()
}

fn driver(d: &Value) -> Value {
    json!({
        "driver_id": text_at(d, &["driverId"]),
        "driver_code": text_at(d, &["code"]),
        "driver_number": text_at(d, &["permanentNumber"]),
        "first_name": text_at(d, &["givenName"]),
        "last_name": text_at(d, &["familyName"]),
        "full_name": full_name(d),
        "nationality": text_at(d, &["nationality"]),
        "date_of_birth": text_at(d, &["dateOfBirth"]),
    })
}

fn race(r: &Value) -> Value {
    let circuit = at(r, &["Circuit"]);
    json!({
        "round_number": text_at(r, &["round"]),
        "event_name": text_at(r, &["raceName"]),
        "circuit_name": text_at(circuit, &["circuitName"]),
        "location": text_at(circuit, &["Location", "locality"]),
        "country": text_at(circuit, &["Location", "country"]),
        "event_date": text_at(r, &["date"]),
        "event_time": text_at(r, &["time"]),
        "event_format": if at(r, &["Sprint"]).is_null() { "conventional" } else { "sprint" },
    })
}

fn result_row(row: &Value) -> Value {
    let d = at(row, &["Driver"]);
    json!({
        "position": text_at(row, &["position"]),
        "position_text": text_at(row, &["positionText"]),
        "driver_code": text_at(d, &["code"]),
        "driver_number": text_at(row, &["number"]),
        "full_name": full_name(d),
        "team_name": text_at(row, &["Constructor", "name"]),
        "grid_position": text_at(row, &["grid"]),
        "laps": text_at(row, &["laps"]),
        "status": text_at(row, &["status"]),
        "time": text_at(row, &["Time", "time"]),
        "fastest_lap_time": text_at(row, &["FastestLap", "Time", "time"]),
        "fastest_lap_rank": text_at(row, &["FastestLap", "rank"]),
        "points": as_f64(at(row, &["points"])).unwrap_or(0.0),
    })
}

/// Seconds in a pit duration: `"22.456"` or `"1:02.345"`.
pub fn parse_duration(raw: &str) -> Option<f64> {
    match raw.trim().split_once(':') {
        Some((m, s)) => Some(m.parse::<f64>().ok()? * 60.0 + s.parse::<f64>().ok()?),
        None => raw.trim().parse().ok(),
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Calendar round matching `event`: a round number, an exact race name, or
/// a unique substring of a race, locality or country name.
pub fn find_round<'a>(
    races: &'a [Value],
    event: &str,
    year: i64,
) -> Result<&'a Value, SkillsError> {
    let needle = event.trim().to_lowercase();
    if let Some(r) = races.iter().find(|r| text_at(r, &["round"]) == needle) {
        return Ok(r);
    }
    if let Some(r) = races
        .iter()
        .find(|r| text_at(r, &["raceName"]).to_lowercase() == needle)
    {
        return Ok(r);
    }
    let partial: Vec<&Value> = races
        .iter()
        .filter(|r| {
            [
                text_at(r, &["raceName"]),
                text_at(r, &["Circuit", "Location", "locality"]),
                text_at(r, &["Circuit", "Location", "country"]),
            ]
            .iter()
            .any(|s| s.to_lowercase().contains(&needle))
        })
        .collect();
    match partial.as_slice() {
        [only] => Ok(*only),
        _ => {
            let available: Vec<String> = races.iter().map(|r| text_at(r, &["raceName"])).collect();
            Err(SkillsError::InvalidInput(format!(
                "Event '{event}' not found in {year} calendar. Available events: {}",
                available.join(", ")
            )))
        }
    }
}

/// Pit stops within the plausible window, fastest first, and per-team
/// average and best.
pub fn pit_summary(stops: &[Value], teams: &BTreeMap<String, String>, race: &str) -> Value {
    let mut pits: Vec<Value> = stops
        .iter()
        .filter_map(|s| {
            let secs = parse_duration(&text_at(s, &["duration"]))?;
            if secs <= PIT_WINDOW_SECS.0 || secs >= PIT_WINDOW_SECS.1 {
                return None;
            }
            let driver_id = text_at(s, &["driverId"]);
            Some(json!({
                "race": race,
                "team": teams.get(&driver_id).cloned().unwrap_or_default(),
                "driver": driver_id,
                "lap": at(s, &["lap"]).as_str().and_then(|l| l.parse::<i64>().ok()),
                "stop": text_at(s, &["stop"]),
                "duration_seconds": round3(secs),
            }))
        })
        .collect();
    pits.sort_by(|a, b| {
        let key = |v: &Value| v["duration_seconds"].as_f64().unwrap_or(f64::MAX);
        key(a).total_cmp(&key(b))
    });

    let mut by_team: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for p in &pits {
        by_team
            .entry(text_at(p, &["team"]))
            .or_default()
            .push(p["duration_seconds"].as_f64().unwrap_or(0.0));
    }
    let mut team_summary: Vec<(f64, Value)> = by_team
        .into_iter()
        .map(|(team, d)| {
            let avg = d.iter().sum::<f64>() / d.len() as f64;
            let best = d.iter().copied().fold(f64::INFINITY, f64::min);
            (
                avg,
                json!({
                    "team": team,
                    "average_seconds": round3(avg),
                    "best_seconds": round3(best),
                    "total_stops": d.len(),
                }),
            )
        })
        .collect();
    team_summary.sort_by(|a, b| a.0.total_cmp(&b.0));

    json!({
        "total_stops": pits.len(),
        "pit_stops": pits,
        "team_summary": team_summary.into_iter().map(|(_, v)| v).collect::<Vec<_>>(),
    })
}

pub struct F1Connector {
    client: Arc<UpstreamClient>,
}

impl F1Connector {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    async fn mr_data(&self, path: &str, ttl_secs: u64) -> Result<Value, SkillsError> {
        let req = Request::new(Scope::F1, format!("{BASE_URL}/{path}.json"))
            .param("limit", PAGE_LIMIT)
            .ttl_secs(ttl_secs);
        let data = self.client.get_json(&req).await?;
        Ok(at(&data, &["MRData"]).clone())
    }

    fn year(params: &Params) -> Result<i64, SkillsError> {
        let year = params
            .int("year")?
            .ok_or_else(|| SkillsError::MissingParams(vec!["year".into()]))?;
        if !(1950..=2100).contains(&year) {
            return Err(SkillsError::InvalidInput(format!("Invalid year: {year}")));
        }
        Ok(year)
    }

    async fn races(&self, year: i64) -> Result<Vec<Value>, SkillsError> {
        let data = self.mr_data(&year.to_string(), SCHEDULE_TTL_SECS).await?;
        Ok(array(&data, &["RaceTable", "Races"]).to_vec())
    }

    async fn race_schedule(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let year = Self::year(params)?;
        let races: Vec<Value> = self.races(year).await?.iter().map(race).collect();
        Ok(Outcome::ok_with(
            races,
            format!("Race schedule for {year} retrieved successfully"),
        ))
    }

    /// Round number and race name for the `event` param.
    async fn resolve_event(
        &self,
        year: i64,
        params: &Params,
    ) -> Result<(String, String), SkillsError> {
        let event = params.require("event")?;
        let races = self.races(year).await?;
        let r = find_round(&races, &event, year)?;
        Ok((text_at(r, &["round"]), text_at(r, &["raceName"])))
    }

    async fn race_results(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let year = Self::year(params)?;
        let (round, name) = self.resolve_event(year, params).await?;
        let data = self
            .mr_data(&format!("{year}/{round}/results"), RESULTS_TTL_SECS)
            .await?;
        let race = first(&data, &["RaceTable", "Races"]);
        let results: Vec<Value> = array(race, &["Results"]).iter().map(result_row).collect();
        if results.is_empty() {
            return Err(SkillsError::NoData(format!("No results yet for {year} {name}")));
        }
        Ok(Outcome::ok(json!({
            "year": year,
            "round": round,
            "event_name": name,
            "date": text_at(race, &["date"]),
            "results": results,
        })))
    }

    async fn standings(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let year = Self::year(params)?;
        let drivers_path = format!("{year}/driverStandings");
        let constructors_path = format!("{year}/constructorStandings");
        let (drivers, constructors) = tokio::join!(
            self.mr_data(&drivers_path, RESULTS_TTL_SECS),
            self.mr_data(&constructors_path, RESULTS_TTL_SECS),
        );
        let (drivers, constructors) = (drivers?, constructors?);
        let dlist = first(&drivers, &["StandingsTable", "StandingsLists"]);
        let clist = first(&constructors, &["StandingsTable", "StandingsLists"]);

        let driver_standings: Vec<Value> = array(dlist, &["DriverStandings"])
            .iter()
            .map(|s| {
                let d = at(s, &["Driver"]);
                json!({
                    "position": text_at(s, &["position"]),
                    "driver_code": text_at(d, &["code"]),
                    "full_name": full_name(d),
                    "team": text_at(first(s, &["Constructors"]), &["name"]),
                    "points": as_f64(at(s, &["points"])).unwrap_or(0.0),
                    "wins": text_at(s, &["wins"]),
                })
            })
            .collect();
        let constructor_standings: Vec<Value> = array(clist, &["ConstructorStandings"])
            .iter()
            .map(|s| {
                json!({
                    "position": text_at(s, &["position"]),
                    "team": text_at(s, &["Constructor", "name"]),
                    "points": as_f64(at(s, &["points"])).unwrap_or(0.0),
                    "wins": text_at(s, &["wins"]),
                })
            })
            .collect();
        let rounds = text_at(dlist, &["round"]).parse::<i64>().unwrap_or(0);
        Ok(Outcome::ok_with(
            json!({
                "driver_standings": driver_standings,
                "constructor_standings": constructor_standings,
                "races_counted": rounds,
            }),
            format!("Championship standings for {year} ({rounds} races)"),
        ))
    }

    /// Drivers paired with their teams, from the season's driver standings.
    async fn season_entries(&self, year: i64) -> Result<Vec<(Value, Value)>, SkillsError> {
        let data = self
            .mr_data(&format!("{year}/driverStandings"), RESULTS_TTL_SECS)
            .await?;
        let list = first(&data, &["StandingsTable", "StandingsLists"]);
        Ok(array(list, &["DriverStandings"])
            .iter()
            .map(|s| (at(s, &["Driver"]).clone(), first(s, &["Constructors"]).clone()))
            .collect())
    }

    async fn driver_info(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let year = Self::year(params)?;
        let entries = self.season_entries(year).await?;
        let mut drivers: Vec<Value> = entries
            .iter()
            .map(|(d, team)| {
                let mut out = driver(d);
                out["team_name"] = json!(text_at(team, &["name"]));
                out
            })
            .collect();

        match params.str("driver") {
            Some(wanted) => {
                let w = wanted.to_lowercase();
                drivers.retain(|d| {
                    text_at(d, &["driver_code"]).to_lowercase() == w
                        || text_at(d, &["driver_id"]) == w
                        || text_at(d, &["full_name"]).to_lowercase().contains(&w)
                });
                if drivers.is_empty() {
                    return Err(SkillsError::NoData(format!(
                        "No information found for driver '{wanted}' in {year}"
                    )));
                }
                Ok(Outcome::ok_with(
                    drivers,
                    format!("Driver information for {wanted} in {year} retrieved successfully"),
                ))
            }
            None => Ok(Outcome::ok_with(
                drivers,
                format!("Driver information for {year} retrieved successfully"),
            )),
        }
    }

    async fn team_info(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let year = Self::year(params)?;
        let entries = self.season_entries(year).await?;
        let mut teams: Vec<Value> = Vec::new();
        for (d, team) in &entries {
            let id = text_at(team, &["constructorId"]);
            let entry = json!({
                "driver_code": text_at(d, &["code"]),
                "full_name": full_name(d),
                "driver_number": text_at(d, &["permanentNumber"]),
            });
            match teams.iter_mut().find(|t| t["team_id"] == json!(id)) {
                Some(t) => {
                    if let Some(list) = t["drivers"].as_array_mut() {
                        list.push(entry);
                    }
                }
                None => teams.push(json!({
                    "team_id": id,
                    "team_name": text_at(team, &["name"]),
                    "nationality": text_at(team, &["nationality"]),
                    "drivers": [entry],
                })),
            }
        }

        let Some(wanted) = params.str("team") else {
            return Ok(Outcome::ok_with(
                teams,
                format!("Team information for {year} retrieved successfully"),
            ));
        };
        let w = wanted.to_lowercase();
        let available: Vec<String> = teams.iter().map(|t| text_at(t, &["team_name"])).collect();
        teams.retain(|t| {
            text_at(t, &["team_name"]).to_lowercase().contains(&w)
                || text_at(t, &["team_id"]).to_lowercase().contains(&w)
        });
        if teams.is_empty() {
            return Err(SkillsError::NoData(format!(
                "No information found for team '{wanted}' in {year}. Available teams: {}",
                available.join(", ")
            )));
        }
        Ok(Outcome::ok_with(
            teams,
            format!("Team information for {wanted} in {year} retrieved successfully"),
        ))
    }

    async fn pit_stops(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let year = Self::year(params)?;
        let (round, name) = self.resolve_event(year, params).await?;
        let stops_path = format!("{year}/{round}/pitstops");
        let results_path = format!("{year}/{round}/results");
        let (stops, results) = tokio::join!(
            self.mr_data(&stops_path, RESULTS_TTL_SECS),
            self.mr_data(&results_path, RESULTS_TTL_SECS),
        );
        let stops = stops?;
        let teams: BTreeMap<String, String> = match results {
            Ok(r) => array(first(&r, &["RaceTable", "Races"]), &["Results"])
                .iter()
                .map(|row| {
                    (
                        text_at(row, &["Driver", "driverId"]),
                        text_at(row, &["Constructor", "name"]),
                    )
                })
                .collect(),
            Err(_) => BTreeMap::new(),
        };
        let mut raw: Vec<Value> =
            array(first(&stops, &["RaceTable", "Races"]), &["PitStops"]).to_vec();
        if let Some(d) = params.str("driver") {
            let d = d.to_lowercase();
            raw.retain(|s| text_at(s, &["driverId"]).to_lowercase() == d);
        }
        Ok(Outcome::ok_with(
            pit_summary(&raw, &teams, &name),
            format!("Pit stop data for {year} {name} retrieved successfully"),
        ))
    }
}

#[async_trait]
impl Connector for F1Connector {
    fn module(&self) -> Module {
        Module::F1
    }

    async fn call(&self, command: &str, params: &Params) -> Outcome {
        let result = match command {
            "get_race_schedule" => self.race_schedule(params).await,
            "get_race_results" => self.race_results(params).await,
            "get_championship_standings" => self.standings(params).await,
            "get_driver_info" => self.driver_info(params).await,
            "get_team_info" => self.team_info(params).await,
            "get_pit_stops" => self.pit_stops(params).await,
            _ => return unknown_command(Module::F1, command),
        };
        result.unwrap_or_else(Outcome::from)
    }
}
