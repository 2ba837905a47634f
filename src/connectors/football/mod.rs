//! Football (soccer) across 30 competitions.
//!
//! ESPN is the primary source for fixtures, standings, teams and match
//! detail. Understat adds expected goals for the five big European leagues,
//! the Fantasy Premier League API adds availability and scorers for the
//! Premier League, and Transfermarkt adds market values and transfers when
//! a Transfermarkt player id is given. Seasons ESPN has nothing for fall
//! back to the openfootball archive where the competition is archived.

pub mod fpl;
pub mod leagues;
pub mod normalize;
pub mod openfootball;
pub mod transfermarkt;
pub mod understat;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::{unknown_command, CommandSpec, Connector, Module, Params};
use crate::espn::EspnApi;
use crate::http::{Request, Scope, UpstreamClient};
use crate::json::{array, at, first, is_truthy, text, text_at};
use crate::types::{Outcome, SkillsError};

use leagues::{
    by_espn, by_slug, names_match, resolve_competition, resolve_season, slugify, strip_urn,
    Competition, COMPETITIONS,
};
use normalize::MatchContext;
use openfootball::OpenFootballApi;
use transfermarkt::TransfermarktApi;
use understat::UnderstatApi;

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "get_current_season",
        "Current season of a competition",
        &["competition_id"],
        &[],
    ),
    CommandSpec::new("get_competitions", "Supported competitions with current seasons", &[], &[]),
    CommandSpec::new(
        "get_competition_seasons",
        "Seasons available for a competition",
        &["competition_id"],
        &[],
    ),
    CommandSpec::new("get_season_schedule", "Every match of a season", &["season_id"], &[]),
    CommandSpec::new("get_season_standings", "League table", &["season_id"], &[]),
    CommandSpec::new(
        "get_season_leaders",
        "Top scorers (Premier League only)",
        &["season_id"],
        &[],
    ),
    CommandSpec::new("get_season_teams", "Teams in a season", &["season_id"], &[]),
    CommandSpec::new(
        "search_team",
        "Find a team by name",
        &["query"],
        &["competition_id"],
    ),
    CommandSpec::new(
        "get_team_profile",
        "Team profile and squad",
        &["team_id"],
        &["league_slug"],
    ),
    CommandSpec::new(
        "get_daily_schedule",
        "All matches on a date",
        &[],
        &["date", "league"],
    ),
    CommandSpec::new(
        "get_event_summary",
        "Match header and score",
        &["event_id"],
        &["league_slug", "season_id"],
    ),
    CommandSpec::new(
        "get_event_lineups",
        "Starting lineups and substitutes",
        &["event_id"],
        &["league_slug", "season_id"],
    ),
    CommandSpec::new(
        "get_event_statistics",
        "Team match statistics",
        &["event_id"],
        &["league_slug", "season_id"],
    ),
    CommandSpec::new(
        "get_event_timeline",
        "Goals, cards and substitutions",
        &["event_id"],
        &["league_slug", "season_id"],
    ),
    CommandSpec::new(
        "get_event_xg",
        "Expected goals and shot map (Understat leagues)",
        &["event_id"],
        &["league_slug", "season_id"],
    ),
    CommandSpec::new(
        "get_event_players_statistics",
        "Player match statistics with xG where available",
        &["event_id"],
        &["league_slug", "season_id"],
    ),
    CommandSpec::new(
        "get_team_schedule",
        "Results and fixtures of a team",
        &["team_id"],
        &["league_slug", "season_year", "competition_id"],
    ),
    CommandSpec::new(
        "get_head_to_head",
        "Head-to-head history",
        &["team_id", "team_id_2"],
        &[],
    ),
    CommandSpec::new(
        "get_missing_players",
        "Injured, suspended and doubtful players (Premier League)",
        &[],
        &["season_id"],
    ),
    CommandSpec::new(
        "get_season_transfers",
        "Transfers of the given Transfermarkt players around a season",
        &["season_id"],
        &["tm_player_ids"],
    ),
    CommandSpec::new(
        "get_player_profile",
        "Player profile from FPL and Transfermarkt",
        &[],
        &["player_id", "fpl_id", "tm_player_id"],
    ),
    CommandSpec::new(
        "get_player_season_stats",
        "Per-match season game log",
        &["player_id"],
        &["league_slug"],
    ),
];

const UNDERSTAT_LEAGUES: &str = "EPL, La Liga, Bundesliga, Serie A, Ligue 1";

fn unknown_season(season_id: &str) -> SkillsError {
    SkillsError::InvalidInput(format!("Unknown season: {season_id}"))
}

fn unknown_competition(id: &str) -> SkillsError {
    SkillsError::InvalidInput(format!("Unknown competition: {id}"))
}

fn competition_info(c: &Competition) -> Value {
    json!({
        "id": c.slug,
        "name": c.name,
        "category": {"id": slugify(c.country), "name": c.country},
        "type": "LEAGUE",
    })
}

/// Season a competition's scoreboard reports as current.
#[derive(Debug, Clone, PartialEq)]
struct CurrentSeason {
    year: String,
    name: String,
    start_date: String,
    end_date: String,
    calendar_dates: usize,
}

impl CurrentSeason {
    fn from_scoreboard(data: &Value) -> Option<Self> {
        let league = first(data, &["leagues"]);
        let season = at(league, &["season"]);
        if !is_truthy(season) {
            return None;
        }
        Some(Self {
            year: text_at(season, &["year"]),
            name: text_at(season, &["displayName"]),
            start_date: text_at(season, &["startDate"]),
            end_date: text_at(season, &["endDate"]),
            calendar_dates: array(league, &["calendar"]).len(),
        })
    }
}

fn player_id_param(params: &Params, key: &str) -> Option<String> {
    params.str(key).map(|id| strip_urn(&id, &["player"]).to_string())
}

pub struct FootballConnector {
    espn: EspnApi,
    understat: UnderstatApi,
    transfermarkt: TransfermarktApi,
    archive: OpenFootballApi,
    client: Arc<UpstreamClient>,
}

impl FootballConnector {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self {
            espn: EspnApi::new(client.clone()),
            understat: UnderstatApi::new(client.clone()),
            transfermarkt: TransfermarktApi::new(client.clone()),
            archive: OpenFootballApi::new(client.clone()),
            client,
        }
    }

    async fn fpl_bootstrap(&self) -> Result<Value, SkillsError> {
        let req = Request::new(Scope::Fpl, fpl::BOOTSTRAP_URL).ttl_secs(fpl::BOOTSTRAP_TTL_SECS);
        Ok(self.client.get_json(&req).await?)
    }

    async fn detect_season(&self, c: &Competition) -> Option<CurrentSeason> {
        match self.espn.site(&c.sport_path(), "scoreboard", &[]).await {
            Ok(data) => CurrentSeason::from_scoreboard(&data),
            Err(e) => {
                debug!(competition = c.slug, error = %e, "Season detection failed");
                None
            }
        }
    }

    fn season_of(params: &Params) -> Result<(&'static Competition, i32, String), SkillsError> {
        let season_id = params.require("season_id")?;
        let (c, year) = resolve_season(&season_id).ok_or_else(|| unknown_season(&season_id))?;
        Ok((c, year, season_id))
    }

    async fn standings_data(&self, c: &Competition, year: i32) -> Result<Value, SkillsError> {
        Ok(self
            .espn
            .web(&c.sport_path(), "standings", &[("season", year.to_string())])
            .await?)
    }

    // -- competitions and seasons ------------------------------------------

    async fn current_season(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let id = params.require("competition_id")?;
        let c = resolve_competition(&id).ok_or_else(|| unknown_competition(&id))?;
        let season = self
            .detect_season(c)
            .await
            .ok_or_else(|| SkillsError::NoData("Could not detect current season".into()))?;
        Ok(Outcome::ok(json!({
            "competition": {"id": c.slug, "name": c.name},
            "season": {
                "id": c.season_id(&season.year),
                "name": season.name,
                "year": season.year,
                "start_date": season.start_date,
                "end_date": season.end_date,
            },
            "calendar_dates": season.calendar_dates,
        })))
    }

    async fn competitions(&self) -> Result<Outcome, SkillsError> {
        let seasons = join_all(COMPETITIONS.iter().map(|c| self.detect_season(c))).await;
        let competitions: Vec<Value> = COMPETITIONS
            .iter()
            .zip(seasons)
            .map(|(c, season)| {
                let mut info = competition_info(c);
                if let Some(s) = season {
                    info["current_season"] = json!({
                        "year": s.year,
                        "start_date": s.start_date,
                        "end_date": s.end_date,
                    });
                }
                info
            })
            .collect();
        Ok(Outcome::ok(json!({ "competitions": competitions })))
    }

    /// Seasons listed by the standings endpoint, or the detected current
    /// season when standings are unavailable.
    async fn competition_seasons(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let id = params.require("competition_id")?;
        let c = resolve_competition(&id).ok_or_else(|| unknown_competition(&id))?;
        let season_entry = |year: &str, name: &str, start: &str, end: &str| {
            json!({
                "id": c.season_id(year),
                "name": if name.is_empty() { year } else { name },
                "year": year,
                "start_date": start,
                "end_date": end,
                "current_matchday": null,
            })
        };

        let seasons: Vec<Value> = match self.espn.web(&c.sport_path(), "standings", &[]).await {
            Ok(data) => array(&data, &["seasons"])
                .iter()
                .map(|s| {
                    season_entry(
                        &text_at(s, &["year"]),
                        &text_at(s, &["displayName"]),
                        &text_at(s, &["startDate"]),
                        &text_at(s, &["endDate"]),
                    )
                })
                .collect(),
            Err(e) => {
                debug!(
                    competition = c.slug,
                    error = %e,
                    "Standings unavailable, using current season"
                );
                self.detect_season(c)
                    .await
                    .map(|s| vec![season_entry(&s.year, &s.name, &s.start_date, &s.end_date)])
                    .unwrap_or_default()
            }
        };
        Ok(Outcome::ok(json!({
            "competition": competition_info(c),
            "seasons": seasons,
        })))
    }

    /// Every match of a season from ESPN, or from the archive when ESPN
    /// fails or has none.
    async fn season_schedule(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let (c, year, _) = Self::season_of(params)?;
        let espn = self.espn_season_schedule(c, year).await;
        if espn.as_ref().map_or(true, |events| events.is_empty()) {
            if let Some(data) = self.archive.season(c, year).await {
                info!(competition = c.slug, year, "Season schedule from openfootball");
                return Ok(Outcome::ok(json!({
                    "schedules": openfootball::schedule(&data, c, year),
                    "source": openfootball::SOURCE,
                })));
            }
        }
        Ok(Outcome::ok(json!({ "schedules": espn? })))
    }

    /// Assembled from each team's schedule. Stops early once a full double
    /// round-robin has been collected.
    async fn espn_season_schedule(
        &self,
        c: &'static Competition,
        year: i32,
    ) -> Result<Vec<Value>, SkillsError> {
        let team_ids: Vec<String> = match self.standings_data(c, year).await {
            Ok(data) => normalize::standings_teams(&data)
                .iter()
                .map(|t| text_at(t, &["id"]))
                .collect(),
            Err(e) => {
                debug!(competition = c.slug, error = %e, "No standings for season schedule");
                Vec::new()
            }
        };

        if team_ids.is_empty() {
            let data = self.espn.site(&c.sport_path(), "scoreboard", &[]).await?;
            return Ok(array(&data, &["events"])
                .iter()
                .map(|e| normalize::event(e, Some(c)))
                .collect());
        }

        let expected = team_ids.len() * (team_ids.len() - 1);
        let mut seen = HashSet::new();
        let mut events = Vec::new();
        for tid in &team_ids {
            let resource = format!("teams/{tid}/schedule");
            match self
                .espn
                .site(&c.sport_path(), &resource, &[("season", year.to_string())])
                .await
            {
                Ok(data) => {
                    for e in array(&data, &["events"]) {
                        let id = text_at(e, &["id"]);
                        if !id.is_empty() && seen.insert(id) {
                            events.push(normalize::event(e, Some(c)));
                        }
                    }
                }
                Err(e) => debug!(team_id = %tid, error = %e, "Team schedule unavailable"),
            }
            if events.len() >= expected {
                break;
            }
        }
        events.sort_by_key(|e| text_at(e, &["start_time"]));
        Ok(events)
    }

    /// ESPN standings, or a table computed from archived results when ESPN
    /// fails or has no groups.
    async fn season_standings(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let (c, year, _) = Self::season_of(params)?;
        let espn = self.standings_data(c, year).await.map(|d| normalize::standings(&d));
        if let Ok(groups) = &espn {
            if groups.iter().any(|g| !array(g, &["entries"]).is_empty()) {
                return Ok(Outcome::ok(json!({ "standings": groups })));
            }
        }
        if let Some(data) = self.archive.season(c, year).await {
            let entries = openfootball::standings(&data)?;
            if !entries.is_empty() {
                info!(competition = c.slug, year, "Standings computed from openfootball");
                return Ok(Outcome::ok(json!({
                    "standings": [{"name": c.name, "type": "TOTAL", "entries": entries}],
                    "source": openfootball::SOURCE,
                })));
            }
        }
        Ok(Outcome::ok(json!({ "standings": espn? })))
    }

    async fn season_leaders(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let (c, _, _) = Self::season_of(params)?;
        if !c.fpl {
            return Ok(Outcome::ok_with(
                json!({ "leaders": [] }),
                "Season leaders available for Premier League only (via FPL)",
            ));
        }
        let bootstrap = self.fpl_bootstrap().await?;
        Ok(Outcome::ok(json!({ "leaders": fpl::leaders(&bootstrap) })))
    }

    async fn season_teams(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let (c, year, _) = Self::season_of(params)?;
        let espn = self.standings_data(c, year).await.map(|d| normalize::standings_teams(&d));
        if let Ok(teams) = &espn {
            if !teams.is_empty() {
                return Ok(Outcome::ok(json!({ "teams": teams })));
            }
        }
        if let Some(data) = self.archive.season(c, year).await {
            let teams = openfootball::teams(&data);
            if !teams.is_empty() {
                return Ok(Outcome::ok(json!({
                    "teams": teams,
                    "source": openfootball::SOURCE,
                })));
            }
        }
        Ok(Outcome::ok(json!({ "teams": espn? })))
    }

    async fn teams_matching(&self, c: &'static Competition, query: &str) -> Vec<Value> {
        let Some(season) = self.detect_season(c).await else {
            return Vec::new();
        };
        let Ok(year) = season.year.parse::<i32>() else {
            return Vec::new();
        };
        let data = match self.standings_data(c, year).await {
            Ok(data) => data,
            Err(e) => {
                debug!(competition = c.slug, error = %e, "No teams for search");
                return Vec::new();
            }
        };
        normalize::standings_teams(&data)
            .into_iter()
            .filter(|t| names_match(query, &text_at(t, &["name"])))
            .map(|t| {
                json!({
                    "team": t,
                    "competition": {"id": c.slug, "name": c.name},
                    "season": {"id": c.season_id(year), "year": season.year},
                })
            })
            .collect()
    }

    async fn search_team(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let query = params.require("query")?;
        let scope: Vec<&'static Competition> = match params.str("competition_id") {
            Some(id) => vec![resolve_competition(&id).ok_or_else(|| unknown_competition(&id))?],
            None => COMPETITIONS.iter().collect(),
        };
        let lookups = scope.into_iter().map(|c| self.teams_matching(c, &query));
        let results: Vec<Value> = join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .collect();
        Ok(Outcome::ok(json!({ "results": results })))
    }

    // -- teams -------------------------------------------------------------

    /// Competitions to try for a team: the hinted one, or all of them.
    fn team_leagues(params: &Params) -> Vec<&'static Competition> {
        params
            .str("league_slug")
            .and_then(|s| resolve_competition(&s))
            .map(|c| vec![c])
            .unwrap_or_else(|| COMPETITIONS.iter().collect())
    }

    async fn site_for(
        &self,
        c: &Competition,
        resource: &str,
        query: &[(&str, String)],
        single_try: bool,
    ) -> Option<Value> {
        let result = if single_try {
            self.espn.site_once(&c.sport_path(), resource, query).await
        } else {
            self.espn.site(&c.sport_path(), resource, query).await
        };
        match result {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(competition = c.slug, resource, error = %e, "ESPN lookup missed");
                None
            }
        }
    }

    async fn team_profile(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let tid = strip_urn(&params.require("team_id")?, &["team"]).to_string();
        let candidates = Self::team_leagues(params);
        let single_try = candidates.len() > 1;

        for c in candidates {
            let Some(data) = self.site_for(c, &format!("teams/{tid}"), &[], single_try).await else {
                continue;
            };
            let team = match at(&data, &["team"]) {
                Value::Null => &data,
                t => t,
            };
            if text_at(team, &["id"]).is_empty() && text_at(team, &["displayName"]).is_empty() {
                continue;
            }
            let roster_path = format!("teams/{tid}/roster");
            let mut players = match self.site_for(c, &roster_path, &[], false).await {
                Some(roster) => roster_players(&roster),
                None => Vec::new(),
            };
            if c.fpl && !players.is_empty() {
                match self.fpl_bootstrap().await {
                    Ok(bootstrap) => enrich_from_fpl(&mut players, &bootstrap),
                    Err(e) => debug!(error = %e, "FPL enrichment skipped"),
                }
            }
            return Ok(Outcome::ok(json!({
                "team": normalize::team(team),
                "competition": {"id": c.slug, "name": c.name},
                "players": players,
                "manager": {},
                "venue": {
                    "id": text_at(team, &["venue", "id"]),
                    "name": text_at(team, &["venue", "fullName"]),
                },
            })));
        }
        Err(SkillsError::NoData(format!("Team not found: {tid}")))
    }

    /// Past results merged with upcoming fixtures, which ESPN only returns
    /// with `fixture=true`.
    async fn team_schedule(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let tid = strip_urn(&params.require("team_id")?, &["team"]).to_string();
        let filter = match params.str("competition_id") {
            Some(id) => Some(resolve_competition(&id).ok_or_else(|| unknown_competition(&id))?),
            None => None,
        };
        let season: Vec<(&str, String)> = params
            .str("season_year")
            .map(|y| vec![("season", y)])
            .unwrap_or_default();
        let mut with_fixtures = season.clone();
        with_fixtures.push(("fixture", "true".to_string()));

        let candidates = Self::team_leagues(params);
        let single_try = candidates.len() > 1;
        let resource = format!("teams/{tid}/schedule");

        for c in candidates {
            let Some(results) = self.site_for(c, &resource, &season, single_try).await else {
                continue;
            };
            let mut raw: Vec<Value> = array(&results, &["events"]).to_vec();
            if let Some(fixtures) = self.site_for(c, &resource, &with_fixtures, single_try).await {
                let mut seen: HashSet<String> = raw.iter().map(|e| text_at(e, &["id"])).collect();
                raw.extend(
                    array(&fixtures, &["events"])
                        .iter()
                        .filter(|e| seen.insert(text_at(e, &["id"])))
                        .cloned(),
                );
            }
            if raw.is_empty() {
                continue;
            }
            let mut events: Vec<Value> = raw
                .iter()
                .map(|e| normalize::event(e, Some(c)))
                .filter(|e| filter.map_or(true, |f| text_at(e, &["competition", "id"]) == f.slug))
                .collect();
            events.sort_by_key(|e| text_at(e, &["start_time"]));
            let team = events
                .first()
                .and_then(|e| {
                    array(e, &["competitors"])
                        .iter()
                        .find(|comp| text_at(comp, &["team", "id"]) == tid)
                })
                .map(|comp| at(comp, &["team"]).clone())
                .unwrap_or_else(|| json!({}));
            return Ok(Outcome::ok(json!({"team": team, "events": events})));
        }
        Ok(Outcome::ok_with(
            json!({"team": {}, "events": []}),
            "Team schedule not found",
        ))
    }

    async fn daily_schedule(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let date = match params.str("date") {
            Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|_| {
                SkillsError::InvalidInput(format!(
                    "Invalid value for --date: expected YYYY-MM-DD, got {d}"
                ))
            })?,
            None => Utc::now().date_naive(),
        };
        let scope: Vec<&'static Competition> = match params.str("league") {
            Some(id) => vec![resolve_competition(&id).ok_or_else(|| unknown_competition(&id))?],
            None => COMPETITIONS.iter().collect(),
        };
        let query = [("dates", date.format("%Y%m%d").to_string())];
        let boards =
            join_all(scope.iter().map(|c| self.site_for(c, "scoreboard", &query, false))).await;

        let mut seen = HashSet::new();
        let mut events = Vec::new();
        for (c, board) in scope.iter().copied().zip(boards) {
            for e in board.iter().flat_map(|b| array(b, &["events"])) {
                if seen.insert(text_at(e, &["id"])) {
                    events.push(normalize::event(e, Some(c)));
                }
            }
        }
        let day = date.format("%Y-%m-%d").to_string();
        if events.is_empty() {
            events = self.archived_matches_on(&scope, date, &day).await;
        }
        Ok(Outcome::ok(json!({
            "date": day,
            "events": events,
        })))
    }

    /// Matches on `date` from the openfootball season of each archived
    /// competition in `scope`.
    async fn archived_matches_on(
        &self,
        scope: &[&'static Competition],
        date: NaiveDate,
        day: &str,
    ) -> Vec<Value> {
        let seasons = scope
            .iter()
            .filter_map(|c| openfootball::season_year(c, date).map(|year| (*c, year)));
        let found = join_all(seasons.map(|(c, year)| async move {
            match self.archive.season(c, year).await {
                Some(data) => openfootball::on_date(&data, c, year, day),
                None => Vec::new(),
            }
        }))
        .await;
        found.into_iter().flatten().collect()
    }

    // -- events ------------------------------------------------------------

    /// Competition an event belongs to: an explicit league hint, the season
    /// id, or failing both a single-attempt lookup in every competition.
    async fn resolve_event(
        &self,
        params: &Params,
    ) -> Result<(&'static Competition, String), SkillsError> {
        let event_id = strip_urn(&params.require("event_id")?, &["event"]).to_string();
        let hinted = params
            .str("league_slug")
            .or_else(|| params.str("competition_id"))
            .and_then(|s| resolve_competition(&s))
            .or_else(|| {
                params
                    .str("season_id")
                    .and_then(|s| resolve_season(&s))
                    .map(|(c, _)| c)
            });
        if let Some(c) = hinted {
            return Ok((c, event_id));
        }
        for c in COMPETITIONS {
            let Some(summary) = self.espn.summary_once(&c.sport_path(), &event_id).await else {
                continue;
            };
            if !is_truthy(at(&summary, &["header"])) {
                continue;
            }
            let actual = by_espn(&text_at(&summary, &["header", "league", "slug"])).unwrap_or(c);
            info!(event_id = %event_id, competition = actual.slug, "Resolved event by search");
            return Ok((actual, event_id));
        }
        Err(SkillsError::NoData(format!("Could not resolve event {event_id}")))
    }

    async fn event_summary_data(
        &self,
        params: &Params,
    ) -> Result<(&'static Competition, String, Value), SkillsError> {
        let (c, event_id) = self.resolve_event(params).await?;
        let summary = self
            .espn
            .summary(&c.sport_path(), &event_id)
            .await
            .ok_or_else(|| SkillsError::NoData(format!("Could not resolve event {event_id}")))?;
        Ok((c, event_id, summary))
    }

    async fn event_summary(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let (_, event_id, summary) = self.event_summary_data(params).await?;
        if !is_truthy(at(&summary, &["header"])) {
            return Err(SkillsError::NoData(format!("Could not resolve event {event_id}")));
        }
        Ok(Outcome::ok(json!({
            "event": normalize::event_from_summary(&summary, &event_id),
            "statistics": {},
        })))
    }

    async fn event_section(
        &self,
        params: &Params,
        key: &str,
        section: fn(&Value) -> Vec<Value>,
    ) -> Result<Outcome, SkillsError> {
        let (_, _, summary) = self.event_summary_data(params).await?;
        Ok(Outcome::ok(json!({ key: section(&summary) })))
    }

    async fn event_xg(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let (c, event_id, summary) = self.event_summary_data(params).await?;
        let empty = |message: String| {
            Outcome::ok_with(
                json!({"event_id": event_id, "teams": [], "shots": []}),
                message,
            )
        };
        let ctx = MatchContext::from_summary(&summary, c.espn);
        if ctx.competition.and_then(|c| c.understat).is_none() {
            return Ok(empty(format!(
                "xG data not available for {}. Understat covers: {UNDERSTAT_LEAGUES}",
                c.slug
            )));
        }
        let Some(match_id) = self.understat.find_match_id(&ctx).await else {
            return Ok(empty("Match not found on Understat".into()));
        };
        let Some(data) = self.understat.match_data(&match_id).await else {
            return Ok(empty("Could not fetch Understat data".into()));
        };
        let mut out = understat::normalize_xg(&data.shots, &data.match_info);
        out["event_id"] = json!(event_id);
        out["source"] = json!("understat");
        Ok(Outcome::ok(out))
    }

    async fn event_players(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let (c, event_id, summary) = self.event_summary_data(params).await?;
        let mut teams = normalize::player_statistics(&summary);
        if teams.is_empty() {
            return Ok(Outcome::ok_with(
                json!({"event_id": event_id, "teams": []}),
                "Player statistics not available",
            ));
        }
        let ctx = MatchContext::from_summary(&summary, c.espn);
        if ctx.competition.and_then(|c| c.understat).is_some() {
            if let Some(match_id) = self.understat.find_match_id(&ctx).await {
                if let Some(data) = self.understat.match_data(&match_id).await {
                    let ustat = understat::normalize_players(&data.rosters, &data.match_info);
                    understat::merge_player_xg(&mut teams, &ustat);
                }
            }
        }
        Ok(Outcome::ok(json!({"event_id": event_id, "teams": teams})))
    }

    // -- players -----------------------------------------------------------

    async fn missing_players(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let season_id = match params.str("season_id") {
            Some(id) => id,
            None => {
                let pl = by_slug("premier-league")
                    .ok_or_else(|| unknown_competition("premier-league"))?;
                let year = match self.detect_season(pl).await {
                    Some(s) => s.year,
                    None => Utc::now().year().to_string(),
                };
                pl.season_id(year)
            }
        };
        let (c, _) = resolve_season(&season_id).ok_or_else(|| unknown_season(&season_id))?;
        if !c.fpl {
            return Ok(Outcome::ok_with(
                json!({"season_id": season_id, "teams": []}),
                "Missing player data only available for Premier League (via FPL)",
            ));
        }
        let bootstrap = self.fpl_bootstrap().await?;
        Ok(Outcome::ok(fpl::missing_players(&bootstrap, &season_id)))
    }

    async fn season_transfers(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let season_id = params.require("season_id")?;
        let ids = params.list("tm_player_ids");
        if ids.is_empty() {
            return Ok(Outcome::ok_with(
                json!({"season_id": season_id, "transfers": []}),
                "Transfers require tm_player_ids parameter (list of Transfermarkt player IDs)",
            ));
        }
        let year = resolve_season(&season_id).map(|(_, y)| y);
        let mut transfers = Vec::new();
        for id in ids.iter().take(transfermarkt::MAX_PLAYERS) {
            let Some(history) = self.transfermarkt.transfer_history(id).await else {
                continue;
            };
            transfers.extend(
                transfermarkt::transfer_records(&history)
                    .iter()
                    .map(|t| transfermarkt::transfer(t, id))
                    .filter(|t| {
                        year.map_or(true, |y| {
                            transfermarkt::near_season(&text_at(t, &["date"]), y)
                        })
                    }),
            );
        }
        Ok(Outcome::ok(json!({"season_id": season_id, "transfers": transfers})))
    }

    async fn player_profile(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let player_id = player_id_param(params, "player_id");
        let fpl_id = player_id_param(params, "fpl_id");
        let tm_id = params.str("tm_player_id");
        if player_id.is_none() && fpl_id.is_none() && tm_id.is_none() {
            return Err(SkillsError::InvalidInput(
                "Provide player_id, fpl_id, or tm_player_id".into(),
            ));
        }

        let mut player = json!({});
        if let Some(id) = fpl_id.or(player_id) {
            match self.fpl_bootstrap().await {
                Ok(bootstrap) => {
                    if let Some(p) = fpl::find_player(&bootstrap, &id) {
                        player = fpl::profile(p, &fpl::team_map(&bootstrap));
                    }
                }
                Err(e) => debug!(error = %e, "FPL lookup skipped"),
            }
        }

        if let Some(tm_id) = tm_id {
            if let Some(values) = self.transfermarkt.market_values(&tm_id).await {
                let points = transfermarkt::value_points(&values);
                if let Some(last) = points.last() {
                    player["market_value"] = transfermarkt::market_value(last);
                    player["market_value_history"] =
                        points.iter().map(transfermarkt::market_value).collect();
                }
            }
            if let Some(history) = self.transfermarkt.transfer_history(&tm_id).await {
                let records = transfermarkt::transfer_records(&history);
                if !records.is_empty() {
                    player["transfer_history"] = records
                        .iter()
                        .map(|t| transfermarkt::transfer(t, &tm_id))
                        .collect();
                }
            }
        }

        if !is_truthy(&player) {
            return Err(SkillsError::NoData(
                "Player not found. Provide player_id, fpl_id, or tm_player_id.".into(),
            ));
        }
        Ok(Outcome::ok(json!({ "player": player })))
    }

    async fn player_season_stats(&self, params: &Params) -> Result<Outcome, SkillsError> {
        let player_id = params.require("player_id")?;
        let league = params.str_or("league_slug", "eng.1");
        let espn_league = resolve_competition(&league).map(|c| c.espn).unwrap_or(league.as_str());
        let data = self
            .espn
            .common(
                &format!("soccer/{espn_league}"),
                &format!("athletes/{player_id}/overview"),
                &[],
            )
            .await?;
        Ok(season_game_log(&data, &player_id, espn_league))
    }
}

fn roster_players(roster: &Value) -> Vec<Value> {
    array(roster, &["athletes"])
        .iter()
        .map(|a| {
            json!({
                "id": text_at(a, &["id"]),
                "name": text_at(a, &["displayName"]),
                "position": text_at(a, &["position", "displayName"]),
                "shirt_number": text_at(a, &["jersey"]),
                "age": at(a, &["age"]),
                "nationality": text_at(a, &["citizenship"]),
            })
        })
        .collect()
}

fn enrich_from_fpl(players: &mut [Value], bootstrap: &Value) {
    for p in players.iter_mut() {
        if let Some(element) = fpl::find_by_name(bootstrap, &text_at(p, &["name"])) {
            p["fpl_data"] = fpl::enrichment(element);
        }
    }
}

/// Per-match stat rows from an athlete overview `gameLog`.
fn season_game_log(data: &Value, player_id: &str, league: &str) -> Outcome {
    let log = at(data, &["gameLog"]);
    let block = first(log, &["statistics"]);
    if !is_truthy(block) {
        return Outcome::ok_with(
            json!({"player_id": player_id, "league": league, "matches": []}),
            "No season statistics available for this player.",
        );
    }
    let labels: Vec<String> = array(block, &["labels"]).iter().map(text).collect();
    let names: Vec<String> = array(block, &["names"]).iter().map(text).collect();
    let display: Vec<String> = array(block, &["displayNames"]).iter().map(text).collect();

    let matches: Vec<Value> = array(block, &["events"])
        .iter()
        .map(|ev| {
            let event_id = text_at(ev, &["eventId"]);
            let stats: serde_json::Map<String, Value> = array(ev, &["stats"])
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let key = names
                        .get(i)
                        .or_else(|| labels.get(i))
                        .cloned()
                        .unwrap_or_else(|| format!("stat_{i}"));
                    (key, v.clone())
                })
                .collect();
            let mut entry = json!({"event_id": event_id, "stats": stats});
            let link = array(log, &["events", event_id.as_str(), "links"])
                .iter()
                .find(|l| array(l, &["rel"]).iter().any(|r| *r == "summary"))
                .map(|l| text_at(l, &["href"]));
            if let Some(href) = link {
                entry["link"] = json!(href);
            }
            entry
        })
        .collect();

    Outcome::ok(json!({
        "player_id": player_id,
        "league": league,
        "stat_columns": labels,
        "stat_names": names,
        "stat_display_names": display,
        "count": matches.len(),
        "matches": matches,
    }))
}

#[async_trait]
impl Connector for FootballConnector {
    fn module(&self) -> Module {
        Module::Football
    }

    async fn call(&self, command: &str, params: &Params) -> Outcome {
        let result = match command {
            "get_current_season" => self.current_season(params).await,
            "get_competitions" => self.competitions().await,
            "get_competition_seasons" => self.competition_seasons(params).await,
            "get_season_schedule" => self.season_schedule(params).await,
            "get_season_standings" => self.season_standings(params).await,
            "get_season_leaders" => self.season_leaders(params).await,
            "get_season_teams" => self.season_teams(params).await,
            "search_team" => self.search_team(params).await,
            "get_team_profile" => self.team_profile(params).await,
            "get_daily_schedule" => self.daily_schedule(params).await,
            "get_event_summary" => self.event_summary(params).await,
            "get_event_lineups" => self.event_section(params, "lineups", normalize::lineups).await,
            "get_event_statistics" => {
                self.event_section(params, "teams", normalize::team_statistics).await
            }
            "get_event_timeline" => {
                self.event_section(params, "timeline", normalize::timeline).await
            }
            "get_event_xg" => self.event_xg(params).await,
            "get_event_players_statistics" => self.event_players(params).await,
            "get_team_schedule" => self.team_schedule(params).await,
            "get_head_to_head" => Ok(Outcome::ok_with(
                json!({"teams": [], "events": []}),
                "Head-to-head history is unavailable. \
                 Use get_team_schedule for both teams and compare.",
            )),
            "get_missing_players" => self.missing_players(params).await,
            "get_season_transfers" => self.season_transfers(params).await,
            "get_player_profile" => self.player_profile(params).await,
            "get_player_season_stats" => self.player_season_stats(params).await,
            _ => return unknown_command(Module::Football, command),
        };
        result.unwrap_or_else(Outcome::from)
    }
}
