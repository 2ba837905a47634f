//! ESPN-backed league connector.
//!
//! One `LeagueConnector` per league (NFL, NBA, WNBA, NHL, MLB, college
//! football, men's college basketball). The leagues share endpoints and
//! shaping and differ only in sport path, play-by-play layout, season
//! calendar and a handful of extra params (weeks, polls).

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::debug;

use super::{unknown_command, CommandSpec, Connector, Module, Params};
use crate::espn::normalize::{
    futures_refs, leader_refs, normalize_core_stats, normalize_depth_chart, normalize_futures,
    normalize_injuries, normalize_leaders, normalize_odds, normalize_transactions,
    DEFAULT_FUTURES_LIMIT,
};
use crate::espn::plays::{normalize_plays, normalize_win_probability, PlayLayout};
use crate::espn::{shape, EspnApi};
use crate::json::{array, at, first, or_empty, text_at};
use crate::types::{Outcome, SkillsError};

// ---------------------------------------------------------------------------
// Leagues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum League {
    Nfl,
    Nba,
    Wnba,
    Nhl,
    Mlb,
    Cfb,
    Cbb,
}

/// Unified NFL weeks 19..=23 are ESPN postseason weeks 1..=5
/// (wild card, divisional, conference, Pro Bowl, Super Bowl).
const NFL_POSTSEASON_FIRST_WEEK: i64 = 19;

/// College team lists are paged; ask for all of them at once.
const COLLEGE_TEAMS_LIMIT: u32 = 1000;

impl League {
    pub const ALL: [League; 7] = [
        League::Nfl,
        League::Nba,
        League::Wnba,
        League::Nhl,
        League::Mlb,
        League::Cfb,
        League::Cbb,
    ];

    pub fn module(&self) -> Module {
        match self {
            League::Nfl => Module::Nfl,
            League::Nba => Module::Nba,
            League::Wnba => Module::Wnba,
            League::Nhl => Module::Nhl,
            League::Mlb => Module::Mlb,
            League::Cfb => Module::Cfb,
            League::Cbb => Module::Cbb,
        }
    }

    pub fn sport_path(&self) -> &'static str {
        match self {
            League::Nfl => "football/nfl",
            League::Nba => "basketball/nba",
            League::Wnba => "basketball/wnba",
            League::Nhl => "hockey/nhl",
            League::Mlb => "baseball/mlb",
            League::Cfb => "football/college-football",
            League::Cbb => "basketball/mens-college-basketball",
        }
    }

    pub fn layout(&self) -> PlayLayout {
        match self {
            League::Nfl | League::Cfb => PlayLayout::Drives,
            League::Mlb => PlayLayout::Innings,
            League::Nba | League::Wnba | League::Nhl | League::Cbb => PlayLayout::Flat,
        }
    }

    pub fn is_college(&self) -> bool {
        matches!(self, League::Cfb | League::Cbb)
    }

    /// Leagues scheduled by week rather than by date.
    pub fn uses_weeks(&self) -> bool {
        matches!(self, League::Nfl | League::Cfb)
    }

    fn season_start_month(&self) -> u32 {
        match self {
            League::Nfl => 9,
            League::Cfb => 8,
            League::Nba | League::Nhl => 10,
            League::Cbb => 11,
            League::Wnba => 5,
            League::Mlb => 4,
        }
    }

    /// Season year in progress on `today`; before the league's opening month
    /// the previous season is still the most recent one.
    pub fn current_season(&self, today: NaiveDate) -> i32 {
        if today.month() >= self.season_start_month() {
            today.year()
        } else {
            today.year() - 1
        }
    }

    pub fn commands(&self) -> &'static [CommandSpec] {
        match self {
            League::Nfl => NFL_COMMANDS,
            League::Cfb => CFB_COMMANDS,
            League::Cbb => CBB_COMMANDS,
            League::Nba | League::Wnba | League::Nhl | League::Mlb => PRO_COMMANDS,
        }
    }
}

/// ESPN query params for a unified week number.
pub fn week_params(league: League, week: i64) -> Vec<(&'static str, String)> {
    if league == League::Nfl && week >= NFL_POSTSEASON_FIRST_WEEK {
        return vec![
            ("seasontype", "3".to_string()),
            ("week", (week - NFL_POSTSEASON_FIRST_WEEK + 1).to_string()),
        ];
    }
    vec![("week", week.to_string())]
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

const STANDINGS: CommandSpec =
    CommandSpec::new("get_standings", "Standings by conference and division", &[], &["season"]);
const TEAMS: CommandSpec = CommandSpec::new("get_teams", "All teams in the league", &[], &[]);
const ROSTER: CommandSpec =
    CommandSpec::new("get_team_roster", "Team roster", &["team_id"], &[]);
const TEAM_SCHEDULE: CommandSpec =
    CommandSpec::new("get_team_schedule", "A team's season schedule", &["team_id"], &["season"]);
const SUMMARY: CommandSpec = CommandSpec::new(
    "get_game_summary",
    "Box score, scoring plays and leaders for a game",
    &["event_id"],
    &[],
);
const LEADERS: CommandSpec =
    CommandSpec::new("get_leaders", "Statistical leaders for a season", &[], &["season"]);
const NEWS: CommandSpec = CommandSpec::new("get_news", "League or team news", &[], &["team_id"]);
const INJURIES: CommandSpec =
    CommandSpec::new("get_injuries", "Current injury report by team", &[], &[]);
const TRANSACTIONS: CommandSpec =
    CommandSpec::new("get_transactions", "Recent signings, trades and releases", &[], &[]);
const DEPTH_CHART: CommandSpec =
    CommandSpec::new("get_depth_chart", "Team depth chart", &["team_id"], &[]);
const PLAY_BY_PLAY: CommandSpec = CommandSpec::new(
    "get_play_by_play",
    "Play-by-play for a game, most recent last",
    &["event_id"],
    &["limit"],
);
const WIN_PROBABILITY: CommandSpec = CommandSpec::new(
    "get_win_probability",
    "Win probability after each play",
    &["event_id"],
    &[],
);
const FUTURES: CommandSpec = CommandSpec::new(
    "get_futures",
    "Futures markets (champion, awards)",
    &[],
    &["season", "limit"],
);
const TEAM_STATS: CommandSpec =
    CommandSpec::new("get_team_stats", "Season team statistics", &["team_id"], &["season"]);
const PLAYER_STATS: CommandSpec = CommandSpec::new(
    "get_player_stats",
    "Season player statistics",
    &["player_id"],
    &["season"],
);
const ODDS: CommandSpec =
    CommandSpec::new("get_odds", "Betting lines for a game", &["event_id"], &[]);

const NFL_COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("get_scoreboard", "Live and recent scores", &[], &["date", "week"]),
    STANDINGS,
    TEAMS,
    ROSTER,
    TEAM_SCHEDULE,
    SUMMARY,
    LEADERS,
    NEWS,
    CommandSpec::new("get_schedule", "Season schedule by week", &[], &["season", "week"]),
    INJURIES,
    TRANSACTIONS,
    DEPTH_CHART,
    PLAY_BY_PLAY,
    WIN_PROBABILITY,
    FUTURES,
    TEAM_STATS,
    PLAYER_STATS,
    ODDS,
];

const PRO_COMMANDS: &[CommandSpec] = &[
    CommandSpec::new("get_scoreboard", "Live and recent scores", &[], &["date"]),
    STANDINGS,
    TEAMS,
    ROSTER,
    TEAM_SCHEDULE,
    SUMMARY,
    LEADERS,
    NEWS,
    CommandSpec::new("get_schedule", "Schedule for a date or season", &[], &["date", "season"]),
    INJURIES,
    TRANSACTIONS,
    DEPTH_CHART,
    PLAY_BY_PLAY,
    WIN_PROBABILITY,
    FUTURES,
    TEAM_STATS,
    PLAYER_STATS,
    ODDS,
];

const RANKINGS: CommandSpec = CommandSpec::new(
    "get_rankings",
    "Poll rankings (AP, Coaches, CFP)",
    &[],
    &["season", "week"],
);

const CFB_COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "get_scoreboard",
        "Live and recent scores",
        &[],
        &["date", "week", "group", "limit"],
    ),
    STANDINGS,
    TEAMS,
    ROSTER,
    TEAM_SCHEDULE,
    SUMMARY,
    LEADERS,
    NEWS,
    CommandSpec::new("get_schedule", "Season schedule by week", &[], &["season", "week", "group"]),
    RANKINGS,
    INJURIES,
    TRANSACTIONS,
    DEPTH_CHART,
    PLAY_BY_PLAY,
    WIN_PROBABILITY,
    FUTURES,
    TEAM_STATS,
    PLAYER_STATS,
    ODDS,
];

const CBB_COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(
        "get_scoreboard",
        "Live and recent scores",
        &[],
        &["date", "group", "limit"],
    ),
    STANDINGS,
    TEAMS,
    ROSTER,
    TEAM_SCHEDULE,
    SUMMARY,
    LEADERS,
    NEWS,
    CommandSpec::new(
        "get_schedule",
        "Schedule for a date or season",
        &[],
        &["date", "season", "group"],
    ),
    RANKINGS,
    INJURIES,
    TRANSACTIONS,
    DEPTH_CHART,
    PLAY_BY_PLAY,
    WIN_PROBABILITY,
    FUTURES,
    TEAM_STATS,
    PLAYER_STATS,
    ODDS,
];

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct LeagueConnector {
    league: League,
    espn: EspnApi,
}

type Query = Vec<(&'static str, String)>;

impl LeagueConnector {
    pub fn new(league: League, espn: EspnApi) -> Self {
        Self { league, espn }
    }

    fn path(&self) -> &'static str {
        self.league.sport_path()
    }

    fn season_or_current(&self, params: &Params) -> Result<i64, SkillsError> {
        let current = self.league.current_season(Utc::now().date_naive());
        params.int_or("season", current as i64)
    }

    fn week_query(&self, params: &Params) -> Result<Query, SkillsError> {
        Ok(match params.int("week")? {
            Some(w) if w > 0 && self.league.uses_weeks() => week_params(self.league, w),
            _ => Vec::new(),
        })
    }

    fn college_query(&self, params: &Params, with_limit: bool) -> Result<Query, SkillsError> {
        let mut q = Query::new();
        if !self.league.is_college() {
            return Ok(q);
        }
        if let Some(group) = params.str("group") {
            q.push(("groups", group));
        }
        if with_limit {
            if let Some(limit) = params.int("limit")? {
                q.push(("limit", limit.to_string()));
            }
        }
        Ok(q)
    }

    async fn scoreboard(&self, params: &Params) -> Result<Value, SkillsError> {
        let mut q = Query::new();
        if let Some(date) = params.str("date") {
            q.push(("dates", date.replace('-', "")));
        }
        q.extend(self.week_query(params)?);
        q.extend(self.college_query(params, true)?);
        let data = self.espn.site(self.path(), "scoreboard", &q).await?;
        Ok(shape::scoreboard(&data))
    }

    async fn schedule(&self, params: &Params) -> Result<Value, SkillsError> {
        let mut q = Query::new();
        match (params.str("date"), params.int("season")?) {
            (Some(date), _) if !self.league.uses_weeks() => {
                q.push(("dates", date.replace('-', "")))
            }
            (_, Some(season)) => q.push(("dates", season.to_string())),
            _ => {}
        }
        q.extend(self.week_query(params)?);
        q.extend(self.college_query(params, false)?);
        let data = self.espn.site(self.path(), "scoreboard", &q).await?;
        Ok(shape::scoreboard(&data))
    }

    async fn standings(&self, params: &Params) -> Result<Value, SkillsError> {
        let mut q = Query::new();
        if let Some(season) = params.int("season")? {
            q.push(("season", season.to_string()));
        }
        let data = self.espn.web(self.path(), "standings", &q).await?;
        Ok(shape::standings(&data))
    }

    async fn teams(&self) -> Result<Value, SkillsError> {
        let q: Query = if self.league.is_college() {
            vec![("limit", COLLEGE_TEAMS_LIMIT.to_string())]
        } else {
            Vec::new()
        };
        let data = self.espn.site(self.path(), "teams", &q).await?;
        Ok(shape::teams(&data))
    }

    async fn roster(&self, params: &Params) -> Result<Value, SkillsError> {
        let team_id = params.require("team_id")?;
        let data = self
            .espn
            .site(self.path(), &format!("teams/{team_id}/roster"), &[])
            .await?;
        Ok(shape::roster(&data, &team_id))
    }

    /// Regular season, plus the postseason for the NFL where ESPN serves it
    /// separately. The postseason fetch is single-attempt and best effort.
    async fn team_schedule(&self, params: &Params) -> Result<Value, SkillsError> {
        let team_id = params.require("team_id")?;
        let resource = format!("teams/{team_id}/schedule");
        let mut q = Query::new();
        if let Some(season) = params.int("season")? {
            q.push(("season", season.to_string()));
        }
        let data = self.espn.site(self.path(), &resource, &q).await?;
        let mut events: Vec<Value> = array(&data, &["events"]).iter().map(shape::event).collect();

        if self.league == League::Nfl {
            let mut post = q.clone();
            post.push(("seasontype", "3".to_string()));
            match self.espn.site_once(self.path(), &resource, &post).await {
                Ok(post_data) => {
                    for ev in array(&post_data, &["events"]) {
                        let ev = shape::event(ev);
                        if !events.iter().any(|e| e["id"] == ev["id"]) {
                            events.push(ev);
                        }
                    }
                }
                Err(e) => debug!(team_id = %team_id, error = %e, "No postseason schedule"),
            }
        }

        let team = at(&data, &["team"]);
        let id = match text_at(team, &["id"]) {
            s if s.is_empty() => team_id.clone(),
            s => s,
        };
        Ok(json!({
            "team": {
                "id": id,
                "name": text_at(team, &["displayName"]),
                "abbreviation": text_at(team, &["abbreviation"]),
            },
            "season": or_empty(&data, &["season", "year"]),
            "count": events.len(),
            "events": events,
        }))
    }

    async fn summary(&self, event_id: &str) -> Result<Value, SkillsError> {
        self.espn
            .summary(self.path(), event_id)
            .await
            .ok_or_else(|| {
                SkillsError::NoData(format!("No summary data found for event {event_id}"))
            })
    }

    async fn game_summary(&self, params: &Params) -> Result<Value, SkillsError> {
        let event_id = params.require("event_id")?;
        let data = self.summary(&event_id).await?;
        Ok(shape::game_summary(&data))
    }

    async fn leaders(&self, params: &Params) -> Result<Value, SkillsError> {
        let season = self.season_or_current(params)?;
        let data = self
            .espn
            .core(self.path(), &format!("seasons/{season}/types/2/leaders"))
            .await?;
        let categories = array(&data, &["categories"]);
        let names = self.espn.resolve_refs(leader_refs(categories)).await;
        let leaders = normalize_leaders(categories, &names);
        Ok(json!({
            "categories": leaders.categories,
            "count": leaders.count,
            "season": match at(&data, &["season", "year"]) {
                Value::Null => json!(season),
                year => year.clone(),
            },
        }))
    }

    async fn news(&self, params: &Params) -> Result<Value, SkillsError> {
        let resource = match params.str("team_id") {
            Some(team_id) => format!("teams/{team_id}/news"),
            None => "news".to_string(),
        };
        let data = self.espn.site(self.path(), &resource, &[]).await?;
        Ok(shape::news(&data))
    }

    async fn rankings(&self, params: &Params) -> Result<Value, SkillsError> {
        let mut q = Query::new();
        if let Some(season) = params.int("season")? {
            q.push(("seasons", season.to_string()));
        }
        if let Some(week) = params.int("week")? {
            q.push(("weeks", week.to_string()));
        }
        let data = self.espn.site(self.path(), "rankings", &q).await?;
        let mut out = shape::rankings(&data);
        out["week"] = or_empty(&data, &["week"]);
        Ok(out)
    }

    async fn injuries(&self) -> Result<Value, SkillsError> {
        let data = self.espn.site(self.path(), "injuries", &[]).await?;
        Ok(serde_json::to_value(normalize_injuries(&data))?)
    }

    async fn transactions(&self) -> Result<Value, SkillsError> {
        let data = self.espn.site(self.path(), "transactions", &[]).await?;
        Ok(serde_json::to_value(normalize_transactions(&data))?)
    }

    async fn depth_chart(&self, params: &Params) -> Result<Value, SkillsError> {
        let team_id = params.require("team_id")?;
        let data = self
            .espn
            .site(self.path(), &format!("teams/{team_id}/depthcharts"), &[])
            .await?;
        let mut out = serde_json::to_value(normalize_depth_chart(&data))?;
        out["team_id"] = json!(team_id);
        Ok(out)
    }

    async fn play_by_play(&self, params: &Params) -> Result<Value, SkillsError> {
        let event_id = params.require("event_id")?;
        let limit = match params.int("limit")? {
            Some(n) if n > 0 => Some(n as usize),
            Some(_) => {
                return Err(SkillsError::InvalidInput("limit must be positive".to_string()));
            }
            None => None,
        };
        let data = self.summary(&event_id).await?;
        let pbp = normalize_plays(self.league.layout(), &data, limit)?;
        Ok(serde_json::to_value(pbp)?)
    }

    async fn win_probability(&self, params: &Params) -> Result<Value, SkillsError> {
        let event_id = params.require("event_id")?;
        let data = self.summary(&event_id).await?;
        Ok(serde_json::to_value(normalize_win_probability(&data)?)?)
    }

    async fn futures(&self, params: &Params) -> Result<Value, SkillsError> {
        let season = self.season_or_current(params)?;
        let limit = match params.int("limit")? {
            Some(n) if n > 0 => n as usize,
            _ => DEFAULT_FUTURES_LIMIT,
        };
        let data = self.espn.core(self.path(), &format!("seasons/{season}/futures")).await?;
        let names = self.espn.resolve_refs(futures_refs(&data, limit)).await;
        let mut out = serde_json::to_value(normalize_futures(&data, limit, &names))?;
        out["season"] = json!(season);
        Ok(out)
    }

    async fn team_stats(&self, params: &Params) -> Result<Value, SkillsError> {
        let team_id = params.require("team_id")?;
        let season = self.season_or_current(params)?;
        let data = self
            .espn
            .core(self.path(), &format!("seasons/{season}/types/2/teams/{team_id}/statistics"))
            .await?;
        let mut out = serde_json::to_value(normalize_core_stats(&data))?;
        out["team_id"] = json!(team_id);
        out["season"] = json!(season);
        Ok(out)
    }

    async fn player_stats(&self, params: &Params) -> Result<Value, SkillsError> {
        let player_id = params.require("player_id")?;
        let season = self.season_or_current(params)?;
        let data = self
            .espn
            .core(
                self.path(),
                &format!("seasons/{season}/types/2/athletes/{player_id}/statistics"),
            )
            .await?;
        let mut out = serde_json::to_value(normalize_core_stats(&data))?;
        out["player_id"] = json!(player_id);
        out["season"] = json!(season);
        Ok(out)
    }

    /// Pick-center lines from the summary, falling back to the odds embedded
    /// in the header competition.
    async fn odds(&self, params: &Params) -> Result<Value, SkillsError> {
        let event_id = params.require("event_id")?;
        let data = self.summary(&event_id).await?;
        let lines = match array(&data, &["pickcenter"]) {
            [] => array(first(&data, &["header", "competitions"]), &["odds"]),
            lines => lines,
        };
        let odds = normalize_odds(lines).ok_or_else(|| {
            SkillsError::NoData(format!("No odds available for event {event_id}"))
        })?;
        Ok(json!({
            "event_id": event_id,
            "odds": odds,
        }))
    }
}

#[async_trait]
impl Connector for LeagueConnector {
    fn module(&self) -> Module {
        self.league.module()
    }

    async fn call(&self, command: &str, params: &Params) -> Outcome {
        let result = match command {
            "get_scoreboard" => self.scoreboard(params).await,
            "get_schedule" => self.schedule(params).await,
            "get_standings" => self.standings(params).await,
            "get_teams" => self.teams().await,
            "get_team_roster" => self.roster(params).await,
            "get_team_schedule" => self.team_schedule(params).await,
            "get_game_summary" => self.game_summary(params).await,
            "get_leaders" => self.leaders(params).await,
            "get_news" => self.news(params).await,
            "get_rankings" if self.league.is_college() => self.rankings(params).await,
            "get_injuries" => self.injuries().await,
            "get_transactions" => self.transactions().await,
            "get_depth_chart" => self.depth_chart(params).await,
            "get_play_by_play" => self.play_by_play(params).await,
            "get_win_probability" => self.win_probability(params).await,
            "get_futures" => self.futures(params).await,
            "get_team_stats" => self.team_stats(params).await,
            "get_player_stats" => self.player_stats(params).await,
            "get_odds" => self.odds(params).await,
            _ => return unknown_command(self.module(), command),
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

    fn connector(league: League, mock: MockHttpTransport) -> LeagueConnector {
        let client = Arc::new(UpstreamClient::with_transport(Arc::new(mock)));
        LeagueConnector::new(league, EspnApi::new(client))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_nfl_postseason_weeks() {
        assert_eq!(week_params(League::Nfl, 5), vec![("week", "5".to_string())]);
        assert_eq!(
            week_params(League::Nfl, 19),
            vec![("seasontype", "3".to_string()), ("week", "1".to_string())]
        );
        assert_eq!(
            week_params(League::Nfl, 23),
            vec![("seasontype", "3".to_string()), ("week", "5".to_string())]
        );
        // College weeks run past 19 without meaning postseason.
        assert_eq!(week_params(League::Cfb, 20), vec![("week", "20".to_string())]);
    }

    #[test]
    fn test_current_season_rolls_at_opening_month() {
        assert_eq!(League::Nba.current_season(date(2026, 9, 30)), 2025);
        assert_eq!(League::Nba.current_season(date(2026, 10, 1)), 2026);
        assert_eq!(League::Mlb.current_season(date(2026, 3, 31)), 2025);
        assert_eq!(League::Mlb.current_season(date(2026, 4, 1)), 2026);
    }

    #[test]
    fn test_only_college_leagues_have_rankings() {
        assert!(Module::Cfb.command("get_rankings").is_some());
        assert!(Module::Cbb.command("get_rankings").is_some());
        assert!(Module::Nba.command("get_rankings").is_none());
        assert!(Module::Nfl.command("get_scoreboard").unwrap().optional.contains(&"week"));
    }

    #[tokio::test]
    async fn test_scoreboard_strips_date_dashes() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| url.ends_with("/basketball/nba/scoreboard?dates=20250115"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"events":[]}"#)));
        let out = connector(League::Nba, mock)
            .call("get_scoreboard", &Params::new().with("date", "2025-01-15"))
            .await;
        let env = out.into_envelope();
        assert!(env.status, "{}", env.message);
        assert_eq!(env.data["count"], json!(0));
    }

    #[tokio::test]
    async fn test_nfl_scoreboard_postseason_week() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| url.contains("seasontype=3") && url.contains("week=2"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"events":[]}"#)));
        let out = connector(League::Nfl, mock)
            .call("get_scoreboard", &Params::new().with("week", 20))
            .await;
        assert!(out.is_success());
    }

    #[tokio::test]
    async fn test_nfl_team_schedule_merges_postseason() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| url.contains("/teams/12/schedule") && !url.contains("seasontype"))
            .times(1)
            .returning(|_, _| {
                Ok(RawResponse::new(
                    200,
                    r#"{"team":{"id":"12","displayName":"Chiefs"},
                        "events":[{"id":"1"},{"id":"2"}]}"#,
                ))
            });
        mock.expect_get()
            .withf(|url, _| url.contains("/teams/12/schedule") && url.contains("seasontype=3"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"events":[{"id":"2"},{"id":"3"}]}"#)));
        let env = connector(League::Nfl, mock)
            .call("get_team_schedule", &Params::new().with("team_id", "12"))
            .await
            .into_envelope();
        assert!(env.status, "{}", env.message);
        assert_eq!(env.data["count"], json!(3));
        assert_eq!(env.data["team"]["name"], json!("Chiefs"));
    }

    #[tokio::test]
    async fn test_nfl_team_schedule_survives_postseason_failure() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| !url.contains("seasontype"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"events":[{"id":"1"}]}"#)));
        // Single attempt: a 503 is not retried.
        mock.expect_get()
            .withf(|url, _| url.contains("seasontype=3"))
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(503, "")));
        let env = connector(League::Nfl, mock)
            .call("get_team_schedule", &Params::new().with("team_id", "12"))
            .await
            .into_envelope();
        assert!(env.status);
        assert_eq!(env.data["count"], json!(1));
        assert_eq!(env.data["team"]["id"], json!("12"));
    }

    #[tokio::test]
    async fn test_play_by_play_without_plays_fails() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(200, r#"{"header":{"id":"401"}}"#)));
        let env = connector(League::Nba, mock)
            .call("get_play_by_play", &Params::new().with("event_id", "401"))
            .await
            .into_envelope();
        assert!(!env.status);
        assert!(env.message.contains("No play-by-play data"));
    }

    #[tokio::test]
    async fn test_summary_not_found_is_failure() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(404, "")));
        let env = connector(League::Nhl, mock)
            .call("get_game_summary", &Params::new().with("event_id", "1"))
            .await
            .into_envelope();
        assert!(!env.status);
        assert_eq!(env.message, "No summary data found for event 1");
    }

    #[tokio::test]
    async fn test_odds_from_pickcenter() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get().times(1).returning(|_, _| {
            Ok(RawResponse::new(
                200,
                r#"{"pickcenter":[{"provider":{"name":"ESPN BET"},"spread":-3.5,"overUnder":47.5,
                    "homeTeamOdds":{"favorite":true,"moneyLine":-180},
                    "awayTeamOdds":{"favorite":false,"moneyLine":150}}]}"#,
            ))
        });
        let env = connector(League::Nfl, mock)
            .call("get_odds", &Params::new().with("event_id", "401"))
            .await
            .into_envelope();
        assert!(env.status, "{}", env.message);
        assert_eq!(env.data["event_id"], json!("401"));
        assert_eq!(env.data["odds"]["favorite"], json!("home"));
    }

    #[tokio::test]
    async fn test_injuries_encode_into_report() {
        let mut mock = MockHttpTransport::new();
        mock.expect_get()
            .withf(|url, _| url.ends_with("/basketball/nba/injuries"))
            .times(1)
            .returning(|_, _| {
                Ok(RawResponse::new(
                    200,
                    r#"{"injuries":[{"id":"13","displayName":"Los Angeles Lakers",
                        "injuries":[{"status":"Out","athlete":{"displayName":"A. Davis"}}]}]}"#,
                ))
            });
        let env = connector(League::Nba, mock)
            .call("get_injuries", &Params::new())
            .await
            .into_envelope();
        assert!(env.status, "{}", env.message);
        assert_eq!(env.data["count"], json!(1));
        assert_eq!(env.data["teams"][0]["team_id"], json!("13"));
        assert_eq!(env.data["teams"][0]["injuries"][0]["status"], json!("Out"));
    }

    #[tokio::test]
    async fn test_invalid_season_rejected_before_fetch() {
        let env = connector(League::Mlb, MockHttpTransport::new())
            .call("get_standings", &Params::new().with("season", "twenty"))
            .await
            .into_envelope();
        assert!(!env.status);
        assert!(env.message.contains("--season"));
    }
}
