//! Connectors.
//!
//! Defines the `Connector` trait, the static module/command catalog and the
//! `Skills` registry that validates a call before handing it to:
//! - `league`: ESPN-backed NFL, NBA, WNBA, NHL, MLB, CFB, CBB
//! - `golf`, `tennis`: ESPN tour endpoints
//! - `football`: soccer via ESPN, FPL, Understat and Transfermarkt
//! - `kalshi`, `polymarket`: prediction-market exchanges (read-only)
//! - `news`: RSS / Atom and Google News
//! - `f1`: Jolpica (feature `f1`)

#[cfg(feature = "f1")]
pub mod f1;
pub mod football;
pub mod golf;
pub mod kalshi;
pub mod league;
pub mod news;
pub mod polymarket;
pub mod tennis;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::espn::EspnApi;
use crate::http::{FetchError, UpstreamClient};
use crate::types::{Envelope, Outcome, SkillsError};

use league::League;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One command a module accepts. Required params are checked by the
/// registry; optional ones are only documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl CommandSpec {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        required: &'static [&'static str],
        optional: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            description,
            required,
            optional,
        }
    }

    /// `name --a=<value> [--b=<value>]`
    pub fn usage(&self) -> String {
        let mut parts = vec![self.name.to_string()];
        parts.extend(self.required.iter().map(|p| format!("--{p}=<value>")));
        parts.extend(self.optional.iter().map(|p| format!("[--{p}=<value>]")));
        parts.join(" ")
    }

    /// Required params absent from `params`, in declaration order.
    pub fn missing(&self, params: &Params) -> Vec<String> {
        self.required
            .iter()
            .filter(|p| !params.has(p))
            .map(|p| p.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Football,
    Polymarket,
    Kalshi,
    News,
    F1,
    Nfl,
    Nba,
    Wnba,
    Nhl,
    Mlb,
    Cfb,
    Cbb,
    Golf,
    Tennis,
}

impl Module {
    pub const ALL: [Module; 14] = [
        Module::Football,
        Module::Polymarket,
        Module::Kalshi,
        Module::News,
        Module::F1,
        Module::Nfl,
        Module::Nba,
        Module::Wnba,
        Module::Nhl,
        Module::Mlb,
        Module::Cfb,
        Module::Cbb,
        Module::Golf,
        Module::Tennis,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Module::Football => "football",
            Module::Polymarket => "polymarket",
            Module::Kalshi => "kalshi",
            Module::News => "news",
            Module::F1 => "f1",
            Module::Nfl => "nfl",
            Module::Nba => "nba",
            Module::Wnba => "wnba",
            Module::Nhl => "nhl",
            Module::Mlb => "mlb",
            Module::Cfb => "cfb",
            Module::Cbb => "cbb",
            Module::Golf => "golf",
            Module::Tennis => "tennis",
        }
    }

    pub fn parse(name: &str) -> Option<Module> {
        Module::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Comma-separated module names, for error messages.
    pub fn available() -> String {
        Module::ALL.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
    }

    pub fn league(&self) -> Option<League> {
        League::ALL.into_iter().find(|l| l.module() == *self)
    }

    pub fn commands(&self) -> &'static [CommandSpec] {
        if let Some(league) = self.league() {
            return league.commands();
        }
        match self {
            Module::Football => football::COMMANDS,
            Module::Polymarket => polymarket::COMMANDS,
            Module::Kalshi => kalshi::COMMANDS,
            Module::News => news::COMMANDS,
            Module::Golf => golf::COMMANDS,
            Module::Tennis => tennis::COMMANDS,
            #[cfg(feature = "f1")]
            Module::F1 => f1::COMMANDS,
            _ => &[],
        }
    }

    pub fn command(&self, name: &str) -> Option<&'static CommandSpec> {
        self.commands().iter().find(|c| c.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Named command arguments, as parsed from the CLI or an agent tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a JSON object; `null` is treated as no params.
    pub fn from_value(value: Value) -> Result<Self, SkillsError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(SkillsError::InvalidInput(format!(
                "Expected an object of params, got {other}"
            ))),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Present and not null or an empty string.
    pub fn has(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// String form of a scalar param; empty strings read as absent.
    pub fn str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn str_or(&self, key: &str, default: &str) -> String {
        self.str(key).unwrap_or_else(|| default.to_string())
    }

    pub fn require(&self, key: &str) -> Result<String, SkillsError> {
        self.str(key)
            .ok_or_else(|| SkillsError::MissingParams(vec![key.to_string()]))
    }

    /// Integer param. Numeric strings are accepted; anything else is an
    /// invalid-input error rather than silently ignored.
    pub fn int(&self, key: &str) -> Result<Option<i64>, SkillsError> {
        let invalid = |v: &Value| {
            SkillsError::InvalidInput(format!(
                "Invalid value for --{key}: expected an integer, got {v}"
            ))
        };
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| invalid(&Value::String(s.clone()))),
            Some(v @ Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| invalid(v)),
            Some(v) => Err(invalid(v)),
        }
    }

    pub fn int_or(&self, key: &str, default: i64) -> Result<i64, SkillsError> {
        Ok(self.int(key)?.unwrap_or(default))
    }

    /// Boolean param: `true`/`1`/`yes`/`""` are true.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => Some(parse_bool(s)),
            Value::Number(n) => Some(n.as_i64() != Some(0)),
            _ => None,
        }
    }

    /// List param: a JSON array or a comma-separated string.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(crate::json::text)
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => split_list(s),
            _ => Vec::new(),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a named param is typed on the command line and in tool schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Integer,
    Flag,
    List,
}

const FLAG_PARAMS: &[&str] = &[
    "google_news",
    "sort_by_date",
    "active",
    "closed",
    "ascending",
    "with_nested_markets",
];

const INTEGER_PARAMS: &[&str] = &[
    "limit",
    "offset",
    "year",
    "session_year",
    "tag_id",
    "fidelity",
    "start_ts",
    "end_ts",
    "period_interval",
    "min_ts",
    "max_ts",
    "season",
    "week",
];

const LIST_PARAMS: &[&str] = &["tm_player_ids", "token_ids"];

impl ParamKind {
    pub fn of(name: &str) -> ParamKind {
        if FLAG_PARAMS.contains(&name) {
            ParamKind::Flag
        } else if INTEGER_PARAMS.contains(&name) {
            ParamKind::Integer
        } else if LIST_PARAMS.contains(&name) {
            ParamKind::List
        } else {
            ParamKind::Text
        }
    }

    /// JSON-schema fragment for a param of this kind.
    pub fn schema(&self) -> Value {
        match self {
            ParamKind::Text => serde_json::json!({"type": "string"}),
            ParamKind::Integer => serde_json::json!({"type": "integer"}),
            ParamKind::Flag => serde_json::json!({"type": "boolean"}),
            ParamKind::List => serde_json::json!({"type": "array", "items": {"type": "string"}}),
        }
    }
}

pub fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "")
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Connector trait
// ---------------------------------------------------------------------------

/// A data provider exposing a fixed set of commands.
///
/// `call` never fails: every upstream or input problem comes back as a
/// failure `Outcome`. Required params have already been checked by the
/// registry when `call` runs.
#[async_trait]
pub trait Connector: Send + Sync {
    fn module(&self) -> Module;

    async fn call(&self, command: &str, params: &Params) -> Outcome;
}

/// Fallback for a command name the connector does not route.
pub(crate) fn unknown_command(module: Module, command: &str) -> Outcome {
    SkillsError::UnknownCommand {
        module: module.name().to_string(),
        command: command.to_string(),
        available: module
            .commands()
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", "),
    }
    .into()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every connector, sharing one `UpstreamClient` (and so one cache and one
/// set of rate limiters).
pub struct Skills {
    connectors: HashMap<Module, Arc<dyn Connector>>,
    client: Arc<UpstreamClient>,
}

impl Skills {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        let espn = EspnApi::new(client.clone());
        let mut connectors: HashMap<Module, Arc<dyn Connector>> = HashMap::new();

        for league in League::ALL {
            connectors.insert(
                league.module(),
                Arc::new(league::LeagueConnector::new(league, espn.clone())),
            );
        }
        connectors.insert(Module::Golf, Arc::new(golf::GolfConnector::new(espn.clone())));
        connectors.insert(Module::Tennis, Arc::new(tennis::TennisConnector::new(espn.clone())));
        connectors.insert(
            Module::Football,
            Arc::new(football::FootballConnector::new(client.clone())),
        );
        connectors.insert(Module::Kalshi, Arc::new(kalshi::KalshiConnector::new(client.clone())));
        connectors.insert(
            Module::Polymarket,
            Arc::new(polymarket::PolymarketConnector::new(client.clone())),
        );
        connectors.insert(Module::News, Arc::new(news::NewsConnector::new(client.clone())));
        #[cfg(feature = "f1")]
        connectors.insert(Module::F1, Arc::new(f1::F1Connector::new(client.clone())));

        Self { connectors, client }
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, FetchError> {
        Ok(Self::new(Arc::new(UpstreamClient::from_config(cfg)?)))
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    pub fn is_enabled(&self, module: Module) -> bool {
        self.connectors.contains_key(&module)
    }

    /// Resolve a module/command pair and check required params, without
    /// touching the network.
    pub fn validate(
        &self,
        module: &str,
        command: &str,
        params: &Params,
    ) -> Result<(Arc<dyn Connector>, &'static CommandSpec), SkillsError> {
        let module = Module::parse(module).ok_or_else(|| SkillsError::UnknownModule {
            name: module.to_string(),
            available: Module::available(),
        })?;
        let connector = self.connectors.get(&module).cloned().ok_or_else(|| {
            SkillsError::Unavailable(format!(
                "{} module requires the `{}` feature",
                module.name().to_uppercase(),
                module.name()
            ))
        })?;
        let spec = module.command(command).ok_or_else(|| SkillsError::UnknownCommand {
            module: module.name().to_string(),
            command: command.to_string(),
            available: module
                .commands()
                .iter()
                .map(|c| c.name)
                .collect::<Vec<_>>()
                .join(", "),
        })?;
        let missing = spec.missing(params);
        if !missing.is_empty() {
            return Err(SkillsError::MissingParams(missing));
        }
        Ok((connector, spec))
    }

    /// Validate and run one command.
    pub async fn call(&self, module: &str, command: &str, params: &Params) -> Outcome {
        let (connector, spec) = match self.validate(module, command, params) {
            Ok(found) => found,
            Err(e) => {
                debug!(module, command, error = %e, "Rejected command");
                return e.into();
            }
        };
        info!(module, command = spec.name, "Dispatching command");
        connector.call(spec.name, params).await
    }

    pub async fn dispatch(&self, module: &str, command: &str, params: &Params) -> Envelope {
        self.call(module, command, params).await.into_envelope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::MockHttpTransport;
    use serde_json::json;

    fn skills() -> Skills {
        // No expectations: any network call fails the test.
        Skills::new(Arc::new(UpstreamClient::with_transport(Arc::new(
            MockHttpTransport::new(),
        ))))
    }

    #[test]
    fn test_module_names_round_trip() {
        for m in Module::ALL {
            assert_eq!(Module::parse(m.name()), Some(m));
        }
        assert_eq!(Module::parse("cricket"), None);
    }

    #[test]
    fn test_every_enabled_module_has_commands() {
        let skills = skills();
        for m in Module::ALL {
            if skills.is_enabled(m) {
                assert!(!m.commands().is_empty(), "{m} has no commands");
            }
        }
    }

    #[test]
    fn test_usage_marks_optional_params() {
        let spec = CommandSpec::new("get_x", "", &["team_id"], &["season"]);
        assert_eq!(spec.usage(), "get_x --team_id=<value> [--season=<value>]");
    }

    #[tokio::test]
    async fn test_unknown_module_lists_available() {
        let out = skills().dispatch("cricket", "get_scores", &Params::new()).await;
        assert!(!out.status);
        assert!(out.message.starts_with("Unknown module 'cricket'"));
        assert!(out.message.contains("football"));
        assert!(out.message.contains("nfl"));
    }

    #[tokio::test]
    async fn test_unknown_command_lists_available() {
        let out = skills().dispatch("nfl", "get_weather", &Params::new()).await;
        assert!(!out.status);
        assert!(out.message.contains("Unknown command 'get_weather' for module 'nfl'"));
        assert!(out.message.contains("get_scoreboard"));
    }

    #[tokio::test]
    async fn test_missing_params_listed_before_network() {
        let out = skills()
            .dispatch("kalshi", "get_market_candlesticks", &Params::new().with("ticker", "X"))
            .await;
        assert!(!out.status);
        assert_eq!(
            out.message,
            "Missing required params: --series_ticker, --start_ts, --end_ts, --period_interval"
        );
    }

    #[tokio::test]
    async fn test_empty_string_counts_as_missing() {
        let out = skills()
            .dispatch("nfl", "get_game_summary", &Params::new().with("event_id", ""))
            .await;
        assert_eq!(out.message, "Missing required params: --event_id");
    }

    #[test]
    fn test_params_int_parsing() {
        let p = Params::from_value(json!({"a": 5, "b": "12", "c": "x", "d": ""})).unwrap();
        assert_eq!(p.int("a").unwrap(), Some(5));
        assert_eq!(p.int("b").unwrap(), Some(12));
        assert!(p.int("c").is_err());
        assert_eq!(p.int("d").unwrap(), None);
        assert_eq!(p.int("missing").unwrap(), None);
    }

    #[test]
    fn test_params_flags_and_lists() {
        let p = Params::from_value(json!({
            "a": "yes", "b": "false", "c": true, "ids": "1, 2,,3", "arr": ["x", 7]
        }))
        .unwrap();
        assert_eq!(p.flag("a"), Some(true));
        assert_eq!(p.flag("b"), Some(false));
        assert_eq!(p.flag("c"), Some(true));
        assert_eq!(p.flag("nope"), None);
        assert_eq!(p.list("ids"), vec!["1", "2", "3"]);
        assert_eq!(p.list("arr"), vec!["x", "7"]);
    }

    #[test]
    fn test_param_kinds() {
        assert_eq!(ParamKind::of("google_news"), ParamKind::Flag);
        assert_eq!(ParamKind::of("start_ts"), ParamKind::Integer);
        assert_eq!(ParamKind::of("token_ids"), ParamKind::List);
        assert_eq!(ParamKind::of("event_id"), ParamKind::Text);
        assert_eq!(ParamKind::List.schema()["items"]["type"], json!("string"));
    }

    #[test]
    fn test_params_reject_non_object() {
        assert!(Params::from_value(json!([1, 2])).is_err());
        assert!(Params::from_value(Value::Null).unwrap().is_empty());
    }
}
