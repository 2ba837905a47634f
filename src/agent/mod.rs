//! Tool surface for a chat agent.
//!
//! Every connector command becomes one tool named `<module>_<command>` with
//! a JSON-schema parameter object derived from the command catalog. Which
//! tools are loaded depends on the chosen sport, the mode, and (in betting
//! mode) the exchange. Tool calls always return an envelope as a JSON
//! string; failures are failure envelopes, never errors.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::connectors::{CommandSpec, Module, ParamKind, Params, Skills};
use crate::types::{Envelope, SkillsError};

/// Sports an agent session can be about, with display labels.
pub const SPORTS: [(Module, &str); 11] = [
    (Module::Nfl, "NFL"),
    (Module::Nba, "NBA"),
    (Module::Wnba, "WNBA"),
    (Module::Nhl, "NHL"),
    (Module::Mlb, "MLB"),
    (Module::Cfb, "College Football"),
    (Module::Cbb, "College Basketball"),
    (Module::Football, "Football (Soccer)"),
    (Module::Golf, "Golf"),
    (Module::Tennis, "Tennis"),
    (Module::F1, "Formula 1"),
];

pub fn sport_label(module: Module) -> Option<&'static str> {
    SPORTS.iter().find(|(m, _)| *m == module).map(|(_, l)| *l)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    General,
    Betting,
}

impl Mode {
    pub fn parse(raw: &str) -> Result<Mode, SkillsError> {
        match raw.trim().to_lowercase().as_str() {
            "general" => Ok(Mode::General),
            "betting" => Ok(Mode::Betting),
            other => Err(SkillsError::InvalidInput(format!(
                "Unknown mode '{other}'. Use 'general' or 'betting'."
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Polymarket,
    Kalshi,
    Both,
}

impl Exchange {
    pub fn parse(raw: &str) -> Result<Exchange, SkillsError> {
        match raw.trim().to_lowercase().as_str() {
            "polymarket" => Ok(Exchange::Polymarket),
            "kalshi" => Ok(Exchange::Kalshi),
            "both" => Ok(Exchange::Both),
            other => Err(SkillsError::InvalidInput(format!(
                "Unknown exchange '{other}'. Use 'polymarket', 'kalshi' or 'both'."
            ))),
        }
    }

    fn modules(&self) -> &'static [Module] {
        match self {
            Exchange::Polymarket => &[Module::Polymarket],
            Exchange::Kalshi => &[Module::Kalshi],
            Exchange::Both => &[Module::Polymarket, Module::Kalshi],
        }
    }
}

/// One tool as presented to a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    #[serde(skip)]
    pub module: Module,
    #[serde(skip)]
    pub command: &'static str,
}

impl ToolDefinition {
    pub fn new(module: Module, spec: &'static CommandSpec) -> Self {
        Self {
            name: format!("{}_{}", module.name(), spec.name),
            description: format!("{} ({})", spec.description, module.name()),
            parameters: parameters_schema(spec),
            module,
            command: spec.name,
        }
    }
}

/// `{"type": "object", "properties": {...}, "required": [...]}` for a command.
pub fn parameters_schema(spec: &CommandSpec) -> Value {
    let properties: Map<String, Value> = spec
        .required
        .iter()
        .chain(spec.optional.iter())
        .map(|p| (p.to_string(), ParamKind::of(p).schema()))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": spec.required,
    })
}

/// A tool invocation requested by a model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub id: String,
    pub name: String,
    pub content: String,
}

/// Tools loaded for one agent session, bound to a `Skills` registry.
pub struct ToolRegistry {
    skills: Arc<Skills>,
    tools: Vec<ToolDefinition>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// The sport's tools plus news; in betting mode also the exchange tools.
    /// Modules compiled out (F1 without its feature) contribute nothing.
    pub fn load(
        skills: Arc<Skills>,
        sport: &str,
        mode: Mode,
        exchange: Option<Exchange>,
    ) -> Result<Self, SkillsError> {
        let sport_module = Module::parse(sport)
            .filter(|m| sport_label(*m).is_some())
            .ok_or_else(|| {
                SkillsError::InvalidInput(format!(
                    "Unknown sport '{sport}'. Available: {}",
                    SPORTS.iter().map(|(m, _)| m.name()).collect::<Vec<_>>().join(", ")
                ))
            })?;

        let mut modules = vec![sport_module, Module::News];
        if let (Mode::Betting, Some(ex)) = (mode, exchange) {
            modules.extend_from_slice(ex.modules());
        }

        let tools: Vec<ToolDefinition> = modules
            .into_iter()
            .filter(|m| skills.is_enabled(*m))
            .flat_map(|m| m.commands().iter().map(move |spec| ToolDefinition::new(m, spec)))
            .collect();
        info!(sport, ?mode, ?exchange, tools = tools.len(), "Loaded agent tools");
        Ok(Self { skills, tools })
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Run one tool and return its envelope as compact JSON.
    pub async fn call(&self, name: &str, arguments: Value) -> String {
        let Some(tool) = self.get(name) else {
            debug!(tool = name, "Unknown tool requested");
            return Envelope::failure(format!("Unknown tool '{name}'"), None).to_json();
        };
        let params = match Params::from_value(arguments) {
            Ok(p) => p,
            Err(e) => return Envelope::failure(e.to_string(), None).to_json(),
        };
        self.skills
            .dispatch(tool.module.name(), tool.command, &params)
            .await
            .to_json()
    }

    /// Run several tool calls concurrently; results keep the call order.
    pub async fn call_many(&self, calls: Vec<ToolCall>) -> Vec<ToolResult> {
        let outputs = join_all(
            calls
                .iter()
                .map(|c| self.call(&c.name, c.arguments.clone())),
        )
        .await;
        calls
            .into_iter()
            .zip(outputs)
            .map(|(c, content)| ToolResult {
                id: c.id,
                name: c.name,
                content,
            })
            .collect()
    }
}
