//! Command-line front end: `sports-skills <module> <command> --key=value ...`
//!
//! Results are printed as pretty JSON envelopes on stdout so agents can read
//! them; failures also print a one-line `Error: ...` on stderr and exit 1.

use clap::Parser;
use serde_json::Value;
use tracing::info;

use crate::config::AppConfig;
use crate::connectors::{parse_bool, split_list, Module, ParamKind, Params, Skills};
use crate::types::{Envelope, SkillsError};

#[derive(Debug, Parser)]
#[command(
    name = "sports-skills",
    version,
    about = "Sports data and prediction markets from the command line: \
             ESPN leagues, football, F1, golf, tennis, Kalshi, Polymarket and news."
)]
pub struct Cli {
    /// Module name (nfl, football, kalshi, ...). Omit to list modules.
    pub module: Option<String>,

    /// Command within the module. Omit to show the module's usage.
    pub command: Option<String>,

    /// Command params as `--key=value` or bare `--flag`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    pub params: Vec<String>,
}

/// What the binary should print and its exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: Option<String>,
    pub code: i32,
}

impl CliOutput {
    fn ok(stdout: String) -> Self {
        Self {
            stdout,
            stderr: None,
            code: 0,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            stdout: Envelope::failure(message.clone(), None).to_pretty_json(),
            stderr: Some(format!("Error: {message}")),
            code: 1,
        }
    }

    fn from_envelope(env: Envelope) -> Self {
        if env.is_success() {
            Self::ok(env.to_pretty_json())
        } else {
            Self {
                stderr: Some(format!("Error: {}", env.message)),
                stdout: env.to_pretty_json(),
                code: 1,
            }
        }
    }
}

/// Build the registry from a loaded config. A config or client error becomes
/// the failure output, so startup problems reach stdout as an envelope too.
pub fn startup(cfg: anyhow::Result<AppConfig>) -> Result<Skills, CliOutput> {
    let cfg = cfg.map_err(|e| CliOutput::error(format!("Configuration error: {e:#}")))?;
    Skills::from_config(&cfg)
        .map_err(|e| CliOutput::error(format!("Failed to build HTTP client: {e}")))
}

/// Convert `--key=value` / `--flag` arguments into typed params.
pub fn parse_params(args: &[String]) -> Result<Params, SkillsError> {
    let mut params = Params::new();
    for arg in args {
        let Some(body) = arg.strip_prefix("--") else {
            return Err(SkillsError::InvalidInput(format!(
                "Unexpected argument '{arg}'. Pass params as --key=value"
            )));
        };
        let (key, raw) = match body.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (body, None),
        };
        if key.is_empty() {
            return Err(SkillsError::InvalidInput(format!("Malformed param '{arg}'")));
        }
        let value = match (ParamKind::of(key), raw) {
            (ParamKind::Flag, None) => Value::Bool(true),
            (ParamKind::Flag, Some(v)) => Value::Bool(parse_bool(v)),
            (_, None) => Value::Bool(true),
            (ParamKind::Integer, Some(v)) => {
                let n: i64 = v.trim().parse().map_err(|_| {
                    SkillsError::InvalidInput(format!(
                        "Invalid value for --{key}: expected an integer, got '{v}'"
                    ))
                })?;
                Value::from(n)
            }
            (ParamKind::List, Some(v)) => {
                Value::Array(split_list(v).into_iter().map(Value::String).collect())
            }
            (ParamKind::Text, Some(v)) => Value::String(v.to_string()),
        };
        params.insert(key, value);
    }
    Ok(params)
}

/// Every module with its command names, shown when no module is given.
pub fn module_listing(skills: &Skills) -> String {
    let mut out = String::from("Available modules:\n");
    for module in Module::ALL {
        let names: Vec<&str> = module.commands().iter().map(|c| c.name).collect();
        let note = if skills.is_enabled(module) { "" } else { " (disabled)" };
        out.push_str(&format!("  {}{}: {}\n", module.name(), note, names.join(", ")));
    }
    out
}

pub fn module_usage(module: Module) -> String {
    let mut out = format!("Commands for '{}':\n", module.name());
    for spec in module.commands() {
        out.push_str(&format!("  {}\n", spec.usage()));
    }
    out
}

/// Execute a parsed command line against `skills`.
pub async fn run(cli: Cli, skills: &Skills) -> CliOutput {
    let Some(module_name) = cli.module.as_deref() else {
        return CliOutput::ok(module_listing(skills));
    };
    let Some(module) = Module::parse(module_name) else {
        return CliOutput::error(
            SkillsError::UnknownModule {
                name: module_name.to_string(),
                available: Module::available(),
            }
            .to_string(),
        );
    };
    let Some(command) = cli.command.as_deref() else {
        return CliOutput::ok(module_usage(module));
    };

    let params = match parse_params(&cli.params) {
        Ok(p) => p,
        Err(e) => return CliOutput::error(e.to_string()),
    };

    if let Err(e) = skills.validate(module_name, command, &params) {
        return CliOutput::error(match e {
            SkillsError::MissingParams(_) => {
                format!("{e}. Run 'sports-skills {}' to see usage.", module.name())
            }
            other => other.to_string(),
        });
    }

    info!(
        module = module.name(),
        command,
        params = params.as_map().len(),
        "Running CLI command"
    );
    CliOutput::from_envelope(skills.dispatch(module_name, command, &params).await)
}
