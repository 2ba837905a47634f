//! Configuration.
//!
//! `AppConfig` holds the upstream-access settings (HTTP, retry, cache TTL
//! overrides, rate-limit budgets), read from TOML. Every section is
//! optional; a missing file yields the built-in defaults.
//!
//! `UserConfig` holds the agent's preferences and provider API keys,
//! persisted as JSON under the user config directory with owner-only
//! permissions.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::http::rate_limit::{RateBudget, Scope};
use crate::http::{RetryPolicy, DEFAULT_USER_AGENT};

/// Environment variable naming an alternative TOML config file.
pub const CONFIG_ENV_VAR: &str = "SPORTS_SKILLS_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sports-skills.toml";

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    /// Per-scope budgets keyed by scope name (`espn`, `kalshi`, ...).
    pub rate_limits: HashMap<String, RateBudget>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..RetryPolicy::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL in seconds forced for every request of a scope. Zero disables
    /// caching for that scope.
    pub ttl_secs: HashMap<String, u64>,
}

impl CacheConfig {
    pub fn ttl_overrides(&self) -> HashMap<Scope, Duration> {
        Scope::ALL
            .iter()
            .filter_map(|scope| {
                self.ttl_secs
                    .get(scope.as_str())
                    .map(|secs| (*scope, Duration::from_secs(*secs)))
            })
            .collect()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// `$SPORTS_SKILLS_CONFIG` if set, otherwise `sports-skills.toml` when it
    /// exists, otherwise defaults. An explicitly named file must exist.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            debug!(path = %path, "loading config from environment");
            return Self::load(path);
        }
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::load(DEFAULT_CONFIG_FILE);
        }
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// UserConfig
// ---------------------------------------------------------------------------

/// Supported LLM providers and the environment variable each one reads.
pub const PROVIDER_ENV_VARS: [(&str, &str); 4] = [
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("openai", "OPENAI_API_KEY"),
    ("google", "GOOGLE_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
];

/// On-disk shape. Keys are plain strings here and only here.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserConfigFile {
    #[serde(default)]
    api_keys: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exchange: Option<String>,
}

/// Agent preferences and provider API keys.
#[derive(Debug, Default)]
pub struct UserConfig {
    pub api_keys: BTreeMap<String, SecretString>,
    pub model: Option<String>,
    pub sport: Option<String>,
    pub mode: Option<String>,
    pub exchange: Option<String>,
}

impl UserConfig {
    /// `<config_dir>/sports-agent/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sports-agent").join("config.json"))
    }

    /// Load from `path`. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no user config found");
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read user config from {}", path.display()))?;
        let file: UserConfigFile = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse user config from {}", path.display()))?;
        Ok(Self {
            api_keys: file
                .api_keys
                .into_iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k, SecretString::new(v)))
                .collect(),
            model: file.model,
            sport: file.sport,
            mode: file.mode,
            exchange: file.exchange,
        })
    }

    /// Write to `path` (creating parent directories), readable by the owner
    /// only on unix.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config dir {}", dir.display()))?;
        }
        let file = UserConfigFile {
            api_keys: self
                .api_keys
                .iter()
                .map(|(k, v)| (k.clone(), v.expose_secret().clone()))
                .collect(),
            model: self.model.clone(),
            sport: self.sport.clone(),
            mode: self.mode.clone(),
            exchange: self.exchange.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialise user config")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write user config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
        }

        info!(path = %path.display(), "user config saved");
        Ok(())
    }

    pub fn set_api_key(&mut self, provider: &str, key: impl Into<String>) {
        self.api_keys
            .insert(provider.to_string(), SecretString::new(key.into()));
    }

    /// At least one known provider has a key.
    pub fn is_configured(&self) -> bool {
        !self.available_providers().is_empty()
    }

    /// Known providers with a non-empty key, in canonical order.
    pub fn available_providers(&self) -> Vec<&'static str> {
        PROVIDER_ENV_VARS
            .iter()
            .filter(|(provider, _)| {
                self.api_keys
                    .get(*provider)
                    .map(|k| !k.expose_secret().is_empty())
                    .unwrap_or(false)
            })
            .map(|(provider, _)| *provider)
            .collect()
    }

    /// `(ENV_VAR, key)` pairs for configured providers. The caller decides
    /// whether to put them in the process environment.
    pub fn export_api_keys(&self) -> Vec<(&'static str, String)> {
        PROVIDER_ENV_VARS
            .iter()
            .filter_map(|(provider, env_var)| {
                self.api_keys
                    .get(*provider)
                    .map(|k| k.expose_secret().clone())
                    .filter(|k| !k.is_empty())
                    .map(|k| (*env_var, k))
            })
            .collect()
    }
}
