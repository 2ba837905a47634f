//! Shared types for sports-skills.
//!
//! The response envelope returned by every public entry point, the
//! `Outcome` connectors produce, and the crate-level error type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::http::FetchError;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The `{status, data, message}` wrapper returned by every connector call,
/// printed by the CLI and handed to agent tools as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: bool,
    pub data: Value,
    pub message: String,
}

impl Envelope {
    pub fn success(data: Value, message: impl Into<String>) -> Self {
        Self {
            status: true,
            data,
            message: message.into(),
        }
    }

    /// A failure envelope. An empty message is replaced so that a failed
    /// envelope always says something.
    pub fn failure(message: impl Into<String>, data: Option<Value>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "Unknown error".to_string();
        }
        Self {
            status: false,
            data: data.unwrap_or(Value::Null),
            message,
        }
    }

    /// Normalize a raw JSON result into an envelope.
    ///
    /// - an object that already has `status` and `data` is returned unchanged
    /// - `{"error": true, "message": ...}` becomes a failure
    /// - anything else is wrapped as success data
    pub fn wrap(raw: Value) -> Self {
        if let Value::Object(map) = &raw {
            if let (Some(Value::Bool(status)), Some(data)) = (map.get("status"), map.get("data")) {
                return Self {
                    status: *status,
                    data: data.clone(),
                    message: map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                };
            }
            if map.get("error").map(crate::json::is_truthy).unwrap_or(false) {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error");
                return Self::failure(message, None);
            }
        }
        Self::success(raw, "")
    }

    pub fn is_success(&self) -> bool {
        self.status
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "data": self.data,
            "message": self.message,
        })
    }

    /// Pretty-printed JSON, the CLI output format.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_else(|_| {
            format!(r#"{{"status": false, "data": null, "message": "{}"}}"#, self.message)
        })
    }

    /// Compact JSON, the agent tool output format.
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What a connector command produces. Converts losslessly into `Envelope`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { data: Value, message: String },
    Failure { message: String, data: Option<Value> },
}

impl Outcome {
    /// Success from any serializable payload.
    pub fn ok<T: Serialize>(data: T) -> Self {
        Self::ok_with(data, "")
    }

    pub fn ok_with<T: Serialize>(data: T, message: impl Into<String>) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Outcome::Success {
                data,
                message: message.into(),
            },
            Err(e) => Outcome::fail(format!("Failed to serialize result: {e}")),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Outcome::Failure {
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success { message, .. } | Outcome::Failure { message, .. } => message,
        }
    }

    pub fn into_envelope(self) -> Envelope {
        self.into()
    }
}

impl From<Outcome> for Envelope {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success { data, message } => Envelope::success(data, message),
            Outcome::Failure { message, data } => Envelope::failure(message, data),
        }
    }
}

impl From<SkillsError> for Outcome {
    fn from(err: SkillsError) -> Self {
        Outcome::fail(err.to_string())
    }
}

impl<T: Serialize> From<Result<T, SkillsError>> for Outcome {
    fn from(result: Result<T, SkillsError>) -> Self {
        match result {
            Ok(data) => Outcome::ok(data),
            Err(e) => e.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

/// Home or away side of a two-team event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
    Home,
    Away,
}

impl fmt::Display for HomeAway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeAway::Home => write!(f, "home"),
            HomeAway::Away => write!(f, "away"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

fn flag_list(names: &[String]) -> String {
    names.iter().map(|p| format!("--{p}")).collect::<Vec<_>>().join(", ")
}

/// Crate-level error. Every variant renders to the message placed in a
/// failure envelope.
#[derive(Debug, thiserror::Error)]
pub enum SkillsError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Missing required params: {}", flag_list(.0))]
    MissingParams(Vec<String>),

    #[error("Unknown module '{name}'. Available: {available}")]
    UnknownModule { name: String, available: String },

    #[error("Unknown command '{command}' for module '{module}'. Available: {available}")]
    UnknownCommand {
        module: String,
        command: String,
        available: String,
    },

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    NoData(String),

    #[error("API error: {0}")]
    Upstream(#[from] FetchError),

    #[error("Failed to serialize result: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let e = Envelope::success(json!({"key": "val"}), "ok");
        assert_eq!(e.to_value(), json!({"status": true, "data": {"key": "val"}, "message": "ok"}));
    }

    #[test]
    fn test_failure_envelope_keeps_debug_data() {
        let e = Envelope::failure("broke", Some(json!({"debug": 1})));
        assert!(!e.status);
        assert_eq!(e.data, json!({"debug": 1}));
        assert_eq!(e.message, "broke");
    }

    #[test]
    fn test_failure_message_never_empty() {
        let e = Envelope::failure("", None);
        assert!(!e.message.is_empty());
        assert!(e.data.is_null());
    }

    #[test]
    fn test_wrap_error_dict() {
        let e = Envelope::wrap(json!({"error": true, "message": "X"}));
        assert!(!e.status);
        assert_eq!(e.message, "X");
    }

    #[test]
    fn test_wrap_plain_dict() {
        let e = Envelope::wrap(json!({"any": "dict"}));
        assert!(e.status);
        assert_eq!(e.data, json!({"any": "dict"}));
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let raw = json!({"status": true, "data": [1, 2], "message": "m"});
        let once = Envelope::wrap(raw.clone());
        assert_eq!(once.to_value(), raw);
        let twice = Envelope::wrap(once.to_value());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_wrap_non_object() {
        let e = Envelope::wrap(json!([1, 2, 3]));
        assert!(e.status);
        assert_eq!(e.data, json!([1, 2, 3]));
    }

    #[test]
    fn test_outcome_into_envelope() {
        let e: Envelope = Outcome::ok(json!({"goals": 3})).into();
        assert!(e.status);
        let e: Envelope = Outcome::fail("nope").into();
        assert!(!e.status);
        assert_eq!(e.message, "nope");
    }

    #[test]
    fn test_missing_params_message_lists_names() {
        let err = SkillsError::MissingParams(vec!["team_id".into(), "season".into()]);
        assert_eq!(err.to_string(), "Missing required params: --team_id, --season");
    }

    #[test]
    fn test_encode_error_becomes_failure() {
        use std::collections::BTreeMap;

        fn encode() -> Result<serde_json::Value, SkillsError> {
            let keyed: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
            Ok(serde_json::to_value(keyed)?)
        }
        let err = encode().unwrap_err();
        assert!(matches!(err, SkillsError::Encode(_)));
        let e: Envelope = Outcome::from(err).into();
        assert!(!e.status);
        assert!(e.message.starts_with("Failed to serialize result: "));
    }

    #[test]
    fn test_home_away_serializes_lowercase() {
        assert_eq!(serde_json::to_value(HomeAway::Home).unwrap(), json!("home"));
        assert_eq!(format!("{}", HomeAway::Away), "away");
    }
}
