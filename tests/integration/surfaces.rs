//! CLI and agent tools driven through the full registry.

use clap::Parser;
use serde_json::{json, Value};
use std::sync::Arc;

use sports_skills::agent::{Exchange, Mode, ToolCall, ToolRegistry};
use sports_skills::cli::{self, Cli};
use sports_skills::connectors::Skills;
use sports_skills::http::UpstreamClient;

use crate::mock_transport::MockTransport;

const KALSHI_STATUS: &str = r#"{"exchange_active":true,"trading_active":true}"#;

fn skills(mock: &MockTransport) -> Skills {
    Skills::new(Arc::new(UpstreamClient::with_transport(Arc::new(mock.clone()))))
}

#[tokio::test]
async fn test_cli_scoreboard_end_to_end() {
    let mock = MockTransport::new().route("/basketball/nba/scoreboard", 200, r#"{"events":[]}"#);
    let out = cli::run(
        Cli::parse_from(["sports-skills", "nba", "get_scoreboard", "--date=2025-01-15"]),
        &skills(&mock),
    )
    .await;

    assert_eq!(out.code, 0, "{}", out.stdout);
    let env: Value = serde_json::from_str(&out.stdout).unwrap();
    assert_eq!(env["status"], json!(true));
    assert_eq!(env["data"]["count"], json!(0));
    assert!(mock.requests()[0].ends_with("scoreboard?dates=20250115"));
}

#[tokio::test]
async fn test_cli_rejects_before_network() {
    let mock = MockTransport::new();
    let skills = skills(&mock);

    let curling = Cli::parse_from(["sports-skills", "curling", "get_scores"]);
    let unknown = cli::run(curling, &skills).await;
    assert_eq!(unknown.code, 1);

    let missing = cli::run(
        Cli::parse_from(["sports-skills", "kalshi", "get_market_candlesticks", "--ticker=X"]),
        &skills,
    )
    .await;
    assert_eq!(missing.code, 1);
    let env: Value = serde_json::from_str(&missing.stdout).unwrap();
    let message = env["message"].as_str().unwrap();
    for param in ["--series_ticker", "--start_ts", "--end_ts", "--period_interval"] {
        assert!(message.contains(param), "{message}");
    }
    assert!(!message.contains("--ticker,"));

    let bad_int = cli::run(
        Cli::parse_from(["sports-skills", "kalshi", "get_markets", "--limit=lots"]),
        &skills,
    )
    .await;
    assert_eq!(bad_int.code, 1);

    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_cli_upstream_failure_is_envelope() {
    let mock = MockTransport::new().route("/markets/NOPE", 404, "not found");
    let out = cli::run(
        Cli::parse_from(["sports-skills", "kalshi", "get_market", "--ticker=NOPE"]),
        &skills(&mock),
    )
    .await;
    assert_eq!(out.code, 1);
    let env: Value = serde_json::from_str(&out.stdout).unwrap();
    assert_eq!(env["status"], json!(false));
    assert!(env["message"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_agent_betting_tools_run_concurrently() {
    let mock = MockTransport::new()
        .route("/hockey/nhl/scoreboard", 200, r#"{"events":[]}"#)
        .route("/exchange/status", 200, KALSHI_STATUS);
    let registry = ToolRegistry::load(
        Arc::new(skills(&mock)),
        "nhl",
        Mode::Betting,
        Some(Exchange::Kalshi),
    )
    .unwrap();
    assert!(registry.get("polymarket_search_markets").is_none());

    let results = registry
        .call_many(vec![
            ToolCall {
                id: "1".into(),
                name: "nhl_get_scoreboard".into(),
                arguments: json!({}),
            },
            ToolCall {
                id: "2".into(),
                name: "kalshi_get_exchange_status".into(),
                arguments: Value::Null,
            },
        ])
        .await;

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    for r in &results {
        let env: Value = serde_json::from_str(&r.content).unwrap();
        assert_eq!(env["status"], json!(true), "{}", r.content);
    }
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn test_agent_tool_definitions_serialize_as_schema() {
    let registry = ToolRegistry::load(
        Arc::new(skills(&MockTransport::new())),
        "football",
        Mode::General,
        None,
    )
    .unwrap();
    let tool = registry.get("football_get_season_transfers").unwrap();
    let value = serde_json::to_value(tool).unwrap();
    assert_eq!(value["name"], json!("football_get_season_transfers"));
    assert_eq!(value["parameters"]["required"], json!(["season_id"]));
    assert_eq!(
        value["parameters"]["properties"]["tm_player_ids"],
        json!({"type": "array", "items": {"type": "string"}})
    );
    assert!(value.get("module").is_none());
}

#[tokio::test]
async fn test_agent_rejects_non_object_arguments() {
    let registry = ToolRegistry::load(
        Arc::new(skills(&MockTransport::new())),
        "mlb",
        Mode::General,
        None,
    )
    .unwrap();
    let env: Value =
        serde_json::from_str(&registry.call("mlb_get_teams", json!(["x"])).await).unwrap();
    assert_eq!(env["status"], json!(false));
    assert!(env["message"].as_str().unwrap().starts_with("Expected an object of params"));
}

#[cfg(feature = "f1")]
#[tokio::test]
async fn test_f1_tools_load_with_feature() {
    let registry = ToolRegistry::load(
        Arc::new(skills(&MockTransport::new())),
        "f1",
        Mode::General,
        None,
    )
    .unwrap();
    assert!(registry.get("f1_get_race_schedule").is_some());
}

#[cfg(not(feature = "f1"))]
#[tokio::test]
async fn test_f1_unavailable_without_feature() {
    let env = skills(&MockTransport::new())
        .dispatch("f1", "get_race_schedule", &Default::default())
        .await;
    assert!(!env.status);
    assert!(env.message.contains("requires the `f1` feature"));
}
