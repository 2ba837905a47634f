//! sports-skills: sports and prediction-market data behind one envelope.
//!
//! Connectors for ESPN leagues, football (ESPN, FPL, Understat,
//! Transfermarkt), golf, tennis, F1, Kalshi, Polymarket and news feeds share
//! one `UpstreamClient` (cache, rate limits, retry). The same registry backs
//! the CLI and the agent tool surface.

pub mod agent;
pub mod cli;
pub mod config;
pub mod connectors;
pub mod espn;
pub mod http;
pub mod json;
pub mod types;
