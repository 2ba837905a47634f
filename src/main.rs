//! sports-skills binary.
//!
//! Loads `.env` and the optional TOML config, initialises logging on stderr,
//! runs one CLI command and exits with its status code.

use clap::Parser;
use std::process::ExitCode;

use sports_skills::cli::{self, Cli, CliOutput};
use sports_skills::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv::dotenv();

    let args = Cli::parse();
    let cfg = AppConfig::discover();
    init_logging();

    let out = match cli::startup(cfg) {
        Ok(skills) => cli::run(args, &skills).await,
        Err(out) => out,
    };
    emit(&out)
}

fn emit(out: &CliOutput) -> ExitCode {
    println!("{}", out.stdout.trim_end());
    if let Some(err) = &out.stderr {
        eprintln!("{err}");
    }
    ExitCode::from(out.code as u8)
}

/// Initialise the `tracing` subscriber. Logs go to stderr; stdout is
/// reserved for JSON envelopes.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sports_skills=warn"));

    if std::env::var("SPORTS_SKILLS_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
