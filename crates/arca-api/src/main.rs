//! # arca-api: Binary Entry Point
//!
//! Loads configuration, opens the repository, and serves the HTTP API.
//! Set `ARCA_LOG_FORMAT=json` for JSON log lines; `RUST_LOG` controls the
//! filter (default `info`).

use arca_api::config::AppConfig;
use arca_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logs = std::env::var("ARCA_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::load().map_err(|e| {
        tracing::error!("Configuration failed: {e}");
        e
    })?;
    let addr = config.socket_addr();

    let state = AppState::open(config).await.map_err(|e| {
        tracing::error!("Repository initialization failed: {e}");
        e
    })?;
    tracing::info!(
        root = %state.config.root.display(),
        extension = %state.config.package_extension,
        "repository opened"
    );

    let app = arca_api::app(state);

    tracing::info!("Arca API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
