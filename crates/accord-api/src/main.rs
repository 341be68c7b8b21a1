//! # accord-api: Binary Entry Point
//!
//! Starts the Axum HTTP server over one in-memory agreement.
//! Reads the agreement config from `ACCORD_CONFIG` (built-in default when
//! unset) and binds to `PORT` (default 8080).

use std::sync::Arc;

use accord_agreement::{AgreementConfig, DEFAULT_CONFIG_YAML};
use accord_api::state::AppState;
use accord_core::SystemClock;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let config = match std::env::var("ACCORD_CONFIG") {
        Ok(path) => {
            tracing::info!(path = %path, "loading agreement config");
            AgreementConfig::from_path(std::path::Path::new(&path))
        }
        Err(_) => {
            tracing::warn!("ACCORD_CONFIG not set, using built-in default agreement");
            AgreementConfig::from_yaml_str(DEFAULT_CONFIG_YAML)
        }
    }
    .map_err(|e| {
        tracing::error!("Config load failed: {e}");
        e
    })?;

    let state = AppState::from_config(&config, Arc::new(SystemClock)).map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;
    tracing::info!(
        setting_id = %state.agreement().current_setting().id,
        arbitrator = %state.agreement().arbitrator_account(),
        "agreement ready"
    );

    let app = accord_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Accord API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
