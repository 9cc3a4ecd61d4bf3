mod config;
mod frame;
mod roles;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use crate::config::Config;
use crate::services::auth_api::HttpAuthApi;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let auth_api = match HttpAuthApi::new(&config.auth_api_base_url, config.auth_api_timeout) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!(error = %e, "auth api client init failed");
            std::process::exit(1);
        }
    };
    tracing::info!(base_url = %config.auth_api_base_url, "auth api configured");

    let port = config.port;
    let state = state::AppState::new(config, Arc::new(auth_api));

    // Fridge jitter, vendor countdowns, session expiry.
    let _telemetry = services::telemetry::spawn_telemetry_task(state.clone());

    let app = routes::app(state);
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %port, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%port, "agartha-ops listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server failed");
    }
}
