//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! HTTP covers authentication, session housekeeping, and first-load reads.
//! Every dashboard operation after that travels over the websocket at
//! `/api/ws` as syscall frames handled in `handlers`.

pub mod auth;
pub(crate) mod handlers;
pub mod ops;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/request-password-reset", post(auth::request_password_reset))
        .route("/api/auth/verify-otp", post(auth::verify_otp))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/ws-ticket", post(auth::ws_ticket))
        .route("/api/auth/mode", patch(auth::set_mode))
        .route("/api/state", get(ops::snapshot))
        .route("/api/nav", get(ops::nav))
        .route("/api/check-ins", get(ops::check_ins))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
