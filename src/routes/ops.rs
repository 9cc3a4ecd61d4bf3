//! Read-only REST views used by dashboards on first load.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use crate::roles::{RoleError, View, authorize, mode_label, nav_items};
use crate::routes::auth::AuthUser;
use crate::services::shift;
use crate::state::AppState;

fn role_error_to_status(err: RoleError) -> StatusCode {
    match err {
        RoleError::Forbidden(_) | RoleError::ShiftRequired => StatusCode::FORBIDDEN,
    }
}

/// `GET /api/state`: snapshot of the shared store.
pub async fn snapshot(State(state): State<AppState>, _auth: AuthUser) -> Json<serde_json::Value> {
    Json(state.store.read().await.snapshot())
}

/// `GET /api/nav`: sidebar for the session's mode.
pub async fn nav(auth: AuthUser) -> Json<serde_json::Value> {
    let session = &auth.session;
    Json(json!({
        "mode": session.mode,
        "mode_label": mode_label(session.mode),
        "on_shift": session.on_shift,
        "nav": nav_items(session.mode, session.on_shift),
    }))
}

#[derive(Deserialize)]
pub struct CheckInLogQuery {
    #[serde(default)]
    q: String,
}

/// `GET /api/check-ins?q=`: filtered check-in log with stats.
pub async fn check_ins(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CheckInLogQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    authorize(auth.session.mode, auth.session.on_shift, &[View::CheckInLog]).map_err(role_error_to_status)?;

    let store = state.store.read().await;
    let records = store.check_ins.filter(&query.q);
    Ok(Json(json!({
        "stats": shift::stats(&records),
        "records": records,
    })))
}

#[cfg(test)]
#[path = "ops_test.rs"]
mod tests;
