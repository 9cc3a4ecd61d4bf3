//! Auth routes: staff login via the external auth API, password recovery,
//! local sessions, WS tickets.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use time::Duration;
use tracing::{info, warn};

use crate::frame::{Data, Frame};
use crate::roles::{AppMode, mode_label, nav_items};
use crate::services::auth_api::{
    ACCOUNT_LOCKED, AuthApiError, RecoveryStep, check_passwords, required, validate_otp,
};
use crate::services::hub;
use crate::services::session::Session;
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";
pub const LOGGED_OUT: &str = "LOGGED_OUT";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated staff session extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub session_key: String,
    pub session: Session,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let sessions = app_state.sessions.read().await;
        let (session_key, session) = sessions.validate(token).ok_or(StatusCode::UNAUTHORIZED)?;
        Ok(Self { session_key, session: session.clone() })
    }
}

fn session_cookie(value: String, secure: bool, max_age: Option<Duration>) -> Cookie<'static> {
    let mut cookie = Cookie::build((COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);
    if let Some(max_age) = max_age {
        cookie = cookie.max_age(max_age);
    }
    cookie.build()
}

/// Map an auth API failure onto an HTTP response carrying the message the
/// login form shows.
fn auth_error_response(err: &AuthApiError) -> Response {
    match err {
        AuthApiError::AccountLocked { locked_until } => (
            StatusCode::LOCKED,
            Json(json!({ "error": ACCOUNT_LOCKED, "locked_until": locked_until })),
        )
            .into_response(),
        AuthApiError::Rejected { status, message } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(json!({ "error": message }))).into_response()
        }
        AuthApiError::Connection(detail) => {
            warn!(error = %detail, "auth api unreachable");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": err.to_string() }))).into_response()
        }
        AuthApiError::HttpClientBuild(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": err.to_string() }))).into_response()
        }
        AuthApiError::PasswordMismatch | AuthApiError::InvalidOtp | AuthApiError::MissingField(_) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

fn session_view(session: &Session) -> serde_json::Value {
    json!({
        "staff": session.staff,
        "mode": session.mode,
        "mode_label": mode_label(session.mode),
        "on_shift": session.on_shift,
        "nav": nav_items(session.mode, session.on_shift),
    })
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    staff_id: String,
    #[serde(default)]
    password: String,
}

/// `POST /api/auth/login`: authenticate upstream, open a local session,
/// set the session cookie.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Response {
    let staff_id = match required(&body.staff_id, "staff_id") {
        Ok(v) => v,
        Err(e) => return auth_error_response(&e),
    };
    if let Err(e) = required(&body.password, "password") {
        return auth_error_response(&e);
    }

    let staff = match state.auth_api.login(staff_id, &body.password).await {
        Ok(staff) => staff,
        Err(e) => {
            info!(%staff_id, error = %e, "login rejected");
            return auth_error_response(&e);
        }
    };

    let mode = AppMode::from_role(&staff.role);
    let token = state.sessions.write().await.create(staff.clone(), mode);
    info!(staff_id = %staff.staff_id, ?mode, "staff logged in");

    let cookie = session_cookie(token, state.config.cookie_secure, None);
    let jar = CookieJar::new().add(cookie);
    let body = json!({
        "staff": staff,
        "mode": mode,
        "mode_label": mode_label(mode),
        "on_shift": false,
        "nav": nav_items(mode, false),
    });
    (jar, Json(body)).into_response()
}

// =============================================================================
// PASSWORD RECOVERY
// =============================================================================

#[derive(Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    phone_number: String,
}

/// `POST /api/auth/request-password-reset`: send an OTP to the phone.
pub async fn request_password_reset(State(state): State<AppState>, Json(body): Json<ResetRequest>) -> Response {
    let phone = match required(&body.phone_number, "phone_number") {
        Ok(v) => v,
        Err(e) => return auth_error_response(&e),
    };
    match state.auth_api.request_password_reset(phone).await {
        Ok(()) => Json(json!({ "next_step": RecoveryStep::ForgotPassword.next() })).into_response(),
        Err(e) => auth_error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    phone_number: String,
    #[serde(default)]
    otp_6_digit: String,
}

/// `POST /api/auth/verify-otp`: exchange the OTP for a reset token.
pub async fn verify_otp(State(state): State<AppState>, Json(body): Json<VerifyOtpRequest>) -> Response {
    let phone = match required(&body.phone_number, "phone_number") {
        Ok(v) => v,
        Err(e) => return auth_error_response(&e),
    };
    if let Err(e) = validate_otp(&body.otp_6_digit) {
        return auth_error_response(&e);
    }
    match state.auth_api.verify_otp(phone, body.otp_6_digit.trim()).await {
        Ok(reset_token) => Json(json!({
            "reset_token": reset_token,
            "next_step": RecoveryStep::VerifyOtp.next(),
        }))
        .into_response(),
        Err(e) => auth_error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    reset_token: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

/// `POST /api/auth/reset-password`: set a new password. Mismatched
/// confirmations never leave the service.
pub async fn reset_password(State(state): State<AppState>, Json(body): Json<ResetPasswordRequest>) -> Response {
    if let Err(e) = check_passwords(&body.new_password, &body.confirm_password) {
        return auth_error_response(&e);
    }
    let token = match required(&body.reset_token, "reset_token") {
        Ok(v) => v,
        Err(e) => return auth_error_response(&e),
    };
    match state.auth_api.reset_password(token, &body.new_password).await {
        Ok(()) => Json(json!({ "next_step": RecoveryStep::ResetPassword.next() })).into_response(),
        Err(e) => auth_error_response(&e),
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// `GET /api/auth/me`: return the current session.
pub async fn me(auth: AuthUser) -> Json<serde_json::Value> {
    Json(session_view(&auth.session))
}

/// `POST /api/auth/logout`: delete session, close its sockets, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    hub::terminate_session(&state, &auth.session_key, LOGGED_OUT).await;

    let cookie = session_cookie(String::new(), state.config.cookie_secure, Some(Duration::ZERO));
    let jar = CookieJar::new().add(cookie);
    (jar, StatusCode::NO_CONTENT)
}

/// `POST /api/auth/ws-ticket`: create a one-time WS ticket.
pub async fn ws_ticket(State(state): State<AppState>, auth: AuthUser) -> Json<serde_json::Value> {
    let ticket = state.sessions.write().await.create_ws_ticket(&auth.session_key);
    Json(json!({ "ticket": ticket }))
}

#[derive(Deserialize)]
pub struct ModeRequest {
    mode: AppMode,
}

/// `PATCH /api/auth/mode`: switch the session's dashboard mode.
pub async fn set_mode(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ModeRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let view = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&auth.session_key).ok_or(StatusCode::UNAUTHORIZED)?;
        session.set_mode(body.mode);
        session_view(session)
    };
    info!(staff_id = %auth.session.staff.staff_id, mode = ?body.mode, "mode changed");

    let mut data = Data::new();
    if let serde_json::Value::Object(map) = &view {
        data.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    hub::send_to_session(&state, &auth.session_key, &Frame::request("nav:mode", data)).await;
    Ok(Json(view))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
