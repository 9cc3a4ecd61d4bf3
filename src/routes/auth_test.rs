use super::*;
use crate::state::test_helpers;
use axum::extract::FromRequestParts;
use axum::http::{Request, header};

async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    serde_json::from_slice(&bytes).expect("body should be json")
}

fn cookie_token(resp: &Response) -> String {
    let raw = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    let cookie = Cookie::parse(raw.to_owned()).expect("cookie should parse");
    cookie.value().to_owned()
}

async fn extract(state: &AppState, token: &str) -> Result<AuthUser, StatusCode> {
    let (mut parts, ()) = Request::builder()
        .header(header::COOKIE, format!("{COOKIE_NAME}={token}"))
        .body(())
        .unwrap()
        .into_parts();
    AuthUser::from_request_parts(&mut parts, state).await
}

fn login_body(staff_id: &str, password: &str) -> Json<LoginRequest> {
    Json(LoginRequest { staff_id: staff_id.into(), password: password.into() })
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_opens_session_and_sets_cookie() {
    let state = test_helpers::test_app_state();
    let resp = login(State(state.clone()), login_body("SEC-07", "secret")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let token = cookie_token(&resp);
    let body = body_json(resp).await;
    assert_eq!(body["mode"], "SECURITY_CREW");
    assert_eq!(body["staff"]["staff_id"], "SEC-07");
    assert_eq!(body["on_shift"], false);

    let auth = extract(&state, &token).await.expect("cookie should authenticate");
    assert_eq!(auth.session.staff.staff_id, "SEC-07");
}

#[tokio::test]
async fn login_surfaces_upstream_message() {
    let state = test_helpers::test_app_state();
    let resp = login(State(state.clone()), login_body("SEC-07", "wrong")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "Invalid credentials");
    assert!(state.sessions.read().await.is_empty());
}

#[tokio::test]
async fn locked_account_returns_423_with_until() {
    let state = test_helpers::test_app_state();
    let resp = login(State(state), login_body("LOCKED-01", "secret")).await;
    assert_eq!(resp.status(), StatusCode::LOCKED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], ACCOUNT_LOCKED);
    assert_eq!(body["locked_until"], "2026-01-01T10:00:00Z");
}

#[tokio::test]
async fn login_requires_both_fields() {
    let state = test_helpers::test_app_state();
    let resp = login(State(state), login_body("  ", "secret")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "staff_id required");
}

#[test]
fn connection_errors_map_to_bad_gateway() {
    let resp = auth_error_response(&AuthApiError::Connection("refused".into()));
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

// =============================================================================
// recovery
// =============================================================================

#[tokio::test]
async fn recovery_flow_walks_steps() {
    let state = test_helpers::test_app_state();

    let resp = request_password_reset(
        State(state.clone()),
        Json(ResetRequest { phone_number: "+15550100".into() }),
    )
    .await;
    assert_eq!(body_json(resp).await["next_step"], "VERIFY_OTP");

    let resp = verify_otp(
        State(state.clone()),
        Json(VerifyOtpRequest { phone_number: "+15550100".into(), otp_6_digit: "123456".into() }),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["reset_token"], "reset-token");
    assert_eq!(body["next_step"], "RESET_PASSWORD");

    let resp = reset_password(
        State(state),
        Json(ResetPasswordRequest {
            reset_token: "reset-token".into(),
            new_password: "n3w".into(),
            confirm_password: "n3w".into(),
        }),
    )
    .await;
    assert_eq!(body_json(resp).await["next_step"], "LOGIN");
}

#[tokio::test]
async fn short_otp_rejected_locally() {
    let state = test_helpers::test_app_state();
    let resp = verify_otp(
        State(state),
        Json(VerifyOtpRequest { phone_number: "+15550100".into(), otp_6_digit: "12345".into() }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mismatched_passwords_rejected_locally() {
    let state = test_helpers::test_app_state();
    let resp = reset_password(
        State(state),
        Json(ResetPasswordRequest {
            reset_token: "reset-token".into(),
            new_password: "one".into(),
            confirm_password: "two".into(),
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Passwords do not match");
}

// =============================================================================
// session
// =============================================================================

#[tokio::test]
async fn missing_or_unknown_cookie_is_unauthorized() {
    let state = test_helpers::test_app_state();
    assert_eq!(extract(&state, "").await.err(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(extract(&state, "deadbeef").await.err(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn logout_terminates_session() {
    let state = test_helpers::test_app_state();
    let (token, key) = test_helpers::seed_session(&state, "FNB-01", AppMode::Fnb).await;
    let (_, mut rx) = test_helpers::connect_client(&state, &key, "FNB-01").await;
    let auth = extract(&state, &token).await.unwrap();

    let resp = logout(State(state.clone()), auth).await.into_response();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let frame = rx.try_recv().expect("terminate frame");
    assert_eq!(frame.str_field("reason"), Some(LOGGED_OUT));
    assert!(extract(&state, &token).await.is_err());
}

#[tokio::test]
async fn ws_ticket_is_single_use() {
    let state = test_helpers::test_app_state();
    let (token, key) = test_helpers::seed_session(&state, "RUN-01", AppMode::Runner).await;
    let auth = extract(&state, &token).await.unwrap();

    let Json(body) = ws_ticket(State(state.clone()), auth).await;
    let ticket = body["ticket"].as_str().unwrap().to_owned();

    let mut sessions = state.sessions.write().await;
    assert_eq!(sessions.consume_ws_ticket(&ticket), Some(key));
    assert_eq!(sessions.consume_ws_ticket(&ticket), None);
}

#[tokio::test]
async fn set_mode_rebuilds_nav_and_notifies_sockets() {
    let state = test_helpers::test_app_state();
    let (token, key) = test_helpers::seed_session(&state, "MNT-01", AppMode::InternalMaintenance).await;
    let (_, mut rx) = test_helpers::connect_client(&state, &key, "MNT-01").await;
    let auth = extract(&state, &token).await.unwrap();

    let Json(body) = set_mode(State(state.clone()), auth, Json(ModeRequest { mode: AppMode::ServiceCrew }))
        .await
        .unwrap();
    assert_eq!(body["mode"], "SERVICE_CREW");
    assert_eq!(body["nav"][0]["label"], "Ticket Validation");

    let frame = rx.try_recv().expect("nav frame");
    assert_eq!(frame.syscall, "nav:mode");
    assert_eq!(state.sessions.read().await.get(&key).unwrap().mode, AppMode::ServiceCrew);
}
