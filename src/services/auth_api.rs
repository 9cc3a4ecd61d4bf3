//! Auth API client: staff login and password recovery against the external
//! auth service.
//!
//! DESIGN
//! ======
//! Thin HTTP wrapper over four endpoints. Parsing of upstream bodies is kept
//! in pure functions for testability. Local validation (OTP shape, password
//! confirmation) happens before anything is sent upstream.
//!
//! ERROR HANDLING
//! ==============
//! No retries or backoff. Transport failures surface as "Connection error";
//! non-2xx responses surface the upstream `error` string, or a per-endpoint
//! fallback when the body carries none. `ACCOUNT_LOCKED` keeps its
//! `locked_until` timestamp.

use std::time::Duration;

use serde_json::{Value, json};

use crate::frame::ErrorCode;
use crate::services::session::StaffMember;

pub const ACCOUNT_LOCKED: &str = "ACCOUNT_LOCKED";

const LOGIN_FAILED: &str = "Login failed";
const RESET_REQUEST_FAILED: &str = "Failed to request reset";
const VERIFY_FAILED: &str = "Verification failed";
const RESET_FAILED: &str = "Reset failed";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthApiError {
    #[error("Account locked until {locked_until}")]
    AccountLocked { locked_until: String },
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Connection error")]
    Connection(String),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("OTP must be 6 digits")]
    InvalidOtp,
    #[error("{0} required")]
    MissingField(&'static str),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for AuthApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AccountLocked { .. } => ACCOUNT_LOCKED,
            Self::Rejected { .. } => "E_AUTH_REJECTED",
            Self::Connection(_) => "E_AUTH_CONNECTION",
            Self::PasswordMismatch => "E_PASSWORD_MISMATCH",
            Self::InvalidOtp => "E_INVALID_OTP",
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

// =============================================================================
// RECOVERY FLOW
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryStep {
    Login,
    ForgotPassword,
    VerifyOtp,
    ResetPassword,
}

impl RecoveryStep {
    /// Step shown after the current one succeeds.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Login => Self::ForgotPassword,
            Self::ForgotPassword => Self::VerifyOtp,
            Self::VerifyOtp => Self::ResetPassword,
            Self::ResetPassword => Self::Login,
        }
    }
}

// =============================================================================
// LOCAL VALIDATION
// =============================================================================

/// # Errors
///
/// `MissingField` when the trimmed value is empty.
pub fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, AuthApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthApiError::MissingField(field));
    }
    Ok(value)
}

/// # Errors
///
/// `InvalidOtp` unless the code is exactly six ASCII digits.
pub fn validate_otp(otp: &str) -> Result<(), AuthApiError> {
    let otp = otp.trim();
    if otp.len() == 6 && otp.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AuthApiError::InvalidOtp)
    }
}

/// # Errors
///
/// `PasswordMismatch` when the confirmation differs.
pub fn check_passwords(new_password: &str, confirm_password: &str) -> Result<(), AuthApiError> {
    if new_password != confirm_password {
        return Err(AuthApiError::PasswordMismatch);
    }
    required(new_password, "new_password").map(|_| ())
}

// =============================================================================
// TRAIT
// =============================================================================

/// External auth service. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// # Errors
    ///
    /// Upstream rejection, account lock, or transport failure.
    async fn login(&self, staff_id: &str, password: &str) -> Result<StaffMember, AuthApiError>;

    /// # Errors
    ///
    /// Upstream rejection or transport failure.
    async fn request_password_reset(&self, phone_number: &str) -> Result<(), AuthApiError>;

    /// Returns the reset token.
    ///
    /// # Errors
    ///
    /// Upstream rejection or transport failure.
    async fn verify_otp(&self, phone_number: &str, otp: &str) -> Result<String, AuthApiError>;

    /// # Errors
    ///
    /// Upstream rejection or transport failure.
    async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<(), AuthApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// # Errors
    ///
    /// `HttpClientBuild` if the underlying client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    async fn post(&self, path: &str, body: &Value, fallback: &'static str) -> Result<Value, AuthApiError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthApiError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthApiError::Connection(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(parse_error(status, &text, fallback));
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, staff_id: &str, password: &str) -> Result<StaffMember, AuthApiError> {
        let body = self
            .post("/api/auth/login", &json!({ "staff_id": staff_id, "password": password }), LOGIN_FAILED)
            .await?;
        parse_staff(&body).ok_or(AuthApiError::Rejected { status: 502, message: LOGIN_FAILED.to_owned() })
    }

    async fn request_password_reset(&self, phone_number: &str) -> Result<(), AuthApiError> {
        self.post(
            "/api/auth/request-password-reset",
            &json!({ "phone_number": phone_number }),
            RESET_REQUEST_FAILED,
        )
        .await
        .map(|_| ())
    }

    async fn verify_otp(&self, phone_number: &str, otp: &str) -> Result<String, AuthApiError> {
        let body = self
            .post(
                "/api/auth/verify-otp",
                &json!({ "phone_number": phone_number, "otp_6_digit": otp }),
                VERIFY_FAILED,
            )
            .await?;
        body.get("reset_token")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(AuthApiError::Rejected { status: 502, message: VERIFY_FAILED.to_owned() })
    }

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<(), AuthApiError> {
        self.post(
            "/api/auth/reset-password",
            &json!({ "reset_token": reset_token, "new_password": new_password }),
            RESET_FAILED,
        )
        .await
        .map(|_| ())
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Map a non-2xx upstream response to an error.
#[must_use]
pub fn parse_error(status: u16, body: &str, fallback: &str) -> AuthApiError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error = parsed.get("error").and_then(Value::as_str).filter(|s| !s.is_empty());
    if error == Some(ACCOUNT_LOCKED) {
        let locked_until = match parsed.get("locked_until") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        return AuthApiError::AccountLocked { locked_until };
    }
    AuthApiError::Rejected { status, message: error.unwrap_or(fallback).to_owned() }
}

fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Extract the staff profile from a login body. The profile may sit under
/// `staff` or `user`, or be the body itself.
#[must_use]
pub fn parse_staff(body: &Value) -> Option<StaffMember> {
    let profile = body.get("staff").or_else(|| body.get("user")).unwrap_or(body);
    let staff_id = text_field(profile, &["staff_id", "staffId", "id"])?;
    Some(StaffMember {
        name: text_field(profile, &["name"]).unwrap_or_else(|| staff_id.clone()),
        role: text_field(profile, &["role"]).unwrap_or_default(),
        current_zone_id: text_field(profile, &["current_zone_id", "currentZoneId"]),
        staff_id,
    })
}

#[cfg(test)]
#[path = "auth_api_test.rs"]
mod tests;
