//! Service configuration: environment variables with typed fallbacks.
//!
//! DESIGN
//! ======
//! Every knob has a default. Numeric values that fail to parse fall back to
//! their default. TTLs and time limits are capped at one year. Malformed
//! clock times are an error.

use std::str::FromStr;
use std::time::Duration;

use time::{Time, UtcOffset};

// =============================================================================
// DEFAULTS
// =============================================================================

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_AUTH_API_BASE_URL: &str = "http://127.0.0.1:4000";
pub const DEFAULT_AUTH_API_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SHIFT_START: &str = "08:00";
pub const DEFAULT_SHIFT_END: &str = "17:00";
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 20;
pub const DEFAULT_RESTOCK_QUANTITY: u32 = 50;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;
pub const DEFAULT_WS_TICKET_TTL_SECS: u64 = 30;
pub const DEFAULT_VENDOR_TIME_LIMIT_MINUTES: u64 = 15;
pub const DEFAULT_FRIDGE_JITTER_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_SCAN_SPEED_FACTOR: f64 = 1.0;
/// Upper bound for every configured TTL and time limit.
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be HH:MM, got {value:?}")]
    InvalidClock { key: &'static str, value: String },
    #[error("shift end {end} must be after shift start {start}")]
    EmptyShift { start: Time, end: Time },
    #[error("SHIFT_UTC_OFFSET_HOURS out of range: {0}")]
    InvalidOffset(i8),
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub auth_api_base_url: String,
    pub auth_api_timeout: Duration,
    pub shift_start: Time,
    pub shift_end: Time,
    /// Offset applied to UTC when computing the local shift clock.
    pub utc_offset: UtcOffset,
    pub low_stock_threshold: u32,
    pub restock_default_quantity: u32,
    pub session_ttl: Duration,
    pub ws_ticket_ttl: Duration,
    pub vendor_time_limit: Duration,
    pub fridge_jitter_interval: Duration,
    /// Multiplier applied to every scan tick and settle delay.
    pub scan_speed_factor: f64,
    pub cookie_secure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_api_base_url: DEFAULT_AUTH_API_BASE_URL.to_owned(),
            auth_api_timeout: Duration::from_secs(DEFAULT_AUTH_API_TIMEOUT_SECS),
            shift_start: Time::from_hms(8, 0, 0).unwrap_or(Time::MIDNIGHT),
            shift_end: Time::from_hms(17, 0, 0).unwrap_or(Time::MIDNIGHT),
            utc_offset: UtcOffset::UTC,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            restock_default_quantity: DEFAULT_RESTOCK_QUANTITY,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            ws_ticket_ttl: Duration::from_secs(DEFAULT_WS_TICKET_TTL_SECS),
            vendor_time_limit: Duration::from_secs(DEFAULT_VENDOR_TIME_LIMIT_MINUTES * 60),
            fridge_jitter_interval: Duration::from_millis(DEFAULT_FRIDGE_JITTER_INTERVAL_MS),
            scan_speed_factor: DEFAULT_SCAN_SPEED_FACTOR,
            cookie_secure: false,
        }
    }
}

impl Config {
    /// Build configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a shift clock time is malformed, the shift window
    /// is empty, or the UTC offset is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let shift_start = parse_clock("SHIFT_START", &env_string("SHIFT_START", DEFAULT_SHIFT_START))?;
        let shift_end = parse_clock("SHIFT_END", &env_string("SHIFT_END", DEFAULT_SHIFT_END))?;
        if shift_end <= shift_start {
            return Err(ConfigError::EmptyShift { start: shift_start, end: shift_end });
        }

        let offset_hours: i8 = env_parse("SHIFT_UTC_OFFSET_HOURS", 0);
        let utc_offset =
            UtcOffset::from_hms(offset_hours, 0, 0).map_err(|_| ConfigError::InvalidOffset(offset_hours))?;

        let scan_speed_factor = env_parse("SCAN_SPEED_FACTOR", DEFAULT_SCAN_SPEED_FACTOR);
        let scan_speed_factor = if scan_speed_factor.is_finite() && scan_speed_factor > 0.0 {
            scan_speed_factor
        } else {
            DEFAULT_SCAN_SPEED_FACTOR
        };

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            auth_api_base_url: env_string("AUTH_API_BASE_URL", DEFAULT_AUTH_API_BASE_URL)
                .trim_end_matches('/')
                .to_owned(),
            auth_api_timeout: env_secs("AUTH_API_TIMEOUT_SECS", DEFAULT_AUTH_API_TIMEOUT_SECS),
            shift_start,
            shift_end,
            utc_offset,
            low_stock_threshold: env_parse("LOW_STOCK_THRESHOLD", DEFAULT_LOW_STOCK_THRESHOLD),
            restock_default_quantity: env_parse("RESTOCK_DEFAULT_QUANTITY", DEFAULT_RESTOCK_QUANTITY),
            session_ttl: env_secs("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS),
            ws_ticket_ttl: env_secs("WS_TICKET_TTL_SECS", DEFAULT_WS_TICKET_TTL_SECS),
            vendor_time_limit: env_minutes("VENDOR_TIME_LIMIT_MINUTES", DEFAULT_VENDOR_TIME_LIMIT_MINUTES),
            fridge_jitter_interval: Duration::from_millis(
                env_parse("FRIDGE_JITTER_INTERVAL_MS", DEFAULT_FRIDGE_JITTER_INTERVAL_MS).max(1),
            ),
            scan_speed_factor,
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
        })
    }

    /// Scale a scan delay by the configured speed factor.
    #[must_use]
    pub fn scaled(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.scan_speed_factor)
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse an `HH:MM` clock time.
///
/// # Errors
///
/// Returns `InvalidClock` when the value is not a valid 24-hour time.
pub fn parse_clock(key: &'static str, raw: &str) -> Result<Time, ConfigError> {
    let invalid = || ConfigError::InvalidClock { key, value: raw.to_owned() };
    let (hours, minutes) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u8 = hours.parse().map_err(|_| invalid())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
    Time::from_hms(hours, minutes, 0).map_err(|_| invalid())
}

pub(crate) fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// A seconds value capped at `MAX_TTL_SECS`.
pub(crate) fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(env_parse(key, default).min(MAX_TTL_SECS))
}

/// A minutes value capped at `MAX_TTL_SECS`.
pub(crate) fn env_minutes(key: &str, default: u64) -> Duration {
    Duration::from_secs(env_parse(key, default).saturating_mul(60).min(MAX_TTL_SECS))
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
