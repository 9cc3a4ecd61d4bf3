//! Alerts: broadcast announcements and red alerts.
//!
//! An alert is "red" when its severity is high or critical, or when it is a
//! health pulse. Everything else is a plain announcement.

use serde::{Deserialize, Serialize};

use crate::frame::{ErrorCode, now_ms};

pub const HEALTH_PULSE: &str = "health_pulse";
pub const SECURITY_ALERT: &str = "security";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub alert_type: String,
    pub zone_id: Option<String>,
    pub created_at: i64,
    pub acknowledged_by: Vec<String>,
    pub resolved: bool,
}

impl Alert {
    #[must_use]
    pub fn is_red(&self) -> bool {
        matches!(self.severity, AlertSeverity::High | AlertSeverity::Critical) || self.alert_type == HEALTH_PULSE
    }
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub alert_type: String,
    pub zone_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert not found: {0}")]
    NotFound(String),
    #[error("alert title required")]
    EmptyTitle,
}

impl ErrorCode for AlertError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ALERT_NOT_FOUND",
            Self::EmptyTitle => "E_ALERT_TITLE",
        }
    }
}

#[derive(Debug, Default)]
pub struct AlertBoard {
    alerts: Vec<Alert>,
    next_seq: u32,
}

impl AlertBoard {
    /// # Errors
    ///
    /// `EmptyTitle` for blank titles.
    pub fn raise(&mut self, new: NewAlert) -> Result<Alert, AlertError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(AlertError::EmptyTitle);
        }
        self.next_seq += 1;
        let alert = Alert {
            id: format!("ALT-{:03}", self.next_seq),
            title: title.to_owned(),
            message: new.message,
            severity: new.severity,
            alert_type: new.alert_type,
            zone_id: new.zone_id,
            created_at: now_ms(),
            acknowledged_by: Vec::new(),
            resolved: false,
        };
        self.alerts.push(alert.clone());
        Ok(alert)
    }

    /// Record that `staff_id` has seen the alert. Idempotent per staff member.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown IDs.
    pub fn acknowledge(&mut self, id: &str, staff_id: &str) -> Result<Alert, AlertError> {
        let alert = self.get_mut(id)?;
        if !alert.acknowledged_by.iter().any(|s| s == staff_id) {
            alert.acknowledged_by.push(staff_id.to_owned());
        }
        Ok(alert.clone())
    }

    /// # Errors
    ///
    /// `NotFound` for unknown IDs.
    pub fn resolve(&mut self, id: &str) -> Result<Alert, AlertError> {
        let alert = self.get_mut(id)?;
        alert.resolved = true;
        Ok(alert.clone())
    }

    /// Unresolved red alerts, newest first.
    #[must_use]
    pub fn red_alerts(&self) -> Vec<&Alert> {
        self.alerts.iter().rev().filter(|a| !a.resolved && a.is_red()).collect()
    }

    /// Everything that is not a red alert, newest first.
    #[must_use]
    pub fn announcements(&self) -> Vec<&Alert> {
        self.alerts.iter().rev().filter(|a| !a.is_red()).collect()
    }

    /// First unresolved red alert for a zone.
    #[must_use]
    pub fn active_red_in_zone(&self, zone_id: &str) -> Option<&Alert> {
        self.alerts
            .iter()
            .find(|a| !a.resolved && a.is_red() && a.zone_id.as_deref() == Some(zone_id))
    }

    /// Whether `staff_id` has unacknowledged announcements.
    #[must_use]
    pub fn has_unread(&self, staff_id: &str) -> bool {
        self.alerts
            .iter()
            .filter(|a| !a.resolved)
            .any(|a| !a.acknowledged_by.iter().any(|s| s == staff_id))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Alert, AlertError> {
        self.alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AlertError::NotFound(id.to_owned()))
    }
}

#[cfg(test)]
#[path = "alerts_test.rs"]
mod tests;
