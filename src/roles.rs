//! Roles: app modes, console views, and what each mode may see.
//!
//! DESIGN
//! ======
//! A staff session runs in exactly one `AppMode`. The mode decides which
//! console views appear in navigation; a subset of views (the operational
//! dashboards) additionally require the staff member to be checked in to a
//! shift. Websocket operations are gated with the same rules through
//! `views_for_syscall`, so an operation is allowed exactly when one of the
//! views that drives it is usable.

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppMode {
    InternalMaintenance,
    ExternalMaintenance,
    ServiceCrew,
    SecurityCrew,
    HealthCrew,
    CleaningCrew,
    Fnb,
    Runner,
    ExperienceCrew,
    GiftshopCrew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    ZoneCheckIn,
    Service,
    #[serde(rename = "FNB")]
    Fnb,
    Runner,
    Security,
    Health,
    Experience,
    Cleaning,
    DailyChecklist,
    ZoneSurveillance,
    Incidents,
    ShiftSchedule,
    MaintenanceLog,
    CheckInLog,
    GiftShop,
    ExternalMaintenance,
    Announcements,
    Settings,
}

/// One navigation entry as rendered by the console sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub view: View,
    pub label: &'static str,
    /// Shift-gated view shown while the session is off shift.
    pub restricted: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("not available in {0:?} mode")]
    Forbidden(AppMode),
    #[error("check in to a shift first")]
    ShiftRequired,
}

impl crate::frame::ErrorCode for RoleError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::ShiftRequired => "E_SHIFT_REQUIRED",
        }
    }
}

// =============================================================================
// NAVIGATION TABLE
// =============================================================================

/// Sidebar order with default labels.
const NAV_ORDER: [(View, &str); 18] = [
    (View::ZoneCheckIn, "Zone Check-In"),
    (View::Service, "Service Dashboard"),
    (View::Fnb, "F&B Dashboard"),
    (View::Runner, "Runner Dashboard"),
    (View::Security, "Security Tactical"),
    (View::Health, "Medical Triage"),
    (View::Experience, "Experience Control"),
    (View::Cleaning, "Sanitation Command"),
    (View::DailyChecklist, "Daily Checklist"),
    (View::ZoneSurveillance, "Zone Surveillance"),
    (View::Incidents, "Incidents"),
    (View::ShiftSchedule, "Shift Schedule"),
    (View::MaintenanceLog, "Maintenance Tactical"),
    (View::CheckInLog, "Check-In Log"),
    (View::GiftShop, "Retail Control"),
    (View::ExternalMaintenance, "Vendor Portal"),
    (View::Announcements, "Announcements"),
    (View::Settings, "Settings"),
];

const COMMON_VIEWS: [View; 5] =
    [View::ZoneCheckIn, View::Incidents, View::ShiftSchedule, View::Announcements, View::Settings];

// =============================================================================
// QUERIES
// =============================================================================

impl AppMode {
    /// Every mode, in settings-menu order.
    pub const ALL: [AppMode; 10] = [
        AppMode::InternalMaintenance,
        AppMode::ExternalMaintenance,
        AppMode::ServiceCrew,
        AppMode::SecurityCrew,
        AppMode::HealthCrew,
        AppMode::CleaningCrew,
        AppMode::Fnb,
        AppMode::Runner,
        AppMode::ExperienceCrew,
        AppMode::GiftshopCrew,
    ];

    /// Best-effort mapping from an upstream staff role string to a mode.
    /// Unknown roles land in `InternalMaintenance`.
    #[must_use]
    pub fn from_role(role: &str) -> Self {
        let role = role.trim().to_ascii_uppercase().replace([' ', '-', '&'], "_");
        let exact = Self::ALL.into_iter().find(|mode| {
            serde_json::to_value(mode)
                .ok()
                .and_then(|v| v.as_str().map(|s| s == role))
                .unwrap_or(false)
        });
        if let Some(mode) = exact {
            return mode;
        }
        match role.as_str() {
            r if r.contains("VENDOR") || r.contains("EXTERNAL") => Self::ExternalMaintenance,
            r if r.contains("SECURITY") => Self::SecurityCrew,
            r if r.contains("HEALTH") || r.contains("MEDIC") => Self::HealthCrew,
            r if r.contains("CLEAN") || r.contains("SANITATION") => Self::CleaningCrew,
            r if r.contains("F_B") || r.contains("FNB") || r.contains("FOOD") => Self::Fnb,
            r if r.contains("RUNNER") || r.contains("LOGISTIC") => Self::Runner,
            r if r.contains("EXPERIENCE") => Self::ExperienceCrew,
            r if r.contains("GIFT") || r.contains("RETAIL") => Self::GiftshopCrew,
            r if r.contains("SERVICE") || r.contains("TICKET") => Self::ServiceCrew,
            _ => Self::InternalMaintenance,
        }
    }
}

/// Views available to a mode, in sidebar order.
#[must_use]
pub fn allowed_views(mode: AppMode) -> Vec<View> {
    let extra: &[View] = match mode {
        AppMode::InternalMaintenance => &[
            View::DailyChecklist,
            View::ZoneSurveillance,
            View::MaintenanceLog,
            View::CheckInLog,
        ],
        AppMode::ExternalMaintenance => {
            return vec![View::ZoneCheckIn, View::ExternalMaintenance, View::Settings];
        }
        AppMode::ServiceCrew => &[View::Service],
        AppMode::SecurityCrew => &[View::Security, View::ZoneSurveillance],
        AppMode::HealthCrew => &[View::Health],
        AppMode::CleaningCrew => &[View::Cleaning],
        AppMode::Fnb => &[View::Fnb, View::DailyChecklist],
        AppMode::Runner => &[View::Runner],
        AppMode::ExperienceCrew => &[View::Experience],
        AppMode::GiftshopCrew => &[View::GiftShop],
    };
    NAV_ORDER
        .iter()
        .map(|(view, _)| *view)
        .filter(|view| COMMON_VIEWS.contains(view) || extra.contains(view))
        .collect()
}

#[must_use]
pub fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::InternalMaintenance => "Maintenance",
        AppMode::ServiceCrew => "Service",
        AppMode::SecurityCrew => "Security",
        AppMode::HealthCrew => "Health & Medical",
        AppMode::CleaningCrew => "Sanitation Specialist",
        AppMode::Fnb => "F&B Specialist",
        AppMode::Runner => "Logistics Runner",
        AppMode::ExperienceCrew => "Experience Lead",
        AppMode::GiftshopCrew => "Retail Specialist",
        AppMode::ExternalMaintenance => "Staff Member",
    }
}

/// Operational dashboards usable only while checked in.
#[must_use]
pub fn requires_shift(view: View) -> bool {
    matches!(
        view,
        View::Fnb
            | View::Runner
            | View::Security
            | View::Health
            | View::Experience
            | View::Cleaning
            | View::GiftShop
            | View::MaintenanceLog
            | View::ExternalMaintenance
            | View::Service
    )
}

/// Ordered, labeled navigation for a mode.
#[must_use]
pub fn nav_items(mode: AppMode, on_shift: bool) -> Vec<NavItem> {
    let allowed = allowed_views(mode);
    NAV_ORDER
        .iter()
        .filter(|(view, _)| allowed.contains(view))
        .map(|&(view, label)| {
            let label = if mode == AppMode::ServiceCrew && view == View::ZoneCheckIn {
                "Ticket Validation"
            } else {
                label
            };
            NavItem { view, label, restricted: requires_shift(view) && !on_shift }
        })
        .collect()
}

/// Check whether a session may act through any of `views`.
///
/// An empty slice means the operation is open to every signed-in session.
///
/// # Errors
///
/// `ShiftRequired` when the mode has a matching view but it is shift-gated
/// and the session is off shift; `Forbidden` when no view matches the mode.
pub fn authorize(mode: AppMode, on_shift: bool, views: &[View]) -> Result<(), RoleError> {
    if views.is_empty() {
        return Ok(());
    }
    let allowed = allowed_views(mode);
    let mut gated = false;
    for view in views.iter().filter(|v| allowed.contains(v)) {
        if on_shift || !requires_shift(*view) {
            return Ok(());
        }
        gated = true;
    }
    if gated { Err(RoleError::ShiftRequired) } else { Err(RoleError::Forbidden(mode)) }
}

/// Views that drive a websocket syscall.
#[must_use]
pub fn views_for_syscall(syscall: &str) -> &'static [View] {
    match syscall {
        "restock:request" => &[View::Fnb, View::Cleaning, View::GiftShop, View::Runner],
        "restock:pickup" | "restock:deliver" | "restock:queue" | "stock:intake" | "stock:supply_count" => {
            &[View::Runner]
        }
        "incident:report" => &[View::Incidents],
        "incident:status" => &[View::Incidents, View::Security, View::Health],
        "incident:escalate" | "log:highlight" | "log:patrol" => &[View::Experience],
        "incident:facility" | "cleaning:start" | "cleaning:ready" => &[View::Cleaning],
        "incident:medical" | "incident:evidence" | "incident:active" => &[View::Security],
        "incident:arrival" => &[View::Security, View::Health],
        "incident:medical_active" | "stock:consume" | "stock:consumable_restock" => &[View::Health],
        "stock:sale" | "log:fridge" | "log:prep" | "log:waste" => &[View::Fnb],
        "stock:receive" | "stock:damage" | "stock:return" | "stock:cycle_count" | "stock:retail_restock" => {
            &[View::GiftShop]
        }
        "checklist:upkeep" | "maint:diagnostics" | "maint:resolve" | "maint:photo" | "maint:hardware" => &[View::MaintenanceLog],
        "service:validate" | "service:promo" | "service:crowd" => &[View::Service],
        "maint:vendor" | "maint:unlock" | "maint:tool" | "maint:signoff" => &[View::ExternalMaintenance],
        "shift:log" => &[View::CheckInLog],
        "shift:roster" => &[View::ShiftSchedule],
        "shift:check_in" | "shift:check_out" => &[View::ZoneCheckIn],
        "alert:ack" | "alert:list" => &[View::Announcements],
        "surveillance:overview" | "surveillance:zone" | "surveillance:usher" => &[View::ZoneSurveillance],
        "alert:raise" | "alert:resolve" => &[View::Security, View::MaintenanceLog],
        _ => &[],
    }
}

#[cfg(test)]
#[path = "roles_test.rs"]
mod tests;
