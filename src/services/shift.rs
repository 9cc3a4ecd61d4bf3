//! Shift: zone check-in flow, shift clock, check-in log, and roster.
//!
//! DESIGN
//! ======
//! The check-in flow is a six-step progression owned by each session:
//! Permission -> Scan QR -> Verify -> Type Check -> Update -> Confirm.
//! The QR step is a zone check-in scan; once it finishes the remaining
//! steps advance on the staged delays in `CHECK_IN_STAGES`, and Confirm
//! puts the session on shift.
//!
//! Clock arithmetic uses `time::Time` in the configured local offset. The
//! countdown is signed: at exactly the end time it shows `00:00:00` and is
//! not overtime. Any instant past the end, even sub-second, is overtime.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, Time, UtcOffset};

use crate::frame::ErrorCode;

// =============================================================================
// SHIFT WINDOW
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub start: Time,
    pub end: Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub overtime: bool,
    pub formatted: String,
}

impl ShiftWindow {
    /// Checking in any time after the start is late.
    #[must_use]
    pub fn is_late(&self, now: Time) -> bool {
        now > self.start
    }

    /// Time remaining until the end of the shift, or time past it.
    #[must_use]
    pub fn countdown(&self, now: Time) -> Countdown {
        let diff = self.end - now;
        let abs = diff.unsigned_abs().as_secs();
        Countdown {
            overtime: diff.is_negative(),
            formatted: format!("{:02}:{:02}:{:02}", abs / 3600, (abs % 3600) / 60, abs % 60),
        }
    }
}

/// Current wall-clock time in the shift's local offset.
#[must_use]
pub fn local_now(offset: UtcOffset) -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(offset)
}

// =============================================================================
// CHECK-IN FLOW
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckInStep {
    Permission = 1,
    ScanQr = 2,
    Verify = 3,
    TypeCheck = 4,
    Update = 5,
    Confirm = 6,
}

impl CheckInStep {
    #[must_use]
    pub fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Permission => "Permission",
            Self::ScanQr => "Scan QR",
            Self::Verify => "Verify",
            Self::TypeCheck => "Type Check",
            Self::Update => "Update",
            Self::Confirm => "Confirm",
        }
    }
}

/// Steps that follow a finished QR scan, each with its delay after the
/// previous one.
pub const CHECK_IN_STAGES: [(CheckInStep, Duration); 4] = [
    (CheckInStep::Verify, Duration::from_millis(500)),
    (CheckInStep::TypeCheck, Duration::from_millis(1000)),
    (CheckInStep::Update, Duration::from_millis(1000)),
    (CheckInStep::Confirm, Duration::from_millis(1000)),
];

#[derive(Debug, Clone, Serialize)]
pub struct CheckInFlow {
    pub step: CheckInStep,
    /// Zone being checked into while the flow is running.
    pub zone_id: Option<String>,
    pub scanning: bool,
}

impl Default for CheckInFlow {
    fn default() -> Self {
        Self { step: CheckInStep::Permission, zone_id: None, scanning: false }
    }
}

impl CheckInFlow {
    /// Camera permission granted.
    pub fn grant_permission(&mut self) {
        if self.step == CheckInStep::Permission {
            self.step = CheckInStep::ScanQr;
        }
    }

    /// Begin the QR scan for `zone_id`.
    ///
    /// # Errors
    ///
    /// `AlreadyOnShift` when the flow has confirmed, `InProgress` when the
    /// post-scan stages are running.
    pub fn begin_scan(&mut self, zone_id: &str) -> Result<(), ShiftError> {
        if self.scanning {
            return Err(ShiftError::InProgress);
        }
        match self.step {
            CheckInStep::Confirm => Err(ShiftError::AlreadyOnShift),
            CheckInStep::Verify | CheckInStep::TypeCheck | CheckInStep::Update => Err(ShiftError::InProgress),
            CheckInStep::Permission | CheckInStep::ScanQr => {
                self.step = CheckInStep::ScanQr;
                self.zone_id = Some(zone_id.to_owned());
                self.scanning = true;
                Ok(())
            }
        }
    }

    pub fn advance(&mut self, step: CheckInStep) {
        self.scanning = false;
        self.step = step;
    }

    /// QR scan cancelled before it finished. The flow stays on Scan QR.
    pub fn scan_cancelled(&mut self) {
        self.scanning = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShiftError {
    #[error("already on shift")]
    AlreadyOnShift,
    #[error("not on shift")]
    NotOnShift,
    #[error("check-in already in progress")]
    InProgress,
    #[error("zone_id required")]
    MissingZone,
}

impl ErrorCode for ShiftError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyOnShift => "E_ALREADY_ON_SHIFT",
            Self::NotOnShift => "E_NOT_ON_SHIFT",
            Self::InProgress => "E_CHECK_IN_IN_PROGRESS",
            Self::MissingZone => "E_MISSING_ZONE",
        }
    }
}

// =============================================================================
// CHECK-IN LOG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckInStatus {
    OnTime,
    Late,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub staff_id: String,
    pub name: String,
    pub zone: String,
    pub check_in_time: i64,
    pub check_out_time: Option<i64>,
    pub status: CheckInStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckInStats {
    pub total: usize,
    pub late: usize,
    pub on_time: usize,
    pub late_pct: u32,
}

#[derive(Debug, Default)]
pub struct CheckInLog {
    records: Vec<CheckInRecord>,
}

impl CheckInLog {
    pub fn record(&mut self, record: CheckInRecord) {
        self.records.push(record);
    }

    /// Stamp the check-out time on the staff member's open record.
    pub fn check_out(&mut self, staff_id: &str, at: i64) -> Option<CheckInRecord> {
        let record = self
            .records
            .iter_mut()
            .rev()
            .find(|r| r.staff_id == staff_id && r.check_out_time.is_none())?;
        record.check_out_time = Some(at);
        Some(record.clone())
    }

    /// Case-insensitive substring match on name, staff ID, or zone.
    #[must_use]
    pub fn filter(&self, query: &str) -> Vec<&CheckInRecord> {
        let needle = query.to_lowercase();
        self.records
            .iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&needle)
                    || r.staff_id.to_lowercase().contains(&needle)
                    || r.zone.to_lowercase().contains(&needle)
            })
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> &[CheckInRecord] {
        &self.records
    }
}

#[must_use]
pub fn stats(records: &[&CheckInRecord]) -> CheckInStats {
    let total = records.len();
    let late = records.iter().filter(|r| r.status == CheckInStatus::Late).count();
    let late_pct = if total == 0 {
        0
    } else {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = ((late as f64 / total as f64) * 100.0).round() as u32;
        pct
    };
    CheckInStats { total, late, on_time: total - late, late_pct }
}

// =============================================================================
// ROSTER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RosterKind {
    Shift,
    Off,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterDay {
    pub day: u8,
    #[serde(rename = "type")]
    pub kind: RosterKind,
    pub start: Option<&'static str>,
    pub end: Option<&'static str>,
    pub zone: Option<&'static str>,
    pub break_time: Option<&'static str>,
    pub is_today: bool,
}

const OFF_DAYS: [u8; 10] = [1, 2, 8, 9, 15, 16, 22, 23, 29, 30];

fn roster_slot(day: u8) -> (&'static str, &'static str, &'static str, &'static str) {
    match day {
        10..=14 => ("14:00", "22:00", "Z-02", "18:00-18:30"),
        24..=28 => ("06:00", "14:00", "Z-01", "10:00-10:30"),
        _ => ("08:00", "16:00", "Z-04", "12:00-12:30"),
    }
}

/// The month calendar, days 1 through 31.
#[must_use]
pub fn roster(today: u8) -> Vec<RosterDay> {
    (1..=31)
        .map(|day| {
            if OFF_DAYS.contains(&day) {
                RosterDay {
                    day,
                    kind: RosterKind::Off,
                    start: None,
                    end: None,
                    zone: None,
                    break_time: None,
                    is_today: day == today,
                }
            } else {
                let (start, end, zone, break_time) = roster_slot(day);
                RosterDay {
                    day,
                    kind: RosterKind::Shift,
                    start: Some(start),
                    end: Some(end),
                    zone: Some(zone),
                    break_time: Some(break_time),
                    is_today: day == today,
                }
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "shift_test.rs"]
mod tests;
