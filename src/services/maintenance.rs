//! Maintenance: hardware fleet, upkeep checks, and the external vendor
//! work order.
//!
//! DESIGN
//! ======
//! Hardware state is mostly static. The one live link is the Leviathan-03
//! hydraulics unit, which mirrors whether zone Z-04 has an unresolved red
//! alert. Resolving an asset goes scan -> photo capture; the photo turns the
//! asset GREEN and resolves the zone's linked red alert.
//!
//! Vendor sessions follow a fixed path: zone unlock scan, tool action,
//! sign-off. The work order carries a time limit; the background telemetry
//! task expires vendor sessions that run past it.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::frame::ErrorCode;
use crate::services::alerts::{Alert, AlertBoard, AlertSeverity, NewAlert, SECURITY_ALERT};
use crate::services::checklist::UpkeepChecklist;

pub const HYDRAULICS_ASSET: &str = "HW-HYD-03";
pub const HYDRAULICS_ZONE: &str = "Z-04";

// =============================================================================
// HARDWARE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HardwareState {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareUnit {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub zone: String,
    pub state: HardwareState,
    pub uptime: String,
    /// Resolution scan finished; waiting for the photo capture.
    pub awaiting_photo: bool,
}

fn unit(id: &str, name: &str, kind: &str, zone: &str, state: HardwareState, uptime: &str) -> HardwareUnit {
    HardwareUnit {
        id: id.to_owned(),
        name: name.to_owned(),
        kind: kind.to_owned(),
        zone: zone.to_owned(),
        state,
        uptime: uptime.to_owned(),
        awaiting_photo: false,
    }
}

/// Outcome of a photo capture.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub asset: HardwareUnit,
    pub resolved_alert: Option<String>,
}

// =============================================================================
// VENDOR WORK ORDER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolType {
    Calibration,
    Firmware,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkOrder {
    pub id: &'static str,
    pub vendor_id: &'static str,
    pub title: &'static str,
    pub scope_of_work: &'static str,
    pub target_zone: &'static str,
    pub tool_type: ToolType,
    pub time_limit_secs: u64,
}

impl WorkOrder {
    #[must_use]
    pub fn standard(time_limit: Duration) -> Self {
        Self {
            id: "WO-9942-EXT",
            vendor_id: "EXT-01",
            title: "Holo-Projector Array Alignment",
            scope_of_work: "Vendor is authorized to recalibrate the primary lens focusing and update firmware \
                            for the Holo-Projector Array located in Zone 01. Must verify sharp edge projection.",
            target_zone: "Z-01",
            tool_type: ToolType::Calibration,
            time_limit_secs: time_limit.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorSession {
    pub staff_id: String,
    pub started_at: i64,
    pub zone_unlocked: bool,
    pub tool_done: bool,
    pub signed_off: bool,
    pub expired: bool,
}

impl VendorSession {
    /// Whole seconds left on the work order clock. Negative once expired.
    #[must_use]
    pub fn remaining_secs(&self, limit_secs: u64, now: i64) -> i64 {
        let elapsed = (now - self.started_at).max(0) / 1000;
        i64::try_from(limit_secs).unwrap_or(i64::MAX) - elapsed
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("asset not found: {0}")]
    AssetNotFound(String),
    #[error("asset {0} has no pending resolution scan")]
    NoPendingScan(String),
    #[error("no active work order session for {0}")]
    NoVendorSession(String),
    #[error("work order time expired")]
    Expired,
    #[error("scan into the target zone first")]
    ZoneLocked,
    #[error("run the tool action first")]
    ToolPending,
}

impl ErrorCode for MaintenanceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AssetNotFound(_) => "E_ASSET_NOT_FOUND",
            Self::NoPendingScan(_) => "E_NO_PENDING_SCAN",
            Self::NoVendorSession(_) => "E_NO_VENDOR_SESSION",
            Self::Expired => "E_WORK_ORDER_EXPIRED",
            Self::ZoneLocked => "E_ZONE_LOCKED",
            Self::ToolPending => "E_TOOL_PENDING",
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug)]
pub struct Maintenance {
    hardware: Vec<HardwareUnit>,
    pub upkeep: UpkeepChecklist,
    pub work_order: WorkOrder,
    vendors: HashMap<String, VendorSession>,
}

impl Maintenance {
    #[must_use]
    pub fn new(vendor_time_limit: Duration) -> Self {
        Self {
            hardware: vec![
                unit("HW-CAM-01", "Depth Camera Array Alpha", "Camera", "Z-04", HardwareState::Green, "99.9%"),
                unit("HW-LID-04", "Lidar Sensor Array C", "Lidar", "Z-02", HardwareState::Yellow, "94.2%"),
                unit("HW-PROJ-09", "Holo-Projector Core", "Projector", "Z-01", HardwareState::Green, "99.9%"),
                unit(HYDRAULICS_ASSET, "Leviathan-03 Hydraulics", "Hydraulics", HYDRAULICS_ZONE, HardwareState::Red, "0.0%"),
                unit("HW-NET-01", "Zone 03 Comms Gateway", "Network Node", "Z-03", HardwareState::Green, "99.8%"),
            ],
            upkeep: UpkeepChecklist::default(),
            work_order: WorkOrder::standard(vendor_time_limit),
            vendors: HashMap::new(),
        }
    }

    #[must_use]
    pub fn hardware(&self) -> &[HardwareUnit] {
        &self.hardware
    }

    /// Mirror the Z-04 red alert onto the hydraulics unit.
    /// Returns true when the unit's state changed.
    pub fn sync_with_alerts(&mut self, alerts: &AlertBoard) -> bool {
        let red = alerts.active_red_in_zone(HYDRAULICS_ZONE).is_some();
        let Some(unit) = self.hardware.iter_mut().find(|h| h.id == HYDRAULICS_ASSET) else {
            return false;
        };
        let next = if red { HardwareState::Red } else { HardwareState::Green };
        let changed = unit.state != next;
        unit.state = next;
        changed
    }

    /// Terminal transcript for a remote diagnostics session.
    ///
    /// # Errors
    ///
    /// `AssetNotFound` for unknown IDs.
    pub fn diagnostics(&self, asset_id: &str) -> Result<Vec<String>, MaintenanceError> {
        let asset = self.asset(asset_id)?;
        let failed = asset.state == HardwareState::Red;
        let mut lines = vec![
            format!("Initiating secure connection to {}...", asset.id),
            format!("Establishing handshake with node {}...", asset.zone),
            "[OK] Connection established. Encryption verified.".to_owned(),
            "[INFO] Querying device diagnostics...".to_owned(),
        ];
        if failed {
            lines.push("[ERROR] Device unresponsive. Heartbeat timed out.".to_owned());
            lines.push("[WARN] Sending PWR_CYCLE_HARD command...".to_owned());
            lines.push("[ERROR] Kernel panic detected. Physical repair required.".to_owned());
        } else {
            lines.push("[OK] Telemetry stream active. Sensors nominal.".to_owned());
            lines.push("[INFO] Fetching latest firmware version...".to_owned());
            lines.push("[OK] Version 4.12.8 running smoothly.".to_owned());
        }
        lines.push("[END] Session terminated.".to_owned());
        Ok(lines)
    }

    /// Check that a resolution scan may start.
    ///
    /// # Errors
    ///
    /// `AssetNotFound` for unknown IDs.
    pub fn ensure_asset(&self, asset_id: &str) -> Result<(), MaintenanceError> {
        self.asset(asset_id).map(|_| ())
    }

    /// Resolution scan finished: the asset now waits for its photo.
    ///
    /// # Errors
    ///
    /// `AssetNotFound` for unknown IDs.
    pub fn mark_scanned(&mut self, asset_id: &str) -> Result<HardwareUnit, MaintenanceError> {
        let asset = self.asset_mut(asset_id)?;
        asset.awaiting_photo = true;
        Ok(asset.clone())
    }

    /// Photo captured: asset goes GREEN and a Z-04 asset resolves the zone's
    /// linked red alert.
    ///
    /// # Errors
    ///
    /// `AssetNotFound`, or `NoPendingScan` when the scan has not finished.
    pub fn capture_photo(&mut self, asset_id: &str, alerts: &mut AlertBoard) -> Result<Resolution, MaintenanceError> {
        let asset = self.asset_mut(asset_id)?;
        if !asset.awaiting_photo {
            return Err(MaintenanceError::NoPendingScan(asset_id.to_owned()));
        }
        asset.awaiting_photo = false;
        asset.state = HardwareState::Green;
        let zone = asset.zone.clone();

        let mut resolved_alert = None;
        if zone == HYDRAULICS_ZONE {
            if let Some(id) = alerts.active_red_in_zone(&zone).map(|a| a.id.clone()) {
                if alerts.resolve(&id).is_ok() {
                    resolved_alert = Some(id);
                }
            }
        }
        self.sync_with_alerts(alerts);

        let asset = self.asset(asset_id)?.clone();
        Ok(Resolution { asset, resolved_alert })
    }

    /// Percentage of GREEN assets, rounded.
    #[must_use]
    pub fn system_health(&self) -> u32 {
        if self.hardware.is_empty() {
            return 100;
        }
        let green = self.hardware.iter().filter(|h| h.state == HardwareState::Green).count();
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = ((green as f64 / self.hardware.len() as f64) * 100.0).round() as u32;
        pct
    }

    // -------------------------------------------------------------------------
    // Vendor
    // -------------------------------------------------------------------------

    /// Open (or return) the vendor's work order session. The clock starts on
    /// first open.
    pub fn open_vendor_session(&mut self, staff_id: &str, now: i64) -> VendorSession {
        self.vendors
            .entry(staff_id.to_owned())
            .or_insert_with(|| VendorSession {
                staff_id: staff_id.to_owned(),
                started_at: now,
                zone_unlocked: false,
                tool_done: false,
                signed_off: false,
                expired: false,
            })
            .clone()
    }

    /// # Errors
    ///
    /// `NoVendorSession`, or `Expired` once the clock ran out.
    pub fn vendor_session(&self, staff_id: &str) -> Result<&VendorSession, MaintenanceError> {
        let session = self
            .vendors
            .get(staff_id)
            .ok_or_else(|| MaintenanceError::NoVendorSession(staff_id.to_owned()))?;
        if session.expired {
            return Err(MaintenanceError::Expired);
        }
        Ok(session)
    }

    /// Apply the zone unlock verdict. A failed scan leaves the zone locked and
    /// returns the security alert it raised.
    ///
    /// # Errors
    ///
    /// `NoVendorSession` or `Expired`.
    pub fn apply_unlock(
        &mut self,
        staff_id: &str,
        passed: bool,
        alerts: &mut AlertBoard,
    ) -> Result<(VendorSession, Option<Alert>), MaintenanceError> {
        let target_zone = self.work_order.target_zone;
        let session = self.vendor_session_mut(staff_id)?;
        if passed {
            session.zone_unlocked = true;
            return Ok((session.clone(), None));
        }
        let alert = alerts
            .raise(NewAlert {
                title: "Unauthorized Zone Access".to_owned(),
                message: format!("Unauthorized access attempt by Vendor({staff_id}) outside assigned {target_zone}."),
                severity: AlertSeverity::High,
                alert_type: SECURITY_ALERT.to_owned(),
                zone_id: Some(target_zone.to_owned()),
            })
            .ok();
        Ok((session.clone(), alert))
    }

    /// Check that the tool action may start.
    ///
    /// # Errors
    ///
    /// `NoVendorSession`, `Expired`, or `ZoneLocked`.
    pub fn ensure_tool_ready(&self, staff_id: &str) -> Result<(), MaintenanceError> {
        if !self.vendor_session(staff_id)?.zone_unlocked {
            return Err(MaintenanceError::ZoneLocked);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `NoVendorSession`, `Expired`, or `ZoneLocked`.
    pub fn finish_tool(&mut self, staff_id: &str) -> Result<VendorSession, MaintenanceError> {
        self.ensure_tool_ready(staff_id)?;
        let session = self.vendor_session_mut(staff_id)?;
        session.tool_done = true;
        Ok(session.clone())
    }

    /// Close the work order. The vendor's session ends with it.
    ///
    /// # Errors
    ///
    /// `ZoneLocked` or `ToolPending` when steps are missing.
    pub fn sign_off(&mut self, staff_id: &str) -> Result<VendorSession, MaintenanceError> {
        let session = self.vendor_session_mut(staff_id)?;
        if !session.zone_unlocked {
            return Err(MaintenanceError::ZoneLocked);
        }
        if !session.tool_done {
            return Err(MaintenanceError::ToolPending);
        }
        session.signed_off = true;
        let session = session.clone();
        self.vendors.remove(staff_id);
        Ok(session)
    }

    /// Mark every vendor session past the time limit as expired and return
    /// the affected staff IDs.
    pub fn expire_vendors(&mut self, now: i64) -> Vec<String> {
        let limit = self.work_order.time_limit_secs;
        let mut expired = Vec::new();
        for session in self.vendors.values_mut() {
            if !session.expired && session.remaining_secs(limit, now) <= 0 {
                session.expired = true;
                expired.push(session.staff_id.clone());
            }
        }
        expired
    }

    /// Forget a vendor session (forced logout).
    pub fn drop_vendor(&mut self, staff_id: &str) {
        self.vendors.remove(staff_id);
    }

    fn vendor_session_mut(&mut self, staff_id: &str) -> Result<&mut VendorSession, MaintenanceError> {
        let session = self
            .vendors
            .get_mut(staff_id)
            .ok_or_else(|| MaintenanceError::NoVendorSession(staff_id.to_owned()))?;
        if session.expired {
            return Err(MaintenanceError::Expired);
        }
        Ok(session)
    }

    fn asset(&self, asset_id: &str) -> Result<&HardwareUnit, MaintenanceError> {
        self.hardware
            .iter()
            .find(|h| h.id == asset_id)
            .ok_or_else(|| MaintenanceError::AssetNotFound(asset_id.to_owned()))
    }

    fn asset_mut(&mut self, asset_id: &str) -> Result<&mut HardwareUnit, MaintenanceError> {
        self.hardware
            .iter_mut()
            .find(|h| h.id == asset_id)
            .ok_or_else(|| MaintenanceError::AssetNotFound(asset_id.to_owned()))
    }
}

#[cfg(test)]
#[path = "maintenance_test.rs"]
mod tests;
