//! Scan: the one progress-scan engine behind every simulated QR, barcode,
//! and signature flow.
//!
//! DESIGN
//! ======
//! A scan is a tokio task that advances a percentage by a fixed step every
//! tick, streaming `scan:progress` frames to the connection that started it.
//! At 100% it waits out the purpose's settle delay, then applies the
//! purpose's completion to the store and reports `scan:complete` (or
//! `scan:failed` when the completion is rejected).
//!
//! Each purpose differs only in its `ScanProfile` and its completion. The
//! zone check-in completion also runs the staged Verify/Type/Update/Confirm
//! steps before it reports.
//!
//! CANCELLATION
//! ============
//! Running scans are registered in `AppState::scans`. Cancelling aborts the
//! task and no completion is applied. A scan leaves the registry before its
//! completion starts, so a completion is never interrupted halfway.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, FRAME_CODE, FRAME_MESSAGE, Frame, now_ms, to_data};
use crate::services::checklist::{ChecklistError, ChecklistKind, checklist_completed};
use crate::services::hub;
use crate::services::incident::IncidentError;
use crate::services::maintenance::MaintenanceError;
use crate::services::restock::RestockError;
use crate::services::shift::{CHECK_IN_STAGES, CheckInRecord, CheckInStatus, CheckInStep, ShiftWindow, local_now};
use crate::state::AppState;

// =============================================================================
// PROFILES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPurpose {
    ZoneCheckIn,
    RestockDelivery,
    ChecklistItem,
    IncidentArrival,
    PatrolLog,
    AssetResolution,
    VendorZoneUnlock,
    VendorTool,
    TicketValidation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProfile {
    pub step_percent: u32,
    pub tick: Duration,
    /// Pause between reaching 100% and applying the completion.
    pub settle: Duration,
}

impl ScanProfile {
    /// Number of ticks to reach 100%.
    #[must_use]
    pub fn ticks(&self) -> u32 {
        100u32.div_ceil(self.step_percent.max(1))
    }
}

impl ScanPurpose {
    #[must_use]
    pub fn profile(self) -> ScanProfile {
        let (step_percent, tick_ms, settle_ms) = match self {
            Self::ZoneCheckIn => (2, 50, 0),
            Self::RestockDelivery => (5, 100, 1000),
            Self::ChecklistItem | Self::IncidentArrival | Self::PatrolLog => (10, 100, 1000),
            Self::AssetResolution => (10, 100, 500),
            Self::VendorZoneUnlock => (15, 100, 0),
            Self::VendorTool => (5, 100, 0),
            Self::TicketValidation => (100, 600, 0),
        };
        ScanProfile {
            step_percent,
            tick: Duration::from_millis(tick_ms),
            settle: Duration::from_millis(settle_ms),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZoneCheckIn => "zone_check_in",
            Self::RestockDelivery => "restock_delivery",
            Self::ChecklistItem => "checklist_item",
            Self::IncidentArrival => "incident_arrival",
            Self::PatrolLog => "patrol_log",
            Self::AssetResolution => "asset_resolution",
            Self::VendorZoneUnlock => "vendor_zone_unlock",
            Self::VendorTool => "vendor_tool",
            Self::TicketValidation => "ticket_validation",
        }
    }
}

// =============================================================================
// JOBS
// =============================================================================

/// A scan's purpose plus the context its completion needs.
#[derive(Debug, Clone)]
pub enum ScanJob {
    ZoneCheckIn { zone_id: String },
    RestockDelivery { task_id: String },
    ChecklistItem { kind: ChecklistKind, index: usize },
    IncidentArrival { incident_id: String },
    PatrolLog { zone_id: String },
    AssetResolution { asset_id: String },
    /// The verdict is drawn when the scan starts.
    VendorZoneUnlock { passes: bool },
    VendorTool,
    TicketValidation,
}

impl ScanJob {
    #[must_use]
    pub fn purpose(&self) -> ScanPurpose {
        match self {
            Self::ZoneCheckIn { .. } => ScanPurpose::ZoneCheckIn,
            Self::RestockDelivery { .. } => ScanPurpose::RestockDelivery,
            Self::ChecklistItem { .. } => ScanPurpose::ChecklistItem,
            Self::IncidentArrival { .. } => ScanPurpose::IncidentArrival,
            Self::PatrolLog { .. } => ScanPurpose::PatrolLog,
            Self::AssetResolution { .. } => ScanPurpose::AssetResolution,
            Self::VendorZoneUnlock { .. } => ScanPurpose::VendorZoneUnlock,
            Self::VendorTool => ScanPurpose::VendorTool,
            Self::TicketValidation => ScanPurpose::TicketValidation,
        }
    }
}

/// Who started a scan.
#[derive(Debug, Clone)]
pub struct ScanOwner {
    pub client_id: Uuid,
    pub session_key: String,
    pub staff_id: String,
    pub name: String,
}

/// Registry entry for a running scan.
#[derive(Debug)]
pub struct ActiveScan {
    pub client_id: Uuid,
    pub session_key: String,
    pub purpose: ScanPurpose,
    handle: JoinHandle<()>,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan not found: {0}")]
    NotFound(Uuid),
    #[error("scan {0} was started by another connection")]
    NotOwner(Uuid),
    #[error("session ended before the scan completed")]
    SessionGone,
    #[error(transparent)]
    Restock(#[from] RestockError),
    #[error(transparent)]
    Incident(#[from] IncidentError),
    #[error(transparent)]
    Checklist(#[from] ChecklistError),
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),
}

impl ErrorCode for ScanError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_SCAN_NOT_FOUND",
            Self::NotOwner(_) => "E_SCAN_NOT_OWNER",
            Self::SessionGone => "E_SESSION_GONE",
            Self::Restock(e) => e.error_code(),
            Self::Incident(e) => e.error_code(),
            Self::Checklist(e) => e.error_code(),
            Self::Maintenance(e) => e.error_code(),
        }
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Start a scan and return its ID.
pub async fn start(state: &AppState, owner: ScanOwner, job: ScanJob) -> Uuid {
    let scan_id = Uuid::new_v4();
    let purpose = job.purpose();
    let client_id = owner.client_id;
    let session_key = owner.session_key.clone();

    // Registered under the lock so the task cannot finish before it is tracked.
    let mut scans = state.scans.write().await;
    let handle = tokio::spawn(run(state.clone(), scan_id, owner, job));
    scans.insert(scan_id, ActiveScan { client_id, session_key, purpose, handle });
    info!(%scan_id, %client_id, purpose = purpose.as_str(), "scan: started");
    scan_id
}

/// Cancel a scan started by `client_id`. No completion is applied.
///
/// # Errors
///
/// `NotFound` for unknown or finished scans, `NotOwner` when another
/// connection started it.
pub async fn cancel(state: &AppState, scan_id: Uuid, client_id: Uuid) -> Result<ScanPurpose, ScanError> {
    let scan = {
        let mut scans = state.scans.write().await;
        let owner = scans.get(&scan_id).ok_or(ScanError::NotFound(scan_id))?.client_id;
        if owner != client_id {
            return Err(ScanError::NotOwner(scan_id));
        }
        scans.remove(&scan_id).ok_or(ScanError::NotFound(scan_id))?
    };
    let purpose = scan.purpose;
    abort(state, scan).await;
    info!(%scan_id, %client_id, purpose = purpose.as_str(), "scan: cancelled");
    Ok(purpose)
}

/// Abort every scan a connection started. Used on disconnect.
pub async fn cancel_for_client(state: &AppState, client_id: Uuid) -> usize {
    let owned: Vec<ActiveScan> = {
        let mut scans = state.scans.write().await;
        let ids: Vec<Uuid> = scans
            .iter()
            .filter(|(_, s)| s.client_id == client_id)
            .map(|(id, _)| *id)
            .collect();
        ids.iter().filter_map(|id| scans.remove(id)).collect()
    };
    let count = owned.len();
    for scan in owned {
        abort(state, scan).await;
    }
    count
}

/// Running scans started by a connection.
pub async fn active_for_client(state: &AppState, client_id: Uuid) -> Vec<(Uuid, ScanPurpose)> {
    state
        .scans
        .read()
        .await
        .iter()
        .filter(|(_, s)| s.client_id == client_id)
        .map(|(id, s)| (*id, s.purpose))
        .collect()
}

async fn abort(state: &AppState, scan: ActiveScan) {
    scan.handle.abort();
    if scan.purpose == ScanPurpose::ZoneCheckIn {
        if let Some(session) = state.sessions.write().await.get_mut(&scan.session_key) {
            session.check_in.scan_cancelled();
        }
    }
}

fn progress_frame(scan_id: Uuid, purpose: ScanPurpose, percent: u32) -> Frame {
    Frame::request("scan:progress", Data::new())
        .with_data("scan_id", scan_id.to_string())
        .with_data("purpose", purpose.as_str())
        .with_data("percent", percent)
}

async fn run(state: AppState, scan_id: Uuid, owner: ScanOwner, job: ScanJob) {
    let purpose = job.purpose();
    let profile = purpose.profile();

    for tick in 1..=profile.ticks() {
        tokio::time::sleep(state.config.scaled(profile.tick)).await;
        let percent = tick.saturating_mul(profile.step_percent).min(100);
        hub::send_to_client(&state, owner.client_id, progress_frame(scan_id, purpose, percent)).await;
    }
    if !profile.settle.is_zero() {
        tokio::time::sleep(state.config.scaled(profile.settle)).await;
    }

    if state.scans.write().await.remove(&scan_id).is_none() {
        return;
    }

    let frame = match complete(&state, &owner, job).await {
        Ok(data) => {
            info!(%scan_id, purpose = purpose.as_str(), "scan: complete");
            Frame::request("scan:complete", data)
                .with_data("scan_id", scan_id.to_string())
                .with_data("purpose", purpose.as_str())
        }
        Err(e) => {
            warn!(%scan_id, purpose = purpose.as_str(), error = %e, "scan: completion rejected");
            Frame::request("scan:failed", Data::new())
                .with_data("scan_id", scan_id.to_string())
                .with_data("purpose", purpose.as_str())
                .with_data(FRAME_CODE, e.error_code())
                .with_data(FRAME_MESSAGE, e.to_string())
        }
    };
    if !hub::deliver_to_client(&state, owner.client_id, frame).await {
        warn!(%scan_id, purpose = purpose.as_str(), "scan: owner gone before result delivery");
    }
}

// =============================================================================
// COMPLETIONS
// =============================================================================

async fn complete(state: &AppState, owner: &ScanOwner, job: ScanJob) -> Result<Data, ScanError> {
    match job {
        ScanJob::ZoneCheckIn { zone_id } => complete_check_in(state, owner, &zone_id).await,
        ScanJob::RestockDelivery { task_id } => {
            let task = state.store.write().await.restock.complete(&task_id)?;
            let data = to_data(&task);
            hub::broadcast(state, &Frame::request("restock:updated", data.clone()), None).await;
            Ok(data)
        }
        ScanJob::ChecklistItem { kind, index } => {
            let (data, completed) = {
                let mut sessions = state.sessions.write().await;
                let session = sessions.get_mut(&owner.session_key).ok_or(ScanError::SessionGone)?;
                let list = session.checklists.get_mut(kind);
                let completed = list.complete_scan(index)?;
                let mut data = to_data(&*list);
                data.insert("kind".into(), serde_json::json!(kind));
                data.insert("index".into(), serde_json::json!(index));
                data.insert("completed".into(), serde_json::json!(completed));
                data.insert("progress".into(), serde_json::json!(list.progress()));
                (data, completed)
            };
            if completed {
                hub::broadcast(state, &checklist_completed(&owner.staff_id, &owner.name, kind), None).await;
            }
            Ok(data)
        }
        ScanJob::IncidentArrival { incident_id } => {
            let incident = state.store.write().await.incidents.record_arrival(&incident_id, now_ms())?;
            let data = to_data(&incident);
            hub::broadcast(state, &Frame::request("incident:updated", data.clone()), None).await;
            Ok(data)
        }
        ScanJob::PatrolLog { zone_id } => {
            let entry = state.store.write().await.logs.add_patrol(&zone_id, &owner.staff_id);
            let data = to_data(&entry);
            hub::broadcast(state, &Frame::request("log:patrol", data.clone()), None).await;
            Ok(data)
        }
        ScanJob::AssetResolution { asset_id } => {
            let asset = state.store.write().await.maintenance.mark_scanned(&asset_id)?;
            let data = to_data(&asset);
            hub::broadcast(state, &Frame::request("maint:hardware_updated", data.clone()), None).await;
            Ok(data)
        }
        ScanJob::VendorZoneUnlock { passes } => {
            let (session, alert) = {
                let mut guard = state.store.write().await;
                let store = &mut *guard;
                store.maintenance.apply_unlock(&owner.staff_id, passes, &mut store.alerts)?
            };
            if let Some(alert) = &alert {
                warn!(staff_id = %owner.staff_id, alert_id = %alert.id, "vendor zone unlock denied");
                hub::broadcast(state, &Frame::request("alert:raised", to_data(alert)), None).await;
            }
            let mut data = to_data(&session);
            data.insert("passed".into(), serde_json::json!(passes));
            Ok(data)
        }
        ScanJob::VendorTool => {
            let session = state.store.write().await.maintenance.finish_tool(&owner.staff_id)?;
            Ok(to_data(&session))
        }
        ScanJob::TicketValidation => {
            let guests = {
                let mut store = state.store.write().await;
                store.guests.admit_guest();
                store.guests.clone()
            };
            let data = to_data(&guests);
            hub::broadcast(state, &Frame::request("service:guests", data.clone()), None).await;
            Ok(data)
        }
    }
}

/// Advance through the post-scan steps, then put the session on shift.
async fn complete_check_in(state: &AppState, owner: &ScanOwner, zone_id: &str) -> Result<Data, ScanError> {
    for (step, delay) in CHECK_IN_STAGES {
        tokio::time::sleep(state.config.scaled(delay)).await;
        {
            let mut sessions = state.sessions.write().await;
            let session = sessions.get_mut(&owner.session_key).ok_or(ScanError::SessionGone)?;
            session.check_in.advance(step);
            if step == CheckInStep::Confirm {
                session.on_shift = true;
                session.staff.current_zone_id = Some(zone_id.to_owned());
            }
        }
        let frame = Frame::request("shift:step", Data::new())
            .with_data("step", step.number())
            .with_data("label", step.label());
        hub::send_to_session(state, &owner.session_key, &frame).await;
    }

    let window = ShiftWindow { start: state.config.shift_start, end: state.config.shift_end };
    let now = local_now(state.config.utc_offset);
    let status = if window.is_late(now.time()) { CheckInStatus::Late } else { CheckInStatus::OnTime };
    let record = CheckInRecord {
        staff_id: owner.staff_id.clone(),
        name: owner.name.clone(),
        zone: zone_id.to_owned(),
        check_in_time: now_ms(),
        check_out_time: None,
        status,
    };
    state.store.write().await.check_ins.record(record.clone());
    info!(staff_id = %record.staff_id, zone = %record.zone, status = ?record.status, "shift: checked in");

    let data = to_data(&record);
    hub::broadcast(state, &Frame::request("shift:checked_in", data.clone()), None).await;
    Ok(data)
}

#[cfg(test)]
#[path = "scan_test.rs"]
mod tests;
