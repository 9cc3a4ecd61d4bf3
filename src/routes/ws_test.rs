use super::*;
use crate::roles::AppMode;
use crate::services::incident::{NewIncident, Severity};
use crate::services::maintenance::HYDRAULICS_ASSET;
use crate::state::test_helpers;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

struct Conn {
    client_id: Uuid,
    key: String,
    rx: mpsc::Receiver<Frame>,
}

async fn connect(state: &AppState, staff_id: &str, mode: AppMode, on_shift: bool) -> Conn {
    let (_, key) = test_helpers::seed_session(state, staff_id, mode).await;
    if on_shift {
        test_helpers::set_on_shift(state, &key).await;
    }
    let (client_id, rx) = test_helpers::connect_client(state, &key, staff_id).await;
    Conn { client_id, key, rx }
}

fn request(syscall: &str, data: serde_json::Value) -> (Frame, String) {
    let data: Data = match data {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => Data::new(),
    };
    let frame = Frame::request(syscall, data);
    let text = serde_json::to_string(&frame).unwrap();
    (frame, text)
}

async fn send(state: &AppState, conn: &Conn, syscall: &str, data: serde_json::Value) -> (Frame, Vec<Frame>) {
    let (req, text) = request(syscall, data);
    let frames = process_inbound_text(state, conn.client_id, &conn.key, &text).await;
    (req, frames)
}

async fn wait_for(rx: &mut mpsc::Receiver<Frame>, syscall: &str) -> Frame {
    timeout(Duration::from_secs(2), async {
        loop {
            let frame = rx.recv().await.expect("channel closed unexpectedly");
            if frame.syscall == syscall {
                return frame;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {syscall}"))
}

fn code(frame: &Frame) -> Option<&str> {
    frame.str_field(FRAME_CODE)
}

// =============================================================================
// framing
// =============================================================================

#[tokio::test]
async fn invalid_json_returns_gateway_error() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "FNB-01", AppMode::Fnb, false).await;

    let frames = process_inbound_text(&state, conn.client_id, &conn.key, "{not json").await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].syscall, "gateway:error");
    assert!(frames[0].str_field(FRAME_MESSAGE).unwrap().starts_with("invalid json"));
}

#[tokio::test]
async fn missing_session_terminates_socket() {
    let state = test_helpers::test_app_state();
    let (_, text) = request("nav:items", json!({}));
    let frames = process_inbound_text(&state, Uuid::new_v4(), "gone", &text).await;
    assert_eq!(frames[0].syscall, hub::SESSION_TERMINATED);
    assert_eq!(frames[0].str_field("reason"), Some(SESSION_EXPIRED));
}

#[tokio::test]
async fn unknown_prefix_and_op_are_errors() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "RUN-01", AppMode::Runner, true).await;

    let (_, frames) = send(&state, &conn, "bogus:thing", json!({})).await;
    assert_eq!(frames[0].status, Status::Error);
    assert_eq!(frames[0].str_field(FRAME_MESSAGE), Some("unknown prefix: bogus"));

    let (_, frames) = send(&state, &conn, "restock:bogus", json!({})).await;
    assert_eq!(frames[0].str_field(FRAME_MESSAGE), Some("unknown restock op: bogus"));
}

#[tokio::test]
async fn missing_field_is_reported_by_name() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "RUN-01", AppMode::Runner, true).await;

    let (_, frames) = send(&state, &conn, "restock:pickup", json!({ "id": "RS-0001" })).await;
    assert_eq!(frames[0].str_field(FRAME_MESSAGE), Some("quantity required"));
}

// =============================================================================
// authorization
// =============================================================================

#[tokio::test]
async fn other_modes_are_forbidden() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "RUN-01", AppMode::Runner, true).await;

    let (_, frames) = send(&state, &conn, "incident:active", json!({})).await;
    assert_eq!(frames[0].status, Status::Error);
    assert_eq!(code(&frames[0]), Some("E_FORBIDDEN"));
}

#[tokio::test]
async fn operational_views_require_shift() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "SEC-01", AppMode::SecurityCrew, false).await;

    let (_, frames) = send(&state, &conn, "incident:active", json!({})).await;
    assert_eq!(code(&frames[0]), Some("E_SHIFT_REQUIRED"));

    test_helpers::set_on_shift(&state, &conn.key).await;
    let (_, frames) = send(&state, &conn, "incident:active", json!({})).await;
    assert_eq!(frames[0].status, Status::Done);
}

#[tokio::test]
async fn checklist_is_gated_by_its_kind() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "FNB-01", AppMode::Fnb, false).await;

    let (_, frames) = send(&state, &conn, "checklist:get", json!({ "kind": "daily" })).await;
    assert_eq!(frames[0].status, Status::Done);
    assert_eq!(frames[0].data["kind"], "daily");

    let (_, frames) = send(&state, &conn, "checklist:get", json!({ "kind": "cleaning" })).await;
    assert_eq!(code(&frames[0]), Some("E_FORBIDDEN"));

    let (_, frames) = send(&state, &conn, "checklist:get", json!({ "kind": "weekly" })).await;
    assert!(frames[0].str_field(FRAME_MESSAGE).unwrap().starts_with("invalid kind"));
}

#[tokio::test]
async fn nav_is_open_to_every_session() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "SVC-01", AppMode::ServiceCrew, false).await;

    let (_, frames) = send(&state, &conn, "nav:items", json!({})).await;
    assert_eq!(frames[0].data["mode"], "SERVICE_CREW");
    assert_eq!(frames[0].data["nav"][0]["label"], "Ticket Validation");
}

// =============================================================================
// outcomes
// =============================================================================

#[tokio::test]
async fn broadcast_reaches_peers_without_parent() {
    let state = test_helpers::test_app_state();
    let fnb = connect(&state, "FNB-01", AppMode::Fnb, true).await;
    let mut runner = connect(&state, "RUN-01", AppMode::Runner, true).await;

    let (req, frames) = send(&state, &fnb, "restock:request", json!({ "item": "Nacho Cheese", "is_urgent": true })).await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, Status::Done);
    assert_eq!(frames[0].parent_id, Some(req.id));
    assert_eq!(frames[0].data["quantity"], 50);

    let peer = wait_for(&mut runner.rx, "restock:request").await;
    assert_eq!(peer.parent_id, None);
    assert_ne!(peer.id, frames[0].id);
    assert_eq!(peer.data["item"], "Nacho Cheese");
    assert_eq!(peer.from.as_deref(), Some("FNB-01"));
}

#[tokio::test]
async fn diagnostics_stream_items_then_done() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "MNT-01", AppMode::InternalMaintenance, true).await;

    let (_, frames) = send(&state, &conn, "maint:diagnostics", json!({ "asset_id": HYDRAULICS_ASSET })).await;
    let (last, items) = frames.split_last().unwrap();
    assert_eq!(last.status, Status::Done);
    assert!(items.iter().all(|f| f.status == Status::Item));
    assert!(items.iter().any(|f| f.str_field("line").is_some_and(|l| l.contains("Kernel panic"))));
}

#[tokio::test]
async fn medical_escalation_raises_health_alert() {
    let state = test_helpers::test_app_state();
    let sec = connect(&state, "SEC-01", AppMode::SecurityCrew, true).await;
    let mut health = connect(&state, "HLT-01", AppMode::HealthCrew, true).await;

    let incident = state
        .store
        .write()
        .await
        .incidents
        .report(NewIncident {
            kind: Some("Guest Injury".into()),
            severity: Severity::Medium,
            description: "Guest fell near the lagoon".into(),
            reported_by: "SEC-01".into(),
            zone_id: Some("Z-02".into()),
        })
        .unwrap();

    let (_, frames) = send(&state, &sec, "incident:medical", json!({ "id": incident.id })).await;
    assert_eq!(frames[0].status, Status::Done);
    assert_eq!(frames[0].data["severity"], "HIGH");

    let alert = wait_for(&mut health.rx, "alert:raised").await;
    assert_eq!(alert.data["alert_type"], "health_pulse");
    let (_, frames) = send(&state, &health, "incident:medical_active", json!({})).await;
    assert_eq!(frames[0].data["incidents"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn consuming_untracked_supply_clamps_at_zero() {
    let state = test_helpers::test_app_state();
    let health = connect(&state, "HLT-01", AppMode::HealthCrew, true).await;

    let (_, frames) = send(&state, &health, "stock:consume", json!({ "item": "Trauma Kits" })).await;
    assert_eq!(frames[0].status, Status::Done);
    assert_eq!(frames[0].data["stock"], 0);

    send(&state, &health, "stock:consumable_restock", json!({ "item": "IV Fluids", "amount": 3 })).await;
    let (_, frames) = send(&state, &health, "stock:consume", json!({ "item": "IV Fluids" })).await;
    assert_eq!(frames[0].data["stock"], 2);
}

#[tokio::test]
async fn usher_dispatch_in_crowded_zone() {
    let state = test_helpers::test_app_state();
    let sec = connect(&state, "SEC-01", AppMode::SecurityCrew, false).await;
    let mut maint = connect(&state, "MNT-01", AppMode::InternalMaintenance, false).await;

    let (_, frames) = send(&state, &sec, "surveillance:zone", json!({ "zone_id": "Z-02" })).await;
    assert_eq!(frames[0].data["staff"].as_array().unwrap().len(), 2);

    let (_, frames) = send(&state, &sec, "surveillance:usher", json!({ "staff_id": "9921-B" })).await;
    assert_eq!(frames[0].status, Status::Done);
    assert_eq!(frames[0].data["status"], "USHERING");
    assert_eq!(frames[0].data["changed"], true);
    let peer = wait_for(&mut maint.rx, "surveillance:usher").await;
    assert_eq!(peer.data["id"], "9921-B");

    let (_, frames) = send(&state, &sec, "surveillance:usher", json!({ "staff_id": "8842-A" })).await;
    assert_eq!(code(&frames[0]), Some("E_NOT_HIGH_DENSITY"));

    let runner = connect(&state, "RUN-01", AppMode::Runner, true).await;
    let (_, frames) = send(&state, &runner, "surveillance:overview", json!({})).await;
    assert_eq!(code(&frames[0]), Some("E_FORBIDDEN"));
}

#[tokio::test]
async fn sale_below_threshold_files_restock_once() {
    let state = test_helpers::test_app_state();
    let mut fnb = connect(&state, "FNB-01", AppMode::Fnb, true).await;

    let mut filed = 0;
    for _ in 0..30 {
        let (_, frames) = send(&state, &fnb, "stock:sale", json!({ "item": "Energy Snacks" })).await;
        if frames[0].status == Status::Error {
            break;
        }
        if !frames[0].data["restock"].is_null() {
            filed += 1;
        }
    }
    assert_eq!(filed, 1);
    let pushed = wait_for(&mut fnb.rx, "restock:request").await;
    assert_eq!(pushed.data["is_urgent"], true);
}

// =============================================================================
// scans
// =============================================================================

#[tokio::test]
async fn scan_gated_checklist_item_starts_scan() {
    let state = test_helpers::test_app_state();
    let mut conn = connect(&state, "CLN-01", AppMode::CleaningCrew, true).await;

    let (_, frames) = send(&state, &conn, "checklist:toggle", json!({ "kind": "cleaning", "index": 1 })).await;
    assert_eq!(frames[0].data["scan_required"], true);
    assert_eq!(frames[0].data["purpose"], "checklist_item");

    let done = wait_for(&mut conn.rx, "scan:complete").await;
    assert_eq!(done.data["index"], 1);

    let (_, frames) = send(&state, &conn, "checklist:get", json!({ "kind": "cleaning" })).await;
    assert_eq!(frames[0].data["items"][1]["done"], true);
}

#[tokio::test]
async fn scan_cancel_is_owner_only() {
    let state = test_helpers::test_app_state();
    let owner = connect(&state, "SVC-01", AppMode::ServiceCrew, true).await;
    let other = connect(&state, "SVC-02", AppMode::ServiceCrew, true).await;

    let (_, frames) = send(&state, &owner, "service:validate", json!({})).await;
    let scan_id = frames[0].data["scan_id"].clone();

    let (_, frames) = send(&state, &other, "scan:cancel", json!({ "scan_id": scan_id })).await;
    assert_eq!(code(&frames[0]), Some("E_SCAN_NOT_OWNER"));

    let (_, frames) = send(&state, &owner, "scan:list", json!({})).await;
    assert_eq!(frames[0].data["scans"].as_array().unwrap().len(), 1);

    let (_, frames) = send(&state, &owner, "scan:cancel", json!({ "scan_id": scan_id })).await;
    assert_eq!(frames[0].status, Status::Done);
    assert_eq!(frames[0].data["purpose"], "ticket_validation");
}

#[tokio::test]
async fn check_out_requires_being_on_shift() {
    let state = test_helpers::test_app_state();
    let conn = connect(&state, "RUN-01", AppMode::Runner, false).await;

    let (_, frames) = send(&state, &conn, "shift:check_out", json!({})).await;
    assert_eq!(code(&frames[0]), Some("E_NOT_ON_SHIFT"));

    let (_, frames) = send(&state, &conn, "shift:check_in", json!({})).await;
    assert_eq!(code(&frames[0]), Some("E_MISSING_ZONE"));
}
