use super::*;
use crate::roles::AppMode;
use crate::services::shift::{CheckInRecord, CheckInStatus};
use crate::state::test_helpers;

async fn auth_for(state: &AppState, staff_id: &str, mode: AppMode) -> AuthUser {
    let (_, key) = test_helpers::seed_session(state, staff_id, mode).await;
    let session = state.sessions.read().await.get(&key).cloned().unwrap();
    AuthUser { session_key: key, session }
}

fn record(staff_id: &str, name: &str, status: CheckInStatus) -> CheckInRecord {
    CheckInRecord {
        staff_id: staff_id.into(),
        name: name.into(),
        zone: "Z-02".into(),
        check_in_time: 1_700_000_000_000,
        check_out_time: None,
        status,
    }
}

#[test]
fn role_errors_map_to_forbidden() {
    assert_eq!(role_error_to_status(RoleError::ShiftRequired), StatusCode::FORBIDDEN);
    assert_eq!(role_error_to_status(RoleError::Forbidden(AppMode::Runner)), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn snapshot_includes_seeded_hydraulics_alert() {
    let state = test_helpers::test_app_state();
    let auth = auth_for(&state, "MNT-01", AppMode::InternalMaintenance).await;

    let Json(body) = snapshot(State(state), auth).await;
    let red = body["red_alerts"].as_array().unwrap();
    assert_eq!(red.len(), 1);
    assert_eq!(red[0]["zone_id"], "Z-04");
    assert_eq!(body["hardware"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn nav_marks_restricted_views_off_shift() {
    let state = test_helpers::test_app_state();
    let auth = auth_for(&state, "FNB-01", AppMode::Fnb).await;

    let Json(body) = nav(auth).await;
    assert_eq!(body["mode_label"], "F&B Specialist");
    let items = body["nav"].as_array().unwrap();
    assert_eq!(items[0]["label"], "Zone Check-In");
    assert!(items.iter().any(|i| i["restricted"] == true));
}

#[tokio::test]
async fn check_in_log_filters_and_counts() {
    let state = test_helpers::test_app_state();
    {
        let mut store = state.store.write().await;
        store.check_ins.record(record("RUN-01", "Jordan Reyes", CheckInStatus::Late));
        store.check_ins.record(record("FNB-02", "Sam Okafor", CheckInStatus::OnTime));
    }
    let auth = auth_for(&state, "MNT-01", AppMode::InternalMaintenance).await;

    let Json(body) = check_ins(State(state), auth, Query(CheckInLogQuery { q: "jordan".into() })).await.unwrap();
    assert_eq!(body["records"].as_array().unwrap().len(), 1);
    assert_eq!(body["stats"]["total"], 1);
    assert_eq!(body["stats"]["late"], 1);
}

#[tokio::test]
async fn check_in_log_is_maintenance_only() {
    let state = test_helpers::test_app_state();
    let auth = auth_for(&state, "RUN-01", AppMode::Runner).await;

    let result = check_ins(State(state), auth, Query(CheckInLogQuery { q: String::new() })).await;
    assert_eq!(result.err(), Some(StatusCode::FORBIDDEN));
}
