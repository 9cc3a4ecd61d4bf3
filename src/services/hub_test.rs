use super::*;
use crate::roles::AppMode;
use crate::state::{ConnectedClient, test_helpers};
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

async fn assert_channel_has_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("frame receive timed out")
        .expect("channel closed unexpectedly")
}

async fn assert_channel_empty(rx: &mut mpsc::Receiver<Frame>) {
    assert!(timeout(Duration::from_millis(80), rx.recv()).await.is_err(), "expected no frame");
}

#[tokio::test]
async fn broadcast_skips_excluded_client() {
    let state = test_helpers::test_app_state();
    let (_, key) = test_helpers::seed_session(&state, "SEC-01", AppMode::SecurityCrew).await;
    let (a, mut rx_a) = test_helpers::connect_client(&state, &key, "SEC-01").await;
    let (_, mut rx_b) = test_helpers::connect_client(&state, &key, "SEC-01").await;

    broadcast(&state, &Frame::request("incident:report", Data::new()), Some(a)).await;

    assert_eq!(assert_channel_has_frame(&mut rx_b).await.syscall, "incident:report");
    assert_channel_empty(&mut rx_a).await;
}

#[tokio::test]
async fn deliver_waits_for_a_full_channel() {
    let state = test_helpers::test_app_state();
    let (_, key) = test_helpers::seed_session(&state, "RUN-01", AppMode::Runner).await;
    let client_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(1);
    state.clients.write().await.insert(
        client_id,
        ConnectedClient { tx, session_key: key, staff_id: "RUN-01".into() },
    );

    send_to_client(&state, client_id, Frame::request("scan:progress", Data::new())).await;
    send_to_client(&state, client_id, Frame::request("scan:progress", Data::new())).await;
    let pending = {
        let state = state.clone();
        tokio::spawn(async move {
            deliver_to_client(&state, client_id, Frame::request("scan:complete", Data::new())).await
        })
    };

    assert_eq!(assert_channel_has_frame(&mut rx).await.syscall, "scan:progress");
    assert_eq!(assert_channel_has_frame(&mut rx).await.syscall, "scan:complete");
    assert!(pending.await.unwrap());
}

#[tokio::test]
async fn deliver_to_missing_client_reports_false() {
    let state = test_helpers::test_app_state();
    assert!(!deliver_to_client(&state, Uuid::new_v4(), Frame::request("scan:failed", Data::new())).await);
}

#[tokio::test]
async fn send_to_session_reaches_only_that_session() {
    let state = test_helpers::test_app_state();
    let (_, key_a) = test_helpers::seed_session(&state, "SEC-01", AppMode::SecurityCrew).await;
    let (_, key_b) = test_helpers::seed_session(&state, "FNB-01", AppMode::Fnb).await;
    let (_, mut rx_a) = test_helpers::connect_client(&state, &key_a, "SEC-01").await;
    let (_, mut rx_b) = test_helpers::connect_client(&state, &key_b, "FNB-01").await;

    send_to_session(&state, &key_a, &Frame::request("shift:step", Data::new())).await;

    assert_eq!(assert_channel_has_frame(&mut rx_a).await.syscall, "shift:step");
    assert_channel_empty(&mut rx_b).await;
}

#[tokio::test]
async fn terminate_session_notifies_and_removes() {
    let state = test_helpers::test_app_state();
    let (token, key) = test_helpers::seed_session(&state, "EXT-01", AppMode::ExternalMaintenance).await;
    let (_, mut rx) = test_helpers::connect_client(&state, &key, "EXT-01").await;

    terminate_session(&state, &key, "WORK_ORDER_EXPIRED").await;

    let frame = assert_channel_has_frame(&mut rx).await;
    assert_eq!(frame.syscall, SESSION_TERMINATED);
    assert_eq!(frame.str_field("reason"), Some("WORK_ORDER_EXPIRED"));
    assert!(state.sessions.read().await.validate(&token).is_none());
}
