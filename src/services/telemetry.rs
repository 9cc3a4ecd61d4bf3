//! Telemetry: background fridge jitter and session housekeeping.
//!
//! DESIGN
//! ======
//! One task owns two intervals. The jitter interval nudges the live fridge
//! readings and broadcasts them. The housekeeping interval runs every second:
//! it expires vendor work orders past their time limit (forcing those
//! sessions out) and purges sessions past their TTL.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::frame::{Data, Frame, now_ms, to_data};
use crate::services::hub;
use crate::state::AppState;

pub const WORK_ORDER_EXPIRED: &str = "WORK_ORDER_EXPIRED";
pub const SESSION_EXPIRED: &str = "SESSION_EXPIRED";

/// Spawn the background telemetry task. Returns a handle for shutdown.
pub fn spawn_telemetry_task(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut jitter = tokio::time::interval(state.config.fridge_jitter_interval);
        let mut housekeeping = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = jitter.tick() => jitter_fridges(&state).await,
                _ = housekeeping.tick() => {
                    expire_vendor_sessions(&state, now_ms()).await;
                    purge_sessions(&state).await;
                }
            }
        }
    })
}

/// Nudge both live fridge readings and broadcast them.
pub async fn jitter_fridges(state: &AppState) {
    let fridges = {
        let mut store = state.store.write().await;
        store.logs.live_fridges.jitter(&mut rand::rng());
        store.logs.live_fridges
    };
    hub::broadcast(state, &Frame::request("log:fridge_live", to_data(&fridges)), None).await;
}

/// Force out every vendor whose work order ran out. Returns the staff IDs.
pub async fn expire_vendor_sessions(state: &AppState, now: i64) -> Vec<String> {
    let expired = state.store.write().await.maintenance.expire_vendors(now);
    for staff_id in &expired {
        let keys = state.sessions.read().await.keys_for_staff(staff_id);
        for key in keys {
            hub::terminate_session(state, &key, WORK_ORDER_EXPIRED).await;
        }
        state.store.write().await.maintenance.drop_vendor(staff_id);
        info!(%staff_id, "vendor work order expired");
    }
    expired
}

/// Drop sessions past their TTL, notifying any open connections.
pub async fn purge_sessions(state: &AppState) -> usize {
    let (expired, remaining) = {
        let mut sessions = state.sessions.write().await;
        if sessions.is_empty() {
            return 0;
        }
        let expired = sessions.purge_expired();
        (expired, sessions.len())
    };
    let frame = Frame::request(hub::SESSION_TERMINATED, Data::new()).with_data("reason", SESSION_EXPIRED);
    for key in &expired {
        hub::send_to_session(state, key, &frame).await;
    }
    if !expired.is_empty() {
        info!(count = expired.len(), remaining, "sessions expired");
    }
    expired.len()
}

#[cfg(test)]
#[path = "telemetry_test.rs"]
mod tests;
