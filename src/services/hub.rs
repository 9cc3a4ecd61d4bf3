//! Hub: fan-out of frames to connected dashboards.
//!
//! Broadcasts and progress are best-effort: a client whose channel is full
//! misses the frame. `deliver_to_client` waits for room instead.

use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::state::AppState;

pub const SESSION_TERMINATED: &str = "session:terminated";

/// Send a frame to every connected client, optionally skipping one.
pub async fn broadcast(state: &AppState, frame: &Frame, exclude: Option<Uuid>) {
    let clients = state.clients.read().await;
    for (client_id, client) in clients.iter() {
        if exclude == Some(*client_id) {
            continue;
        }
        let _ = client.tx.try_send(frame.clone());
    }
}

/// Send a frame to one connection.
pub async fn send_to_client(state: &AppState, client_id: Uuid, frame: Frame) {
    let clients = state.clients.read().await;
    if let Some(client) = clients.get(&client_id) {
        let _ = client.tx.try_send(frame);
    }
}

/// Send a frame to one connection, waiting for channel capacity. Returns
/// false when the connection is gone.
pub async fn deliver_to_client(state: &AppState, client_id: Uuid, frame: Frame) -> bool {
    let tx = state.clients.read().await.get(&client_id).map(|c| c.tx.clone());
    match tx {
        Some(tx) => tx.send(frame).await.is_ok(),
        None => false,
    }
}

/// Send a frame to every connection opened by a session.
pub async fn send_to_session(state: &AppState, session_key: &str, frame: &Frame) {
    let clients = state.clients.read().await;
    for client in clients.values().filter(|c| c.session_key == session_key) {
        let _ = client.tx.try_send(frame.clone());
    }
}

/// End a session: its connections receive `session:terminated` and close,
/// and the session is removed from the store.
pub async fn terminate_session(state: &AppState, session_key: &str, reason: &str) {
    let frame = Frame::request(SESSION_TERMINATED, Data::new()).with_data("reason", reason);
    send_to_session(state, session_key, &frame).await;
    state.sessions.write().await.remove(session_key);
    tracing::info!(reason, "session terminated");
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
