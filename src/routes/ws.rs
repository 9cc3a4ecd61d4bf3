//! WebSocket handler: bidirectional frame relay for the dashboards.
//!
//! DESIGN
//! ======
//! On upgrade, the one-time ticket is exchanged for the session key, a
//! client ID is generated, and the connection enters a `select!` loop:
//! - Incoming client frames → parse + authorize + dispatch by syscall prefix
//! - Frames pushed by peers, scans, and telemetry → forward to client
//!
//! Handler functions are business logic: they validate, mutate the store,
//! and return an `Outcome`. The dispatch layer owns outbound concerns:
//! reply to sender and broadcast to peers.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply, broadcast, or stream)
//! 4. `session:terminated` or close → cancel the client's scans → cleanup

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, FRAME_CODE, FRAME_MESSAGE, Frame, Status};
use crate::roles::authorize;
use crate::routes::handlers::{self, Ctx};
use crate::services::telemetry::SESSION_EXPIRED;
use crate::services::{hub, scan};
use crate::state::{AppState, ConnectedClient};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what.
pub(crate) enum Outcome {
    /// Send done+data to the sender and a copy to every other dashboard.
    /// Sender's copy carries `parent_id` for correlation.
    Broadcast(Data),
    /// Send done+data to sender only.
    Reply(Data),
    /// Send each entry as an item frame, then an empty done.
    Stream(Vec<Data>),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(ticket) = params.get("ticket") else {
        return (StatusCode::UNAUTHORIZED, "ticket required").into_response();
    };

    let Some(session_key) = state.sessions.write().await.consume_ws_ticket(ticket) else {
        return (StatusCode::UNAUTHORIZED, "invalid or expired ticket").into_response();
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, session_key))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, session_key: String) {
    let client_id = Uuid::new_v4();

    let Some((staff_id, mode)) = state
        .sessions
        .read()
        .await
        .get(&session_key)
        .map(|s| (s.staff.staff_id.clone(), s.mode))
    else {
        return;
    };

    // Per-connection channel for frames pushed by peers, scans, and telemetry.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);
    state.clients.write().await.insert(
        client_id,
        ConnectedClient { tx: client_tx, session_key: session_key.clone(), staff_id: staff_id.clone() },
    );

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", client_id.to_string())
        .with_data("staff_id", staff_id.clone())
        .with_data("mode", serde_json::json!(mode));
    if send_frame(&mut socket, &welcome).await.is_ok() {
        info!(%client_id, %staff_id, "ws: client connected");

        loop {
            tokio::select! {
                msg = socket.recv() => {
                    let Some(msg) = msg else { break };
                    let Ok(msg) = msg else { break };
                    match msg {
                        Message::Text(text) => {
                            let frames = process_inbound_text(&state, client_id, &session_key, &text).await;
                            let terminated = frames.iter().any(|f| f.syscall == hub::SESSION_TERMINATED);
                            for frame in frames {
                                let _ = send_frame(&mut socket, &frame).await;
                            }
                            if terminated {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                Some(frame) = client_rx.recv() => {
                    let terminated = frame.syscall == hub::SESSION_TERMINATED;
                    if send_frame(&mut socket, &frame).await.is_err() || terminated {
                        break;
                    }
                }
            }
        }
    }

    state.clients.write().await.remove(&client_id);
    let cancelled = scan::cancel_for_client(&state, client_id).await;
    info!(%client_id, cancelled_scans = cancelled, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
/// Peer broadcasts go out through the hub.
pub(crate) async fn process_inbound_text(
    state: &AppState,
    client_id: Uuid,
    session_key: &str,
    text: &str,
) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new()).with_data(FRAME_MESSAGE, format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Snapshot the session; it may have been logged out or expired.
    let snapshot = state
        .sessions
        .read()
        .await
        .get(session_key)
        .map(|s| (s.staff.staff_id.clone(), s.staff.name.clone(), s.mode, s.on_shift));
    let Some((staff_id, name, mode, on_shift)) = snapshot else {
        let frame = Frame::request(hub::SESSION_TERMINATED, Data::new()).with_data("reason", SESSION_EXPIRED);
        return vec![frame];
    };

    // Stamp the authenticated staff ID as `from`.
    req.from = Some(staff_id.clone());
    info!(%client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");

    let views = match handlers::views_for(&req) {
        Ok(views) => views,
        Err(err_frame) => return vec![err_frame],
    };
    if let Err(e) = authorize(mode, on_shift, views) {
        return vec![req.error_from(&e)];
    }

    let ctx = Ctx { state, client_id, session_key, staff_id, name, mode, on_shift };
    let result = handlers::dispatch(&ctx, &req).await;

    // Apply the outcome.
    match result {
        Ok(Outcome::Broadcast(data)) => {
            let sender_frame = req.done_with(data);
            // Peers get a copy without parent_id.
            let peer_frame =
                Frame { id: Uuid::new_v4(), parent_id: None, ..sender_frame.clone() }.with_from(&ctx.staff_id);
            hub::broadcast(state, &peer_frame, Some(client_id)).await;
            vec![sender_frame]
        }
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Stream(items)) => {
            let mut frames: Vec<Frame> = items.into_iter().map(|data| req.item(data)).collect();
            frames.push(req.done());
            frames
        }
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    let is_progress = frame.syscall == "scan:progress";
    if frame.status == Status::Error {
        let code = frame.str_field(FRAME_CODE).unwrap_or("-");
        let message = frame.str_field(FRAME_MESSAGE).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if !is_progress {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
