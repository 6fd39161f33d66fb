//! WebSocket handler — live task subscription channel.
//!
//! DESIGN
//! ======
//! On upgrade (authenticated by a one-time ticket), the connection enters a
//! `select!` loop over three sources:
//! - Inbound client messages → select user / clear selection / delete task
//! - Snapshots from the active task watch → forwarded as full-list `tasks`
//! - Session revocations → the connection closes when its session dies
//!
//! Selection is per-connection state. Switching users tears the previous
//! watch down before the new one is established, so at most one watch is
//! ever active per connection. Message handling is split from the socket
//! transport so tests can drive it directly.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `connected` with `client_id`
//! 2. `select_user` → unsubscribe old watch, subscribe new, snapshots flow
//! 3. `delete_task` → vendor delete; the removal arrives via the next snapshot
//! 4. Close / revocation → watch dropped, loop exits

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::TaskWatch;
use crate::msg::{ClientMessage, ServerMessage};
use crate::services::session::WsAuth;
use crate::state::AppState;

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

    let Some(auth) = state.sessions.consume_ws_ticket(ticket) else {
        return (StatusCode::UNAUTHORIZED, "invalid or expired ticket").into_response();
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, auth))
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Per-connection selection state: which user is selected, and the live
/// watch on that user's tasks. The two move together.
#[derive(Default)]
struct Selection {
    watch: Option<TaskWatch>,
}

impl Selection {
    fn user_id(&self) -> Option<&str> {
        self.watch.as_ref().map(TaskWatch::user_id)
    }

    /// Drop the active watch, explicitly closing the subscription.
    fn clear(&mut self) {
        self.watch = None;
    }
}

async fn run_ws(mut socket: WebSocket, state: AppState, auth: WsAuth) {
    let client_id = Uuid::new_v4();
    let mut revocations = state.sessions.subscribe_revocations();
    let mut selection = Selection::default();

    let welcome = ServerMessage::Connected { client_id, email: auth.identity.email.clone() };
    if send_msg(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, email = %auth.identity.email, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_text(&state, &auth, &mut selection, &text).await;
                        for reply in replies {
                            if send_msg(&mut socket, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            snapshot = next_snapshot(&mut selection), if selection.watch.is_some() => {
                match snapshot {
                    Some((user_id, tasks)) => {
                        let push = ServerMessage::Tasks { user_id, tasks };
                        if send_msg(&mut socket, &push).await.is_err() {
                            break;
                        }
                    }
                    // Backend closed the watch; drop it rather than spin.
                    None => selection.clear(),
                }
            }
            revoked = revocations.recv() => {
                match revoked {
                    Ok(token) if token == auth.session_token => {
                        info!(%client_id, "ws: session revoked, closing");
                        break;
                    }
                    // Lagged just means missed revocations for other sessions;
                    // ours is checked again on the next receive.
                    Ok(_) | Err(_) => {}
                }
            }
        }
    }

    info!(%client_id, "ws: client disconnected");
}

async fn next_snapshot(selection: &mut Selection) -> Option<(String, Vec<crate::backend::Task>)> {
    let watch = selection.watch.as_mut()?;
    let user_id = watch.user_id().to_owned();
    let tasks = watch.next().await?;
    Some((user_id, tasks))
}

async fn send_msg(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).unwrap_or_default();
    socket.send(Message::Text(json.into())).await
}

// =============================================================================
// MESSAGE DISPATCH
// =============================================================================

/// Parse one inbound text message and apply it to the selection state,
/// returning the replies for this client. Snapshot pushes arrive through the
/// watch, not from here.
async fn process_text(
    state: &AppState,
    auth: &WsAuth,
    selection: &mut Selection,
    text: &str,
) -> Vec<ServerMessage> {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "ws: invalid inbound message");
            return vec![ServerMessage::error(format!("invalid json: {e}"))];
        }
    };
    process_message(state, auth, selection, msg).await
}

async fn process_message(
    state: &AppState,
    auth: &WsAuth,
    selection: &mut Selection,
    msg: ClientMessage,
) -> Vec<ServerMessage> {
    match msg {
        ClientMessage::SelectUser { user_id } => {
            // The previous subscription must be closed before the next one
            // opens; two task watches are never concurrently active.
            selection.clear();

            match state.store.watch_tasks(&auth.identity, &user_id).await {
                Ok(watch) => {
                    selection.watch = Some(watch);
                    vec![ServerMessage::Selected { user_id }]
                }
                Err(e) => vec![ServerMessage::error(e.to_string())],
            }
        }
        ClientMessage::ClearSelection => {
            selection.clear();
            vec![ServerMessage::SelectionCleared]
        }
        ClientMessage::DeleteTask { task_id } => {
            // No selected user → no backend call.
            let Some(user_id) = selection.user_id().map(str::to_owned) else {
                return vec![ServerMessage::error("no user selected")];
            };

            match state.store.delete_task(&auth.identity, &user_id, &task_id).await {
                Ok(()) => vec![ServerMessage::TaskDeleted { task_id }],
                Err(e) => vec![ServerMessage::error(e.to_string())],
            }
        }
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
