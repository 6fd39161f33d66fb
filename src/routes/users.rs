//! User and task REST routes.
//!
//! The dashboard uses these for its initial render: the full (optionally
//! filtered) user list and a one-shot task list. Ongoing task updates come
//! over the websocket instead.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use crate::backend::{BackendError, Task, UserRecord};
use crate::services::directory;
use crate::state::AppState;

fn backend_error_to_status(e: &BackendError) -> StatusCode {
    match e {
        BackendError::Auth(_) => StatusCode::UNAUTHORIZED,
        BackendError::Transport(_) | BackendError::Protocol(_) => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserRecord>,
    /// Unfiltered collection size, for the "Total Users" stat card.
    pub total: usize,
}

/// `GET /api/users?search=…` — one-shot read of the user collection with the
/// sidebar's case-insensitive email filter applied server-side.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, StatusCode> {
    let users = directory::load_users(&state.store, &auth.identity)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user list fetch failed");
            backend_error_to_status(&e)
        })?;

    let total = users.len();
    let users = match query.search.as_deref() {
        Some(term) if !term.is_empty() => directory::filter_users(&users, term),
        _ => users,
    };
    Ok(Json(UserListResponse { users, total }))
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub user_id: String,
    pub tasks: Vec<Task>,
}

/// `GET /api/users/{id}/tasks` — one-shot task list for the initial render.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<TaskListResponse>, StatusCode> {
    let tasks = state
        .store
        .list_tasks(&auth.identity, &user_id)
        .await
        .map_err(|e| {
            tracing::error!(%user_id, error = %e, "task list fetch failed");
            backend_error_to_status(&e)
        })?;
    Ok(Json(TaskListResponse { user_id, tasks }))
}

/// `DELETE /api/users/{id}/tasks/{task_id}` — direct vendor delete. The live
/// subscription reflects the removal; nothing is updated optimistically.
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, task_id)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    state
        .store
        .delete_task(&auth.identity, &user_id, &task_id)
        .await
        .map_err(|e| {
            tracing::error!(%user_id, %task_id, error = %e, "task delete failed");
            backend_error_to_status(&e)
        })?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
