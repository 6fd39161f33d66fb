//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Two pages (`/login`, `/dashboard`) plus a small JSON API and one
//! websocket endpoint, all under a single Axum router. The dashboard page
//! is served only behind the session guard; everything else about
//! navigation is a plain redirect.

pub mod auth;
pub mod users;
pub mod ws;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const LOGIN_PAGE: &str = include_str!("../../static/login.html");
const DASHBOARD_PAGE: &str = include_str!("../../static/dashboard.html");

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(redirect_root))
        .route("/login", get(login_page))
        .route("/dashboard", get(dashboard_page))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/ws-ticket", post(auth::ws_ticket))
        .route("/api/users", get(users::list_users))
        .route("/api/users/{id}/tasks", get(users::list_tasks))
        .route("/api/users/{id}/tasks/{task_id}", delete(users::delete_task))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn redirect_root() -> Redirect {
    Redirect::temporary("/dashboard")
}

async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// The protected view. Anonymous or non-admin sessions are sent to the
/// login page; the guard result is decided before any task data renders.
async fn dashboard_page(auth: Result<auth::AuthUser, StatusCode>) -> Response {
    match auth {
        Ok(_) => Html(DASHBOARD_PAGE).into_response(),
        Err(_) => Redirect::temporary("/login").into_response(),
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
