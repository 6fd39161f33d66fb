//! Auth routes — login form endpoint, session guard, WS tickets.
//!
//! DESIGN
//! ======
//! The session guard is the `AuthUser` extractor: every guarded handler
//! revalidates the cookie token and re-checks the admin address, so a
//! revoked or non-admin session can never reach task data. Login mirrors
//! the admin panel form: provider errors surface verbatim, a valid
//! non-admin login is signed back out, and a successful admin login answers
//! with exactly one `/dashboard` redirect.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::backend::Identity;
use crate::services::auth::{self as auth_svc, AuthError};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn cookie_secure() -> bool {
    if let Some(value) = env_bool("COOKIE_SECURE") {
        return value;
    }
    std::env::var("PUBLIC_BASE_URL")
        .map(|uri| uri.starts_with("https://"))
        .unwrap_or(false)
}

fn session_cookie(token: impl Into<String>) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token.into()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = session_cookie("");
    cookie.set_max_age(Duration::ZERO);
    cookie
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated admin extracted from the session cookie.
/// Use as a handler parameter to require authentication.
#[derive(Debug)]
pub struct AuthUser {
    pub identity: Identity,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let identity = app_state
            .sessions
            .validate_session(token)
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // Sessions are only ever minted for the admin, but the guard
        // re-checks the address on every request regardless.
        if identity.email != *app_state.admin_email {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(Self { identity, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginOk {
    pub email: String,
    pub redirect: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginFailed {
    pub error: String,
}

/// `POST /api/auth/login` — sign in, gate on the admin address, set cookie.
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    match auth_svc::sign_in_admin(&state.auth, &state.admin_email, &req.email, &req.password).await {
        Ok(identity) => {
            let email = identity.email.clone();
            let token = state.sessions.create_session(identity);
            let jar = CookieJar::new().add(session_cookie(token));
            (jar, Json(LoginOk { email, redirect: "/dashboard" })).into_response()
        }
        Err(e) => {
            let status = match &e {
                AuthError::Provider(_) => StatusCode::UNAUTHORIZED,
                AuthError::NotAdmin => StatusCode::FORBIDDEN,
            };
            // Same shape the original form rendered: "Error: <message>".
            (status, Json(LoginFailed { error: format!("Error: {e}") })).into_response()
        }
    }
}

/// `POST /api/auth/logout` — revoke the session, clear the cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    state.sessions.delete_session(&auth.token);
    let jar = CookieJar::new().add(clear_session_cookie());
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
}

/// `GET /api/auth/me` — return the current admin identity.
pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse { user_id: auth.identity.user_id, email: auth.identity.email })
}

/// `POST /api/auth/ws-ticket` — create a one-time WS ticket.
pub async fn ws_ticket(State(state): State<AppState>, auth: AuthUser) -> Json<serde_json::Value> {
    let ticket = state.sessions.create_ws_ticket(auth.identity, &auth.token);
    Json(serde_json::json!({ "ticket": ticket }))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
