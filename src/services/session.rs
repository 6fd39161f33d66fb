//! Session and WS-ticket management.
//!
//! ARCHITECTURE
//! ============
//! Sessions are server-side state: the cookie carries only a random token,
//! the token maps to the vendor `Identity` in memory. Nothing here is
//! durable on purpose — the vendor owns the real account state, and a
//! restart just forces a fresh login. HTTP auth uses long-lived session
//! tokens, while websocket upgrades use one-time short-lived tickets to
//! avoid sending cookies over WS query params.
//!
//! Revocation is push-based: logout broadcasts the dead token so live
//! websocket connections for that session can close immediately.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::broadcast;

use crate::backend::Identity;

const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60 * 24;
const TICKET_TTL: Duration = Duration::from_secs(60);
const REVOCATION_CAPACITY: usize = 16;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Generate a short-lived 16-byte hex WS ticket.
#[must_use]
pub(crate) fn generate_ws_ticket() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes_to_hex(&bytes)
}

fn session_ttl() -> Duration {
    let secs = std::env::var("SESSION_TTL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SESSION_TTL_SECS);
    Duration::from_secs(secs)
}

struct SessionEntry {
    identity: Identity,
    expires_at: Instant,
}

struct TicketEntry {
    auth: WsAuth,
    expires_at: Instant,
}

/// What a consumed WS ticket resolves to: the identity plus the session
/// token it was minted under, so the connection can react to revocation.
#[derive(Debug, Clone)]
pub struct WsAuth {
    pub identity: Identity,
    pub session_token: String,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, SessionEntry>,
    tickets: HashMap<String, TicketEntry>,
}

/// In-memory session + ticket store, shared across handlers.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
    revocations: broadcast::Sender<String>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (revocations, _) = broadcast::channel(REVOCATION_CAPACITY);
        Self { inner: Arc::new(Mutex::new(Inner::default())), revocations }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Create a session for the given identity, returning the token.
    #[must_use]
    pub fn create_session(&self, identity: Identity) -> String {
        let token = generate_token();
        let entry = SessionEntry { identity, expires_at: Instant::now() + session_ttl() };
        self.lock().sessions.insert(token.clone(), entry);
        token
    }

    /// Validate a session token and return the associated identity.
    /// Expired entries are dropped on the way out.
    #[must_use]
    pub fn validate_session(&self, token: &str) -> Option<Identity> {
        let mut inner = self.lock();
        let entry = inner.sessions.get(token)?;
        if entry.expires_at <= Instant::now() {
            inner.sessions.remove(token);
            return None;
        }
        Some(entry.identity.clone())
    }

    /// Delete a session and broadcast its revocation to live subscribers.
    pub fn delete_session(&self, token: &str) {
        let removed = self.lock().sessions.remove(token);
        if removed.is_some() {
            let _ = self.revocations.send(token.to_owned());
        }
    }

    /// Subscribe to revoked-token notifications.
    #[must_use]
    pub fn subscribe_revocations(&self) -> broadcast::Receiver<String> {
        self.revocations.subscribe()
    }

    /// Create a one-time WS ticket bound to this identity and its session.
    #[must_use]
    pub fn create_ws_ticket(&self, identity: Identity, session_token: &str) -> String {
        let ticket = generate_ws_ticket();
        let entry = TicketEntry {
            auth: WsAuth { identity, session_token: session_token.to_owned() },
            expires_at: Instant::now() + TICKET_TTL,
        };
        self.lock().tickets.insert(ticket.clone(), entry);
        ticket
    }

    /// Consume a WS ticket, returning its auth if valid. Consumption is
    /// destructive so a ticket can never authenticate two upgrades.
    #[must_use]
    pub fn consume_ws_ticket(&self, ticket: &str) -> Option<WsAuth> {
        let entry = self.lock().tickets.remove(ticket)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.auth)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
