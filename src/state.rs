//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the two vendor boundary handles as trait objects (so tests swap in
//! the in-memory backend), the in-memory session store, and the fixed
//! allowed admin address. There is no database pool: all durable data lives
//! at the vendor.

use std::sync::Arc;

use crate::backend::{AuthProvider, TaskStore};
use crate::services::session::SessionStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn TaskStore>,
    pub sessions: SessionStore,
    /// The one email allowed past the session guard. Exact match only.
    pub admin_email: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn TaskStore>, admin_email: &str) -> Self {
        Self {
            auth,
            store,
            sessions: SessionStore::new(),
            admin_email: Arc::from(admin_email),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::Identity;

    pub const TEST_ADMIN_EMAIL: &str = "admin@example.com";
    pub const TEST_ADMIN_PASSWORD: &str = "correct horse";

    /// Test `AppState` over a fresh in-memory backend, with the admin
    /// account already registered at the provider.
    #[must_use]
    pub fn test_app_state() -> (AppState, MemoryBackend) {
        let backend = MemoryBackend::new();
        backend.add_account(TEST_ADMIN_EMAIL, TEST_ADMIN_PASSWORD);
        let state = AppState::new(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            TEST_ADMIN_EMAIL,
        );
        (state, backend)
    }

    /// Sign the admin in through the real flow and return the identity.
    pub async fn admin_identity(state: &AppState) -> Identity {
        crate::services::auth::sign_in_admin(
            &state.auth,
            &state.admin_email,
            TEST_ADMIN_EMAIL,
            TEST_ADMIN_PASSWORD,
        )
        .await
        .expect("admin sign-in should succeed")
    }

    /// Create a logged-in admin session and return its token.
    pub async fn admin_session(state: &AppState) -> String {
        let identity = admin_identity(state).await;
        state.sessions.create_session(identity)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
