//! Vendor backend boundary — auth provider and document store.
//!
//! ARCHITECTURE
//! ============
//! All persistence and authentication is delegated to the managed backend.
//! This module defines the two seams the rest of the server talks through:
//! `AuthProvider` (sign-in/sign-out) and `TaskStore` (user list, live task
//! snapshots, task delete). `FirebaseBackend` implements both against the
//! vendor REST APIs; `MemoryBackend` implements both for tests and
//! credential-less dev runs.
//!
//! DESIGN
//! ======
//! There is no ambient session: every store call takes the authenticated
//! `Identity` explicitly, and live subscriptions are explicit `TaskWatch`
//! values whose drop unsubscribes. Each watch delivery is the full current
//! task list for the watched user, never a delta.

pub mod firebase;
pub mod memory;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// =============================================================================
// TYPES
// =============================================================================

/// An authenticated principal returned by the auth provider.
///
/// `id_token` is the bearer credential presented on document-store calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
}

/// An end-user account, as cached in the vendor's `users` collection.
/// Created and deleted entirely outside this application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
}

/// A single to-do item in a user's task subcollection.
/// Field names follow the vendor documents (`isDone`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "isDone")]
    pub is_done: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Sign-in rejected by the provider. The message is the provider's own
    /// failure string and is surfaced to the user verbatim.
    #[error("{0}")]
    Auth(String),
    /// Network-level failure talking to the vendor.
    #[error("backend request failed: {0}")]
    Transport(String),
    /// The vendor answered with something we could not interpret.
    #[error("unexpected backend response: {0}")]
    Protocol(String),
}

// =============================================================================
// TASK WATCH
// =============================================================================

/// A live subscription to one user's task subcollection.
///
/// Every delivery replaces the previous snapshot wholesale. Dropping the
/// watch unsubscribes; there is no other teardown call.
pub struct TaskWatch {
    user_id: String,
    rx: mpsc::Receiver<Vec<Task>>,
    _guard: WatchGuard,
}

impl TaskWatch {
    #[must_use]
    pub fn new(user_id: impl Into<String>, rx: mpsc::Receiver<Vec<Task>>, guard: WatchGuard) -> Self {
        Self { user_id: user_id.into(), rx, _guard: guard }
    }

    /// The user whose tasks this watch observes.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Wait for the next full snapshot. `None` once the backend side closes.
    pub async fn next(&mut self) -> Option<Vec<Task>> {
        self.rx.recv().await
    }
}

impl std::fmt::Debug for TaskWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskWatch").field("user_id", &self.user_id).finish_non_exhaustive()
    }
}

/// Cancellation handle for a watch. Runs its unsubscribe action exactly once,
/// when dropped.
pub struct WatchGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchGuard {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// External auth provider: owns credentials and account identity.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange email + password for an authenticated identity.
    ///
    /// # Errors
    ///
    /// `BackendError::Auth` carries the provider's rejection message verbatim.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError>;

    /// Discard the provider-side credential for this identity.
    async fn sign_out(&self, identity: &Identity) -> Result<(), BackendError>;
}

/// External document database: user collection plus per-user task
/// subcollections. Read and delete only; tasks are created elsewhere.
#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    /// One-shot read of the entire user collection.
    async fn list_users(&self, identity: &Identity) -> Result<Vec<UserRecord>, BackendError>;

    /// One-shot read of one user's task subcollection. Document order is
    /// whatever the backend returns; insertion order is not guaranteed.
    async fn list_tasks(&self, identity: &Identity, user_id: &str) -> Result<Vec<Task>, BackendError>;

    /// Open a live subscription to one user's tasks. The watch delivers the
    /// current full snapshot first, then again on every backend-side change.
    async fn watch_tasks(&self, identity: &Identity, user_id: &str) -> Result<TaskWatch, BackendError>;

    /// Delete a single task document.
    async fn delete_task(&self, identity: &Identity, user_id: &str, task_id: &str) -> Result<(), BackendError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
