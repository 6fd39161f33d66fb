//! In-memory backend — test double and credential-less dev mode.
//!
//! DESIGN
//! ======
//! Implements both vendor traits over plain maps behind one mutex. Deletes
//! notify every registered watcher of that user synchronously with the full
//! remaining task list, mirroring the vendor's snapshot-push semantics.
//! Instrumentation counters (sign-outs, deletes, active watches) back the
//! behavioral tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::{AuthProvider, BackendError, Identity, Task, TaskStore, TaskWatch, UserRecord, WatchGuard};

/// Failure message for a wrong password, matching the vendor's wire string.
const INVALID_PASSWORD: &str = "INVALID_LOGIN_CREDENTIALS";
/// Failure message for an unknown account, matching the vendor's wire string.
const EMAIL_NOT_FOUND: &str = "EMAIL_NOT_FOUND";

const WATCH_BUFFER: usize = 16;

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password: String,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    users: Vec<UserRecord>,
    tasks: HashMap<String, Vec<Task>>,
    watchers: HashMap<Uuid, Watcher>,
    sign_out_calls: u64,
    delete_calls: u64,
}

struct Watcher {
    user_id: String,
    tx: mpsc::Sender<Vec<Task>>,
}

/// Shared-handle in-memory backend. Clones observe the same data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with the demo admin account and a couple of
    /// end-users, for running without vendor credentials.
    #[must_use]
    pub fn with_demo_data(admin_email: &str) -> Self {
        let backend = Self::new();
        backend.add_account(admin_email, "admin");
        let alice = backend.add_user("alice@example.com");
        let bob = backend.add_user("bob@example.com");
        backend.add_task(&alice, "Buy groceries", false);
        backend.add_task(&alice, "Water the plants", true);
        backend.add_task(&bob, "File expense report", false);
        backend
    }

    /// Register a sign-in account. Returns the assigned user id.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let user_id = Uuid::new_v4().to_string();
        let mut inner = self.lock();
        inner.accounts.insert(
            email.to_owned(),
            Account { user_id: user_id.clone(), password: password.to_owned() },
        );
        user_id
    }

    /// Add an end-user record to the user collection. Returns its id.
    pub fn add_user(&self, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.lock();
        inner.users.push(UserRecord { id: id.clone(), email: email.to_owned() });
        inner.tasks.entry(id.clone()).or_default();
        id
    }

    /// Add a task to a user's subcollection and push a snapshot to that
    /// user's watchers. Returns the task id.
    pub fn add_task(&self, user_id: &str, title: &str, is_done: bool) -> String {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.lock();
        inner
            .tasks
            .entry(user_id.to_owned())
            .or_default()
            .push(Task { id: id.clone(), title: title.to_owned(), is_done });
        Self::notify(&mut inner, user_id);
        id
    }

    /// Number of watches currently open against `user_id`.
    #[must_use]
    pub fn active_watches(&self, user_id: &str) -> usize {
        self.lock().watchers.values().filter(|w| w.user_id == user_id).count()
    }

    /// Number of watches currently open against any user.
    #[must_use]
    pub fn total_watches(&self) -> usize {
        self.lock().watchers.len()
    }

    /// How many times `sign_out` has been called.
    #[must_use]
    pub fn sign_out_calls(&self) -> u64 {
        self.lock().sign_out_calls
    }

    /// How many times `delete_task` has been called.
    #[must_use]
    pub fn delete_calls(&self) -> u64 {
        self.lock().delete_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked while holding it; the
        // data is still usable.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Send the full current snapshot for `user_id` to its watchers.
    /// Watchers with full buffers are skipped; the next change catches them up.
    fn notify(inner: &mut Inner, user_id: &str) {
        let snapshot = inner.tasks.get(user_id).cloned().unwrap_or_default();
        for watcher in inner.watchers.values() {
            if watcher.user_id == user_id {
                let _ = watcher.tx.try_send(snapshot.clone());
            }
        }
    }
}

#[async_trait::async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        let inner = self.lock();
        let Some(account) = inner.accounts.get(email) else {
            return Err(BackendError::Auth(EMAIL_NOT_FOUND.to_owned()));
        };
        if account.password != password {
            return Err(BackendError::Auth(INVALID_PASSWORD.to_owned()));
        }
        Ok(Identity {
            user_id: account.user_id.clone(),
            email: email.to_owned(),
            id_token: format!("memory-token-{}", account.user_id),
        })
    }

    async fn sign_out(&self, _identity: &Identity) -> Result<(), BackendError> {
        self.lock().sign_out_calls += 1;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskStore for MemoryBackend {
    async fn list_users(&self, _identity: &Identity) -> Result<Vec<UserRecord>, BackendError> {
        Ok(self.lock().users.clone())
    }

    async fn list_tasks(&self, _identity: &Identity, user_id: &str) -> Result<Vec<Task>, BackendError> {
        Ok(self.lock().tasks.get(user_id).cloned().unwrap_or_default())
    }

    async fn watch_tasks(&self, _identity: &Identity, user_id: &str) -> Result<TaskWatch, BackendError> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let watch_id = Uuid::new_v4();
        let initial = {
            let mut inner = self.lock();
            inner
                .watchers
                .insert(watch_id, Watcher { user_id: user_id.to_owned(), tx: tx.clone() });
            inner.tasks.get(user_id).cloned().unwrap_or_default()
        };
        // Initial snapshot is delivered through the channel like any change.
        let _ = tx.try_send(initial);

        let backend = self.clone();
        let guard = WatchGuard::new(move || {
            backend.lock().watchers.remove(&watch_id);
        });
        Ok(TaskWatch::new(user_id, rx, guard))
    }

    async fn delete_task(&self, _identity: &Identity, user_id: &str, task_id: &str) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner.delete_calls += 1;
        if let Some(tasks) = inner.tasks.get_mut(user_id) {
            tasks.retain(|t| t.id != task_id);
        }
        Self::notify(&mut inner, user_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
