//! Firebase REST backend — Identity Toolkit sign-in + Firestore documents.
//!
//! SYSTEM CONTEXT
//! ==============
//! The production deployment keeps all accounts and to-do data in Firebase:
//! password sign-in goes through the Identity Toolkit
//! (`accounts:signInWithPassword`), and users/tasks live in Firestore under
//! `users/{uid}` with a `todos` subcollection per user.
//!
//! DESIGN
//! ======
//! Firestore's streaming listen channel is not exposed over plain REST, so
//! `watch_tasks` converts to push at this boundary: a spawned poll loop
//! re-fetches the subcollection and sends a snapshot whenever the document
//! set changes. Dropping the returned watch aborts the loop.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use super::{AuthProvider, BackendError, Identity, Task, TaskStore, TaskWatch, UserRecord, WatchGuard};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Single fetch covers the whole collection; the admin panel reads the user
/// list in one shot and does not paginate.
const LIST_PAGE_SIZE: u32 = 300;

const DEFAULT_POLL_MS: u64 = 2000;
const WATCH_BUFFER: usize = 16;

/// Firebase project configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    /// Snapshot poll interval for task watches.
    pub poll_interval: Duration,
}

impl FirebaseConfig {
    /// Load from `FIREBASE_API_KEY`, `FIREBASE_PROJECT_ID`, `TASK_POLL_MS`.
    /// Returns `None` if the key or project id is missing (the server falls
    /// back to the in-memory backend).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("FIREBASE_API_KEY").ok()?;
        let project_id = std::env::var("FIREBASE_PROJECT_ID").ok()?;
        let poll_ms = std::env::var("TASK_POLL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_MS);
        Some(Self { api_key, project_id, poll_interval: Duration::from_millis(poll_ms) })
    }
}

/// Both vendor boundaries backed by the Firebase REST APIs.
#[derive(Clone)]
pub struct FirebaseBackend {
    config: FirebaseConfig,
    client: reqwest::Client,
}

impl FirebaseBackend {
    #[must_use]
    pub fn new(config: FirebaseConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    fn documents_url(&self, path: &str) -> String {
        format!(
            "{FIRESTORE_URL}/projects/{}/databases/(default)/documents/{path}",
            self.config.project_id
        )
    }

    /// Fetch every document in a collection path, mapped by `f`.
    async fn list_documents<T>(
        &self,
        identity: &Identity,
        path: &str,
        f: impl Fn(&Document) -> Option<T>,
    ) -> Result<Vec<T>, BackendError> {
        let url = format!("{}?pageSize={LIST_PAGE_SIZE}", self.documents_url(path));
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&identity.id_token)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Protocol(format!("{status}: {body}")));
        }

        let list: DocumentList = resp
            .json()
            .await
            .map_err(|e| BackendError::Protocol(e.to_string()))?;
        Ok(list.documents.iter().filter_map(f).collect())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
struct SignInResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: String,
    #[serde(rename = "idToken")]
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    /// Full resource name; the document id is the last path segment.
    name: String,
    #[serde(default)]
    fields: std::collections::HashMap<String, FieldValue>,
}

/// Firestore's typed value envelope, narrowed to the field types the to-do
/// documents actually use.
#[derive(Debug, Deserialize)]
struct FieldValue {
    #[serde(rename = "stringValue")]
    string_value: Option<String>,
    #[serde(rename = "booleanValue")]
    boolean_value: Option<bool>,
}

impl Document {
    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key)?.string_value.as_deref()
    }

    fn bool_field(&self, key: &str) -> Option<bool> {
        self.fields.get(key)?.boolean_value
    }
}

fn user_from_document(doc: &Document) -> Option<UserRecord> {
    Some(UserRecord { id: doc.id().to_owned(), email: doc.string_field("email")?.to_owned() })
}

fn task_from_document(doc: &Document) -> Option<Task> {
    Some(Task {
        id: doc.id().to_owned(),
        title: doc.string_field("title").unwrap_or_default().to_owned(),
        is_done: doc.bool_field("isDone").unwrap_or(false),
    })
}

/// Pull the `error.message` out of a failed Identity Toolkit response, or
/// fall back to the raw body.
fn sign_in_error(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body).map_or_else(|_| body.to_owned(), |b| b.error.message)
}

// =============================================================================
// TRAIT IMPLS
// =============================================================================

#[async_trait::async_trait]
impl AuthProvider for FirebaseBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        let url = format!(
            "{IDENTITY_TOOLKIT_URL}/accounts:signInWithPassword?key={}",
            self.config.api_key
        );
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Auth(sign_in_error(&body)));
        }

        let signed_in: SignInResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Protocol(e.to_string()))?;
        Ok(Identity {
            user_id: signed_in.local_id,
            email: signed_in.email,
            id_token: signed_in.id_token,
        })
    }

    async fn sign_out(&self, _identity: &Identity) -> Result<(), BackendError> {
        // Password sign-in has no server-side invalidation on the REST
        // surface; discarding the credential is what the SDK's signOut does.
        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskStore for FirebaseBackend {
    async fn list_users(&self, identity: &Identity) -> Result<Vec<UserRecord>, BackendError> {
        self.list_documents(identity, "users", user_from_document).await
    }

    async fn list_tasks(&self, identity: &Identity, user_id: &str) -> Result<Vec<Task>, BackendError> {
        self.list_documents(identity, &format!("users/{user_id}/todos"), task_from_document)
            .await
    }

    async fn watch_tasks(&self, identity: &Identity, user_id: &str) -> Result<TaskWatch, BackendError> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let backend = self.clone();
        let identity = identity.clone();
        let watched_user = user_id.to_owned();
        let interval = self.config.poll_interval;

        let handle = tokio::spawn(async move {
            let mut last: Option<Vec<Task>> = None;
            loop {
                match backend.list_tasks(&identity, &watched_user).await {
                    Ok(tasks) => {
                        if last.as_ref() != Some(&tasks) {
                            if tx.send(tasks.clone()).await.is_err() {
                                break;
                            }
                            last = Some(tasks);
                        }
                    }
                    Err(e) => {
                        // Poll failures are transient by assumption; the last
                        // snapshot simply stays current until the next round.
                        tracing::warn!(user_id = %watched_user, error = %e, "task watch poll failed");
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });

        let guard = WatchGuard::new(move || handle.abort());
        Ok(TaskWatch::new(user_id, rx, guard))
    }

    async fn delete_task(&self, identity: &Identity, user_id: &str, task_id: &str) -> Result<(), BackendError> {
        let url = self.documents_url(&format!("users/{user_id}/todos/{task_id}"));
        let resp = self
            .client
            .delete(&url)
            .bearer_auth(&identity.id_token)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Protocol(format!("{status}: {body}")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;
