//! User directory — one-shot collection read plus the sidebar filter.

use std::sync::Arc;

use crate::backend::{BackendError, Identity, TaskStore, UserRecord};

/// One-shot read of the entire user collection. No pagination; the panel
/// loads the whole list once the session guard passes.
///
/// # Errors
///
/// Propagates the store error unchanged.
pub async fn load_users(store: &Arc<dyn TaskStore>, identity: &Identity) -> Result<Vec<UserRecord>, BackendError> {
    store.list_users(identity).await
}

/// Case-insensitive substring match on email. Pure; recomputed per request.
/// An empty search term returns the list unmodified.
#[must_use]
pub fn filter_users(users: &[UserRecord], search: &str) -> Vec<UserRecord> {
    let needle = search.to_lowercase();
    users
        .iter()
        .filter(|u| u.email.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
