use super::*;
use crate::backend::memory::MemoryBackend;
use crate::backend::AuthProvider;

fn user(email: &str) -> UserRecord {
    UserRecord { id: format!("id-{email}"), email: email.into() }
}

// =============================================================================
// filter_users
// =============================================================================

#[test]
fn empty_search_returns_full_list_unmodified() {
    let users = vec![user("a@x.com"), user("b@x.com")];
    assert_eq!(filter_users(&users, ""), users);
}

#[test]
fn non_matching_search_returns_empty_list() {
    let users = vec![user("a@x.com"), user("b@x.com")];
    assert!(filter_users(&users, "zzz").is_empty());
}

#[test]
fn substring_match_selects_matching_emails() {
    let users = vec![user("a@x.com"), user("b@x.com")];
    let filtered = filter_users(&users, "a");
    assert_eq!(filtered, vec![user("a@x.com")]);
}

#[test]
fn match_is_case_insensitive_both_ways() {
    let users = vec![user("Alice@Example.COM"), user("bob@example.com")];
    assert_eq!(filter_users(&users, "ALICE").len(), 1);
    assert_eq!(filter_users(&users, "alice").len(), 1);
    assert_eq!(filter_users(&users, "EXAMPLE").len(), 2);
}

#[test]
fn filter_preserves_backend_order() {
    let users = vec![user("c@x.com"), user("a@x.com"), user("ca@x.com")];
    let filtered = filter_users(&users, "c");
    assert_eq!(filtered, vec![user("c@x.com"), user("ca@x.com")]);
}

// =============================================================================
// load_users
// =============================================================================

#[tokio::test]
async fn load_users_reads_whole_collection() {
    let backend = MemoryBackend::new();
    backend.add_account("admin@example.com", "pw");
    backend.add_user("a@x.com");
    backend.add_user("b@x.com");

    let identity = backend
        .sign_in("admin@example.com", "pw")
        .await
        .expect("sign-in should succeed");
    let store: Arc<dyn TaskStore> = Arc::new(backend);

    let users = load_users(&store, &identity).await.expect("list should succeed");
    let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
}
