//! Integration tests for the session store invariants
//!
//! Covers authentication, toggle semantics, watch history bounds and the
//! comment collection over the public API.

mod common;

use common::{authenticated_store, demo_registry, DEMO_EMAIL, DEMO_SECRET};
use pezzottube_session::session::WATCH_HISTORY_LIMIT;
use pezzottube_session::{MemoryStorage, SessionError, SessionStore};

// =============================================================================
// Authentication
// =============================================================================

#[test]
fn register_then_login_round_trip() {
    let storage = MemoryStorage::new();
    let store = SessionStore::new(Box::new(demo_registry()), Box::new(storage.clone()));
    store.initialize();

    let registered = store.register("a@b.com", "secret", "Al").unwrap();
    assert_eq!(registered.email, "a@b.com");
    assert_eq!(registered.display_name, "Al");
    assert!(registered.liked_video_ids.is_empty());

    store.logout().unwrap();
    assert!(!store.is_authenticated());

    let logged_in = store.login("a@b.com", "secret").unwrap();
    assert_eq!(logged_in.id, registered.id);
}

#[test]
fn login_with_wrong_secret_leaves_existing_session_untouched() {
    let (store, _storage) = authenticated_store();

    let result = store.login("a@b.com", "wrong");
    assert!(matches!(result, Err(SessionError::InvalidCredentials)));

    let user = store.current_user().unwrap();
    assert_eq!(user.email, DEMO_EMAIL);
}

#[test]
fn login_is_case_sensitive() {
    let (store, _storage) = authenticated_store();
    store.logout().unwrap();

    let upper = DEMO_EMAIL.to_uppercase();
    assert!(matches!(
        store.login(&upper, DEMO_SECRET),
        Err(SessionError::InvalidCredentials)
    ));
}

#[test]
fn registering_an_existing_email_fails() {
    let (store, _storage) = authenticated_store();

    let result = store.register(DEMO_EMAIL, "whatever", "Impostor");
    assert!(matches!(result, Err(SessionError::UserExists(_))));
}

#[test]
fn session_user_carries_no_secret() {
    let (store, _storage) = authenticated_store();

    let json = serde_json::to_string(&store.current_user().unwrap()).unwrap();
    assert!(!json.contains(DEMO_SECRET));
    assert!(!json.contains("credential_secret"));
}

#[test]
fn logout_when_unauthenticated_is_a_no_op() {
    let store = SessionStore::new(
        Box::new(demo_registry()),
        Box::new(MemoryStorage::new()),
    );
    store.initialize();

    store.logout().unwrap();
    assert!(!store.is_authenticated());
}

// =============================================================================
// Video toggles
// =============================================================================

#[test]
fn like_then_dislike_is_mutually_exclusive() {
    let (store, _storage) = authenticated_store();

    store.toggle_like_video("v9").unwrap();
    assert!(store.is_video_liked("v9"));

    store.toggle_dislike_video("v9").unwrap();
    assert!(store.is_video_disliked("v9"));
    assert!(!store.is_video_liked("v9"));

    store.toggle_like_video("v9").unwrap();
    assert!(store.is_video_liked("v9"));
    assert!(!store.is_video_disliked("v9"));
}

#[test]
fn like_toggle_is_idempotent_pairwise() {
    let (store, _storage) = authenticated_store();

    assert!(!store.is_video_liked("v9"));
    store.toggle_like_video("v9").unwrap();
    store.toggle_like_video("v9").unwrap();
    assert!(!store.is_video_liked("v9"));
}

#[test]
fn watch_later_toggle_returns_to_original_state() {
    let (store, _storage) = authenticated_store();

    let before = store.is_in_watch_later("v9");
    store.toggle_watch_later("v9").unwrap();
    assert_ne!(store.is_in_watch_later("v9"), before);
    store.toggle_watch_later("v9").unwrap();
    assert_eq!(store.is_in_watch_later("v9"), before);
}

#[test]
fn subscription_toggle() {
    let (store, _storage) = authenticated_store();

    // seeded subscription
    assert!(store.is_subscribed("2"));
    store.toggle_subscription("2").unwrap();
    assert!(!store.is_subscribed("2"));

    store.toggle_subscription("c7").unwrap();
    assert!(store.is_subscribed("c7"));
}

// =============================================================================
// Watch history
// =============================================================================

#[test]
fn history_is_most_recent_first_without_duplicates() {
    let storage = MemoryStorage::new();
    let store = SessionStore::new(Box::new(demo_registry()), Box::new(storage));
    store.initialize();
    store.register("h@b.com", "secret", "H").unwrap();

    for video_id in ["a", "b", "a", "c"] {
        store.add_to_watch_history(video_id).unwrap();
    }

    let history = store.current_user().unwrap().watch_history;
    assert_eq!(history, vec!["c", "a", "b"]);
}

#[test]
fn history_is_capped_at_the_limit() {
    let storage = MemoryStorage::new();
    let store = SessionStore::new(Box::new(demo_registry()), Box::new(storage));
    store.initialize();
    store.register("h@b.com", "secret", "H").unwrap();

    for i in 0..60 {
        store.add_to_watch_history(&format!("v{}", i)).unwrap();
    }

    let history = store.current_user().unwrap().watch_history;
    assert_eq!(history.len(), WATCH_HISTORY_LIMIT);
    assert_eq!(history.first().unwrap(), "v59");
    assert_eq!(history.last().unwrap(), "v10");
}

// =============================================================================
// Comments
// =============================================================================

#[test]
fn added_comment_snapshots_the_author() {
    let (store, _storage) = authenticated_store();

    let comment = store.add_comment("v1", "hi").unwrap();
    assert_eq!(comment.author_display_name, "DemoUser");
    assert_eq!(comment.like_count, 0);
    assert!(comment.liked_by_user_ids.is_empty());

    let comments = store.get_comments_for_video("v1").unwrap();
    assert_eq!(comments, vec![comment]);
}

#[test]
fn comment_ids_are_creation_ordered() {
    let (store, _storage) = authenticated_store();

    let first = store.add_comment("v1", "first").unwrap();
    let second = store.add_comment("v2", "second").unwrap();
    let third = store.add_comment("v1", "third").unwrap();
    assert!(first.id < second.id && second.id < third.id);

    let on_v1 = store.get_comments_for_video("v1").unwrap();
    assert_eq!(
        on_v1.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![first.id, third.id]
    );
}

#[test]
fn comment_like_toggles_count_and_membership() {
    let (store, _storage) = authenticated_store();
    let comment = store.add_comment("v1", "hi").unwrap();
    let user_id = store.current_user().unwrap().id;

    store.toggle_like_comment(comment.id).unwrap();
    let liked = &store.get_comments_for_video("v1").unwrap()[0];
    assert_eq!(liked.like_count, 1);
    assert!(liked.liked_by_user_ids.contains(&user_id));

    store.toggle_like_comment(comment.id).unwrap();
    let unliked = &store.get_comments_for_video("v1").unwrap()[0];
    assert_eq!(unliked.like_count, 0);
    assert!(unliked.liked_by_user_ids.is_empty());
}

#[test]
fn comments_reflect_latest_persisted_state_across_stores() {
    let (store, storage) = authenticated_store();
    store.add_comment("v1", "hello from the first store").unwrap();

    // a second store over the same storage sees the comment immediately
    let other = SessionStore::new(Box::new(demo_registry()), Box::new(storage));
    other.initialize();
    let comments = other.get_comments_for_video("v1").unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "hello from the first store");
}

// =============================================================================
// Unauthenticated access
// =============================================================================

#[test]
fn unauthenticated_mutations_fail_and_leave_storage_untouched() {
    let storage = MemoryStorage::new();
    let store = SessionStore::new(Box::new(demo_registry()), Box::new(storage.clone()));
    store.initialize();

    let before = storage.snapshot();

    assert!(matches!(
        store.toggle_like_video("v1"),
        Err(SessionError::Unauthenticated)
    ));
    assert!(matches!(
        store.toggle_dislike_video("v1"),
        Err(SessionError::Unauthenticated)
    ));
    assert!(matches!(
        store.toggle_subscription("c1"),
        Err(SessionError::Unauthenticated)
    ));
    assert!(matches!(
        store.toggle_watch_later("v1"),
        Err(SessionError::Unauthenticated)
    ));
    assert!(matches!(
        store.add_to_watch_history("v1"),
        Err(SessionError::Unauthenticated)
    ));
    assert!(matches!(
        store.add_comment("v1", "hi"),
        Err(SessionError::Unauthenticated)
    ));
    assert!(matches!(
        store.toggle_like_comment(1),
        Err(SessionError::Unauthenticated)
    ));
    assert!(matches!(
        store.update_profile(Default::default()),
        Err(SessionError::Unauthenticated)
    ));

    assert_eq!(storage.snapshot(), before);
}

#[test]
fn predicates_are_false_when_unauthenticated() {
    let store = SessionStore::new(
        Box::new(demo_registry()),
        Box::new(MemoryStorage::new()),
    );
    store.initialize();

    assert!(!store.is_video_liked("1"));
    assert!(!store.is_video_disliked("1"));
    assert!(!store.is_subscribed("2"));
    assert!(!store.is_in_watch_later("4"));
}
