use pezzottube_session::{
    InMemoryUserRegistry, MemoryStorage, RegistryUser, SessionStore,
};

pub const DEMO_EMAIL: &str = "demo@pezzottube.local";
pub const DEMO_SECRET: &str = "demo123";
pub const DEMO_DISPLAY_NAME: &str = "DemoUser";

pub fn demo_user() -> RegistryUser {
    let mut user = RegistryUser::new(
        "demo-user",
        DEMO_EMAIL,
        DEMO_SECRET,
        DEMO_DISPLAY_NAME,
        "avatars/demo.png",
    );
    user.subscribed_channel_ids = vec!["2".to_string(), "3".to_string()];
    user.liked_video_ids = vec!["1".to_string(), "3".to_string()];
    user.watch_history = vec!["1".to_string(), "2".to_string(), "3".to_string()];
    user.watch_later_ids = vec!["4".to_string(), "5".to_string()];
    user
}

pub fn demo_registry() -> InMemoryUserRegistry {
    InMemoryUserRegistry::with_users(vec![demo_user()])
}

/// A store logged in as the demo user, plus a handle on its storage so tests
/// can inspect the persisted state directly.
pub fn authenticated_store() -> (SessionStore, MemoryStorage) {
    let storage = MemoryStorage::new();
    let store = SessionStore::new(Box::new(demo_registry()), Box::new(storage.clone()));
    store.initialize();
    store
        .login(DEMO_EMAIL, DEMO_SECRET)
        .expect("demo login should succeed");
    (store, storage)
}
