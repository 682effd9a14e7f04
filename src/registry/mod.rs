mod sqlite_user_registry;

pub use sqlite_user_registry::SqliteUserRegistry;

use crate::session::SessionUser;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// The full record of a known user, including the credential secret used
/// during login. Secrets never leave the registry: sessions and persisted
/// state only ever see the [`RegistryUser::session_view`] copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryUser {
    pub id: String,
    pub email: String,
    pub credential_secret: String,
    pub display_name: String,
    pub avatar_ref: String,
    pub subscribed_channel_ids: Vec<String>,
    pub liked_video_ids: Vec<String>,
    pub disliked_video_ids: Vec<String>,
    pub watch_history: Vec<String>,
    pub watch_later_ids: Vec<String>,
    pub playlists: Vec<crate::session::Playlist>,
    pub notifications: Vec<crate::session::Notification>,
}

impl RegistryUser {
    /// A fresh user with empty collections, as created by registration.
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        credential_secret: impl Into<String>,
        display_name: impl Into<String>,
        avatar_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            credential_secret: credential_secret.into(),
            display_name: display_name.into(),
            avatar_ref: avatar_ref.into(),
            subscribed_channel_ids: vec![],
            liked_video_ids: vec![],
            disliked_video_ids: vec![],
            watch_history: vec![],
            watch_later_ids: vec![],
            playlists: vec![],
            notifications: vec![],
        }
    }

    /// The session-safe copy of this record, with the secret stripped.
    pub fn session_view(&self) -> SessionUser {
        SessionUser {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            avatar_ref: self.avatar_ref.clone(),
            subscribed_channel_ids: self.subscribed_channel_ids.clone(),
            liked_video_ids: self.liked_video_ids.clone(),
            disliked_video_ids: self.disliked_video_ids.clone(),
            watch_history: self.watch_history.clone(),
            watch_later_ids: self.watch_later_ids.clone(),
            playlists: self.playlists.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

/// The registry of known users the session store authenticates against.
/// Lookups are case-sensitive exact matches on the email.
pub trait UserRegistry: Send + Sync {
    /// Returns the first user whose email matches exactly.
    /// Returns Ok(None) if no user has that email.
    /// Returns Err if the backend fails.
    fn find_by_email(&self, email: &str) -> Result<Option<RegistryUser>>;

    /// Returns the user with the given id.
    /// Returns Ok(None) if the id is unknown.
    fn find_by_id(&self, id: &str) -> Result<Option<RegistryUser>>;

    /// Adds a new user.
    /// Returns Err if a user with the same email or id already exists.
    fn insert(&self, user: RegistryUser) -> Result<()>;
}

/// In-memory [`UserRegistry`], seeded with a fixed user list. Registrations
/// do not survive a process restart; substitute [`SqliteUserRegistry`]
/// where they should.
#[derive(Default)]
pub struct InMemoryUserRegistry {
    users: Mutex<Vec<RegistryUser>>,
}

impl InMemoryUserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<RegistryUser>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }
}

impl UserRegistry for InMemoryUserRegistry {
    fn find_by_email(&self, email: &str) -> Result<Option<RegistryUser>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<RegistryUser>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    fn insert(&self, user: RegistryUser) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            bail!("A user with email {} already exists.", user.email);
        }
        if users.iter().any(|u| u.id == user.id) {
            bail!("A user with id {} already exists.", user.id);
        }
        users.push(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn sample_user(id: &str, email: &str) -> RegistryUser {
        RegistryUser::new(id, email, "secret", "Sample", "avatars/default.png")
    }

    #[test]
    fn test_insert_and_lookup() {
        let registry = InMemoryUserRegistry::new();
        registry.insert(sample_user("1", "a@b.com")).unwrap();

        let found = registry.find_by_email("a@b.com").unwrap().unwrap();
        assert_eq!(found.id, "1");
        assert_eq!(registry.find_by_email("x@y.com").unwrap(), None);

        let found = registry.find_by_id("1").unwrap().unwrap();
        assert_eq!(found.email, "a@b.com");
    }

    #[test]
    fn email_lookup_is_case_sensitive() {
        let registry = InMemoryUserRegistry::new();
        registry.insert(sample_user("1", "a@b.com")).unwrap();
        assert_eq!(registry.find_by_email("A@B.com").unwrap(), None);
    }

    #[test]
    fn rejects_duplicate_email() {
        let registry = InMemoryUserRegistry::new();
        registry.insert(sample_user("1", "a@b.com")).unwrap();
        assert!(registry.insert(sample_user("2", "a@b.com")).is_err());
    }

    #[test]
    fn session_view_strips_the_secret() {
        let user = sample_user("1", "a@b.com");
        let view = user.session_view();
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secret"));
        assert_eq!(view.id, user.id);
        assert_eq!(view.email, user.email);
    }
}
