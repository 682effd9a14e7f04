use crate::registry::{RegistryUser, UserRegistry};
use crate::session::session_models::{
    Comment, ProfileUpdate, SessionUser, WATCH_HISTORY_LIMIT,
};
use crate::storage::StorageBackend;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Storage key of the serialized session user (secret stripped).
pub const STORAGE_KEY_USER: &str = "pezzottube_user";
/// Storage key of the serialized global comment collection.
pub const STORAGE_KEY_COMMENTS: &str = "pezzottube_comments";

/// Bumped whenever the shape of a persisted record changes. Records with a
/// different version are rejected rather than assumed to still parse.
const RECORD_VERSION: u32 = 1;

const DEFAULT_AVATAR_REF: &str = "avatars/default.png";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("A user with email {0} already exists")]
    UserExists(String),

    #[error("No authenticated session")]
    Unauthenticated,

    #[error("Stored {record} record is corrupt: {reason}")]
    PersistenceCorrupt {
        record: &'static str,
        reason: String,
    },

    #[error("Storage write failed: {0}")]
    PersistenceWriteFailed(#[source] anyhow::Error),

    #[error("Storage read failed: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("User registry error: {0}")]
    Registry(#[source] anyhow::Error),
}

/// Envelope around every persisted record, so a record written by a newer
/// (or older) build is detected instead of mis-parsed.
#[derive(Serialize, Deserialize)]
struct PersistedRecord<T> {
    version: u32,
    data: T,
}

struct SessionState {
    current_user: Option<SessionUser>,
    is_initializing: bool,
}

/// Single authority for identity state, per-user interaction toggles, watch
/// history and comments. Every mutation re-persists the affected record
/// wholesale through the injected [`StorageBackend`]; authentication goes
/// through the injected [`UserRegistry`].
///
/// All session mutations hold one internal lock for their whole duration, so
/// the store keeps its invariants even if the host dispatches from more than
/// one thread.
pub struct SessionStore {
    registry: Box<dyn UserRegistry>,
    storage: Box<dyn StorageBackend>,
    state: Mutex<SessionState>,
}

impl SessionStore {
    /// A store that has not yet rehydrated: `is_initializing` stays true
    /// until [`SessionStore::initialize`] runs.
    pub fn new(registry: Box<dyn UserRegistry>, storage: Box<dyn StorageBackend>) -> Self {
        Self {
            registry,
            storage,
            state: Mutex::new(SessionState {
                current_user: None,
                is_initializing: true,
            }),
        }
    }

    /// Attempts to restore a previously persisted session with a single
    /// storage read. A missing record leaves the session unauthenticated; a
    /// malformed or version-mismatched record is dropped with a warning
    /// rather than failing startup.
    pub fn initialize(&self) {
        let mut state = self.state.lock().unwrap();
        match self.read_record::<SessionUser>(STORAGE_KEY_USER, "user") {
            Ok(Some(user)) => {
                info!("Restored session for user {}", user.id);
                state.current_user = Some(user);
            }
            Ok(None) => {}
            Err(err) => {
                warn!("Dropping stored session: {}", err);
                state.current_user = None;
            }
        }
        state.is_initializing = false;
    }

    pub fn is_initializing(&self) -> bool {
        self.state.lock().unwrap().is_initializing
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().unwrap().current_user.is_some()
    }

    /// Cloned snapshot of the current session user, if any.
    pub fn current_user(&self) -> Option<SessionUser> {
        self.state.lock().unwrap().current_user.clone()
    }

    /// Authenticates against the registry with a case-sensitive exact match
    /// on email and secret. On success the stripped copy of the matched user
    /// becomes the session user and is persisted. On failure the existing
    /// session is left untouched.
    pub fn login(
        &self,
        email: &str,
        credential_secret: &str,
    ) -> Result<SessionUser, SessionError> {
        let mut state = self.state.lock().unwrap();
        let found = self
            .registry
            .find_by_email(email)
            .map_err(SessionError::Registry)?;
        let user = match found {
            Some(user) if user.credential_secret == credential_secret => user,
            _ => return Err(SessionError::InvalidCredentials),
        };

        let session_user = user.session_view();
        self.write_record(STORAGE_KEY_USER, &session_user)?;
        info!("User {} logged in", session_user.id);
        state.current_user = Some(session_user.clone());
        Ok(session_user)
    }

    /// Creates a new registry user with a fresh collision-free id and empty
    /// collections, then logs it in.
    pub fn register(
        &self,
        email: &str,
        credential_secret: &str,
        display_name: &str,
    ) -> Result<SessionUser, SessionError> {
        let mut state = self.state.lock().unwrap();
        if self
            .registry
            .find_by_email(email)
            .map_err(SessionError::Registry)?
            .is_some()
        {
            return Err(SessionError::UserExists(email.to_string()));
        }

        let user = RegistryUser::new(
            self.fresh_user_id()?,
            email,
            credential_secret,
            display_name,
            DEFAULT_AVATAR_REF,
        );
        self.registry
            .insert(user.clone())
            .map_err(SessionError::Registry)?;

        let session_user = user.session_view();
        self.write_record(STORAGE_KEY_USER, &session_user)?;
        info!("Registered user {}", session_user.id);
        state.current_user = Some(session_user.clone());
        Ok(session_user)
    }

    /// Clears the session and the persisted user record. No effect when
    /// already unauthenticated.
    pub fn logout(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.current_user.is_none() {
            return Ok(());
        }
        self.storage
            .remove(STORAGE_KEY_USER)
            .map_err(SessionError::PersistenceWriteFailed)?;
        state.current_user = None;
        Ok(())
    }

    /// Merges the given presentation fields into the current user and
    /// re-persists the record.
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<SessionUser, SessionError> {
        self.mutate_current_user(|user| {
            if let Some(display_name) = update.display_name {
                user.display_name = display_name;
            }
            if let Some(avatar_ref) = update.avatar_ref {
                user.avatar_ref = avatar_ref;
            }
        })
    }

    /// Toggles the video in the liked set, removing it from the disliked set
    /// first so the two stay mutually exclusive.
    pub fn toggle_like_video(&self, video_id: &str) -> Result<(), SessionError> {
        self.mutate_current_user(|user| {
            remove_id(&mut user.disliked_video_ids, video_id);
            toggle_id(&mut user.liked_video_ids, video_id);
        })
        .map(|_| ())
    }

    /// Mirror of [`SessionStore::toggle_like_video`] for the disliked set.
    pub fn toggle_dislike_video(&self, video_id: &str) -> Result<(), SessionError> {
        self.mutate_current_user(|user| {
            remove_id(&mut user.liked_video_ids, video_id);
            toggle_id(&mut user.disliked_video_ids, video_id);
        })
        .map(|_| ())
    }

    pub fn toggle_subscription(&self, channel_id: &str) -> Result<(), SessionError> {
        self.mutate_current_user(|user| toggle_id(&mut user.subscribed_channel_ids, channel_id))
            .map(|_| ())
    }

    pub fn toggle_watch_later(&self, video_id: &str) -> Result<(), SessionError> {
        self.mutate_current_user(|user| toggle_id(&mut user.watch_later_ids, video_id))
            .map(|_| ())
    }

    /// Moves the video to the front of the watch history, de-duplicating any
    /// earlier occurrence and truncating to [`WATCH_HISTORY_LIMIT`] entries.
    pub fn add_to_watch_history(&self, video_id: &str) -> Result<(), SessionError> {
        self.mutate_current_user(|user| {
            remove_id(&mut user.watch_history, video_id);
            user.watch_history.insert(0, video_id.to_string());
            user.watch_history.truncate(WATCH_HISTORY_LIMIT);
        })
        .map(|_| ())
    }

    pub fn is_video_liked(&self, video_id: &str) -> bool {
        self.current_user_contains(|user| &user.liked_video_ids, video_id)
    }

    pub fn is_video_disliked(&self, video_id: &str) -> bool {
        self.current_user_contains(|user| &user.disliked_video_ids, video_id)
    }

    pub fn is_subscribed(&self, channel_id: &str) -> bool {
        self.current_user_contains(|user| &user.subscribed_channel_ids, channel_id)
    }

    pub fn is_in_watch_later(&self, video_id: &str) -> bool {
        self.current_user_contains(|user| &user.watch_later_ids, video_id)
    }

    /// Appends a comment with a fresh creation-order id and a snapshot of the
    /// current user's identity fields, re-persisting the whole collection.
    pub fn add_comment(&self, video_id: &str, text: &str) -> Result<Comment, SessionError> {
        let state = self.state.lock().unwrap();
        let user = state
            .current_user
            .as_ref()
            .ok_or(SessionError::Unauthenticated)?;

        let mut comments = self.read_comments()?;
        // ids are monotonic and comments are never deleted, so max + 1 is
        // always fresh
        let id = comments.iter().map(|c| c.id).max().map_or(1, |max| max + 1);
        let comment = Comment {
            id,
            video_id: video_id.to_string(),
            author_id: user.id.clone(),
            author_display_name: user.display_name.clone(),
            author_avatar_ref: user.avatar_ref.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
            like_count: 0,
            liked_by_user_ids: vec![],
        };
        comments.push(comment.clone());
        self.write_record(STORAGE_KEY_COMMENTS, &comments)?;
        Ok(comment)
    }

    /// All comments for the video in creation order, re-read from storage on
    /// every call so it reflects the latest persisted state.
    pub fn get_comments_for_video(&self, video_id: &str) -> Result<Vec<Comment>, SessionError> {
        let mut comments = self.read_comments()?;
        comments.retain(|c| c.video_id == video_id);
        Ok(comments)
    }

    /// Toggles the current user's like on a comment, recomputing its like
    /// count from the resulting membership set. An unknown comment id is a
    /// no-op.
    pub fn toggle_like_comment(&self, comment_id: u64) -> Result<(), SessionError> {
        let state = self.state.lock().unwrap();
        let user_id = state
            .current_user
            .as_ref()
            .ok_or(SessionError::Unauthenticated)?
            .id
            .clone();

        let mut comments = self.read_comments()?;
        let comment = match comments.iter_mut().find(|c| c.id == comment_id) {
            Some(comment) => comment,
            None => return Ok(()),
        };
        toggle_id(&mut comment.liked_by_user_ids, &user_id);
        comment.like_count = comment.liked_by_user_ids.len() as u64;
        self.write_record(STORAGE_KEY_COMMENTS, &comments)?;
        Ok(())
    }

    fn fresh_user_id(&self) -> Result<String, SessionError> {
        // v4 collisions are vanishingly rare, but id uniqueness is an
        // invariant here, not a probability
        loop {
            let id = Uuid::new_v4().to_string();
            if self
                .registry
                .find_by_id(&id)
                .map_err(SessionError::Registry)?
                .is_none()
            {
                return Ok(id);
            }
        }
    }

    /// Applies the mutation to a copy of the current user, persists it, then
    /// swaps it in, so a failed write leaves the session consistent with
    /// storage. Fails with [`SessionError::Unauthenticated`] when there is no
    /// session, before anything touches storage.
    fn mutate_current_user(
        &self,
        mutate: impl FnOnce(&mut SessionUser),
    ) -> Result<SessionUser, SessionError> {
        let mut state = self.state.lock().unwrap();
        let user = state
            .current_user
            .as_mut()
            .ok_or(SessionError::Unauthenticated)?;
        let mut updated = user.clone();
        mutate(&mut updated);
        self.write_record(STORAGE_KEY_USER, &updated)?;
        *user = updated.clone();
        Ok(updated)
    }

    fn current_user_contains(
        &self,
        select: impl FnOnce(&SessionUser) -> &Vec<String>,
        id: &str,
    ) -> bool {
        self.state
            .lock()
            .unwrap()
            .current_user
            .as_ref()
            .map(|user| select(user).iter().any(|x| x == id))
            .unwrap_or(false)
    }

    fn read_comments(&self) -> Result<Vec<Comment>, SessionError> {
        Ok(self
            .read_record::<Vec<Comment>>(STORAGE_KEY_COMMENTS, "comments")?
            .unwrap_or_default())
    }

    fn read_record<T: DeserializeOwned>(
        &self,
        key: &str,
        record: &'static str,
    ) -> Result<Option<T>, SessionError> {
        let raw = match self.storage.get(key).map_err(SessionError::Storage)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let envelope: PersistedRecord<T> =
            serde_json::from_str(&raw).map_err(|err| SessionError::PersistenceCorrupt {
                record,
                reason: err.to_string(),
            })?;
        if envelope.version != RECORD_VERSION {
            return Err(SessionError::PersistenceCorrupt {
                record,
                reason: format!("unsupported record version {}", envelope.version),
            });
        }
        Ok(Some(envelope.data))
    }

    fn write_record<T: Serialize>(&self, key: &str, data: &T) -> Result<(), SessionError> {
        let envelope = PersistedRecord {
            version: RECORD_VERSION,
            data,
        };
        let raw = serde_json::to_string(&envelope)
            .map_err(|err| SessionError::PersistenceWriteFailed(err.into()))?;
        self.storage
            .set(key, &raw)
            .map_err(SessionError::PersistenceWriteFailed)
    }
}

fn remove_id(ids: &mut Vec<String>, id: &str) -> bool {
    match ids.iter().position(|x| x == id) {
        Some(index) => {
            ids.remove(index);
            true
        }
        None => false,
    }
}

/// Idempotent set toggle over an order-preserving id list.
fn toggle_id(ids: &mut Vec<String>, id: &str) {
    if !remove_id(ids, id) {
        ids.push(id.to_string());
    }
}
