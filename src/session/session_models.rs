use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many entries the watch history keeps before dropping the oldest.
pub const WATCH_HISTORY_LIMIT: usize = 50;

/// The user record held by an authenticated session and persisted to local
/// storage. It never carries the credential secret, see
/// [`crate::registry::RegistryUser::session_view`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_ref: String,
    pub subscribed_channel_ids: Vec<String>,
    pub liked_video_ids: Vec<String>,
    pub disliked_video_ids: Vec<String>,
    /// Most recent first, no duplicates, at most [`WATCH_HISTORY_LIMIT`] entries.
    pub watch_history: Vec<String>,
    pub watch_later_ids: Vec<String>,
    pub playlists: Vec<Playlist>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub video_ids: Vec<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewVideo,
    CommentReply,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// A remark attached to a video, with a denormalized snapshot of its author
/// taken at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Creation-order unique, assigned monotonically by the store.
    pub id: u64,
    pub video_id: String,
    pub author_id: String,
    pub author_display_name: String,
    pub author_avatar_ref: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Always equal to `liked_by_user_ids.len()`.
    pub like_count: u64,
    pub liked_by_user_ids: Vec<String>,
}

/// Partial presentation-field update merged into the current user by
/// [`crate::session::SessionStore::update_profile`]. `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}
