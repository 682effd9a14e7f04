mod session_models;
mod session_store;

pub use session_models::{
    Comment, Notification, NotificationKind, Playlist, ProfileUpdate, SessionUser,
    WATCH_HISTORY_LIMIT,
};
pub use session_store::{SessionError, SessionStore, STORAGE_KEY_COMMENTS, STORAGE_KEY_USER};
