//! Pezzottube Session Store
//!
//! Client-side session/state store for the Pezzottube UI: the single
//! authority for the authenticated user, like/dislike/subscribe/watch-later
//! toggles, bounded watch history and the global comment collection, with
//! wholesale re-persistence to a local key-value backend on every mutation.

pub mod registry;
pub mod session;
pub mod sqlite_persistence;
pub mod storage;

// Re-export commonly used types for convenience
pub use registry::{InMemoryUserRegistry, RegistryUser, SqliteUserRegistry, UserRegistry};
pub use session::{Comment, ProfileUpdate, SessionError, SessionStore, SessionUser};
pub use storage::{MemoryStorage, SqliteStorage, StorageBackend};
