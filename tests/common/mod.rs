//! Common test infrastructure
//!
//! Fixtures shared by the integration tests: a seeded in-memory registry and
//! helpers to build stores around inspectable storage.

mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{
    authenticated_store, demo_registry, demo_user, DEMO_DISPLAY_NAME, DEMO_EMAIL, DEMO_SECRET,
};
