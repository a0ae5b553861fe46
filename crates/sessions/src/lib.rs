//! Session storage for the client.
//!
//! A small string key/value store with the lifetime of a login session. The
//! client keeps exactly two entries in it: the bearer token under
//! [`key::AUTH_TOKEN`] and the test-only bypass flag under
//! [`key::BYPASS_AUTH`]. Backends are in-memory or a JSON file.

pub mod key;
pub mod store;

pub use {
    key::SessionKey,
    store::{FileStorage, MemoryStorage, SessionStorage, SessionStorageExt},
};
