//! Session management: a persistent in-memory store and stateless replay.

pub mod stateless;
pub mod store;

pub use store::{SessionHandle, SessionStore, history_matches, spawn_expiry_task};
