//! HTTP adapter: wire types, authentication, and routes.

pub mod auth;
pub mod routes;
pub mod wire;

pub use routes::{AppState, router};
