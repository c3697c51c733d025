//! Scam honeypot: detects scam messages, engages the sender with a victim
//! persona, and collects the payment details and links they reveal.

pub mod agent;
pub mod api;
pub mod callback;
pub mod config;
pub mod detection;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod safety;
pub mod session;
