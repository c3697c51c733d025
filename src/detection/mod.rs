//! Per-message detection: scam classification and entity extraction.
//!
//! Both components are pure and shared across tasks without locking.

pub mod classifier;
pub mod extractor;

pub use classifier::{RISK_BOOST, SCAM_THRESHOLD, ScamClassifier};
pub use extractor::EntityExtractor;
