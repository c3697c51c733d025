//! Data model shared by every pipeline stage.

pub mod intelligence;
pub mod message;
pub mod session;
pub mod verdict;

pub use intelligence::{BankAccount, BehaviorPatterns, Intelligence, Link, PhoneNumber};
pub use message::{AGENT_SENDER, Message};
pub use session::{Session, SessionStatus, SessionSummary};
pub use verdict::{ScamCategory, ScamVerdict};
