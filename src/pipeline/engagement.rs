//! Engagement policy.

use crate::model::{ScamVerdict, Session};

/// Engage when the current message is a scam or any earlier one was.
///
/// Once a conversation has been flagged it stays engaged, so a scammer
/// cannot shake the persona off by switching to harmless small talk.
pub fn should_engage(session: &Session, current: &ScamVerdict) -> bool {
    current.is_scam || session.ever_flagged()
}
