//! Stateless sessions rebuilt from caller-supplied history.
//!
//! Nothing is persisted: the caller sends the full conversation with every
//! request and a transient [`Session`] is replayed from it.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{Message, Session};

/// Build a transient session from `history` followed by `current`.
///
/// Messages whose id was already replayed are skipped. `created_at` is the
/// earliest message timestamp that is not in the future, or now.
pub fn reconstruct(session_id: &str, history: Vec<Message>, current: Message) -> Session {
    reconstruct_at(session_id, history, current, Utc::now())
}

pub(crate) fn reconstruct_at(
    session_id: &str,
    history: Vec<Message>,
    current: Message,
    now: DateTime<Utc>,
) -> Session {
    let created_at = history
        .iter()
        .chain(std::iter::once(&current))
        .map(|m| m.timestamp)
        .filter(|ts| *ts <= now)
        .min()
        .unwrap_or(now);

    let mut session = Session::with_created_at(session_id, created_at);
    let mut skipped = 0usize;
    for message in history.into_iter().chain(std::iter::once(current)) {
        if !session.add_message(message) {
            skipped += 1;
        }
    }

    debug!(
        session_id,
        skipped_duplicates = skipped,
        summary = ?session.summary(),
        "Reconstructed stateless session"
    );

    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn msg(id: &str, ts: DateTime<Utc>) -> Message {
        Message::new("scammer", "hello", ts, id)
    }

    #[test]
    fn replays_history_then_current() {
        let now = Utc::now();
        let history = vec![
            msg("m1", now - Duration::minutes(5)),
            Message::new("agent", "who is this?", now - Duration::minutes(4), "m2"),
        ];
        let session = reconstruct_at("s", history, msg("m3", now), now);

        let ids: Vec<&str> = session.messages.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(session.created_at, now - Duration::minutes(5));
        assert!(session.classifications.is_empty());
    }

    #[test]
    fn duplicate_ids_are_skipped() {
        let now = Utc::now();
        let history = vec![msg("m1", now), msg("m1", now)];
        let session = reconstruct_at("s", history, msg("m1", now), now);
        assert_eq!(session.message_count(), 1);
    }

    #[test]
    fn future_timestamps_do_not_set_creation_time() {
        let now = Utc::now();
        let history = vec![msg("m1", now + Duration::hours(1))];
        let session = reconstruct_at("s", history, msg("m2", now + Duration::hours(2)), now);
        assert_eq!(session.created_at, now);
        assert_eq!(session.duration_seconds(now), 0);
    }

    #[test]
    fn empty_history() {
        let session = reconstruct("s", Vec::new(), msg("m1", Utc::now()));
        assert_eq!(session.session_id, "s");
        assert_eq!(session.message_count(), 1);
    }
}
