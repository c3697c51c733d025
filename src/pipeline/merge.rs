//! Folding per-message intelligence into the session.

use crate::model::{Intelligence, Session};

/// Merge freshly extracted intelligence into the session's accumulated copy.
///
/// The first extraction is adopted as-is, even when empty, so a session
/// that has been analysed always carries `Some` intelligence. Later ones are
/// unioned by natural key, so re-merging the same intelligence changes nothing.
pub fn merge_into(session: &mut Session, incoming: Intelligence) {
    match session.accumulated_intelligence.as_mut() {
        Some(accumulated) => accumulated.merge(incoming),
        None => session.accumulated_intelligence = Some(incoming),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_handle(handle: &str) -> Intelligence {
        Intelligence {
            payment_handles: [handle.to_string()].into(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_first_extraction_is_adopted() {
        let mut session = Session::new("s");
        merge_into(&mut session, Intelligence::default());
        assert_eq!(session.accumulated_intelligence, Some(Intelligence::default()));

        merge_into(&mut session, with_handle("fraud@ybl"));
        assert_eq!(session.accumulated_intelligence.unwrap().entity_count(), 1);
    }

    #[test]
    fn adopts_first_extraction() {
        let mut session = Session::new("s");
        merge_into(&mut session, with_handle("a@upi"));
        assert_eq!(session.accumulated_intelligence, Some(with_handle("a@upi")));
    }

    #[test]
    fn merge_is_idempotent_and_commutative_on_keys() {
        let mut first = Session::new("s");
        merge_into(&mut first, with_handle("a@upi"));
        merge_into(&mut first, with_handle("b@upi"));
        merge_into(&mut first, with_handle("b@upi"));

        let mut second = Session::new("s");
        merge_into(&mut second, with_handle("b@upi"));
        merge_into(&mut second, with_handle("a@upi"));

        assert_eq!(first.accumulated_intelligence, second.accumulated_intelligence);
        assert_eq!(
            first
                .accumulated_intelligence
                .map(|i| i.payment_handles.len()),
            Some(2)
        );
    }
}
