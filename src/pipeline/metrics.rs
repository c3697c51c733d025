//! Per-turn engagement metrics.

use chrono::{DateTime, Utc};

use super::types::EngagementMetrics;
use crate::model::{Intelligence, Session};

/// Compute metrics from the session as it stands after this turn.
pub fn compute_metrics(
    session: &Session,
    reply_produced: bool,
    now: DateTime<Utc>,
) -> EngagementMetrics {
    let empty = Intelligence::default();
    let intel = session.accumulated_intelligence.as_ref().unwrap_or(&empty);
    let message_count = session.message_count();

    EngagementMetrics {
        duration_seconds: session.duration_seconds(now),
        message_count,
        engagement_quality: engagement_quality(reply_produced, message_count, intel),
        intelligence_score: intelligence_score(intel),
    }
}

fn engagement_quality(reply_produced: bool, message_count: usize, intel: &Intelligence) -> f64 {
    let mut quality = 0.0;
    if reply_produced {
        quality += 0.3;
    }
    if message_count > 1 {
        quality += (0.1 * message_count as f64).min(0.4);
    }
    quality += (0.1 * intel.entity_count() as f64).min(0.3);
    round2(quality.min(1.0))
}

fn intelligence_score(intel: &Intelligence) -> f64 {
    let score = 0.3 * intel.bank_accounts.len() as f64
        + 0.2 * intel.payment_handles.len() as f64
        + 0.2 * intel.phone_numbers.len() as f64
        + 0.1 * intel.links.len() as f64
        + (0.02 * intel.keywords.len() as f64).min(0.2);
    round2(score.min(1.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BankAccount, Message};

    fn session_with(messages: usize, intel: Option<Intelligence>) -> Session {
        let mut session = Session::new("s");
        for i in 0..messages {
            session.add_message(Message::new("scammer", "x", Utc::now(), format!("m{i}")));
        }
        session.accumulated_intelligence = intel;
        session
    }

    #[test]
    fn first_benign_turn_scores_zero() {
        let session = session_with(1, None);
        let metrics = compute_metrics(&session, false, Utc::now());
        assert_eq!(metrics.message_count, 1);
        assert_eq!(metrics.engagement_quality, 0.0);
        assert_eq!(metrics.intelligence_score, 0.0);
    }

    #[test]
    fn reply_and_history_raise_quality() {
        let intel = Intelligence {
            payment_handles: ["a@upi".to_string()].into(),
            ..Default::default()
        };
        let session = session_with(2, Some(intel));
        let metrics = compute_metrics(&session, true, Utc::now());
        // 0.3 reply + 0.2 for two messages + 0.1 for one entity.
        assert_eq!(metrics.engagement_quality, 0.6);
        assert_eq!(metrics.intelligence_score, 0.2);
    }

    #[test]
    fn components_are_capped() {
        let intel = Intelligence {
            bank_accounts: (0..5)
                .map(|i| BankAccount {
                    account_number: format!("12345678901{i}"),
                    routing_code: None,
                    confidence: 0.5,
                })
                .collect(),
            keywords: (0..20).map(|i| format!("k{i}")).collect(),
            ..Default::default()
        };
        let session = session_with(12, Some(intel));
        let metrics = compute_metrics(&session, true, Utc::now());
        assert_eq!(metrics.engagement_quality, 1.0);
        assert_eq!(metrics.intelligence_score, 1.0);
    }

    #[test]
    fn keyword_contribution_is_capped() {
        let intel = Intelligence {
            keywords: (0..30).map(|i| format!("k{i}")).collect(),
            ..Default::default()
        };
        assert_eq!(intelligence_score(&intel), 0.2);
    }
}
