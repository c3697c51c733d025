//! Reporting of scam engagements to an external evaluation endpoint.
//!
//! The payload uses the endpoint's camelCase field names. Delivery is
//! fire-and-forget from the pipeline's point of view; retries live here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{error, info, warn};

use crate::config::CallbackConfig;
use crate::error::CallbackError;
use crate::model::{Intelligence, Session};
use crate::pipeline::types::ProcessResponse;

const DEFAULT_AGENT_NOTES: &str = "AI agent engagement completed";
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Intelligence flattened to plain strings for the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedIntelligence {
    pub bank_accounts: Vec<String>,
    pub upi_ids: Vec<String>,
    pub phishing_links: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub suspicious_keywords: Vec<String>,
}

impl From<&Intelligence> for ReportedIntelligence {
    fn from(intel: &Intelligence) -> Self {
        Self {
            bank_accounts: intel
                .bank_accounts
                .iter()
                .map(|a| a.account_number.clone())
                .collect(),
            upi_ids: intel.payment_handles.iter().cloned().collect(),
            phishing_links: intel.links.iter().map(|l| l.url.clone()).collect(),
            phone_numbers: intel.phone_numbers.iter().map(|p| p.number.clone()).collect(),
            suspicious_keywords: intel.keywords.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub session_id: String,
    pub scam_detected: bool,
    pub total_messages_exchanged: usize,
    pub extracted_intelligence: ReportedIntelligence,
    pub agent_notes: String,
}

impl CallbackPayload {
    /// Build the report for a processed turn.
    ///
    /// Intelligence comes from the session, falling back to the response.
    /// Notes prefer the session's, then the response's, then a default line.
    pub fn from_turn(session: &Session, response: &ProcessResponse) -> Self {
        let intel = session
            .accumulated_intelligence
            .as_ref()
            .unwrap_or(&response.extracted_intelligence);

        let agent_notes = [session.notes.as_str(), response.notes.as_str()]
            .into_iter()
            .find(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_AGENT_NOTES)
            .to_string();

        Self {
            session_id: session.session_id.clone(),
            scam_detected: response.scam_detected,
            total_messages_exchanged: session.message_count(),
            extracted_intelligence: ReportedIntelligence::from(intel),
            agent_notes,
        }
    }
}

/// Delivers reports. Implementations own their retry policy.
#[async_trait]
pub trait CallbackDispatcher: Send + Sync {
    async fn send(&self, payload: &CallbackPayload) -> Result<(), CallbackError>;
}

/// POSTs the payload as JSON with a timeout and exponential backoff.
pub struct HttpCallbackDispatcher {
    client: reqwest::Client,
    url: Option<String>,
    max_retries: usize,
    retry_base_delay: Duration,
}

impl HttpCallbackDispatcher {
    pub fn new(config: &CallbackConfig) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn send_once(&self, url: &str, payload: &CallbackPayload) -> Result<(), CallbackError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(session_id = %payload.session_id, status = status.as_u16(), "Callback rejected");
            return Err(CallbackError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CallbackDispatcher for HttpCallbackDispatcher {
    async fn send(&self, payload: &CallbackPayload) -> Result<(), CallbackError> {
        let Some(url) = self.url.as_deref() else {
            warn!(session_id = %payload.session_id, "No callback URL configured, skipping");
            return Err(CallbackError::NotConfigured);
        };

        info!(session_id = %payload.session_id, url, "Sending callback");

        // Delays start at the base and double: from_millis(2) * base/2.
        let factor = (self.retry_base_delay.as_millis() as u64 / 2).max(1);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(MAX_RETRY_DELAY)
            .map(jitter)
            .take(self.max_retries);

        let result = RetryIf::spawn(
            strategy,
            || self.send_once(url, payload),
            CallbackError::is_retryable,
        )
        .await;

        match result {
            Ok(()) => {
                info!(session_id = %payload.session_id, "Callback delivered");
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                error!(
                    session_id = %payload.session_id,
                    attempts = self.max_retries + 1,
                    error = %e,
                    "Callback failed after retries"
                );
                Err(CallbackError::RetryExhausted {
                    attempts: self.max_retries + 1,
                    last: e.to_string(),
                })
            }
            Err(e) => {
                error!(session_id = %payload.session_id, error = %e, "Callback failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BankAccount, Message, PhoneNumber};
    use crate::pipeline::types::{EngagementMetrics, ResponseStatus};
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn response(notes: &str) -> ProcessResponse {
        ProcessResponse {
            status: ResponseStatus::Success,
            scam_detected: true,
            agent_reply: Some("which bank?".into()),
            engagement_metrics: EngagementMetrics::default(),
            extracted_intelligence: Intelligence::default(),
            notes: notes.into(),
            session_id: "s1".into(),
        }
    }

    fn session() -> Session {
        let mut session = Session::new("s1");
        session.add_message(Message::new("scammer", "pay", Utc::now(), "m1"));
        session.add_message(Message::agent("which bank?"));
        session.accumulated_intelligence = Some(Intelligence {
            bank_accounts: vec![BankAccount {
                account_number: "123456789012".into(),
                routing_code: None,
                confidence: 0.5,
            }],
            payment_handles: ["fraud@ybl".to_string()].into(),
            phone_numbers: vec![PhoneNumber {
                number: "+919876543210".into(),
                country_code: "+91".into(),
                confidence: 0.9,
            }],
            keywords: ["urgent".to_string()].into(),
            ..Default::default()
        });
        session
    }

    fn dispatcher(url: Option<String>, max_retries: usize) -> HttpCallbackDispatcher {
        HttpCallbackDispatcher::new(&CallbackConfig {
            url,
            timeout: Duration::from_secs(5),
            max_retries,
            retry_base_delay: Duration::from_millis(10),
            ..CallbackConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn payload_uses_camel_case() {
        let payload = CallbackPayload::from_turn(&session(), &response("bank fraud"));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["sessionId"], "s1");
        assert_eq!(value["scamDetected"], true);
        assert_eq!(value["totalMessagesExchanged"], 2);
        assert_eq!(value["extractedIntelligence"]["bankAccounts"][0], "123456789012");
        assert_eq!(value["extractedIntelligence"]["upiIds"][0], "fraud@ybl");
        assert_eq!(value["extractedIntelligence"]["phoneNumbers"][0], "+919876543210");
        assert_eq!(value["extractedIntelligence"]["suspiciousKeywords"][0], "urgent");
        assert!(value["extractedIntelligence"]["phishingLinks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn notes_fall_back_in_order() {
        let mut session = session();
        session.notes = "from session".into();
        assert_eq!(
            CallbackPayload::from_turn(&session, &response("from response")).agent_notes,
            "from session"
        );

        session.notes.clear();
        assert_eq!(
            CallbackPayload::from_turn(&session, &response("from response")).agent_notes,
            "from response"
        );
        assert_eq!(
            CallbackPayload::from_turn(&session, &response("")).agent_notes,
            DEFAULT_AGENT_NOTES
        );
    }

    #[tokio::test]
    async fn delivers_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/callback"))
            .and(body_partial_json(json!({"sessionId": "s1", "scamDetected": true})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(Some(format!("{}/callback", server.uri())), 3);
        let payload = CallbackPayload::from_turn(&session(), &response("notes"));
        dispatcher.send(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(Some(server.uri()), 3);
        let payload = CallbackPayload::from_turn(&session(), &response("notes"));
        dispatcher.send(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(Some(server.uri()), 2);
        let payload = CallbackPayload::from_turn(&session(), &response("notes"));
        let err = dispatcher.send(&payload).await.unwrap_err();
        assert!(matches!(err, CallbackError::RetryExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(Some(server.uri()), 3);
        let payload = CallbackPayload::from_turn(&session(), &response("notes"));
        let err = dispatcher.send(&payload).await.unwrap_err();
        assert!(matches!(err, CallbackError::Status { status: 400 }));
    }

    #[tokio::test]
    async fn missing_url_is_not_configured() {
        let dispatcher = dispatcher(None, 3);
        assert!(!dispatcher.is_configured());
        let payload = CallbackPayload::from_turn(&session(), &response("notes"));
        let err = dispatcher.send(&payload).await.unwrap_err();
        assert!(matches!(err, CallbackError::NotConfigured));
    }
}
