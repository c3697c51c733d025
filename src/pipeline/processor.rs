//! Message processor: runs one scammer turn through the pipeline.
//!
//! Flow:
//! 1. Load or create the session (persistent) or rebuild it (stateless)
//! 2. Append the inbound message and check the caller's history
//! 3. Classify, extract, merge intelligence, decide on engagement
//! 4. Generate a persona reply, outside the session lock and time-boxed
//! 5. Compute metrics, build the response, report flagged turns
//!
//! Steps 2-3 run under the session lock. Whatever they commit stays
//! committed even if a later step fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::engagement::should_engage;
use super::merge::merge_into;
use super::metrics::compute_metrics;
use super::types::{ProcessRequest, ProcessResponse, ResponseStatus};
use crate::agent::{ResponseGenerator, SessionContext};
use crate::callback::{CallbackDispatcher, CallbackPayload};
use crate::config::{CallbackPolicy, HoneypotConfig};
use crate::detection::{EntityExtractor, ScamClassifier};
use crate::error::{GeneratorError, PipelineError, ValidationError};
use crate::model::{Message, ScamVerdict, Session};
use crate::safety::LeakDetector;
use crate::session::{SessionStore, history_matches, stateless};

/// Where sessions come from.
#[derive(Clone)]
pub enum SessionBackend {
    /// Sessions live in the in-process store.
    Persistent(Arc<SessionStore>),
    /// Sessions are rebuilt from the request's history every turn.
    Stateless,
}

/// Outcome of the locked part of a turn.
struct Turn {
    verdict: ScamVerdict,
    /// Present when the persona should reply.
    context: Option<SessionContext>,
}

pub struct MessageProcessor {
    sessions: SessionBackend,
    classifier: ScamClassifier,
    extractor: EntityExtractor,
    generator: Arc<dyn ResponseGenerator>,
    dispatcher: Option<Arc<dyn CallbackDispatcher>>,
    callback_policy: CallbackPolicy,
    response_timeout: Duration,
    leak_detector: LeakDetector,
}

impl MessageProcessor {
    pub fn new(
        config: &HoneypotConfig,
        sessions: SessionBackend,
        generator: Arc<dyn ResponseGenerator>,
        dispatcher: Option<Arc<dyn CallbackDispatcher>>,
    ) -> Self {
        Self {
            sessions,
            classifier: ScamClassifier::default_rules(),
            extractor: EntityExtractor::new(&config.extractor),
            generator,
            dispatcher,
            callback_policy: config.callback.policy,
            response_timeout: config.response_timeout,
            leak_detector: LeakDetector::new(),
        }
    }

    /// The session store, in persistent mode.
    pub fn store(&self) -> Option<&Arc<SessionStore>> {
        match &self.sessions {
            SessionBackend::Persistent(store) => Some(store),
            SessionBackend::Stateless => None,
        }
    }

    /// Process one inbound message.
    ///
    /// Invalid requests and a full session table are errors; anything that
    /// goes wrong after the session is loaded yields a degraded response.
    pub async fn process_message(
        &self,
        request: ProcessRequest,
    ) -> Result<ProcessResponse, PipelineError> {
        validate(&request)?;

        info!(
            session_id = %request.session_id,
            message_id = %request.message.message_id,
            sender = %request.message.sender,
            history = request.conversation_history.len(),
            "Processing message"
        );
        debug!(
            session_id = %request.session_id,
            text = %self.leak_detector.scrub(&request.message.text),
            "Message text"
        );

        let session_id = request.session_id.clone();
        let result = match &self.sessions {
            SessionBackend::Persistent(store) => self.process_persistent(store, request).await,
            SessionBackend::Stateless => self.process_stateless(request).await,
        };

        match result {
            Err(PipelineError::Internal { reason }) => {
                error!(session_id = %session_id, reason = %reason, "Turn failed, returning degraded response");
                Ok(ProcessResponse::degraded(
                    session_id,
                    format!("Processing error: {reason}"),
                ))
            }
            other => other,
        }
    }

    async fn process_persistent(
        &self,
        store: &SessionStore,
        request: ProcessRequest,
    ) -> Result<ProcessResponse, PipelineError> {
        let (handle, mut session) = store.lock_live(&request.session_id).await?;
        let turn = self.apply_turn(&mut session, &request, true);
        drop(session);

        let reply = match turn.context {
            Some(ctx) => self.generate_reply(ctx, &request.message.text).await?,
            None => None,
        };

        let (response, snapshot) = {
            let mut session = handle.lock().await;
            if let Some(reply) = &reply {
                session.add_message(Message::agent(reply.clone()));
            }
            let response = self.assemble(&session, &turn.verdict, reply.clone());
            let snapshot = self
                .claim_report(&mut session, &response)
                .then(|| session.clone());
            (response, snapshot)
        };

        if let Some(session) = snapshot {
            self.report(&session, &response);
        }
        Ok(response)
    }

    async fn process_stateless(
        &self,
        request: ProcessRequest,
    ) -> Result<ProcessResponse, PipelineError> {
        let mut session = stateless::reconstruct(
            &request.session_id,
            request.conversation_history.clone(),
            request.message.clone(),
        );

        // The caller's history says whether the persona has already replied.
        session.reported = request
            .conversation_history
            .iter()
            .any(Message::is_from_agent);
        let turn = self.apply_turn(&mut session, &request, false);

        let reply = match turn.context {
            Some(ctx) => self.generate_reply(ctx, &request.message.text).await?,
            None => None,
        };
        if let Some(reply) = &reply {
            session.add_message(Message::agent(reply.clone()));
        }

        let response = self.assemble(&session, &turn.verdict, reply);
        // Without stored state a turn only counts once the persona engaged.
        if response.agent_reply.is_some() && self.claim_report(&mut session, &response) {
            self.report(&session, &response);
        }
        Ok(response)
    }

    /// Append, check history, classify, extract, merge, decide.
    fn apply_turn(
        &self,
        session: &mut Session,
        request: &ProcessRequest,
        check_history: bool,
    ) -> Turn {
        let message = &request.message;
        session.add_message(message.clone());

        // A mismatch means the caller's view drifted; the stored history wins.
        if check_history
            && !request.conversation_history.is_empty()
            && !history_matches(&session.messages, &request.conversation_history)
        {
            warn!(
                session_id = %session.session_id,
                stored = session.messages.len(),
                provided = request.conversation_history.len(),
                "Conversation history does not match stored session"
            );
        }

        let verdict = self.classifier.classify(&message.text);
        session.add_classification(verdict.clone());
        if verdict.is_scam {
            session.notes = verdict.reasoning.clone();
        }

        merge_into(session, self.extractor.extract(&message.text));

        let engage = should_engage(session, &verdict);
        debug!(
            session_id = %session.session_id,
            is_scam = verdict.is_scam,
            category = %verdict.category,
            engage,
            "Turn analysed"
        );

        let context = engage.then(|| {
            SessionContext::from_session(
                session,
                &message.message_id,
                &verdict,
                request.metadata.language.clone(),
            )
        });

        Turn { verdict, context }
    }

    /// Ask the generator for a reply, bounded by the response timeout.
    ///
    /// Generator errors and timeouts mean no reply. Only a crashed
    /// generation task is an internal error.
    async fn generate_reply(
        &self,
        ctx: SessionContext,
        current: &str,
    ) -> Result<Option<String>, PipelineError> {
        let generator = self.generator.clone();
        let session_id = ctx.session_id.clone();
        let current = current.to_string();
        let mut task = tokio::spawn(async move { generator.generate(&ctx, &current).await });

        match tokio::time::timeout(self.response_timeout, &mut task).await {
            Ok(Ok(Ok(reply))) => Ok(reply.filter(|r| !r.trim().is_empty())),
            Ok(Ok(Err(e))) => {
                warn!(session_id = %session_id, generator = self.generator.name(), error = %e, "No reply generated");
                Ok(None)
            }
            Ok(Err(join_error)) => Err(PipelineError::Internal {
                reason: format!("response generation crashed: {join_error}"),
            }),
            Err(_) => {
                task.abort();
                let e = GeneratorError::Timeout {
                    timeout: self.response_timeout,
                };
                warn!(session_id = %session_id, error = %e, "No reply generated");
                Ok(None)
            }
        }
    }

    fn assemble(
        &self,
        session: &Session,
        verdict: &ScamVerdict,
        reply: Option<String>,
    ) -> ProcessResponse {
        let metrics = compute_metrics(session, reply.is_some(), Utc::now());
        info!(
            session_id = %session.session_id,
            scam_detected = verdict.is_scam,
            replied = reply.is_some(),
            messages = metrics.message_count,
            intelligence_score = metrics.intelligence_score,
            "Turn complete"
        );

        ProcessResponse {
            status: ResponseStatus::Success,
            scam_detected: verdict.is_scam,
            agent_reply: reply,
            engagement_metrics: metrics,
            extracted_intelligence: session.accumulated_intelligence.clone().unwrap_or_default(),
            notes: verdict.reasoning.clone(),
            session_id: session.session_id.clone(),
        }
    }

    /// Whether this turn should be reported under the callback policy.
    /// Marks the session reported when it is.
    fn claim_report(&self, session: &mut Session, response: &ProcessResponse) -> bool {
        if !response.scam_detected || self.dispatcher.is_none() {
            return false;
        }
        let first = session.mark_reported();
        match self.callback_policy {
            CallbackPolicy::EveryScamTurn => true,
            CallbackPolicy::OncePerSession => {
                if !first {
                    debug!(session_id = %session.session_id, "Session already reported");
                }
                first
            }
        }
    }

    /// Fire-and-forget delivery of a flagged turn.
    fn report(&self, session: &Session, response: &ProcessResponse) {
        let Some(dispatcher) = self.dispatcher.clone() else {
            return;
        };
        let payload = CallbackPayload::from_turn(session, response);
        tokio::spawn(async move {
            if let Err(e) = dispatcher.send(&payload).await {
                warn!(session_id = %payload.session_id, error = %e, "Callback not delivered");
            }
        });
    }
}

fn validate(request: &ProcessRequest) -> Result<(), ValidationError> {
    if request.session_id.trim().is_empty() {
        return Err(ValidationError::EmptySessionId);
    }
    if request.message.text.trim().is_empty() {
        return Err(ValidationError::EmptyMessageText);
    }
    if request.message.message_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "message.message_id".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}
