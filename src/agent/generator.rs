//! Response generators: the LLM-backed persona agent and its offline stand-in.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rig::agent::AgentBuilder;
use rig::client::CompletionClient;
use rig::completion::{Chat, CompletionModel, Message as ChatMessage};
use secrecy::ExposeSecret;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use super::persona::Persona;
use crate::config::{LlmBackend, LlmConfig};
use crate::error::GeneratorError;
use crate::model::{Message, ScamCategory, ScamVerdict, Session};
use crate::safety::SafetyLayer;

/// First delay between generation attempts; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
/// Cap on the backoff between generation attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Read-only view of a session handed to a generator.
///
/// Built while the session lock is held, then used after it is released,
/// so generation never blocks other work on the same session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    /// Conversation before the message being answered.
    pub history: Vec<Message>,
    pub verdict: ScamVerdict,
    /// Category of the latest positive verdict, or `Unknown`.
    pub category: ScamCategory,
    pub language: Option<String>,
}

impl SessionContext {
    /// Snapshot `session` for answering the message `current_id`.
    pub fn from_session(
        session: &Session,
        current_id: &str,
        verdict: &ScamVerdict,
        language: Option<String>,
    ) -> Self {
        let history = session
            .messages
            .iter()
            .filter(|m| m.message_id != current_id)
            .cloned()
            .collect();
        let category = session
            .classifications
            .iter()
            .rev()
            .find(|v| v.is_scam)
            .map(|v| v.category)
            .unwrap_or(ScamCategory::Unknown);

        Self {
            session_id: session.session_id.clone(),
            history,
            verdict: verdict.clone(),
            category,
            language,
        }
    }
}

/// Produces persona replies to scammer messages.
///
/// `Ok(None)` and `Err(_)` both mean "no reply this turn"; the pipeline
/// continues either way.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        ctx: &SessionContext,
        current: &str,
    ) -> Result<Option<String>, GeneratorError>;
}

/// Build the generator for the configured LLM, or the scripted responder
/// when no LLM is configured.
pub fn create_generator(
    config: Option<&LlmConfig>,
) -> Result<Arc<dyn ResponseGenerator>, GeneratorError> {
    let Some(config) = config else {
        warn!("No LLM API key configured, using scripted responses");
        return Ok(Arc::new(ScriptedResponder::new()));
    };

    match config.backend {
        LlmBackend::Anthropic => create_anthropic_agent(config),
        LlmBackend::OpenAi => create_openai_agent(config),
    }
}

fn create_anthropic_agent(config: &LlmConfig) -> Result<Arc<dyn ResponseGenerator>, GeneratorError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            GeneratorError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {e}"),
            }
        })?;

    let model = client.completion_model(&config.model);
    info!(model = %config.model, "Persona agent using Anthropic");
    Ok(Arc::new(PersonaAgent::new(model, "anthropic", config)))
}

fn create_openai_agent(config: &LlmConfig) -> Result<Arc<dyn ResponseGenerator>, GeneratorError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            GeneratorError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {e}"),
            }
        })?;

    let model = client.completion_model(&config.model);
    info!(model = %config.model, "Persona agent using OpenAI");
    Ok(Arc::new(PersonaAgent::new(model, "openai", config)))
}

/// LLM-backed persona with bounded, jittered exponential retry. Falls back
/// to scripted replies once the provider gives up.
pub struct PersonaAgent<M: CompletionModel> {
    model: M,
    provider: &'static str,
    model_name: String,
    temperature: f64,
    max_tokens: u64,
    max_attempts: usize,
    safety: SafetyLayer,
    fallback: ScriptedResponder,
}

impl<M: CompletionModel> PersonaAgent<M> {
    pub fn new(model: M, provider: &'static str, config: &LlmConfig) -> Self {
        Self {
            model,
            provider,
            model_name: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_attempts: config.max_attempts.max(1),
            safety: SafetyLayer::new(),
            fallback: ScriptedResponder::new(),
        }
    }
}

#[async_trait]
impl<M> ResponseGenerator for PersonaAgent<M>
where
    M: CompletionModel + 'static,
{
    fn name(&self) -> &str {
        self.provider
    }

    async fn generate(
        &self,
        ctx: &SessionContext,
        current: &str,
    ) -> Result<Option<String>, GeneratorError> {
        let screened = self.safety.validate_input(current);
        if !screened.is_valid {
            let reasons: Vec<&str> = screened.errors.iter().map(|e| e.message.as_str()).collect();
            warn!(session_id = %ctx.session_id, reasons = ?reasons, "Unsafe content in scammer message");
        }

        let persona = Persona::for_conversation(ctx.category, &ctx.session_id);
        let preamble = persona.system_prompt(ctx.language.as_deref());
        let history = chat_history(&ctx.history);

        let agent = AgentBuilder::new(self.model.clone())
            .preamble(&preamble)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build();

        debug!(
            session_id = %ctx.session_id,
            persona = persona.label(),
            turns = history.len(),
            model = %self.model_name,
            "Generating persona reply"
        );

        let result = chat_with_retry(self.max_attempts, RETRY_BASE_DELAY, || {
            agent.chat(ChatMessage::user(current), history.clone())
        })
        .await;

        Ok(self.settle(&ctx.session_id, result, current))
    }
}

impl<M: CompletionModel> PersonaAgent<M> {
    /// Turn the provider's final answer into a reply. When the provider
    /// gave up, the scripted persona answers instead so an engaged scammer
    /// is never left without a response.
    fn settle<E: std::fmt::Display>(
        &self,
        session_id: &str,
        result: Result<String, E>,
        current: &str,
    ) -> Option<String> {
        match result {
            Ok(reply) => {
                let reply = reply.trim();
                if reply.is_empty() {
                    return None;
                }
                Some(self.safety.sanitize_reply(reply).content)
            }
            Err(e) => {
                let exhausted = GeneratorError::RetryExhausted {
                    provider: self.provider.to_string(),
                    attempts: self.max_attempts,
                };
                error!(session_id, error = %exhausted, last_error = %e, "Persona reply generation failed");
                warn!(session_id, "Falling back to scripted reply");
                Some(self.fallback.reply_to(current).to_string())
            }
        }
    }
}

/// Run `attempt` up to `max_attempts` times with jittered exponential
/// backoff starting at `base_delay`.
async fn chat_with_retry<A, Fut, E>(
    max_attempts: usize,
    base_delay: Duration,
    attempt: A,
) -> Result<String, E>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<String, E>>,
{
    let factor = (base_delay.as_millis() as u64 / 2).max(1);
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(factor)
        .max_delay(MAX_RETRY_DELAY)
        .map(jitter)
        .take(max_attempts.saturating_sub(1));

    Retry::spawn(strategy, attempt).await
}

/// Replay a conversation as alternating chat turns. Persona messages become
/// assistant turns, everything else user turns; consecutive turns from the
/// same side are joined.
fn chat_history(messages: &[Message]) -> Vec<ChatMessage> {
    let mut turns: Vec<(bool, String)> = Vec::new();
    for message in messages {
        let from_agent = message.is_from_agent();
        match turns.last_mut() {
            Some((side, text)) if *side == from_agent => {
                text.push('\n');
                text.push_str(&message.text);
            }
            _ => turns.push((from_agent, message.text.clone())),
        }
    }

    turns
        .into_iter()
        .map(|(from_agent, text)| {
            if from_agent {
                ChatMessage::assistant(text)
            } else {
                ChatMessage::user(text)
            }
        })
        .collect()
}

/// Canned persona lines, used when no LLM is configured.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponder {
    safety: SafetyLayer,
}

impl ScriptedResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_to(&self, text: &str) -> &'static str {
        let lowered = text.to_lowercase();
        if lowered.contains("bank") || lowered.contains("account") {
            "Oh dear, I seem to have lost my bank book. Which bank is this again?"
        } else if lowered.contains("password") || lowered.contains("pin") {
            "Is that the number on the back of the card? The print is so small."
        } else if lowered.contains("invest") {
            "That sounds wonderful. My grandson usually handles my money, but tell me more."
        } else {
            "I'm sorry, I'm a bit hard of hearing. Can you type that again clearly?"
        }
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedResponder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        ctx: &SessionContext,
        current: &str,
    ) -> Result<Option<String>, GeneratorError> {
        if self.safety.is_unsafe(current) {
            warn!(session_id = %ctx.session_id, "Unsafe content in scammer message");
        }
        Ok(Some(self.reply_to(current).to_string()))
    }
}
