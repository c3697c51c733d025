//! Configuration types.
//!
//! Built once at startup (usually via [`HoneypotConfig::from_env`]) and
//! handed to each component's constructor.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Top-level honeypot configuration.
#[derive(Debug, Clone)]
pub struct HoneypotConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub extractor: ExtractorConfig,
    pub llm: Option<LlmConfig>,
    pub callback: CallbackConfig,
    /// Upper bound on a single response-generation call.
    pub response_timeout: Duration,
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            extractor: ExtractorConfig::default(),
            llm: None,
            callback: CallbackConfig::default(),
            response_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP listener and authentication settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accepted `x-api-key` values. Empty means authentication is disabled.
    pub api_keys: Vec<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_keys: Vec::new(),
        }
    }
}

/// Which session strategy the pipeline runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// In-process store with idle expiry.
    #[default]
    Persistent,
    /// Rebuild every session from caller-supplied history.
    Stateless,
}

/// Session store settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: SessionMode,
    /// Sessions idle longer than this are evicted.
    pub idle_timeout: Duration,
    /// Hard cap on concurrently held sessions.
    pub max_sessions: usize,
    /// How often the background sweep runs.
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Persistent,
            idle_timeout: Duration::from_secs(3600), // 1 hour
            max_sessions: 100,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Numbering plan used for phone extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhoneLocale {
    /// Indian mobile numbers: optional +91, then 10 digits starting 6-9.
    #[default]
    India,
    /// North American numbers: optional +1, then NXX-NXX-XXXX.
    NorthAmerica,
}

impl PhoneLocale {
    /// Country calling code recorded on extracted numbers.
    pub fn country_code(&self) -> &'static str {
        match self {
            Self::India => "+91",
            Self::NorthAmerica => "+1",
        }
    }
}

/// Entity extractor settings.
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    pub phone_locale: PhoneLocale,
}

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for the persona LLM.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: SecretString,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
    pub max_attempts: usize,
}

/// When a scam-flagged turn is reported to the callback endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackPolicy {
    /// Report every flagged turn.
    #[default]
    EveryScamTurn,
    /// Report the first flagged turn of each session only.
    OncePerSession,
}

/// Callback dispatcher settings.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    /// Reporting endpoint. `None` disables dispatch.
    pub url: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
    /// First backoff delay; doubles per attempt.
    pub retry_base_delay: Duration,
    pub policy: CallbackPolicy,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
            policy: CallbackPolicy::EveryScamTurn,
        }
    }
}

impl HoneypotConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server = ServerConfig {
            host: lookup("HONEYPOT_HOST").unwrap_or(defaults.server.host),
            port: parse_or(&lookup, "HONEYPOT_PORT", defaults.server.port)?,
            api_keys: lookup("HONEYPOT_API_KEYS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(SecretString::from)
                .collect(),
        };

        let mode = match lookup("HONEYPOT_SESSION_MODE").as_deref() {
            None | Some("persistent") => SessionMode::Persistent,
            Some("stateless") => SessionMode::Stateless,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "HONEYPOT_SESSION_MODE".into(),
                    message: format!("expected 'persistent' or 'stateless', got '{other}'"),
                });
            }
        };

        let session = SessionConfig {
            mode,
            idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HONEYPOT_SESSION_TIMEOUT_SECS",
                defaults.session.idle_timeout.as_secs(),
            )?),
            max_sessions: parse_or(
                &lookup,
                "HONEYPOT_MAX_SESSIONS",
                defaults.session.max_sessions,
            )?,
            sweep_interval: defaults.session.sweep_interval,
        };

        let phone_locale = match lookup("HONEYPOT_PHONE_LOCALE").as_deref() {
            None | Some("in") | Some("IN") => PhoneLocale::India,
            Some("us") | Some("US") | Some("ca") | Some("CA") => PhoneLocale::NorthAmerica,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "HONEYPOT_PHONE_LOCALE".into(),
                    message: format!("unsupported locale '{other}'"),
                });
            }
        };

        let policy = match lookup("HONEYPOT_CALLBACK_POLICY").as_deref() {
            None | Some("every_turn") => CallbackPolicy::EveryScamTurn,
            Some("once_per_session") => CallbackPolicy::OncePerSession,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "HONEYPOT_CALLBACK_POLICY".into(),
                    message: format!("expected 'every_turn' or 'once_per_session', got '{other}'"),
                });
            }
        };

        let callback = CallbackConfig {
            url: lookup("HONEYPOT_CALLBACK_URL").filter(|s| !s.trim().is_empty()),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "HONEYPOT_CALLBACK_TIMEOUT_SECS",
                defaults.callback.timeout.as_secs(),
            )?),
            max_retries: parse_or(
                &lookup,
                "HONEYPOT_CALLBACK_MAX_RETRIES",
                defaults.callback.max_retries,
            )?,
            retry_base_delay: defaults.callback.retry_base_delay,
            policy,
        };

        Ok(Self {
            server,
            session,
            extractor: ExtractorConfig { phone_locale },
            llm: llm_from_lookup(&lookup)?,
            callback,
            response_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HONEYPOT_RESPONSE_TIMEOUT_SECS",
                defaults.response_timeout.as_secs(),
            )?),
        })
    }
}

fn llm_from_lookup<F>(lookup: &F) -> Result<Option<LlmConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let backend = match lookup("HONEYPOT_LLM_PROVIDER").as_deref() {
        None | Some("anthropic") => LlmBackend::Anthropic,
        Some("openai") => LlmBackend::OpenAi,
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                key: "HONEYPOT_LLM_PROVIDER".into(),
                message: format!("expected 'anthropic' or 'openai', got '{other}'"),
            });
        }
    };

    let (key_var, default_model) = match backend {
        LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-3-5-haiku-latest"),
        LlmBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4o-mini"),
    };

    // No key means the scripted offline responder is used instead.
    let Some(api_key) = lookup(key_var).filter(|k| !k.trim().is_empty()) else {
        return Ok(None);
    };

    Ok(Some(LlmConfig {
        backend,
        api_key: SecretString::from(api_key),
        model: lookup("HONEYPOT_LLM_MODEL").unwrap_or_else(|| default_model.to_string()),
        temperature: 0.8,
        max_tokens: 150,
        max_attempts: 3,
    }))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}
