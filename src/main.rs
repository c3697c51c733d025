use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use scam_honeypot::agent::create_generator;
use scam_honeypot::api::{AppState, router};
use scam_honeypot::callback::{CallbackDispatcher, HttpCallbackDispatcher};
use scam_honeypot::config::{HoneypotConfig, SessionMode};
use scam_honeypot::pipeline::{MessageProcessor, SessionBackend};
use scam_honeypot::session::{SessionStore, spawn_expiry_task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = HoneypotConfig::from_env().context("Invalid configuration")?;

    let generator =
        create_generator(config.llm.as_ref()).context("Failed to create response generator")?;

    let http_dispatcher =
        HttpCallbackDispatcher::new(&config.callback).context("Failed to create callback client")?;
    let dispatcher: Option<Arc<dyn CallbackDispatcher>> = if http_dispatcher.is_configured() {
        Some(Arc::new(http_dispatcher))
    } else {
        tracing::warn!("HONEYPOT_CALLBACK_URL not set, scam reports will not be sent");
        None
    };

    let sessions = match config.session.mode {
        SessionMode::Persistent => {
            let store = SessionStore::new(config.session.clone());
            spawn_expiry_task(Arc::clone(&store));
            SessionBackend::Persistent(store)
        }
        SessionMode::Stateless => SessionBackend::Stateless,
    };

    let callback_enabled = dispatcher.is_some();
    let processor = Arc::new(MessageProcessor::new(
        &config,
        sessions,
        Arc::clone(&generator),
        dispatcher,
    ));

    if config.server.api_keys.is_empty() {
        tracing::warn!("HONEYPOT_API_KEYS not set, API is unauthenticated");
    }
    let app = router(AppState::new(processor, config.server.api_keys.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    eprintln!("🍯 Scam Honeypot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Generator: {}", generator.name());
    eprintln!("   Sessions: {:?}", config.session.mode);
    eprintln!("   Callback: {}", if callback_enabled { "enabled" } else { "disabled" });
    eprintln!("   API: http://{}/api/v1/process-message", addr);

    tracing::info!(addr = %addr, "Honeypot server started");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
