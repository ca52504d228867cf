mod config;
mod error;
mod llm;
mod platform;
mod scheduler;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::llm::LlmClient;
use crate::platform::telegram::TelegramSender;
use crate::scheduler::Scheduler;
use crate::webhook::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,translate_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional TOML file; credentials normally come from the environment
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &config_path {
        info!("Loading configuration from: {}", path.display());
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    let missing = config.missing_credentials();
    if !missing.is_empty() {
        warn!("Missing {} environment variables.", missing.join(" or "));
    }

    info!("Configuration loaded");
    info!("  Model: {}", config.llm.model);
    info!("  Completion endpoint: {}", config.llm.completions_url());
    info!(
        "  Webhook secret: {}",
        if config.telegram.webhook_secret().is_some() {
            "set"
        } else {
            "not set"
        }
    );

    let state = Arc::new(AppState {
        webhook_secret: config.telegram.webhook_secret().map(str::to_string),
        reply_to_source: config.telegram.reply_to_source,
        translator: Arc::new(LlmClient::new(config.llm.clone())?),
        sender: Arc::new(TelegramSender::new(&config.telegram)?),
    });

    let mut scheduler = Scheduler::new().await?;
    scheduler::tasks::register_builtin_tasks(&scheduler, &config.heartbeat).await?;
    scheduler.start().await?;

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening on http://{addr}");

    axum::serve(listener, webhook::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    scheduler.shutdown().await?;

    Ok(())
}
