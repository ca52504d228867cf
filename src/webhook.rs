use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{AuthRejected, MalformedPayload};
use crate::llm::{Extraction, Translator};
use crate::platform::{IncomingMessage, MessageSender};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub const TEXT_PROMPT: &str = "Please send text messages for translation.";
pub const NO_TRANSLATION: &str = "Sorry, couldn't translate right now.";
pub const TRANSLATION_FAILED: &str = "Sorry, translation service failed.";

/// Shared, read-only handler state.
pub struct AppState {
    pub webhook_secret: Option<String>,
    pub reply_to_source: bool,
    pub translator: Arc<dyn Translator>,
    pub sender: Arc<dyn MessageSender>,
}

/// Build the HTTP router: liveness on `/`, updates on `/webhook`
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/webhook", post(webhook))
        .with_state(state)
}

async fn index() -> &'static str {
    "OK"
}

fn verify_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AuthRejected> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided == expected {
        Ok(())
    } else {
        Err(AuthRejected)
    }
}

/// Lenient body parse: no content-type requirement, and empty objects count
/// as no payload at all.
fn parse_payload(body: &[u8]) -> Result<Value, MalformedPayload> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Ok(Value::Object(map)),
        Ok(_) => Err(MalformedPayload::NotPayload),
        Err(e) => {
            debug!("Webhook body is not JSON: {}", e);
            Err(MalformedPayload::NotPayload)
        }
    }
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejected) = verify_secret(state.webhook_secret.as_deref(), &headers) {
        warn!("Invalid webhook secret token");
        return rejected.into_response();
    }

    let incoming = match parse_payload(&body).and_then(|p| IncomingMessage::from_update(&p)) {
        Ok(incoming) => incoming,
        Err(skip) => {
            debug!("Ignoring update: {}", skip);
            return skip.into_response();
        }
    };

    // Outbound calls run on their own task so an inbound disconnect does not
    // cancel them.
    let task = tokio::spawn(relay(state, incoming));
    match task.await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!("Relay task failed: {}", e);
            (StatusCode::OK, "ok").into_response()
        }
    }
}

/// Translate-and-reply for one message. Downstream failures are logged and
/// absorbed; the returned string is the webhook response body.
async fn relay(state: Arc<AppState>, incoming: IncomingMessage) -> &'static str {
    let IncomingMessage {
        chat,
        message_id,
        text,
    } = incoming;

    let Some(text) = text else {
        if let Err(e) = state.sender.send(&chat, TEXT_PROMPT, None).await {
            error!(
                "Failed to send Telegram message to {}: {:#}",
                chat,
                anyhow::Error::from(e)
            );
        }
        return "ok, not text";
    };

    info!("Translating message from chat {} ({} chars)", chat, text.chars().count());

    let translated = match state.translator.translate(&text).await {
        Ok(Extraction::Found(t)) => t,
        Ok(Extraction::NotFound) => {
            warn!("Completion returned no content for chat {}", chat);
            NO_TRANSLATION.to_string()
        }
        Err(e) => {
            error!("OpenRouter call failed: {:#}", anyhow::Error::from(e));
            TRANSLATION_FAILED.to_string()
        }
    };

    let reply_to = if state.reply_to_source { message_id } else { None };
    match state.sender.send(&chat, &translated, reply_to).await {
        Ok(id) => debug!("Translation delivered to chat {} as message {}", chat, id),
        Err(e) => error!(
            "Failed to send Telegram message to {}: {:#}",
            chat,
            anyhow::Error::from(e)
        ),
    }

    "ok"
}
