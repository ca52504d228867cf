use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure of the completion (translation) call.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("refusing to translate empty text")]
    EmptyInput,

    #[error("completion API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("completion request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("completion response is not valid JSON: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Failure of the outbound sendMessage call.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("refusing to send empty text")]
    EmptyText,

    #[error("telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Inbound body that carries nothing to act on. Always answered with 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedPayload {
    #[error("body is empty or not a JSON object")]
    NotPayload,

    #[error("update has neither message nor edited_message")]
    NoMessage,

    #[error("message has no usable chat.id")]
    NoChat,
}

impl MalformedPayload {
    /// Body returned to the platform for this skip reason
    pub fn reply_body(self) -> &'static str {
        match self {
            MalformedPayload::NotPayload => "ok, not payload",
            MalformedPayload::NoMessage => "ok, not message",
            MalformedPayload::NoChat => "ok, not chat",
        }
    }
}

impl IntoResponse for MalformedPayload {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.reply_body()).into_response()
    }
}

/// Webhook secret header missing or wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRejected;

impl IntoResponse for AuthRejected {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "ok": false, "reason": "invalid secret" })),
        )
            .into_response()
    }
}
