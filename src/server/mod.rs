//! Meta webhook endpoints.
//!
//! GET handles the subscription handshake (`hub.verify_token` /
//! `hub.challenge`); POST receives message notifications. Only `text`,
//! `audio`, and `interactive` messages are processed; everything else is
//! acknowledged with 200 and no effect, because Meta retries anything that
//! does not get a 2xx.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::messenger::Messenger;
use crate::pipeline::types::MessageBody;
use crate::pipeline::{ConversationOrchestrator, IncomingMessage, MessageDeduplicator, VoiceMessageFlow};

// ── Payload shapes ──────────────────────────────────────────────────

/// Meta webhook notification, narrowed to the fields the pipeline uses.
#[derive(Debug, Deserialize)]
pub struct MetaWebhookPayload {
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub changes: Option<Vec<WebhookChange>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub value: Option<WebhookValue>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookValue {
    pub contacts: Option<Vec<WebhookContact>>,
    pub messages: Option<Vec<WebhookMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookContact {
    pub profile: Option<WebhookProfile>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookProfile {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<WebhookText>,
    pub audio: Option<WebhookAudio>,
    pub interactive: Option<WebhookInteractive>,
    pub context: Option<WebhookContext>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookText {
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookAudio {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookInteractive {
    pub button_reply: Option<WebhookButtonReply>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookButtonReply {
    pub id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookContext {
    pub id: Option<String>,
}

impl MetaWebhookPayload {
    /// The first message in the notification, with the sender's display
    /// name from the contacts block.
    pub fn first_message(&self) -> Option<(&WebhookMessage, Option<&str>)> {
        let value = self
            .entry
            .as_ref()?
            .first()?
            .changes
            .as_ref()?
            .first()?
            .value
            .as_ref()?;
        let message = value.messages.as_ref()?.first()?;
        let sender_name = value
            .contacts
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.profile.as_ref())
            .and_then(|p| p.name.as_deref());
        Some((message, sender_name))
    }
}

// ── State and routes ────────────────────────────────────────────────

#[derive(Clone)]
pub struct WebhookState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub voice: Arc<VoiceMessageFlow>,
    pub dedup: Arc<MessageDeduplicator>,
    pub messenger: Arc<dyn Messenger>,
    pub verify_token: String,
}

pub fn webhook_routes(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_response(success: bool, message: &str, data: serde_json::Value) -> Json<serde_json::Value> {
    Json(json!({
        "success": success,
        "message": message,
        "data": data,
    }))
}

/// GET /webhook — subscription handshake.
async fn verify_webhook(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let token = params.get("hub.verify_token");
    let challenge = params.get("hub.challenge");

    if token == Some(&state.verify_token)
        && let Some(challenge) = challenge
    {
        return (StatusCode::OK, challenge.clone()).into_response();
    }
    (
        StatusCode::FORBIDDEN,
        api_response(false, "Verification failed", serde_json::Value::Null),
    )
        .into_response()
}

/// POST /webhook — message notifications.
async fn handle_webhook(
    State(state): State<WebhookState>,
    Json(payload): Json<MetaWebhookPayload>,
) -> impl IntoResponse {
    let Some((message, sender_name)) = payload.first_message() else {
        return (
            StatusCode::OK,
            api_response(true, "No actionable message", serde_json::Value::Null),
        );
    };

    let kind = message.kind.as_deref().unwrap_or_default();
    if !matches!(kind, "text" | "audio" | "interactive") {
        info!(kind, "Unsupported message type");
        return (
            StatusCode::OK,
            api_response(true, "Unsupported message type", serde_json::Value::Null),
        );
    }

    // Dedup before any side effects: check, then mark immediately.
    if let Some(message_id) = message.id.as_deref() {
        match state.dedup.has_been_processed(message_id).await {
            Ok(true) => {
                return (
                    StatusCode::OK,
                    api_response(true, "Message already processed", serde_json::Value::Null),
                );
            }
            Ok(false) => {
                if let Err(e) = state.dedup.mark_processed(message_id).await {
                    error!(error = %e, "Failed to mark message processed");
                    return internal_error();
                }
            }
            Err(e) => {
                error!(error = %e, "Dedup check failed");
                return internal_error();
            }
        }
    }

    let Some(sender_phone) = message.from.clone().filter(|p| !p.is_empty()) else {
        return bad_request("Invalid message payload: Missing senderPhone");
    };

    // Typing indicator is cosmetic; fire and forget.
    if let Some(message_id) = message.id.clone() {
        let messenger = Arc::clone(&state.messenger);
        tokio::spawn(async move {
            if let Err(e) = messenger.send_typing_indicator(&message_id).await {
                warn!(error = %e, "Failed to send typing indicator");
            }
        });
    }

    let sender_name = sender_name.map(str::to_string);
    let reply_to_message_id = message.context.as_ref().and_then(|c| c.id.clone());

    match kind {
        "text" => {
            let Some(body) = message
                .text
                .as_ref()
                .and_then(|t| t.body.clone())
                .filter(|b| !b.is_empty())
            else {
                return bad_request("Invalid message payload: Missing text body");
            };

            let result = state
                .orchestrator
                .execute(IncomingMessage {
                    sender_phone,
                    sender_name,
                    body: MessageBody::Text(body),
                    reply_to_message_id,
                })
                .await;
            match result {
                Ok(outcome) => (
                    StatusCode::OK,
                    api_response(
                        true,
                        "Message processed",
                        json!({
                            "response": outcome.response,
                            "intent": outcome.parsed.intent,
                        }),
                    ),
                ),
                Err(e) => {
                    error!(error = %e, "Failed to process text message");
                    internal_error()
                }
            }
        }
        "audio" => {
            let Some(media_id) = message.audio.as_ref().and_then(|a| a.id.clone()) else {
                return bad_request("Invalid message payload: Missing audio media ID");
            };

            let result = state
                .voice
                .execute(
                    &sender_phone,
                    sender_name.as_deref(),
                    &media_id,
                    reply_to_message_id,
                )
                .await;
            match result {
                Ok(outcome) => (
                    StatusCode::OK,
                    api_response(
                        true,
                        "Voice message processed",
                        json!({
                            "transcribedText": outcome.transcribed_text,
                            "response": outcome.response,
                        }),
                    ),
                ),
                Err(e) => {
                    error!(error = %e, "Failed to process voice message");
                    internal_error()
                }
            }
        }
        _ => {
            let Some(reply) = message
                .interactive
                .as_ref()
                .and_then(|i| i.button_reply.as_ref())
            else {
                return bad_request("Invalid message payload: Missing button ID");
            };
            let Some(button_id) = reply.id.clone() else {
                return bad_request("Invalid message payload: Missing button ID");
            };

            let result = state
                .orchestrator
                .execute(IncomingMessage {
                    sender_phone,
                    sender_name,
                    body: MessageBody::Button {
                        id: button_id,
                        title: reply.title.clone().unwrap_or_default(),
                    },
                    reply_to_message_id,
                })
                .await;
            match result {
                Ok(outcome) => (
                    StatusCode::OK,
                    api_response(
                        true,
                        "Interactive message processed",
                        json!({
                            "response": outcome.response,
                            "intent": outcome.parsed.intent,
                        }),
                    ),
                ),
                Err(e) => {
                    error!(error = %e, "Failed to process interactive message");
                    internal_error()
                }
            }
        }
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    warn!(message, "Rejecting webhook payload");
    (
        StatusCode::BAD_REQUEST,
        api_response(false, message, serde_json::Value::Null),
    )
}

fn internal_error() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        api_response(false, "Internal server error", serde_json::Value::Null),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_message_payload() {
        let raw = r#"{
            "entry": [{"changes": [{"value": {
                "contacts": [{"profile": {"name": "Sadik"}, "wa_id": "919900112233"}],
                "messages": [{
                    "from": "919900112233",
                    "id": "wamid.abc",
                    "type": "text",
                    "text": {"body": "Gave 500 to Raju"},
                    "context": {"id": "wamid.prev"}
                }]
            }}]}]
        }"#;
        let payload: MetaWebhookPayload = serde_json::from_str(raw).unwrap();
        let (message, name) = payload.first_message().unwrap();
        assert_eq!(message.from.as_deref(), Some("919900112233"));
        assert_eq!(message.kind.as_deref(), Some("text"));
        assert_eq!(
            message.text.as_ref().unwrap().body.as_deref(),
            Some("Gave 500 to Raju")
        );
        assert_eq!(
            message.context.as_ref().unwrap().id.as_deref(),
            Some("wamid.prev")
        );
        assert_eq!(name, Some("Sadik"));
    }

    #[test]
    fn parses_button_reply_payload() {
        let raw = r#"{
            "entry": [{"changes": [{"value": {
                "messages": [{
                    "from": "919900112233",
                    "id": "wamid.btn",
                    "type": "interactive",
                    "interactive": {
                        "type": "button_reply",
                        "button_reply": {"id": "confirm_delete_t1", "title": "Delete"}
                    }
                }]
            }}]}]
        }"#;
        let payload: MetaWebhookPayload = serde_json::from_str(raw).unwrap();
        let (message, name) = payload.first_message().unwrap();
        assert!(name.is_none());
        let reply = message
            .interactive
            .as_ref()
            .unwrap()
            .button_reply
            .as_ref()
            .unwrap();
        assert_eq!(reply.id.as_deref(), Some("confirm_delete_t1"));
        assert_eq!(reply.title.as_deref(), Some("Delete"));
    }

    #[test]
    fn empty_payload_has_no_message() {
        let payload: MetaWebhookPayload = serde_json::from_str(r#"{"entry": []}"#).unwrap();
        assert!(payload.first_message().is_none());

        let payload: MetaWebhookPayload = serde_json::from_str(r#"{}"#).unwrap();
        assert!(payload.first_message().is_none());
    }
}
