//! WhatsApp Cloud API messenger.
//!
//! All sends go through the Graph API `/{phone_number_id}/messages`
//! endpoint. Media downloads are two-step: resolve the media id to a
//! short-lived URL, then fetch the bytes with the same bearer token.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::WhatsAppConfig;
use crate::error::MessengerError;
use crate::messenger::{Button, Messenger};

const DEFAULT_API_BASE: &str = "https://graph.facebook.com";

pub struct WhatsAppMessenger {
    client: reqwest::Client,
    access_token: SecretString,
    api_base: String,
    graph_version: String,
    phone_number_id: String,
}

#[derive(Deserialize)]
struct SendResponse {
    messages: Option<Vec<SentMessage>>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Deserialize)]
struct MediaInfo {
    url: String,
    mime_type: Option<String>,
}

impl WhatsAppMessenger {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self::with_base(config, DEFAULT_API_BASE)
    }

    pub fn with_base(config: &WhatsAppConfig, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: config.access_token.clone(),
            api_base: api_base.to_string(),
            graph_version: config.graph_version.clone(),
            phone_number_id: config.phone_number_id.clone(),
        }
    }

    fn messages_endpoint(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.api_base, self.graph_version, self.phone_number_id
        )
    }

    /// POST a payload to the messages endpoint and return the message id
    /// when the API reports one.
    async fn post_message(
        &self,
        payload: serde_json::Value,
    ) -> Result<Option<String>, MessengerError> {
        let response = self
            .client
            .post(self.messages_endpoint())
            .bearer_auth(self.access_token.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MessengerError::SendFailed {
                status: status.as_u16(),
                detail,
            });
        }

        let sent: SendResponse = response.json().await?;
        Ok(sent.messages.and_then(|m| m.into_iter().next()).map(|m| m.id))
    }
}

#[async_trait]
impl Messenger for WhatsAppMessenger {
    async fn send_message(&self, to: &str, body: &str) -> Result<String, MessengerError> {
        debug!(to, "Sending text message");
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": { "body": body },
        });
        self.post_message(payload).await?.ok_or_else(|| {
            MessengerError::InvalidResponse("send response missing message id".to_string())
        })
    }

    async fn send_interactive_message(
        &self,
        to: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<String, MessengerError> {
        debug!(to, buttons = buttons.len(), "Sending interactive message");
        let rendered: Vec<serde_json::Value> = buttons
            .iter()
            .map(|b| {
                json!({
                    "type": "reply",
                    "reply": { "id": b.id, "title": b.title },
                })
            })
            .collect();

        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "interactive",
            "interactive": {
                "type": "button",
                "body": { "text": body },
                "action": { "buttons": rendered },
            },
        });
        self.post_message(payload).await?.ok_or_else(|| {
            MessengerError::InvalidResponse("send response missing message id".to_string())
        })
    }

    async fn mark_as_read(&self, message_id: &str) -> Result<(), MessengerError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id,
        });
        self.post_message(payload).await?;
        Ok(())
    }

    async fn send_typing_indicator(&self, message_id: &str) -> Result<(), MessengerError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id,
            "typing_indicator": { "type": "text" },
        });
        self.post_message(payload).await?;
        Ok(())
    }

    async fn download_media(&self, media_id: &str) -> Result<(Vec<u8>, String), MessengerError> {
        let info_url = format!("{}/{}/{}", self.api_base, self.graph_version, media_id);
        let response = self
            .client
            .get(&info_url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MessengerError::MediaDownload {
                media_id: media_id.to_string(),
                reason: format!("metadata fetch returned {status}: {detail}"),
            });
        }
        let info: MediaInfo = response.json().await?;

        let media = self
            .client
            .get(&info.url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;

        let status = media.status();
        if !status.is_success() {
            return Err(MessengerError::MediaDownload {
                media_id: media_id.to_string(),
                reason: format!("content fetch returned {status}"),
            });
        }

        let mime = info
            .mime_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = media.bytes().await?.to_vec();
        debug!(media_id, bytes = bytes.len(), mime, "Downloaded media");
        Ok((bytes, mime))
    }
}
