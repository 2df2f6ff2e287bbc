//! Outbound messaging abstraction.
//!
//! The pipeline only ever talks to the `Messenger` trait; the WhatsApp
//! Cloud API implementation lives in [`whatsapp`]. Tests swap in a
//! recording mock.

pub mod whatsapp;

use async_trait::async_trait;

use crate::error::MessengerError;

pub use whatsapp::WhatsAppMessenger;

/// A quick-reply button attached to an interactive message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Opaque payload echoed back when the user taps the button.
    pub id: String,
    /// Label shown to the user. WhatsApp caps this at 20 characters.
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain text message. Returns the provider message id.
    async fn send_message(&self, to: &str, body: &str) -> Result<String, MessengerError>;

    /// Send a text message with quick-reply buttons. Returns the provider
    /// message id, which callers may persist for later correlation.
    async fn send_interactive_message(
        &self,
        to: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<String, MessengerError>;

    /// Mark an inbound message as read.
    async fn mark_as_read(&self, message_id: &str) -> Result<(), MessengerError>;

    /// Show the typing indicator on the conversation that `message_id`
    /// arrived on. Cosmetic; callers may ignore failures.
    async fn send_typing_indicator(&self, message_id: &str) -> Result<(), MessengerError>;

    /// Download a media attachment. Returns the raw bytes and the MIME type
    /// reported by the provider.
    async fn download_media(&self, media_id: &str) -> Result<(Vec<u8>, String), MessengerError>;
}
