//! Voice-note flow: download the media, transcribe it, then run the
//! transcript through the same orchestrator as typed text.

use std::sync::Arc;

use tracing::info;

use crate::error::Error;
use crate::messenger::Messenger;
use crate::pipeline::orchestrator::{ConversationOrchestrator, IncomingMessage};
use crate::pipeline::types::MessageBody;
use crate::transcribe::Transcriber;

/// A processed voice note: what was heard, and what was said back.
#[derive(Debug, Clone)]
pub struct VoiceOutcome {
    pub transcribed_text: String,
    pub response: String,
}

pub struct VoiceMessageFlow {
    messenger: Arc<dyn Messenger>,
    transcriber: Arc<dyn Transcriber>,
    orchestrator: Arc<ConversationOrchestrator>,
}

impl VoiceMessageFlow {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        transcriber: Arc<dyn Transcriber>,
        orchestrator: Arc<ConversationOrchestrator>,
    ) -> Self {
        Self {
            messenger,
            transcriber,
            orchestrator,
        }
    }

    pub async fn execute(
        &self,
        sender_phone: &str,
        sender_name: Option<&str>,
        media_id: &str,
        reply_to_message_id: Option<String>,
    ) -> Result<VoiceOutcome, Error> {
        let (audio, mime) = self.messenger.download_media(media_id).await?;
        let transcription = self.transcriber.transcribe(audio, &mime).await?;
        info!(
            media_id,
            language = ?transcription.language,
            "Transcribed voice note"
        );

        let outcome = self
            .orchestrator
            .execute(IncomingMessage {
                sender_phone: sender_phone.to_string(),
                sender_name: sender_name.map(str::to_string),
                body: MessageBody::Text(transcription.text.clone()),
                reply_to_message_id,
            })
            .await?;

        Ok(VoiceOutcome {
            transcribed_text: transcription.text,
            response: outcome.response,
        })
    }
}
