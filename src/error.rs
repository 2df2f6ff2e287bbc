//! Error types for the khata ledger engine.

use crate::classifier::types::Intent;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Bad column value: {0}")]
    Decode(String),
}

/// Outbound messaging errors (WhatsApp Graph API).
#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    #[error("Send failed with status {status}: {detail}")]
    SendFailed { status: u16, detail: String },

    #[error("Media download failed for {media_id}: {reason}")]
    MediaDownload { media_id: String, reason: String },

    #[error("Malformed API response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Intent classification backend errors.
///
/// Backends must fail loudly; the fallback wrapper relies on this to
/// distinguish "backend failed" from "backend degraded".
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Backend {backend} request failed: {reason}")]
    RequestFailed { backend: String, reason: String },

    #[error("Backend {backend} returned an empty response")]
    EmptyResponse { backend: String },

    #[error("Backend {backend} returned unparseable output: {reason}")]
    InvalidOutput { backend: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Speech-to-text errors. No fallback is defined; these are terminal.
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("Transcription request failed with status {status}: {detail}")]
    RequestFailed { status: u16, detail: String },

    #[error("Transcription response missing text")]
    EmptyTranscript,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Message-processing errors from the orchestrator and processors.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Amount is required for CREDIT or DEBIT intents")]
    MissingAmount,

    #[error("Unsupported intent: {0:?}")]
    UnsupportedIntent(Intent),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
