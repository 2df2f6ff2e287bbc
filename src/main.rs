use std::sync::Arc;

use khata::classifier::{self, FallbackParser};
use khata::config::Config;
use khata::ledger::{ContactResolver, TransactionLedger};
use khata::messenger::{Messenger, WhatsAppMessenger};
use khata::pipeline::orchestrator::default_quick_replies;
use khata::pipeline::{
    self, ConversationOrchestrator, MessageDeduplicator, VoiceMessageFlow,
};
use khata::server::{webhook_routes, WebhookState};
use khata::store::{LedgerStore, LibSqlStore};
use khata::transcribe::{SarvamTranscriber, Transcriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    // ── Persistence ──────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    let store: Arc<dyn LedgerStore> = Arc::new(LibSqlStore::new_local(db_path).await?);
    tracing::info!(db_path = %config.db_path, "Database ready");

    // ── Core services ────────────────────────────────────────────────
    let ledger = Arc::new(TransactionLedger::new(Arc::clone(&store)));
    let contacts = Arc::new(ContactResolver::new(Arc::clone(&store)));
    let dedup = Arc::new(MessageDeduplicator::new(Arc::clone(&store)));

    let messenger: Arc<dyn Messenger> = Arc::new(WhatsAppMessenger::new(&config.whatsapp));
    let transcriber: Arc<dyn Transcriber> =
        Arc::new(SarvamTranscriber::new(config.sarvam_api_key.clone()));
    let parser: Arc<FallbackParser> = Arc::new(classifier::create_classifier(&config.classifier));

    // ── Pipeline ─────────────────────────────────────────────────────
    let router = pipeline::default_router(
        Arc::clone(&ledger),
        Arc::clone(&contacts),
        Arc::clone(&messenger),
    );
    let orchestrator = Arc::new(ConversationOrchestrator::new(
        ledger,
        parser,
        Arc::clone(&messenger),
        router,
        default_quick_replies(),
    ));
    let voice = Arc::new(VoiceMessageFlow::new(
        Arc::clone(&messenger),
        transcriber,
        Arc::clone(&orchestrator),
    ));

    // ── Server ───────────────────────────────────────────────────────
    let app = webhook_routes(WebhookState {
        orchestrator,
        voice,
        dedup,
        messenger,
        verify_token: config.whatsapp.verify_token.clone(),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Webhook server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
