//! Message-processing pipeline: dedup guard, processor routing, and the
//! per-message orchestrator.

pub mod dedup;
pub mod orchestrator;
pub mod processors;
pub mod router;
pub mod types;
pub mod voice;

use std::sync::Arc;

pub use dedup::MessageDeduplicator;
pub use orchestrator::{ConversationOrchestrator, IncomingMessage};
pub use router::{Processor, ProcessorRouter};
pub use types::{MessageBody, ProcessContext, ProcessOutcome};
pub use voice::{VoiceMessageFlow, VoiceOutcome};

use crate::ledger::{ContactResolver, TransactionLedger};
use crate::messenger::Messenger;
use crate::pipeline::processors::{
    BalanceProcessor, ChatProcessor, ConfirmationProcessor, DailySummaryProcessor,
    QueryProcessor, ReplyProcessor, StartProcessor, TransactionProcessor, UndoProcessor,
};

/// The production processor ordering. Confirmation buttons and keyword
/// handlers come first so they can claim messages before classification;
/// chat and query trail everything ledger-mutating.
pub fn default_router(
    ledger: Arc<TransactionLedger>,
    contacts: Arc<ContactResolver>,
    messenger: Arc<dyn Messenger>,
) -> ProcessorRouter {
    ProcessorRouter::new(vec![
        Arc::new(ConfirmationProcessor::new(
            Arc::clone(&ledger),
            Arc::clone(&messenger),
        )),
        Arc::new(StartProcessor::new(Arc::clone(&messenger))),
        Arc::new(ReplyProcessor::new(
            Arc::clone(&ledger),
            Arc::clone(&messenger),
        )),
        Arc::new(BalanceProcessor::new(
            Arc::clone(&ledger),
            Arc::clone(&contacts),
            Arc::clone(&messenger),
        )),
        Arc::new(UndoProcessor::new(
            Arc::clone(&ledger),
            Arc::clone(&messenger),
        )),
        Arc::new(TransactionProcessor::new(
            Arc::clone(&ledger),
            Arc::clone(&contacts),
            Arc::clone(&messenger),
        )),
        Arc::new(DailySummaryProcessor::new(
            Arc::clone(&ledger),
            Arc::clone(&messenger),
        )),
        Arc::new(ChatProcessor::new(Arc::clone(&messenger))),
        Arc::new(QueryProcessor::new(messenger)),
    ])
}
