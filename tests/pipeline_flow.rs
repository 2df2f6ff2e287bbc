//! End-to-end pipeline tests: in-memory store, recording messenger, and a
//! scripted classifier standing in for the real backends.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

use khata::classifier::types::{Intent, ParsedIntent, UpdatedFields};
use khata::classifier::{FallbackParser, IntentParser};
use khata::error::{ClassifierError, MessengerError};
use khata::ledger::model::Transaction;
use khata::ledger::{ContactResolver, TransactionLedger};
use khata::messenger::{Button, Messenger};
use khata::pipeline::orchestrator::default_quick_replies;
use khata::pipeline::{
    self, ConversationOrchestrator, IncomingMessage, MessageBody, MessageDeduplicator,
};
use khata::store::{LedgerStore, LibSqlStore};

// ── Test doubles ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SentMessage {
    to: String,
    body: String,
    buttons: Vec<Button>,
}

#[derive(Default)]
struct MockMessenger {
    sent: std::sync::Mutex<Vec<SentMessage>>,
    counter: std::sync::Mutex<u32>,
}

impl MockMessenger {
    fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn last(&self) -> SentMessage {
        self.sent.lock().unwrap().last().cloned().expect("no messages sent")
    }

    fn record(&self, to: &str, body: &str, buttons: &[Button]) -> String {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            body: body.to_string(),
            buttons: buttons.to_vec(),
        });
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        format!("m{}", *counter)
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_message(&self, to: &str, body: &str) -> Result<String, MessengerError> {
        Ok(self.record(to, body, &[]))
    }

    async fn send_interactive_message(
        &self,
        to: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<String, MessengerError> {
        Ok(self.record(to, body, buttons))
    }

    async fn mark_as_read(&self, _message_id: &str) -> Result<(), MessengerError> {
        Ok(())
    }

    async fn send_typing_indicator(&self, _message_id: &str) -> Result<(), MessengerError> {
        Ok(())
    }

    async fn download_media(&self, media_id: &str) -> Result<(Vec<u8>, String), MessengerError> {
        Err(MessengerError::MediaDownload {
            media_id: media_id.to_string(),
            reason: "not supported in tests".to_string(),
        })
    }
}

/// Pops scripted results in order; errors when the script runs dry so a
/// test that classifies more than it scripted fails loudly.
struct ScriptedParser {
    script: Arc<Mutex<VecDeque<ParsedIntent>>>,
}

#[async_trait]
impl IntentParser for ScriptedParser {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn parse_text(
        &self,
        _text: &str,
        _reply_context: Option<&Transaction>,
    ) -> Result<ParsedIntent, ClassifierError> {
        self.script
            .lock()
            .await
            .pop_front()
            .ok_or(ClassifierError::RequestFailed {
                backend: "scripted".to_string(),
                reason: "script exhausted".to_string(),
            })
    }
}

struct AlwaysFailingParser;

#[async_trait]
impl IntentParser for AlwaysFailingParser {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn parse_text(
        &self,
        _text: &str,
        _reply_context: Option<&Transaction>,
    ) -> Result<ParsedIntent, ClassifierError> {
        Err(ClassifierError::RequestFailed {
            backend: "failing".to_string(),
            reason: "unavailable".to_string(),
        })
    }
}

// ── Harness ─────────────────────────────────────────────────────────

const PHONE: &str = "919900112233";

struct Harness {
    store: Arc<dyn LedgerStore>,
    ledger: Arc<TransactionLedger>,
    messenger: Arc<MockMessenger>,
    orchestrator: ConversationOrchestrator,
    script: Arc<Mutex<VecDeque<ParsedIntent>>>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_backends(|script| {
            vec![Arc::new(ScriptedParser { script }) as Arc<dyn IntentParser>]
        })
        .await
    }

    async fn degraded() -> Self {
        Self::with_backends(|_| {
            vec![
                Arc::new(AlwaysFailingParser) as Arc<dyn IntentParser>,
                Arc::new(AlwaysFailingParser),
            ]
        })
        .await
    }

    async fn with_backends(
        backends: impl FnOnce(Arc<Mutex<VecDeque<ParsedIntent>>>) -> Vec<Arc<dyn IntentParser>>,
    ) -> Self {
        let store: Arc<dyn LedgerStore> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let ledger = Arc::new(TransactionLedger::new(Arc::clone(&store)));
        let contacts = Arc::new(ContactResolver::new(Arc::clone(&store)));
        let messenger = Arc::new(MockMessenger::default());
        let script = Arc::new(Mutex::new(VecDeque::new()));

        let classifier = Arc::new(FallbackParser::new(backends(Arc::clone(&script))));
        let router = pipeline::default_router(
            Arc::clone(&ledger),
            contacts,
            Arc::clone(&messenger) as Arc<dyn Messenger>,
        );
        let orchestrator = ConversationOrchestrator::new(
            Arc::clone(&ledger),
            classifier,
            Arc::clone(&messenger) as Arc<dyn Messenger>,
            router,
            default_quick_replies(),
        );

        Self {
            store,
            ledger,
            messenger,
            orchestrator,
            script,
        }
    }

    async fn expect_parse(&self, parsed: ParsedIntent) {
        self.script.lock().await.push_back(parsed);
    }

    async fn send_text(&self, text: &str) -> String {
        self.send(MessageBody::Text(text.to_string()), None).await
    }

    async fn send_reply(&self, text: &str, reply_to: &str) -> String {
        self.send(
            MessageBody::Text(text.to_string()),
            Some(reply_to.to_string()),
        )
        .await
    }

    async fn send_button(&self, id: &str, title: &str) -> String {
        self.send(
            MessageBody::Button {
                id: id.to_string(),
                title: title.to_string(),
            },
            None,
        )
        .await
    }

    async fn send(&self, body: MessageBody, reply_to: Option<String>) -> String {
        self.orchestrator
            .execute(IncomingMessage {
                sender_phone: PHONE.to_string(),
                sender_name: Some("Sadik".to_string()),
                body,
                reply_to_message_id: reply_to,
            })
            .await
            .unwrap()
            .response
    }

    fn credit(amount: rust_decimal::Decimal, name: &str) -> ParsedIntent {
        let mut parsed = ParsedIntent::of(Intent::Credit);
        parsed.amount = Some(amount);
        parsed.name = Some(name.to_string());
        parsed.category = Some("Loan".to_string());
        parsed
    }

    fn debit(amount: rust_decimal::Decimal, name: &str) -> ParsedIntent {
        let mut parsed = ParsedIntent::of(Intent::Debit);
        parsed.amount = Some(amount);
        parsed.name = Some(name.to_string());
        parsed
    }

    fn balance_query(name: &str) -> ParsedIntent {
        let mut parsed = ParsedIntent::of(Intent::Balance);
        parsed.name = Some(name.to_string());
        parsed
    }

    async fn contact_balance(&self, name: &str) -> rust_decimal::Decimal {
        let user = self.store.find_user_by_phone(PHONE).await.unwrap().unwrap();
        self.store
            .find_contact_by_name(&user.id, name)
            .await
            .unwrap()
            .unwrap()
            .current_balance
    }
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn credit_then_balance_report() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(500), "Raju")).await;
    let response = h.send_text("Gave 500 to Raju").await;
    assert!(response.contains("Entry Added"));
    assert!(response.contains("₹500.00"));
    assert!(response.contains("To: Raju"));

    // The confirmation message id must be linked for reply correlation.
    let linked = h.ledger.find_by_confirmation_id("m1").await.unwrap();
    assert!(linked.is_some());

    h.expect_parse(Harness::balance_query("Raju")).await;
    let report = h.send_text("Balance for Raju").await;
    assert!(report.contains("Customer Report: Raju"));
    assert!(report.contains("₹500.00"));
    assert!(report.contains("🟢 (Credit)"));
}

#[tokio::test]
async fn debit_subtracts_from_balance() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(500), "Raju")).await;
    h.send_text("Gave 500 to Raju").await;
    h.expect_parse(Harness::debit(dec!(200), "Raju")).await;
    h.send_text("Raju gave me back 200").await;

    assert_eq!(h.contact_balance("Raju").await, dec!(300));

    h.expect_parse(Harness::balance_query("Raju")).await;
    let report = h.send_text("Balance for Raju").await;
    assert!(report.contains("₹300.00"));
}

#[tokio::test]
async fn legacy_reply_updates_category_without_classification() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(120), "Raju")).await;
    h.send_text("Gave 120 to Raju").await;
    let tx = h.ledger.find_by_confirmation_id("m1").await.unwrap().unwrap();

    // Handled in the pre-classification pass; nothing scripted.
    let response = h.send_reply("update category to Food", "m1").await;
    assert!(response.contains("Category Updated"));
    assert!(response.contains("Food"));

    let updated = h.ledger.find_by_id(&tx.id).await.unwrap().unwrap();
    assert_eq!(updated.category, "Food");
}

#[tokio::test]
async fn classified_reply_updates_amount_and_recomputes() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(500), "Raju")).await;
    h.send_text("Gave 500 to Raju").await;

    let mut update = ParsedIntent::of(Intent::UpdateTransaction);
    update.updated_fields = Some(UpdatedFields {
        amount: Some(dec!(600)),
        ..Default::default()
    });
    h.expect_parse(update).await;

    let response = h.send_reply("actually it was 600", "m1").await;
    assert!(response.contains("Transaction Updated"));
    assert!(response.contains("600"));
    assert_eq!(h.contact_balance("Raju").await, dec!(600));
}

#[tokio::test]
async fn two_phase_delete_confirm_restores_balance() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(100), "Raju")).await;
    h.send_text("Gave 100 to Raju").await;
    h.expect_parse(Harness::credit(dec!(75), "Raju")).await;
    h.send_text("Gave 75 to Raju").await;
    assert_eq!(h.contact_balance("Raju").await, dec!(175));
    let target = h.ledger.find_by_confirmation_id("m2").await.unwrap().unwrap();

    // Phase 1: reply "delete" asks for confirmation, nothing deleted yet.
    let prompt = h.send_reply("delete", "m2").await;
    assert!(prompt.contains("Are you sure"));
    let sent = h.messenger.last();
    let ids: Vec<&str> = sent.buttons.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            format!("confirm_delete_{}", target.id).as_str(),
            format!("cancel_delete_{}", target.id).as_str(),
        ]
    );
    assert_eq!(h.contact_balance("Raju").await, dec!(175));

    // Phase 2: the confirm tap soft-deletes and restores the balance.
    let done = h
        .send_button(&format!("confirm_delete_{}", target.id), "Delete")
        .await;
    assert!(done.contains("Entry Deleted"));
    assert_eq!(h.contact_balance("Raju").await, dec!(100));

    let deleted = h.ledger.find_by_id(&target.id).await.unwrap().unwrap();
    assert!(deleted.is_deleted);
}

#[tokio::test]
async fn two_phase_delete_cancel_keeps_entry() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(50), "Raju")).await;
    h.send_text("Gave 50 to Raju").await;
    let target = h.ledger.find_by_confirmation_id("m1").await.unwrap().unwrap();

    h.send_reply("please delete this", "m1").await;
    let response = h
        .send_button(&format!("cancel_delete_{}", target.id), "Cancel")
        .await;
    assert!(response.contains("cancelled"));

    let kept = h.ledger.find_by_id(&target.id).await.unwrap().unwrap();
    assert!(!kept.is_deleted);
    assert_eq!(h.contact_balance("Raju").await, dec!(50));
}

#[tokio::test]
async fn confirming_twice_reports_already_deleted() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(50), "Raju")).await;
    h.send_text("Gave 50 to Raju").await;
    let target = h.ledger.find_by_confirmation_id("m1").await.unwrap().unwrap();
    let confirm_id = format!("confirm_delete_{}", target.id);

    h.send_button(&confirm_id, "Delete").await;
    let second = h.send_button(&confirm_id, "Delete").await;
    assert!(second.contains("not found or already deleted"));
}

#[tokio::test]
async fn duplicate_delivery_is_a_no_op() {
    let h = Harness::new().await;
    let dedup = MessageDeduplicator::new(Arc::clone(&h.store));

    // First delivery: unseen, mark, process.
    assert!(!dedup.has_been_processed("wamid.1").await.unwrap());
    dedup.mark_processed("wamid.1").await.unwrap();
    h.expect_parse(Harness::credit(dec!(500), "Raju")).await;
    h.send_text("Gave 500 to Raju").await;

    // Redelivery: flagged before the pipeline runs.
    assert!(dedup.has_been_processed("wamid.1").await.unwrap());

    let user = h.store.find_user_by_phone(PHONE).await.unwrap().unwrap();
    let entries = h.store.find_transactions_by_user(&user.id).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn degraded_classification_still_answers() {
    let h = Harness::degraded().await;

    let response = h.send_text("something the backends never saw").await;
    // Degraded result is a BALANCE for "Unknown": harmless, read-only.
    assert!(response.contains("Unknown"));

    let user = h.store.find_user_by_phone(PHONE).await.unwrap().unwrap();
    let entries = h.store.find_transactions_by_user(&user.id).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn quick_replies_skip_the_classifier() {
    let h = Harness::new().await;

    // Nothing scripted: a classifier call would fail the test.
    assert_eq!(h.send_text("ping").await, "pong");
    assert_eq!(h.send_text("  PING  ").await, "pong");

    let greeting = h.send_text("start").await;
    assert!(greeting.contains("Hey Sadik"));
}

#[tokio::test]
async fn undo_via_classifier_removes_last_entry() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(500), "Raju")).await;
    h.send_text("Gave 500 to Raju").await;

    h.expect_parse(ParsedIntent::of(Intent::Undo)).await;
    let response = h.send_text("galti se add ho gaya, undo").await;
    assert!(response.contains("Deleted Last Entry"));
    assert_eq!(h.contact_balance("Raju").await, dec!(0));

    h.expect_parse(ParsedIntent::of(Intent::Undo)).await;
    let empty = h.send_text("undo").await;
    assert!(empty.contains("No recent transaction"));
}

#[tokio::test]
async fn daily_summary_reports_credit_spend() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(120), "Raju")).await;
    h.send_text("Gave 120 to Raju for food").await;
    h.expect_parse(Harness::debit(dec!(999), "Raju")).await;
    h.send_text("Raju returned 999").await;

    h.expect_parse(ParsedIntent::of(Intent::ViewDailySummary)).await;
    let summary = h.send_text("innathe chilavu?").await;
    assert!(summary.contains("Today's Summary"));
    assert!(summary.contains("₹120.00"));
    assert!(!summary.contains("₹1119.00"));
}

#[tokio::test]
async fn every_message_gets_exactly_one_response() {
    let h = Harness::new().await;

    h.expect_parse(Harness::credit(dec!(10), "Raju")).await;
    h.send_text("Gave 10 to Raju").await;
    assert_eq!(h.messenger.sent().len(), 1);

    h.expect_parse(Harness::balance_query("Raju")).await;
    h.send_text("Balance for Raju").await;
    assert_eq!(h.messenger.sent().len(), 2);
}
