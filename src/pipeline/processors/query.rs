//! Analytical queries. Deliberately shallow for now: the classifier tells
//! us what was asked, and the response points at the flows that can answer
//! it properly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::types::{Intent, ParsedIntent, QueryKind, QueryPeriod};
use crate::error::ProcessError;
use crate::messenger::Messenger;
use crate::pipeline::router::Processor;
use crate::pipeline::types::{ProcessContext, ProcessOutcome};

pub struct QueryProcessor {
    messenger: Arc<dyn Messenger>,
}

fn describe(kind: &QueryKind) -> &'static str {
    match kind {
        QueryKind::TotalSpend => "total spend",
        QueryKind::TotalIncome => "total income",
        QueryKind::NetBalance => "net balance",
        QueryKind::TransactionHistory => "transaction history",
    }
}

impl QueryProcessor {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }
}

#[async_trait]
impl Processor for QueryProcessor {
    fn name(&self) -> &'static str {
        "query"
    }

    fn can_handle(&self, ctx: &ProcessContext) -> bool {
        ctx.parsed.as_ref().is_some_and(|p| p.intent == Intent::Query)
    }

    async fn process(&self, ctx: &ProcessContext) -> Result<ProcessOutcome, ProcessError> {
        let parsed = ctx
            .parsed
            .clone()
            .unwrap_or_else(|| ParsedIntent::of(Intent::Query));

        let response = match parsed.query_details.as_ref().and_then(|d| d.kind.as_ref()) {
            Some(QueryKind::TotalSpend)
                if parsed
                    .query_details
                    .as_ref()
                    .and_then(|d| d.period.as_ref())
                    == Some(&QueryPeriod::ThisMonth) =>
            {
                "Use /summary to see your daily summary, or check the dashboard \
                 for detailed analytics."
                    .to_string()
            }
            Some(kind) => format!(
                "I can help you look up {}. Check the dashboard for more details!",
                describe(kind),
            ),
            None => "I can currently only answer basic queries. \
                     Try 'Show me today's summary'."
                .to_string(),
        };

        self.messenger
            .send_message(&ctx.user.phone_number, &response)
            .await?;
        Ok(ProcessOutcome { response, parsed })
    }
}
