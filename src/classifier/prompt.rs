//! Shared prompt construction and response parsing for the classifier
//! backends. Both backends speak the same JSON schema; the differences are
//! transport-level only.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::classifier::types::{
    Intent, ParsedIntent, QueryDetails, QueryKind, QueryPeriod, UpdatedFields,
};
use crate::ledger::model::Transaction;

/// System prompt for informal Indian-context financial text. The backends
/// must output strict JSON matching `RawParsed`.
pub const SYSTEM_PROMPT: &str = r#"You are an expert financial parser for informal Indian transactions.
Analyze text in English, Hindi, Malayalam, Manglish, or Hinglish and extract structured data.

Intents:
1. CREDIT — money LEFT the user (gave, paid, lent, spent; "koduthu", "diya", "kharch kiya").
   Example: "Rajuin 500 koduthu" -> {"intent":"CREDIT","name":"Raju","amount":500}
2. DEBIT — money CAME TO the user (got, received, borrowed; "thannu", "kitti", "mila").
   Example: "Raju 500 thannu" -> {"intent":"DEBIT","name":"Raju","amount":500}
3. BALANCE — inquiry about dues or status ("How much does Raju owe?", "Raju balance ethra?").
4. UNDO — delete/correct the last entry ("undo", "delete last", "galti se add ho gaya").
5. VIEW_DAILY_SUMMARY — today's spending ("today's spend", "innathe chilavu", "aaj ka kharcha").
6. UPDATE_TRANSACTION — user is correcting a referenced entry; put changes in updated_fields.
   Example: "Actually it was 600" -> {"intent":"UPDATE_TRANSACTION","updated_fields":{"amount":600}}
7. CHAT — purely conversational; put a short friendly reply in conversational_response.
8. QUERY — analytical question about the ledger; fill query_details with
   kind (TOTAL_SPEND|TOTAL_INCOME|NET_BALANCE|TRANSACTION_HISTORY) and
   period (TODAY|THIS_WEEK|THIS_MONTH|ALL_TIME).

Rules:
- Take the USER'S perspective: "Raju paid me" means money arrived (DEBIT).
- Ignore spelling mistakes.
- amount: the numeric amount, 0 if none is mentioned.
- name: the person/shop involved, "Unknown" if not specified.
- category: inferred (Food, Travel, Salary, Loan, ...), "General" if unclear.
- Respond with ONLY a JSON object:
  {"intent":"...","amount":0,"name":"...","category":"...","description":"...",
   "conversational_response":"...","query_details":{...},"updated_fields":{...}}
  omitting fields that do not apply."#;

/// Build the user prompt, grounding the reply context when present so that
/// ambiguous replies resolve against the referenced transaction.
pub fn build_user_prompt(text: &str, reply_context: Option<&Transaction>) -> String {
    match reply_context {
        Some(tx) => format!(
            "Context: the user is replying to a recorded transaction.\n\
             Transaction: amount={} intent={} category={} description={}\n\
             User reply: \"{}\"\n\
             If they are correcting something, use UPDATE_TRANSACTION.",
            tx.amount,
            tx.intent.as_str(),
            tx.category,
            tx.description.as_deref().unwrap_or("-"),
            text,
        ),
        None => text.to_string(),
    }
}

/// Extract a JSON object from backend output (handles markdown wrapping).
pub fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

/// Wire shape of a backend response.
#[derive(Debug, Deserialize)]
struct RawParsed {
    intent: String,
    amount: Option<serde_json::Number>,
    name: Option<String>,
    category: Option<String>,
    description: Option<String>,
    conversational_response: Option<String>,
    query_details: Option<RawQueryDetails>,
    #[serde(alias = "updatedFields")]
    updated_fields: Option<RawUpdatedFields>,
}

#[derive(Debug, Deserialize)]
struct RawQueryDetails {
    #[serde(alias = "type")]
    kind: Option<String>,
    period: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpdatedFields {
    amount: Option<serde_json::Number>,
    category: Option<String>,
    description: Option<String>,
    name: Option<String>,
}

/// Parse via the string form to dodge binary float artifacts.
fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    Decimal::from_str(&n.to_string()).ok()
}

/// Treat the prompt's "not specified" sentinels as absent.
fn meaningful(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty() && !v.trim().eq_ignore_ascii_case("unknown"))
}

/// Parse raw backend output into a `ParsedIntent`.
pub fn parse_response(backend: &str, raw: &str) -> Result<ParsedIntent, String> {
    let json = extract_json_object(raw);
    let parsed: RawParsed = serde_json::from_str(&json)
        .map_err(|e| format!("{backend}: JSON parse error: {e}"))?;

    let intent = match parsed.intent.as_str() {
        "CREDIT" => Intent::Credit,
        "DEBIT" => Intent::Debit,
        "BALANCE" => Intent::Balance,
        "UNDO" => Intent::Undo,
        "UPDATE_TRANSACTION" => Intent::UpdateTransaction,
        "VIEW_DAILY_SUMMARY" => Intent::ViewDailySummary,
        "CHAT" => Intent::Chat,
        "QUERY" => Intent::Query,
        "START" => Intent::Start,
        other => return Err(format!("{backend}: unknown intent '{other}'")),
    };

    let query_details = parsed.query_details.map(|raw| QueryDetails {
        kind: raw.kind.as_deref().and_then(|k| match k {
            "TOTAL_SPEND" => Some(QueryKind::TotalSpend),
            "TOTAL_INCOME" => Some(QueryKind::TotalIncome),
            "NET_BALANCE" => Some(QueryKind::NetBalance),
            "TRANSACTION_HISTORY" => Some(QueryKind::TransactionHistory),
            _ => None,
        }),
        period: raw.period.as_deref().and_then(|p| match p {
            "TODAY" => Some(QueryPeriod::Today),
            "THIS_WEEK" => Some(QueryPeriod::ThisWeek),
            "THIS_MONTH" => Some(QueryPeriod::ThisMonth),
            "ALL_TIME" => Some(QueryPeriod::AllTime),
            _ => None,
        }),
        category: raw.category,
    });

    let updated_fields = parsed.updated_fields.map(|raw| UpdatedFields {
        amount: raw.amount.as_ref().and_then(number_to_decimal),
        category: raw.category,
        description: raw.description,
        name: raw.name,
    });

    Ok(ParsedIntent {
        intent,
        amount: parsed.amount.as_ref().and_then(number_to_decimal),
        name: meaningful(parsed.name),
        category: parsed.category,
        description: parsed.description,
        notes: None,
        conversational_response: parsed.conversational_response,
        query_details,
        updated_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::ledger::model::TransactionIntent;

    #[test]
    fn extract_direct_object() {
        let input = r#"{"intent": "BALANCE"}"#;
        assert_eq!(extract_json_object(input), input);
    }

    #[test]
    fn extract_from_markdown_block() {
        let input = "Sure:\n```json\n{\"intent\": \"CREDIT\"}\n```";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.contains("CREDIT"));
    }

    #[test]
    fn extract_embedded_in_text() {
        let input = "Here: {\"intent\": \"UNDO\"} done.";
        let result = extract_json_object(input);
        assert!(result.starts_with('{') && result.ends_with('}'));
    }

    #[test]
    fn parse_credit_response() {
        let raw = r#"{"intent":"CREDIT","amount":500,"name":"Raju","category":"Loan"}"#;
        let parsed = parse_response("test", raw).unwrap();
        assert_eq!(parsed.intent, Intent::Credit);
        assert_eq!(parsed.amount, Some(dec!(500)));
        assert_eq!(parsed.name.as_deref(), Some("Raju"));
        assert_eq!(parsed.category.as_deref(), Some("Loan"));
    }

    #[test]
    fn parse_decimal_amount_exactly() {
        let raw = r#"{"intent":"DEBIT","amount":99.95,"name":"Shop"}"#;
        let parsed = parse_response("test", raw).unwrap();
        assert_eq!(parsed.amount, Some(dec!(99.95)));
    }

    #[test]
    fn parse_update_with_camel_case_alias() {
        let raw = r#"{"intent":"UPDATE_TRANSACTION","updatedFields":{"amount":600}}"#;
        let parsed = parse_response("test", raw).unwrap();
        assert_eq!(parsed.intent, Intent::UpdateTransaction);
        assert_eq!(parsed.updated_fields.unwrap().amount, Some(dec!(600)));
    }

    #[test]
    fn unknown_name_sentinel_becomes_none() {
        let raw = r#"{"intent":"UNDO","amount":0,"name":"Unknown"}"#;
        let parsed = parse_response("test", raw).unwrap();
        assert!(parsed.name.is_none());
    }

    #[test]
    fn unknown_intent_fails() {
        let raw = r#"{"intent":"TRANSFER"}"#;
        assert!(parse_response("test", raw).is_err());
    }

    #[test]
    fn query_details_mapped() {
        let raw = r#"{"intent":"QUERY","query_details":{"type":"TOTAL_SPEND","period":"THIS_MONTH"}}"#;
        let parsed = parse_response("test", raw).unwrap();
        let details = parsed.query_details.unwrap();
        assert_eq!(details.kind, Some(QueryKind::TotalSpend));
        assert_eq!(details.period, Some(QueryPeriod::ThisMonth));
    }

    #[test]
    fn reply_context_appears_in_prompt() {
        let tx = Transaction {
            id: "t1".into(),
            user_id: "u1".into(),
            contact_id: None,
            amount: dec!(500),
            intent: TransactionIntent::Credit,
            category: "Loan".into(),
            description: None,
            date: Utc::now(),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            confirmation_message_id: None,
        };
        let prompt = build_user_prompt("actually 600", Some(&tx));
        assert!(prompt.contains("amount=500"));
        assert!(prompt.contains("intent=CREDIT"));
        assert!(prompt.contains("actually 600"));
        assert!(prompt.contains("UPDATE_TRANSACTION"));
    }

    #[test]
    fn no_context_passes_text_through() {
        assert_eq!(build_user_prompt("gave 50 to raju", None), "gave 50 to raju");
    }
}
